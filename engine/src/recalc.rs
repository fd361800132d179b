//! FILENAME: engine/src/recalc.rs
//! PURPOSE: The recomputation scheduler behind every workbook mutation.
//! CONTEXT: An edit installs new contents, evaluates them and installs the
//! new graph edges. The scheduler then walks the strongly connected
//! components of everything that depends on the edited cell: cycles become
//! #CIRCREF!, every other cell is re-evaluated in dependency order. A log of
//! the values cells had before the mutation decides which cells are reported
//! to change listeners once the public call completes.

use crate::cell::{Cell, CellErrorType, CellValue};
use crate::coord::{coord_to_a1, CellCoord};
use crate::dependency_graph::CellId;
use crate::evaluator::Evaluator;
use crate::workbook::{ChangedCell, Workbook};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Values of the cells touched by the running mutation, as they were
/// before it started. Remembers first-touch order.
#[derive(Debug, Default)]
pub(crate) struct ChangeLog {
    original: FxHashMap<CellId, CellValue>,
    order: Vec<CellId>,
}

impl ChangeLog {
    /// Remembers `value` unless the cell was already touched.
    fn record(&mut self, id: &CellId, value: CellValue) {
        if !self.original.contains_key(id) {
            self.original.insert(id.clone(), value);
            self.order.push(id.clone());
        }
    }

    fn drain(&mut self) -> Vec<(CellId, CellValue)> {
        let mut original = std::mem::take(&mut self.original);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| original.remove(&id).map(|value| (id, value)))
            .collect()
    }
}

impl Workbook {
    /// Current value of a cell; unset cells and missing sheets are empty.
    fn current_value(&self, id: &CellId) -> CellValue {
        self.sheet_by_key(&id.sheet)
            .and_then(|sheet| sheet.grid.get_cell(id.coord))
            .map(|cell| cell.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Replaces the contents of one cell and brings every dependent cell up
    /// to date. Does not notify listeners.
    pub(crate) fn apply_contents(&mut self, sheet_index: usize, coord: CellCoord, contents: &str) {
        let contents = contents.trim();
        let id = CellId::new(self.sheets[sheet_index].key.clone(), coord);
        let original = self.current_value(&id);
        self.changes.record(&id, original);

        let grid = &mut self.sheets[sheet_index].grid;
        let previous = if contents.is_empty() {
            grid.clear_cell(coord)
        } else {
            let mut cell = Cell::new(contents);
            if contents.starts_with('=') {
                // The cached AST stays valid while the text is unchanged.
                let cached = grid
                    .get_cell(coord)
                    .filter(|old| old.contents == contents)
                    .and_then(|old| old.formula.clone());
                match cached.map(Ok).unwrap_or_else(|| parser::parse(contents)) {
                    Ok(formula) => cell.formula = Some(formula),
                    Err(e) => cell.value = CellValue::error(CellErrorType::Parse, e.message),
                }
            } else {
                cell.value = CellValue::from_literal(contents);
            }
            grid.replace_cell(coord, cell)
        };
        if let Some(old) = &previous {
            self.graph.remove_references(&id, &old.references);
        }

        log::trace!("set {} to {:?}", id, contents);
        self.evaluate_cell(&id);
        self.propagate(&id);
    }

    /// Re-evaluates one formula cell, storing its value and replacing its
    /// graph edges. Returns true if the set of cells it reads changed.
    /// Literal cells, parse errors and missing cells are left alone.
    pub(crate) fn evaluate_cell(&mut self, id: &CellId) -> bool {
        let Some(sheet_index) = self.sheet_position(&id.sheet) else {
            return false;
        };
        let Some(formula) = self.sheets[sheet_index]
            .grid
            .get_cell_mut(id.coord)
            .and_then(|cell| cell.formula.take())
        else {
            return false;
        };

        let (value, references) = Evaluator::evaluate_formula(&*self, &id.sheet, &formula);

        let original = self.current_value(id);
        self.changes.record(id, original);

        let Some(cell) = self.sheets[sheet_index].grid.get_cell_mut(id.coord) else {
            return false;
        };
        cell.formula = Some(formula);
        cell.value = value;
        if cell.references == references {
            return false;
        }
        self.graph.remove_references(id, &cell.references);
        self.graph.add_references(id, &references);
        cell.references = references;
        true
    }

    fn mark_circular(&mut self, id: &CellId) {
        let original = self.current_value(id);
        self.changes.record(id, original);
        let Some(sheet_index) = self.sheet_position(&id.sheet) else {
            return;
        };
        if let Some(cell) = self.sheets[sheet_index].grid.get_cell_mut(id.coord) {
            cell.value = CellValue::error(CellErrorType::CircularReference, format!("{} is part of a cycle", id));
        }
    }

    /// Brings every cell that transitively depends on `start` up to date.
    /// `start` itself must already be evaluated.
    pub(crate) fn propagate(&mut self, start: &CellId) {
        // Each entry is an origin to walk from, and whether the origin must be
        // evaluated again first because it read cells that were stale.
        let mut pending = vec![(start.clone(), false)];
        // Cycle members re-evaluated during this walk, at most once each.
        let mut refreshed: BTreeSet<CellId> = BTreeSet::new();

        while let Some((origin, stale)) = pending.pop() {
            if stale {
                self.evaluate_cell(&origin);
            }
            let order = self.graph.strongly_connected_from(&origin);
            log::trace!("recompute from {}: {} components", origin, order.components.len());

            for component in order.components {
                if component.cyclic {
                    // A member whose taken branches moved may no longer close the loop.
                    let mut rewired = false;
                    for member in &component.cells {
                        if refreshed.insert(member.clone()) {
                            rewired |= self.evaluate_cell(member);
                        }
                    }
                    if rewired {
                        pending.push((origin.clone(), false));
                        break;
                    }

                    log::warn!(
                        "circular reference through {} cells, starting at {}",
                        component.cells.len(),
                        component.cells[0]
                    );
                    for member in &component.cells {
                        self.mark_circular(member);
                    }
                    continue;
                }

                let cell = &component.cells[0];
                if *cell == origin {
                    continue;
                }
                // New references may point at cells later in this order, which
                // are still stale. Evaluate again once this walk is done.
                if self.evaluate_cell(cell) {
                    pending.push((cell.clone(), true));
                }
            }
        }
    }

    /// Re-evaluates `cells` and everything depending on them, for changes
    /// that did not go through `apply_contents` (sheets appearing, vanishing
    /// or being renamed).
    pub(crate) fn recompute_cells(&mut self, cells: Vec<CellId>) {
        let cells: BTreeSet<CellId> = cells.into_iter().collect();
        for id in cells {
            self.evaluate_cell(&id);
            self.propagate(&id);
        }
    }

    /// Ends a public mutation: reports every cell whose value differs from
    /// before the mutation to each listener, once.
    pub(crate) fn finish_mutation(&mut self) {
        let touched = self.changes.drain();
        let changed: Vec<ChangedCell> = touched
            .into_iter()
            .filter_map(|(id, original)| {
                let sheet = self.sheet_by_key(&id.sheet)?;
                let current = sheet
                    .grid
                    .get_cell(id.coord)
                    .map(|cell| &cell.value)
                    .unwrap_or(&CellValue::Empty);
                (*current != original).then(|| ChangedCell {
                    sheet: sheet.name.clone(),
                    location: coord_to_a1(id.coord),
                })
            })
            .collect();

        if changed.is_empty() {
            return;
        }
        log::trace!("notifying {} listeners of {} changed cells", self.listeners.len(), changed.len());

        for listener in &self.listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(self, &changed)));
            if outcome.is_err() {
                log::error!("change listener panicked; {} changed cells were not delivered to it", changed.len());
            }
        }
    }
}
