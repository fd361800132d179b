//! FILENAME: engine/src/workbook.rs
//! PURPOSE: The public workbook: named sheets of cells plus the dependency graph.
//! CONTEXT: Every public mutation validates its arguments first, then applies
//! edits through the scheduler in `recalc.rs`, then notifies change
//! listeners once. Sheet names keep their case for display; lookups go
//! through a lowercase key.

use crate::cell::CellValue;
use crate::coord::{coord_to_a1, normalize_corners, offset_coord, parse_location, CellCoord};
use crate::dependency_graph::{CellId, DependencyGraph};
use crate::error::{Result, WorkbookError};
use crate::evaluator::EvalContext;
use crate::grid::Grid;
use crate::recalc::ChangeLog;
use crate::reference_rewriter;
use std::collections::BTreeMap;
use std::fmt;

/// Punctuation allowed in sheet names besides letters, digits and spaces.
const SHEET_NAME_PUNCTUATION: &str = ".?!,:;@#$%^&*()-_";

/// A cell whose value changed during one public call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedCell {
    /// Sheet display name.
    pub sheet: String,
    /// Upper-case A1 location.
    pub location: String,
}

/// Called after each mutation that changed at least one value.
pub type ChangeListener = Box<dyn Fn(&Workbook, &[ChangedCell])>;

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    /// Lowercase name, used for lookups and graph ids.
    pub(crate) key: String,
    pub(crate) grid: Grid,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            key: name.to_lowercase(),
            grid: Grid::new(),
        }
    }
}

pub struct Workbook {
    pub(crate) sheets: Vec<Sheet>,
    pub(crate) graph: DependencyGraph,
    pub(crate) changes: ChangeLog,
    pub(crate) listeners: Vec<ChangeListener>,
}

impl fmt::Debug for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sheets.iter().map(|sheet| sheet.name.as_str()).collect();
        f.debug_struct("Workbook")
            .field("sheets", &names)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext for Workbook {
    fn cell_value(&self, sheet_key: &str, coord: CellCoord) -> Option<CellValue> {
        let sheet = self.sheet_by_key(sheet_key)?;
        Some(
            sheet
                .grid
                .get_cell(coord)
                .map(|cell| cell.value.clone())
                .unwrap_or(CellValue::Empty),
        )
    }
}

pub(crate) fn location(text: &str) -> Result<CellCoord> {
    parse_location(text).ok_or_else(|| WorkbookError::InvalidLocation(text.to_string()))
}

fn validate_sheet_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.trim() == name
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || SHEET_NAME_PUNCTUATION.contains(c));
    if valid {
        Ok(())
    } else {
        Err(WorkbookError::InvalidSheetName(name.to_string()))
    }
}

/// True if `coord` lies in the rectangle with corners `top_left` and `bottom_right`.
pub(crate) fn within(coord: CellCoord, top_left: CellCoord, bottom_right: CellCoord) -> bool {
    (top_left.0..=bottom_right.0).contains(&coord.0) && (top_left.1..=bottom_right.1).contains(&coord.1)
}

/// Contents of a formula relocated by a delta. Unparsable formulas and
/// literals come back unchanged.
pub(crate) fn relocate_contents(contents: &str, row_delta: i64, col_delta: i64) -> String {
    if !contents.starts_with('=') {
        return contents.to_string();
    }
    match parser::parse(contents) {
        Ok(expr) => format!("={}", reference_rewriter::relocate(&expr, row_delta, col_delta)),
        Err(_) => contents.to_string(),
    }
}

impl Workbook {
    /// Creates a workbook with no sheets.
    pub fn new() -> Self {
        Workbook {
            sheets: Vec::new(),
            graph: DependencyGraph::new(),
            changes: ChangeLog::default(),
            listeners: Vec::new(),
        }
    }

    // ==================== Sheet lookup ====================

    pub(crate) fn sheet_position(&self, key: &str) -> Option<usize> {
        self.sheets.iter().position(|sheet| sheet.key == key)
    }

    pub(crate) fn sheet_by_key(&self, key: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.key == key)
    }

    /// Index of the sheet with this name, compared case-insensitively.
    pub(crate) fn sheet_index(&self, name: &str) -> Result<usize> {
        self.sheet_position(&name.to_lowercase())
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()))
    }

    fn name_taken(&self, name: &str) -> bool {
        self.sheet_position(&name.to_lowercase()).is_some()
    }

    pub fn num_sheets(&self) -> usize {
        self.sheets.len()
    }

    /// Sheet display names in workbook order.
    pub fn list_sheets(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    // ==================== Sheet operations ====================

    /// Adds a sheet at the end. Without a name, the first free `SheetN` is used.
    /// Returns the new sheet's index and name.
    pub fn new_sheet(&mut self, name: Option<&str>) -> Result<(usize, String)> {
        let result = self.insert_sheet(name)?;
        self.finish_mutation();
        Ok(result)
    }

    fn insert_sheet(&mut self, name: Option<&str>) -> Result<(usize, String)> {
        let name = match name {
            Some(name) => {
                validate_sheet_name(name)?;
                if self.name_taken(name) {
                    return Err(WorkbookError::DuplicateSheetName(name.to_string()));
                }
                name.to_string()
            }
            None => (1..)
                .map(|n| format!("Sheet{}", n))
                .find(|candidate| !self.name_taken(candidate))
                .unwrap_or_default(),
        };

        let sheet = Sheet::new(&name);
        let key = sheet.key.clone();
        self.sheets.push(sheet);
        log::debug!("created sheet {:?}", name);

        // References to this name that were dangling now resolve.
        let waiting = self.graph.parents_of_sheet(&key);
        self.recompute_cells(waiting);
        Ok((self.sheets.len() - 1, name))
    }

    /// Removes a sheet. Formulas that referenced it become #REF!.
    pub fn del_sheet(&mut self, name: &str) -> Result<()> {
        let index = self.sheet_index(name)?;
        let sheet = self.sheets.remove(index);
        for (coord, cell) in &sheet.grid.cells {
            let id = CellId::new(sheet.key.clone(), *coord);
            self.graph.remove_references(&id, &cell.references);
        }
        log::debug!("deleted sheet {:?} ({} cells)", sheet.name, sheet.grid.len());

        let orphaned = self.graph.parents_of_sheet(&sheet.key);
        self.recompute_cells(orphaned);
        self.finish_mutation();
        Ok(())
    }

    /// Renames a sheet and rewrites every formula that names it.
    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<()> {
        let index = self.sheet_index(old)?;
        validate_sheet_name(new)?;
        let old_key = self.sheets[index].key.clone();
        let new_key = new.to_lowercase();
        if new_key != old_key && self.name_taken(new) {
            return Err(WorkbookError::DuplicateSheetName(new.to_string()));
        }

        // Formula text first: the meaning of each reference is unchanged.
        for sheet in &mut self.sheets {
            for cell in sheet.grid.cells.values_mut() {
                let Some(formula) = &cell.formula else {
                    continue;
                };
                if reference_rewriter::mentions_sheet(formula, &old_key) {
                    let rewritten = reference_rewriter::rename_sheet(formula, &old_key, new);
                    cell.contents = format!("={}", rewritten);
                    cell.formula = Some(rewritten);
                }
            }
        }

        let old_name = std::mem::replace(&mut self.sheets[index].name, new.to_string());
        self.sheets[index].key = new_key.clone();
        self.graph.rename_sheet(&old_key, &new_key);
        for sheet in &mut self.sheets {
            for cell in sheet.grid.cells.values_mut() {
                if cell.references.iter().any(|r| r.sheet == old_key) {
                    cell.references = std::mem::take(&mut cell.references)
                        .into_iter()
                        .map(|r| if r.sheet == old_key { CellId::new(new_key.clone(), r.coord) } else { r })
                        .collect();
                }
            }
        }
        log::debug!("renamed sheet {:?} to {:?}", old_name, new);

        let affected = self.graph.parents_of_sheet(&new_key);
        self.recompute_cells(affected);
        self.finish_mutation();
        Ok(())
    }

    /// Moves a sheet to position `index` in the sheet order.
    pub fn move_sheet(&mut self, name: &str, index: usize) -> Result<()> {
        let from = self.sheet_index(name)?;
        if index >= self.sheets.len() {
            return Err(WorkbookError::IndexOutOfRange {
                index,
                count: self.sheets.len(),
            });
        }
        let sheet = self.sheets.remove(from);
        self.sheets.insert(index, sheet);
        log::debug!("moved sheet {:?} from {} to {}", name, from, index);
        Ok(())
    }

    /// Appends a copy of a sheet named `{name}_{k}` for the first free k.
    /// Returns the copy's index and name.
    pub fn copy_sheet(&mut self, name: &str) -> Result<(usize, String)> {
        let source = self.sheet_index(name)?;
        let base = self.sheets[source].name.clone();
        let copy_name = (1..)
            .map(|k| format!("{}_{}", base, k))
            .find(|candidate| !self.name_taken(candidate))
            .unwrap_or_default();

        let contents: Vec<(CellCoord, String)> = self.sheets[source]
            .grid
            .sorted_coords()
            .into_iter()
            .filter_map(|coord| {
                let cell = self.sheets[source].grid.get_cell(coord)?;
                Some((coord, cell.contents.clone()))
            })
            .collect();

        let (index, copy_name) = self.insert_sheet(Some(&copy_name))?;
        for (coord, text) in &contents {
            self.apply_contents(index, *coord, text);
        }
        log::debug!("copied sheet {:?} to {:?} ({} cells)", base, copy_name, contents.len());
        self.finish_mutation();
        Ok((index, copy_name))
    }

    /// Bounding box of the non-empty cells as (columns, rows), counted from A1.
    pub fn get_sheet_extent(&self, name: &str) -> Result<(u32, u32)> {
        let index = self.sheet_index(name)?;
        Ok(self.sheets[index].grid.extent())
    }

    // ==================== Cell operations ====================

    /// Sets the contents of a cell. Empty or whitespace-only text clears it.
    pub fn set_cell_contents(&mut self, sheet: &str, loc: &str, contents: &str) -> Result<()> {
        let index = self.sheet_index(sheet)?;
        let coord = location(loc)?;
        self.apply_contents(index, coord, contents);
        self.finish_mutation();
        Ok(())
    }

    pub fn clear_cell_contents(&mut self, sheet: &str, loc: &str) -> Result<()> {
        self.set_cell_contents(sheet, loc, "")
    }

    /// Trimmed contents as entered, or None for an empty cell.
    pub fn get_cell_contents(&self, sheet: &str, loc: &str) -> Result<Option<String>> {
        let index = self.sheet_index(sheet)?;
        let coord = location(loc)?;
        Ok(self.sheets[index].grid.get_cell(coord).map(|cell| cell.contents.clone()))
    }

    pub fn get_cell_value(&self, sheet: &str, loc: &str) -> Result<CellValue> {
        let index = self.sheet_index(sheet)?;
        let coord = location(loc)?;
        Ok(self.sheets[index]
            .grid
            .get_cell(coord)
            .map(|cell| cell.value.clone())
            .unwrap_or(CellValue::Empty))
    }

    /// All non-empty cells of a sheet as (location, contents), row-major.
    pub fn cell_contents(&self, sheet: &str) -> Result<Vec<(String, String)>> {
        let index = self.sheet_index(sheet)?;
        let grid = &self.sheets[index].grid;
        Ok(grid
            .sorted_coords()
            .into_iter()
            .filter_map(|coord| {
                let cell = grid.get_cell(coord)?;
                Some((coord_to_a1(coord), cell.contents.clone()))
            })
            .collect())
    }

    // ==================== Region operations ====================

    /// Moves the block between two corners so its top-left lands on `to`,
    /// relocating formulas. The source area is cleared first.
    pub fn move_cells(&mut self, sheet: &str, start: &str, end: &str, to: &str, to_sheet: Option<&str>) -> Result<()> {
        self.transfer_cells(sheet, start, end, to, to_sheet, true)
    }

    /// Like `move_cells`, but leaves the source in place.
    pub fn copy_cells(&mut self, sheet: &str, start: &str, end: &str, to: &str, to_sheet: Option<&str>) -> Result<()> {
        self.transfer_cells(sheet, start, end, to, to_sheet, false)
    }

    fn transfer_cells(
        &mut self,
        sheet: &str,
        start: &str,
        end: &str,
        to: &str,
        to_sheet: Option<&str>,
        clear_source: bool,
    ) -> Result<()> {
        let source = self.sheet_index(sheet)?;
        let target = match to_sheet {
            Some(name) => self.sheet_index(name)?,
            None => source,
        };
        let (top_left, bottom_right) = normalize_corners(location(start)?, location(end)?);
        let to = location(to)?;

        let row_delta = i64::from(to.0) - i64::from(top_left.0);
        let col_delta = i64::from(to.1) - i64::from(top_left.1);
        let Some(target_bottom_right) = offset_coord(bottom_right, row_delta, col_delta) else {
            return Err(WorkbookError::TargetOutOfBounds(format!(
                "{}:{} moved to {}",
                start, end, coord_to_a1(to)
            )));
        };

        // Everything is read before anything is written.
        let moved: BTreeMap<CellCoord, String> = self.sheets[source]
            .grid
            .cells
            .iter()
            .filter(|(coord, _)| within(**coord, top_left, bottom_right))
            .filter_map(|(coord, cell)| {
                let dest = offset_coord(*coord, row_delta, col_delta)?;
                Some((dest, relocate_contents(&cell.contents, row_delta, col_delta)))
            })
            .collect();

        if clear_source {
            let mut sources: Vec<CellCoord> = self.sheets[source]
                .grid
                .cells
                .keys()
                .filter(|coord| within(**coord, top_left, bottom_right))
                .copied()
                .collect();
            sources.sort_unstable();
            for coord in sources {
                self.apply_contents(source, coord, "");
            }
        }

        // Occupied target cells with no source counterpart are cleared.
        let mut stale: Vec<CellCoord> = self.sheets[target]
            .grid
            .cells
            .keys()
            .filter(|coord| within(**coord, to, target_bottom_right) && !moved.contains_key(*coord))
            .copied()
            .collect();
        stale.sort_unstable();
        for coord in stale {
            self.apply_contents(target, coord, "");
        }
        for (coord, contents) in &moved {
            self.apply_contents(target, *coord, contents);
        }

        log::debug!(
            "{} {}:{} on {:?} to {} ({} cells)",
            if clear_source { "moved" } else { "copied" },
            start,
            end,
            sheet,
            coord_to_a1(to),
            moved.len()
        );
        self.finish_mutation();
        Ok(())
    }

    // ==================== Notifications ====================

    /// Registers a listener called with the cells whose values changed,
    /// once per mutating call that changed anything.
    pub fn notify_cells_changed(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }
}
