//! FILENAME: engine/src/dependency_graph.rs
//! PURPOSE: Tracks cross-sheet cell dependencies and finds strongly connected
//! components for recalculation.
//! CONTEXT: This module is the heart of the spreadsheet's recalculation engine.
//! Edges run from a referenced cell (the "child") to the formula cell that
//! reads it (the "parent"). Walking parent edges outward from an edited cell
//! visits everything that must be recomputed.
//!
//! TERMINOLOGY:
//! - Child: a cell some formula reads. If A3 = A1 + A2, A1 and A2 are children of A3.
//! - Parent: a formula cell reading a child. A3 is a parent of A1 and of A2.
//! - Placeholder entry: children stored under a sheet key with no live sheet,
//!   created by dangling references such as `=Missing!A1`.
//!
//! USAGE:
//! 1. Before a formula is replaced, remove its old edges with `remove_references()`.
//! 2. After evaluating it, install the new edges with `add_references()`.
//! 3. Call `strongly_connected_from()` on the edited cell to get the components
//!    to recompute, start component first, plus which of them are cycles.
//!
//! The SCC walk is an iterative Tarjan, so long dependency chains never
//! recurse on the call stack.

use crate::coord::{coord_to_a1, CellCoord};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;

/// Stable identifier of a cell: canonical (lower-case) sheet key plus location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub sheet: String,
    pub coord: CellCoord,
}

impl CellId {
    pub fn new(sheet: impl Into<String>, coord: CellCoord) -> Self {
        CellId {
            sheet: sheet.into(),
            coord,
        }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, coord_to_a1(self.coord))
    }
}

/// One strongly connected component found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Members, sorted.
    pub cells: Vec<CellId>,
    /// Size > 1, or a single cell that reads itself.
    pub cyclic: bool,
}

/// Result of `strongly_connected_from()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccOrder {
    /// Components in evaluation order: the start's own component first,
    /// every component before the components that depend on it.
    pub components: Vec<Component>,
    pub cycle_detected: bool,
}

/// The Dependency Graph tracks child -> parent edges across sheets.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// sheet key -> child location -> parents that read it.
    children: FxHashMap<String, FxHashMap<CellCoord, Vec<CellId>>>,
}

impl DependencyGraph {
    /// Creates a new, empty dependency graph.
    pub fn new() -> Self {
        DependencyGraph {
            children: FxHashMap::default(),
        }
    }

    /// Records that `parent` reads `child`. Adding an existing edge is a no-op.
    pub fn add_edge(&mut self, child: &CellId, parent: &CellId) {
        let parents = self
            .children
            .entry(child.sheet.clone())
            .or_default()
            .entry(child.coord)
            .or_default();
        if !parents.contains(parent) {
            parents.push(parent.clone());
        }
    }

    /// Removes the edge `child -> parent`, dropping emptied entries.
    pub fn remove_edge(&mut self, child: &CellId, parent: &CellId) {
        let Some(locations) = self.children.get_mut(&child.sheet) else {
            return;
        };
        if let Some(parents) = locations.get_mut(&child.coord) {
            parents.retain(|p| p != parent);
            if parents.is_empty() {
                locations.remove(&child.coord);
            }
        }
        if locations.is_empty() {
            self.children.remove(&child.sheet);
        }
    }

    /// Installs an edge from every referenced cell to `parent`.
    pub fn add_references<'a>(&mut self, parent: &CellId, references: impl IntoIterator<Item = &'a CellId>) {
        for child in references {
            self.add_edge(child, parent);
        }
    }

    /// Removes the edges from every referenced cell to `parent`.
    pub fn remove_references<'a>(&mut self, parent: &CellId, references: impl IntoIterator<Item = &'a CellId>) {
        for child in references {
            self.remove_edge(child, parent);
        }
    }

    /// Returns the direct parents of a cell (formula cells that read it).
    pub fn parents_of(&self, child: &CellId) -> &[CellId] {
        self.children
            .get(&child.sheet)
            .and_then(|locations| locations.get(&child.coord))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns every distinct parent of any cell under the given sheet key, sorted.
    pub fn parents_of_sheet(&self, sheet_key: &str) -> Vec<CellId> {
        let Some(locations) = self.children.get(sheet_key) else {
            return Vec::new();
        };
        let parents: BTreeSet<&CellId> = locations.values().flatten().collect();
        parents.into_iter().cloned().collect()
    }

    pub fn has_self_loop(&self, cell: &CellId) -> bool {
        self.parents_of(cell).contains(cell)
    }

    /// Relabels a sheet key. Children under `old` merge into any placeholder
    /// entry already stored under `new`; parents on `old` are relabeled too.
    pub fn rename_sheet(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        if let Some(moved) = self.children.remove(old) {
            let target = self.children.entry(new.to_string()).or_default();
            for (coord, parents) in moved {
                let merged = target.entry(coord).or_default();
                for parent in parents {
                    if !merged.contains(&parent) {
                        merged.push(parent);
                    }
                }
            }
        }
        for parents in self.children.values_mut().flat_map(|locations| locations.values_mut()) {
            for parent in parents.iter_mut().filter(|p| p.sheet == old) {
                parent.sheet = new.to_string();
            }
        }
    }

    /// Finds the strongly connected components reachable from `start` by
    /// following parent edges, using an iterative Tarjan walk.
    ///
    /// Tarjan completes a component only after every component reachable from
    /// it has completed, so reversing completion order puts each component
    /// ahead of its dependents.
    pub fn strongly_connected_from<'a>(&'a self, start: &'a CellId) -> SccOrder {
        // Discovery id doubles as the Tarjan index.
        let mut nodes: Vec<&'a CellId> = vec![start];
        let mut ids: FxHashMap<&'a CellId, usize> = FxHashMap::default();
        ids.insert(start, 0);
        let mut lowlink = vec![0usize];
        let mut on_stack = vec![true];
        let mut stack = vec![0usize];
        // (node, index of the next parent to visit)
        let mut frames = vec![(0usize, 0usize)];
        let mut completed: Vec<Component> = Vec::new();

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if let Some(parent) = self.parents_of(nodes[node]).get(frame.1) {
                frame.1 += 1;
                match ids.get(parent) {
                    Some(&seen) => {
                        if on_stack[seen] {
                            lowlink[node] = lowlink[node].min(seen);
                        }
                    }
                    None => {
                        let id = nodes.len();
                        nodes.push(parent);
                        ids.insert(parent, id);
                        lowlink.push(id);
                        on_stack.push(true);
                        stack.push(id);
                        frames.push((id, 0));
                    }
                }
                continue;
            }

            frames.pop();
            if let Some(&(caller, _)) = frames.last() {
                lowlink[caller] = lowlink[caller].min(lowlink[node]);
            }

            if lowlink[node] == node {
                let mut members = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    members.push(nodes[member].clone());
                    if member == node {
                        break;
                    }
                }
                members.sort();
                let cyclic = members.len() > 1 || self.has_self_loop(nodes[node]);
                completed.push(Component {
                    cells: members,
                    cyclic,
                });
            }
        }

        completed.reverse();
        let cycle_detected = completed.iter().any(|c| c.cyclic);
        SccOrder {
            components: completed,
            cycle_detected,
        }
    }
}
