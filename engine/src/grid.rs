//! FILENAME: engine/src/grid.rs
//! PURPOSE: Manages the collection of cells of one sheet (The Spreadsheet Grid).
//! CONTEXT: This file defines the `Grid` struct which acts as the container
//! for all cell data. It uses a sparse storage strategy (HashMap) since
//! most of the A1..ZZZZ9999 grid is empty, and maintains the bounding box
//! of occupied cells for extent queries.

use crate::cell::Cell;
use crate::coord::CellCoord;
use std::collections::HashMap;

/// Sparse cell storage for one sheet.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Sparse storage: keys are (row, col), 0-based.
    pub cells: HashMap<CellCoord, Cell>,

    /// Tracks the highest row index currently in use.
    pub max_row: u32,

    /// Tracks the highest column index currently in use.
    pub max_col: u32,
}

impl Grid {
    /// Creates a new, empty Grid.
    pub fn new() -> Self {
        Grid {
            cells: HashMap::new(),
            max_row: 0,
            max_col: 0,
        }
    }

    /// Stores a cell, growing the bounds if needed.
    pub fn set_cell(&mut self, coord: CellCoord, cell: Cell) {
        let (row, col) = coord;
        if self.cells.is_empty() {
            self.max_row = row;
            self.max_col = col;
        } else {
            self.max_row = self.max_row.max(row);
            self.max_col = self.max_col.max(col);
        }
        self.cells.insert(coord, cell);
    }

    /// Stores a cell and returns the one it replaced.
    pub fn replace_cell(&mut self, coord: CellCoord, cell: Cell) -> Option<Cell> {
        let previous = self.cells.remove(&coord);
        self.set_cell(coord, cell);
        previous
    }

    /// Retrieves a reference to a cell. Returns None if the cell is empty (not stored).
    pub fn get_cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    pub fn get_cell_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        self.cells.get_mut(&coord)
    }

    /// Removes a cell from the grid, returning it.
    /// If the cell was at a boundary (max_row or max_col), recalculates bounds.
    pub fn clear_cell(&mut self, coord: CellCoord) -> Option<Cell> {
        let removed = self.cells.remove(&coord)?;
        let (row, col) = coord;
        if row == self.max_row || col == self.max_col {
            self.recalculate_bounds();
        }
        Some(removed)
    }

    /// Recalculates max_row and max_col by scanning all cells.
    /// This is O(n) where n is the number of non-empty cells.
    pub fn recalculate_bounds(&mut self) {
        self.max_row = self.cells.keys().map(|&(row, _)| row).max().unwrap_or(0);
        self.max_col = self.cells.keys().map(|&(_, col)| col).max().unwrap_or(0);
    }

    /// Size of the occupied bounding box as (columns, rows), counted from A1.
    /// An empty grid reports (0, 0).
    pub fn extent(&self) -> (u32, u32) {
        if self.cells.is_empty() {
            (0, 0)
        } else {
            (self.max_col + 1, self.max_row + 1)
        }
    }

    /// Coordinates of all stored cells in reading order (row, then column).
    pub fn sorted_coords(&self) -> Vec<CellCoord> {
        let mut coords: Vec<CellCoord> = self.cells.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_tracks_bounding_box() {
        let mut grid = Grid::new();
        assert_eq!(grid.extent(), (0, 0));

        grid.set_cell((4, 2), Cell::new("x"));
        assert_eq!(grid.extent(), (3, 5));

        grid.set_cell((1, 7), Cell::new("y"));
        assert_eq!(grid.extent(), (8, 5));

        grid.clear_cell((1, 7));
        assert_eq!(grid.extent(), (3, 5));

        grid.clear_cell((4, 2));
        assert_eq!(grid.extent(), (0, 0));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_replace_cell_returns_previous() {
        let mut grid = Grid::new();
        assert!(grid.replace_cell((2, 2), Cell::new("old")).is_none());
        let previous = grid.replace_cell((2, 2), Cell::new("new")).unwrap();
        assert_eq!(previous.contents, "old");
        assert_eq!(grid.get_cell((2, 2)).unwrap().contents, "new");
        assert_eq!(grid.extent(), (3, 3));
    }

    #[test]
    fn test_clear_missing_cell_is_noop() {
        let mut grid = Grid::new();
        grid.set_cell((0, 0), Cell::new("1"));
        assert!(grid.clear_cell((3, 3)).is_none());
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_sorted_coords_reading_order() {
        let mut grid = Grid::new();
        grid.set_cell((1, 0), Cell::new("c"));
        grid.set_cell((0, 5), Cell::new("b"));
        grid.set_cell((0, 1), Cell::new("a"));
        assert_eq!(grid.sorted_coords(), vec![(0, 1), (0, 5), (1, 0)]);
    }
}
