//! FILENAME: engine/src/sort.rs
//! PURPOSE: Stable multi-column sort of the rows of a rectangular region.
//! CONTEXT: Rows are ordered by the computed values of the chosen columns;
//! then each row's contents are rewritten into its new position with
//! formulas relocated by the row distance, as if the row had been moved.

use crate::cell::CellValue;
use crate::coord::{normalize_corners, CellCoord};
use crate::error::{Result, WorkbookError};
use crate::workbook::{location, relocate_contents, within, Workbook};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Checks 1-based, signed sort columns against the region width.
pub fn validate_sort_columns(sort_cols: &[i32], width: u32) -> Result<()> {
    let invalid = |reason: &str| Err(WorkbookError::InvalidSortColumns(format!("{:?}: {}", sort_cols, reason)));

    if sort_cols.is_empty() {
        return invalid("no columns given");
    }
    let mut seen = BTreeSet::new();
    for &col in sort_cols {
        let abs = col.unsigned_abs();
        if abs == 0 {
            return invalid("columns are numbered from 1");
        }
        if abs > width {
            return invalid("column outside the region");
        }
        if !seen.insert(abs) {
            return invalid("column listed twice");
        }
    }
    Ok(())
}

fn sort_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Empty => 0,
        CellValue::Error(_) => 1,
        CellValue::Number(_) => 2,
        CellValue::Text(_) => 3,
        CellValue::Boolean(_) => 4,
    }
}

/// Ascending sort order: empty < errors (by kind) < numbers < text
/// (ignoring case) < booleans.
pub fn compare_for_sort(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Error(x), CellValue::Error(y)) => x.kind.cmp(&y.kind),
        (CellValue::Number(x), CellValue::Number(y)) => x.cmp(y),
        (CellValue::Text(x), CellValue::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (CellValue::Boolean(x), CellValue::Boolean(y)) => x.cmp(y),
        _ => sort_rank(a).cmp(&sort_rank(b)),
    }
}

/// Compares two rows' key values, one entry per sort column.
fn compare_rows(a: &[CellValue], b: &[CellValue], sort_cols: &[i32]) -> Ordering {
    for ((x, y), col) in a.iter().zip(b).zip(sort_cols) {
        let ordering = compare_for_sort(x, y);
        let ordering = if *col < 0 { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl Workbook {
    /// Sorts the rows of the region between two corners. `sort_cols` lists
    /// 1-based columns of the region; a negative column sorts descending.
    pub fn sort_region(&mut self, sheet: &str, start: &str, end: &str, sort_cols: &[i32]) -> Result<()> {
        let index = self.sheet_index(sheet)?;
        let (top_left, bottom_right) = normalize_corners(location(start)?, location(end)?);
        validate_sort_columns(sort_cols, bottom_right.1 - top_left.1 + 1)?;

        let grid = &self.sheets[index].grid;
        let value_at = |coord: CellCoord| {
            grid.get_cell(coord)
                .map(|cell| cell.value.clone())
                .unwrap_or(CellValue::Empty)
        };

        let rows: Vec<u32> = (top_left.0..=bottom_right.0).collect();
        let keys: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|&row| {
                sort_cols
                    .iter()
                    .map(|col| value_at((row, top_left.1 + col.unsigned_abs() - 1)))
                    .collect()
            })
            .collect();

        // order[i] is the offset of the source row that lands at offset i.
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| compare_rows(&keys[a], &keys[b], sort_cols));

        // Stored contents of the region, grouped by row.
        let mut by_row: BTreeMap<u32, Vec<(u32, String)>> = BTreeMap::new();
        for (coord, cell) in &grid.cells {
            if within(*coord, top_left, bottom_right) {
                by_row.entry(coord.0).or_default().push((coord.1, cell.contents.clone()));
            }
        }

        let mut writes: BTreeMap<CellCoord, String> = BTreeMap::new();
        for (target, &source) in order.iter().enumerate() {
            if target == source {
                continue;
            }
            let (target_row, source_row) = (rows[target], rows[source]);
            // Cells of the target row not overwritten below end up empty.
            for (col, _) in by_row.get(&target_row).into_iter().flatten() {
                writes.entry((target_row, *col)).or_default();
            }
            let row_delta = i64::from(target_row) - i64::from(source_row);
            for (col, contents) in by_row.get(&source_row).into_iter().flatten() {
                writes.insert((target_row, *col), relocate_contents(contents, row_delta, 0));
            }
        }

        log::debug!("sorting {} rows of {:?} by {:?}", rows.len(), sheet, sort_cols);
        for (coord, contents) in &writes {
            self.apply_contents(index, *coord, contents);
        }
        self.finish_mutation();
        Ok(())
    }
}
