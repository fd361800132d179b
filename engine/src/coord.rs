//! FILENAME: engine/src/coord.rs
//! PURPOSE: Utilities for converting between spreadsheet coordinate formats.
//! CONTEXT: This module provides functions to convert between A1-style notation
//! (e.g., "A1", "AA100") and 0-based (row, col) numeric indices used internally.
//! Column "A" = 0, "B" = 1, ..., "Z" = 25, "AA" = 26, etc.
//! Row 1 in A1 notation = row 0 internally.
//!
//! GRID BOUNDS: columns A..ZZZZ, rows 1..9999. Anything outside is not a
//! valid location, neither for the API nor for formula references.

/// A cell coordinate as (row, col) with 0-based indices.
pub type CellCoord = (u32, u32);

/// Number of columns in a sheet: A..ZZZZ.
pub const MAX_COLUMNS: u32 = 26 + 26 * 26 + 26 * 26 * 26 + 26 * 26 * 26 * 26;

/// Number of rows in a sheet: 1..9999.
pub const MAX_ROWS: u32 = 9999;

/// Converts a column string (e.g., "A", "aa", "ABC") to a 0-based column index.
/// "A" -> 0, "B" -> 1, ..., "Z" -> 25, "AA" -> 26, "AB" -> 27, etc.
///
/// Returns None for empty input, non-letters, or columns past ZZZZ.
pub fn col_to_index(col_str: &str) -> Option<u32> {
    if col_str.is_empty() || col_str.len() > 4 {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result * 26 + digit;
    }
    Some(result - 1) // Convert to 0-based
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 1 -> "B", ..., 25 -> "Z", 26 -> "AA", 27 -> "AB", etc.
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Returns true if the 0-based coordinate lies inside the grid.
pub fn in_bounds(coord: CellCoord) -> bool {
    let (row, col) = coord;
    row < MAX_ROWS && col < MAX_COLUMNS
}

/// Converts a column string and 1-based row to a 0-based (row, col) coordinate.
/// "A", 1 -> (0, 0); "AA", 100 -> (99, 26). Out-of-grid references give None.
pub fn a1_to_coord(col_str: &str, row_num: u32) -> Option<CellCoord> {
    let col = col_to_index(col_str)?;
    let row = row_num.checked_sub(1)?; // Convert 1-based to 0-based
    let coord = (row, col);
    in_bounds(coord).then_some(coord)
}

/// Converts a 0-based (row, col) coordinate to an A1-style reference string.
/// (0, 0) -> "A1", (1, 1) -> "B2", (99, 26) -> "AA100"
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses a location string as accepted by the workbook API.
/// The text must match `[A-Za-z]{1,4}[1-9][0-9]{0,3}` exactly: no `$`,
/// no sheet prefix, no surrounding whitespace.
pub fn parse_location(location: &str) -> Option<CellCoord> {
    let split = location.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = location.split_at(split);
    if digits.is_empty()
        || digits.len() > 4
        || digits.starts_with('0')
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    a1_to_coord(letters, row)
}

/// Shifts a coordinate by a signed delta; None if the result leaves the grid.
pub fn offset_coord(coord: CellCoord, row_delta: i64, col_delta: i64) -> Option<CellCoord> {
    let row = i64::from(coord.0) + row_delta;
    let col = i64::from(coord.1) + col_delta;
    if row < 0 || col < 0 {
        return None;
    }
    let shifted = (u32::try_from(row).ok()?, u32::try_from(col).ok()?);
    in_bounds(shifted).then_some(shifted)
}

/// Normalizes two corners of a rectangle given in any order into
/// (top-left, bottom-right).
pub fn normalize_corners(a: CellCoord, b: CellCoord) -> (CellCoord, CellCoord) {
    ((a.0.min(b.0), a.1.min(b.1)), (a.0.max(b.0), a.1.max(b.1)))
}
