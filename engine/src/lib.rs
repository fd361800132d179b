//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell;
pub mod coord;
pub mod dependency_graph;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod grid;
mod recalc;
pub mod reference_rewriter;
pub mod sort;
pub mod workbook;


// Re-export commonly used types at the crate root
pub use cell::{Cell, CellError, CellErrorType, CellValue};
pub use coord::{a1_to_coord, col_to_index, coord_to_a1, index_to_col, parse_location, CellCoord};
pub use dependency_graph::{CellId, DependencyGraph};
pub use error::{ErrorKind, Result, WorkbookError};
pub use evaluator::{EvalContext, EvalResult, Evaluator};
pub use grid::Grid;
pub use workbook::{ChangeListener, ChangedCell, Sheet, Workbook};
