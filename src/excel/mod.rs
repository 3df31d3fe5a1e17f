//! Excel input: workbook sources, per-tab grids and the cover sheet index
//!
//! - `WorkbookSource`: hands out one grid per tab (`XlsxWorkbook` via calamine,
//!   `MemoryWorkbook` for tests)
//! - `GridCache`: loads each (workbook, tab) pair once per run
//! - `parse_cover`: reads the activity → decision table index

mod cover;
mod grid;
mod workbook;

pub use cover::{parse_cover, COVER_SHEET};
pub use grid::{Grid, GridCache};
pub use workbook::{MemoryWorkbook, WorkbookSource, XlsxWorkbook};
