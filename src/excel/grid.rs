//! Addressable cell matrix for one tab, and the per-run grid cache

use crate::error::{DtError, DtResult};
use crate::excel::workbook::WorkbookSource;
use crate::types::{Cell, CellValue};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, warn};

static BLANK: CellValue = CellValue::Blank;

/// Dense 2-D matrix addressed by absolute (row, col), 0-based
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    tab: String,
    rows: Vec<Vec<CellValue>>,
    width: usize,
}

impl Grid {
    pub fn new(tab: impl Into<String>) -> Self {
        Self {
            tab: tab.into(),
            rows: Vec::new(),
            width: 0,
        }
    }

    /// Build a grid from string rows; empty strings become blank cells
    pub fn from_rows<R, S>(tab: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grid = Grid::new(tab);
        for (row, cells) in rows.into_iter().enumerate() {
            for (col, cell) in cells.into_iter().enumerate() {
                let value = CellValue::text(cell.as_ref());
                if !value.is_blank() {
                    grid.set(row, col, value);
                }
            }
        }
        grid
    }

    pub fn tab(&self) -> &str {
        &self.tab
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Blank);
        }
        cells[col] = value;
        self.width = self.width.max(col + 1);
    }

    /// Cell value, blank outside the used range
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&BLANK)
    }

    /// Optional column lookup; absent columns read as blank
    pub fn get_opt(&self, row: usize, col: Option<usize>) -> &CellValue {
        match col {
            Some(col) => self.get(row, col),
            None => &BLANK,
        }
    }

    /// Trimmed text of a cell, `None` when blank
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.get(row, col).to_trimmed()
    }

    /// Non-blank cells in column-major order
    pub fn cells_by_column(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.width).flat_map(move |col| {
            (0..self.rows.len()).filter_map(move |row| {
                let value = self.get(row, col);
                (!value.is_blank()).then(|| Cell {
                    row,
                    col,
                    value: value.clone(),
                })
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GridKey {
    workbook: PathBuf,
    tab: String,
}

/// Grids loaded during a run, one per (workbook, tab)
#[derive(Debug, Default)]
pub struct GridCache {
    grids: HashMap<GridKey, Rc<Grid>>,
    failed: HashMap<GridKey, String>,
}

impl GridCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a tab, serving repeat requests from the cache. A tab that failed
    /// once is not read again.
    pub fn load(&mut self, source: &mut dyn WorkbookSource, tab: &str) -> DtResult<Rc<Grid>> {
        let key = GridKey {
            workbook: source.path().to_path_buf(),
            tab: tab.trim().to_string(),
        };
        if let Some(grid) = self.grids.get(&key) {
            return Ok(Rc::clone(grid));
        }
        if let Some(reason) = self.failed.get(&key) {
            return Err(DtError::MissingSheet(format!("{} ({})", tab, reason)));
        }

        debug!(workbook = %key.workbook.display(), tab, "loading tab");
        match source.read_sheet(tab) {
            Ok(grid) => {
                let grid = Rc::new(grid);
                self.grids.insert(key, Rc::clone(&grid));
                Ok(grid)
            }
            Err(e) => {
                warn!(workbook = %key.workbook.display(), tab, error = %e, "could not load tab");
                self.failed.insert(key, e.to_string());
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}
