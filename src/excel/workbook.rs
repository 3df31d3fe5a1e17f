//! Workbook sources - where grids come from

use crate::error::{DtError, DtResult};
use crate::excel::grid::Grid;
use crate::types::CellValue;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A spreadsheet file that can hand out one grid per tab
pub trait WorkbookSource {
    /// Identifies the workbook in cache keys and log messages
    fn path(&self) -> &Path;

    fn sheet_names(&self) -> Vec<String>;

    /// Read one tab. Absent tabs yield `DtError::MissingSheet`.
    fn read_sheet(&mut self, name: &str) -> DtResult<Grid>;

    /// Resolve a tab name case-insensitively, ignoring surrounding spaces
    fn resolve_sheet(&self, name: &str) -> Option<String> {
        let wanted = name.trim();
        let names = self.sheet_names();
        names
            .iter()
            .find(|n| n.as_str() == wanted)
            .or_else(|| names.iter().find(|n| n.trim().eq_ignore_ascii_case(wanted)))
            .cloned()
    }
}

/// `.xlsx` workbook read through calamine
pub struct XlsxWorkbook {
    path: PathBuf,
    workbook: Xlsx<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open<P: AsRef<Path>>(path: P) -> DtResult<Self> {
        let path = path.as_ref().to_path_buf();
        let workbook: Xlsx<_> = open_workbook(&path)?;
        Ok(Self { path, workbook })
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    fn read_sheet(&mut self, name: &str) -> DtResult<Grid> {
        let sheet = self
            .resolve_sheet(name)
            .ok_or_else(|| DtError::MissingSheet(name.to_string()))?;
        let range = self.workbook.worksheet_range(&sheet)?;
        Ok(grid_from_range(&sheet, &range))
    }
}

/// Convert a calamine range into a grid with absolute coordinates
fn grid_from_range(tab: &str, range: &Range<Data>) -> Grid {
    let mut grid = Grid::new(tab);
    let Some((start_row, start_col)) = range.start() else {
        return grid;
    };

    for (row, col, cell) in range.cells() {
        let value = convert_cell(cell);
        if value.is_blank() {
            continue;
        }
        grid.set(start_row as usize + row, start_col as usize + col, value);
    }
    grid
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(f) => CellValue::numeric(*f),
        Data::Int(i) => CellValue::numeric(*i as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => CellValue::numeric(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Error(_) | Data::Empty => CellValue::Blank,
    }
}

/// Workbook held in memory, keyed by tab name
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    path: PathBuf,
    sheets: Vec<(String, Grid)>,
    reads: HashMap<String, usize>,
}

impl MemoryWorkbook {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_sheet(mut self, grid: Grid) -> Self {
        self.sheets.push((grid.tab().to_string(), grid));
        self
    }

    /// How many times a tab has been read
    pub fn read_count(&self, name: &str) -> usize {
        self.reads.get(name).copied().unwrap_or(0)
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> DtResult<Grid> {
        let sheet = self
            .resolve_sheet(name)
            .ok_or_else(|| DtError::MissingSheet(name.to_string()))?;
        *self.reads.entry(sheet.clone()).or_default() += 1;
        self.sheets
            .iter()
            .find(|(n, _)| *n == sheet)
            .map(|(_, grid)| grid.clone())
            .ok_or(DtError::MissingSheet(sheet))
    }
}
