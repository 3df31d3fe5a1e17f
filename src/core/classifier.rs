//! Row classification for the table walker

use crate::excel::Grid;
use crate::types::{CellValue, TableAnchor};

/// Cells of one table row, before forward-fill
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    pub row: usize,
    /// Positional slice `[anchor_col, output_col)`
    pub inputs: Vec<CellValue>,
    pub output: CellValue,
    pub guidance: CellValue,
    pub annotation: CellValue,
    pub reference: CellValue,
}

impl RawRow {
    pub fn read(grid: &Grid, anchor: &TableAnchor, row: usize) -> Self {
        Self {
            row,
            inputs: (anchor.anchor_col..anchor.output_col)
                .map(|col| grid.get(row, col).clone())
                .collect(),
            output: grid.get(row, anchor.output_col).clone(),
            guidance: grid.get_opt(row, anchor.guidance_col).clone(),
            annotation: grid.get_opt(row, anchor.annotation_col).clone(),
            reference: grid.get_opt(row, anchor.reference_col).clone(),
        }
    }

    /// Input at an absolute sheet column
    pub fn input_at(&self, anchor: &TableAnchor, column: usize) -> &CellValue {
        static BLANK: CellValue = CellValue::Blank;
        column
            .checked_sub(anchor.anchor_col)
            .and_then(|offset| self.inputs.get(offset))
            .unwrap_or(&BLANK)
    }

    fn first_input(&self) -> Option<&CellValue> {
        self.inputs.first()
    }

    fn trailing_inputs_blank(&self) -> bool {
        self.inputs.iter().skip(1).all(CellValue::is_blank)
    }

    /// Output, guidance and annotation are all blank
    fn outputs_blank(&self) -> bool {
        self.output.is_blank() && self.guidance.is_blank() && self.annotation.is_blank()
    }
}

/// What a row contributes to its table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    /// Sentinel row; nothing from here on belongs to the table
    EndOfTable,
    /// Free text in the first input column only, attached to the next rule
    PreAnnotation,
    /// Declares the table's input definitions
    InputDefinitionRow,
    RuleRow,
}

/// Classify a raw row. `expecting_definitions` is true while a regular
/// table has not consumed its definitions row yet.
pub fn classify(row: &RawRow, expecting_definitions: bool) -> RowClass {
    let first_blank = row.first_input().map_or(true, CellValue::is_blank);

    if first_blank && row.trailing_inputs_blank() && row.outputs_blank() {
        return RowClass::EndOfTable;
    }
    if !first_blank && row.trailing_inputs_blank() && row.outputs_blank() {
        return RowClass::PreAnnotation;
    }
    if expecting_definitions {
        return RowClass::InputDefinitionRow;
    }
    RowClass::RuleRow
}
