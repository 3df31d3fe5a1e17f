//! Table locator - finds anchored decision tables in a tab
//!
//! An anchor is a "Decision ID" or "Schedule ID" cell at (r, c) followed by
//! a fixed header block:
//!
//! ```text
//! (r,   c) Decision ID          (r,   c+1) <decision id>
//! (r+1, c) Business rule        (r+1, c+1) <text>
//! (r+2, c) Trigger              (r+2, c+1) <text>
//! (r+3, c) Inputs | Potential contraindications ... Output ... Guidance ... Annotations ... Reference(s)
//! ```

use crate::error::{DtError, DtResult};
use crate::excel::Grid;
use crate::text;
use crate::types::{TableAnchor, TableKind};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

pub const DECISION_ANCHOR: &str = "Decision ID";
pub const SCHEDULE_ANCHOR: &str = "Schedule ID";
pub const BUSINESS_RULE_LABEL: &str = "Business rule";
pub const TRIGGER_LABEL: &str = "Trigger";
pub const INPUTS_LABEL: &str = "Inputs";
pub const CONTRAINDICATIONS_LABEL: &str = "Potential contraindications";
pub const OUTPUT_LABEL: &str = "Output";
pub const GUIDANCE_LABEL: &str = "Guidance displayed to health worker";
pub const ANNOTATIONS_LABEL: &str = "Annotations";
pub const REFERENCES_LABEL: &str = "Reference(s)";

/// All valid anchors of a tab keyed by decision id, in discovery order.
/// Invalid anchors are logged and skipped; a repeated decision id keeps the
/// first table.
pub fn locate(grid: &Grid) -> IndexMap<String, TableAnchor> {
    let mut anchors: IndexMap<String, TableAnchor> = IndexMap::new();

    for cell in grid.cells_by_column() {
        let Some(label) = cell.value.to_trimmed() else {
            continue;
        };
        let kind = if text::labels_match(&label, DECISION_ANCHOR) {
            TableKind::Regular
        } else if text::labels_match(&label, SCHEDULE_ANCHOR) {
            TableKind::Schedule
        } else {
            continue;
        };

        match validate_anchor(grid, cell.row, cell.col, kind) {
            Ok(anchor) => {
                if let Some(existing) = anchors.get(&anchor.decision_id) {
                    warn!(
                        tab = grid.tab(),
                        decision_id = %anchor.decision_id,
                        first_row = existing.anchor_row,
                        duplicate_row = anchor.anchor_row,
                        "duplicate decision id, keeping the first table"
                    );
                    continue;
                }
                info!(
                    tab = grid.tab(),
                    decision_id = %anchor.decision_id,
                    row = anchor.anchor_row,
                    col = anchor.anchor_col,
                    kind = ?anchor.kind,
                    "found decision table"
                );
                anchors.insert(anchor.decision_id.clone(), anchor);
            }
            Err(e) => {
                warn!(tab = grid.tab(), row = cell.row, col = cell.col, error = %e, "skipping anchor");
            }
        }
    }

    anchors
}

fn required_label(grid: &Grid, row: usize, col: usize, labels: &[&str], what: &str) -> DtResult<String> {
    let found = grid.text(row, col);
    match found {
        Some(ref label) if labels.iter().any(|l| text::labels_match(label, l)) => Ok(label.clone()),
        _ => Err(DtError::Structural(format!(
            "expected {} at ({}, {}), found {:?}",
            what, row, col, found
        ))),
    }
}

fn required_value(grid: &Grid, row: usize, col: usize, what: &str) -> DtResult<String> {
    grid.text(row, col)
        .ok_or_else(|| DtError::Structural(format!("missing {} at ({}, {})", what, row, col)))
}

/// Check the header contract around an anchor cell
pub fn validate_anchor(grid: &Grid, row: usize, col: usize, kind: TableKind) -> DtResult<TableAnchor> {
    let decision_id = text::name_to_id(&required_value(grid, row, col + 1, "decision id")?);
    if decision_id.is_empty() {
        return Err(DtError::Structural(format!(
            "decision id at ({}, {}) has no identifier characters",
            row,
            col + 1
        )));
    }

    required_label(grid, row + 1, col, &[BUSINESS_RULE_LABEL], "business rule row")?;
    let business_rule_text = required_value(grid, row + 1, col + 1, "business rule")?;

    required_label(grid, row + 2, col, &[TRIGGER_LABEL], "trigger row")?;
    let trigger_text = required_value(grid, row + 2, col + 1, "trigger")?;

    let header_row = row + 3;
    let (header_label, kind) = match kind {
        TableKind::Schedule => (
            grid.text(header_row, col).unwrap_or_default(),
            TableKind::Schedule,
        ),
        _ => {
            let label = required_label(
                grid,
                header_row,
                col,
                &[INPUTS_LABEL, CONTRAINDICATIONS_LABEL],
                "inputs row",
            )?;
            let kind = if text::labels_match(&label, CONTRAINDICATIONS_LABEL) {
                TableKind::Contraindication
            } else {
                TableKind::Regular
            };
            (label, kind)
        }
    };

    let header_col = |label: &str| {
        (col + 1..grid.width()).find(|&c| {
            grid.text(header_row, c)
                .is_some_and(|cell| text::labels_match(&cell, label))
        })
    };

    let output_col = header_col(OUTPUT_LABEL).ok_or_else(|| {
        DtError::Structural(format!("no Output column for decision table {}", decision_id))
    })?;
    let guidance_col = header_col(GUIDANCE_LABEL);
    let annotation_col = header_col(ANNOTATIONS_LABEL);
    let reference_col = header_col(REFERENCES_LABEL);

    if guidance_col.is_none() {
        warn!(tab = grid.tab(), decision_id = %decision_id, "no Guidance column");
    }
    if reference_col.is_none() {
        warn!(tab = grid.tab(), decision_id = %decision_id, "no Reference column");
    }
    if annotation_col.is_none() {
        debug!(tab = grid.tab(), decision_id = %decision_id, "no Annotations column");
    }

    Ok(TableAnchor {
        tab: grid.tab().to_string(),
        decision_id,
        anchor_row: row,
        anchor_col: col,
        business_rule_text,
        trigger_text,
        header_row,
        header_label,
        output_col,
        guidance_col,
        annotation_col,
        reference_col,
        kind,
    })
}
