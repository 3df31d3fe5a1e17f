//! Cover sheet index: which activity uses which decision table on which tab

use crate::error::{DtError, DtResult};
use crate::excel::grid::Grid;
use crate::text;
use crate::types::CoverEntry;
use tracing::{debug, info, warn};

/// Name of the index sheet
pub const COVER_SHEET: &str = "COVER";

/// Rows searched for the header
const HEADER_SEARCH_ROWS: usize = 20;

const ACTIVITY_LABELS: &[&str] = &["Activity ID.Activity name", "Activity ID and name"];
const TAB_LABELS: &[&str] = &["Tab name", "Tab"];
const DECISION_LABELS: &[&str] = &[
    "Decision-support table (DT), contraindications table and scheduling-logic table (S) identification (ID)",
    "Decision table ID",
    "Decision ID",
];
const DESCRIPTION_LABELS: &[&str] = &["Table description", "Description"];
const SOURCE_LABELS: &[&str] = &["Reference/source", "Reference", "Source"];

#[derive(Debug, Clone, Copy, PartialEq)]
struct CoverColumns {
    header_row: usize,
    activity: usize,
    tab: usize,
    decision: usize,
    description: Option<usize>,
    source: Option<usize>,
}

fn find_column(grid: &Grid, row: usize, labels: &[&str]) -> Option<usize> {
    (0..grid.width()).find(|&col| {
        grid.text(row, col)
            .is_some_and(|cell| labels.iter().any(|label| text::labels_match(&cell, label)))
    })
}

fn find_columns(grid: &Grid) -> Option<CoverColumns> {
    (0..HEADER_SEARCH_ROWS.min(grid.height())).find_map(|row| {
        Some(CoverColumns {
            header_row: row,
            activity: find_column(grid, row, ACTIVITY_LABELS)?,
            tab: find_column(grid, row, TAB_LABELS)?,
            decision: find_column(grid, row, DECISION_LABELS)?,
            description: find_column(grid, row, DESCRIPTION_LABELS),
            source: find_column(grid, row, SOURCE_LABELS),
        })
    })
}

/// Cell text unless blank or a dash
fn meaningful(grid: &Grid, row: usize, col: Option<usize>) -> Option<String> {
    let value = grid.get_opt(row, col);
    if value.is_vacant() {
        None
    } else {
        value.to_trimmed()
    }
}

/// Parse the activity index. Activity and tab cells are often merged, so
/// blanks inherit the value above. The index ends at the first row with no
/// activity, tab, decision id or description.
pub fn parse_cover(grid: &Grid) -> DtResult<Vec<CoverEntry>> {
    let columns = find_columns(grid).ok_or_else(|| {
        DtError::Structural(format!("no cover index header found on sheet '{}'", grid.tab()))
    })?;
    debug!(?columns, "found cover header");

    let mut entries = Vec::new();
    let mut activity: Option<String> = None;
    let mut tab: Option<String> = None;

    for row in columns.header_row + 1..grid.height() {
        let row_activity = meaningful(grid, row, Some(columns.activity));
        let row_tab = meaningful(grid, row, Some(columns.tab));
        let decision = meaningful(grid, row, Some(columns.decision));
        let description = meaningful(grid, row, columns.description);

        if row_activity.is_none() && row_tab.is_none() && decision.is_none() && description.is_none()
        {
            info!(row, "reached end of cover index");
            break;
        }
        if row_activity.is_some() {
            activity = row_activity;
        }
        if row_tab.is_some() {
            tab = row_tab;
        }

        let Some(id_name) = activity.as_deref() else {
            warn!(row, "cover row without activity");
            continue;
        };
        let Some((activity_id, activity_name)) = id_name.split_once(char::is_whitespace) else {
            warn!(row, activity = id_name, "skipping activity without 'id name' form");
            continue;
        };
        let Some(decision) = decision else {
            debug!(row, activity = id_name, "cover row without decision table");
            continue;
        };
        let decision_id = text::name_to_id(&decision);
        let entry_tab = tab.clone().unwrap_or_else(|| decision_id.clone());

        entries.push(CoverEntry {
            activity_id: activity_id.trim().to_string(),
            activity_name: activity_name.trim().to_string(),
            tab: entry_tab,
            decision_id,
            description,
            source: meaningful(grid, row, columns.source),
        });
    }

    Ok(entries)
}
