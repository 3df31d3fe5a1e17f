//! Row walker - single pass over one anchored table
//!
//! Reads rows from the first data row until the sentinel row, applies
//! forward-fill for merged cells, and feeds definitions and rules into a
//! `TableBuilder`. Every expression seen is registered with the
//! `ExpressionRegistry` under the table's ids.

use crate::config::FillPolicy;
use crate::core::builder::TableBuilder;
use crate::core::classifier::{classify, RawRow, RowClass};
use crate::core::registry::{ExpressionKind, ExpressionRegistry, Sighting};
use crate::core::TableIds;
use crate::error::{DtError, DtResult};
use crate::excel::Grid;
use crate::text;
use crate::types::{CellValue, DecisionTable, InputDefinition, Rule, TableAnchor, TableKind};
use tracing::{debug, info, warn};

/// Result of walking one table
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub table: DecisionTable,
    /// Sentinel row (or grid height) where the walk stopped
    pub end_row: usize,
    /// Rows dropped because they could not be aligned with the definitions
    pub skipped_rows: usize,
    /// Suspicious layouts worth reporting
    pub warnings: Vec<String>,
}

/// Fill a merged cell from the previous rule. The raw value is kept unless
/// it is fillable under `policy` and the previous value is not blank.
pub fn forward_fill(raw: &CellValue, previous: Option<&CellValue>, policy: FillPolicy) -> CellValue {
    let fillable = match policy {
        FillPolicy::Blank => raw.is_blank(),
        FillPolicy::BlankOrDash => raw.is_vacant(),
    };
    match previous {
        Some(prev) if fillable && !prev.is_blank() => prev.clone(),
        _ => raw.clone(),
    }
}

/// Walk the table under `anchor`
pub fn walk(
    grid: &Grid,
    anchor: &TableAnchor,
    ids: &TableIds,
    policy: FillPolicy,
    registry: &mut ExpressionRegistry,
) -> DtResult<WalkOutcome> {
    if anchor.kind == TableKind::Schedule {
        return Err(DtError::Structural(format!(
            "schedule table {} is not supported",
            anchor.decision_id
        )));
    }

    let mut builder = TableBuilder::new(anchor.clone());
    let mut pending_annotation: Option<String> = None;
    // pre-annotation seen before the definitions row
    let mut early_annotation_row: Option<usize> = None;
    let mut warnings = Vec::new();
    let mut skipped_rows = 0;
    let mut row = anchor.first_data_row();

    while row < grid.height() {
        let raw = RawRow::read(grid, anchor, row);
        match classify(&raw, builder.expecting_definitions()) {
            RowClass::EndOfTable => break,
            RowClass::PreAnnotation => {
                if let Some(note) = raw.inputs.first().and_then(CellValue::to_trimmed) {
                    debug!(row, "pre-annotation");
                    if builder.expecting_definitions() && early_annotation_row.is_none() {
                        early_annotation_row = Some(row);
                    }
                    pending_annotation = Some(match pending_annotation.take() {
                        Some(pending) => format!("{}\n{}", pending, note),
                        None => note,
                    });
                }
            }
            RowClass::InputDefinitionRow => {
                if let Some(annotation_row) = early_annotation_row {
                    let message = format!(
                        "{}: row {} was read as a pre-annotation and row {} as the input definitions; \
                         a single-input definitions row needs \"-\" in the other input columns",
                        ids.table_id, annotation_row, row
                    );
                    warnings.push(message);
                }
                let definitions = read_definitions(&raw, anchor);
                for definition in &definitions {
                    registry.register(Sighting {
                        name: &definition.display_name,
                        definition: definition.expression_text.as_deref(),
                        kind: ExpressionKind::Input,
                        tab_id: &ids.tab_id,
                        table_id: &ids.table_id,
                    });
                }
                debug!(row, count = definitions.len(), "input definitions");
                builder.declare_inputs(definitions)?;
            }
            RowClass::RuleRow => match read_rule(&raw, &builder, policy) {
                Ok(Some(mut rule)) => {
                    if let Some(pending) = pending_annotation.take() {
                        rule.annotation = Some(match rule.annotation.take() {
                            Some(own) => format!("{}\n\n{}", pending, own),
                            None => pending,
                        });
                    }
                    register_rule(&rule, ids, registry);
                    builder.push_rule(rule)?;
                }
                Ok(None) => debug!(row, "skipping contraindication row without output"),
                Err(e) => {
                    warn!(table = %ids.table_id, row, error = %e, "skipping row");
                    skipped_rows += 1;
                }
            },
        }
        row += 1;
    }

    if let Some(pending) = pending_annotation {
        debug!(table = %ids.table_id, annotation = %pending, "annotation after the last rule dropped");
    }
    let table = builder.finish();
    info!(
        table = %ids.table_id,
        inputs = table.inputs.len(),
        rules = table.rules.len(),
        end_row = row,
        "end of table"
    );

    Ok(WalkOutcome {
        table,
        end_row: row,
        skipped_rows,
        warnings,
    })
}

/// Each non-blank, non-dash cell declares one input
fn read_definitions(raw: &RawRow, anchor: &TableAnchor) -> Vec<InputDefinition> {
    raw.inputs
        .iter()
        .enumerate()
        .filter(|(_, value)| !value.is_vacant())
        .filter_map(|(offset, value)| {
            let cell = value.to_trimmed()?;
            let (name, expression) = text::split_name_expression(&cell);
            Some(InputDefinition::new(&name, expression, anchor.anchor_col + offset))
        })
        .collect()
}

/// Build the rule for a row. Contraindication rows without output yield `None`.
fn read_rule(raw: &RawRow, builder: &TableBuilder, policy: FillPolicy) -> DtResult<Option<Rule>> {
    let anchor = builder.anchor();
    let definitions = builder.inputs();
    let previous = builder.last_rule();

    if anchor.kind == TableKind::Contraindication && raw.output.is_blank() {
        return Ok(None);
    }
    if definitions.is_empty() {
        return Err(DtError::ShapeMismatch(format!(
            "row {} has no input definitions to align with",
            raw.row
        )));
    }
    if anchor.kind == TableKind::Regular {
        let stray = raw.inputs.iter().enumerate().find(|(offset, value)| {
            let column = anchor.anchor_col + offset;
            !value.is_vacant() && !definitions.iter().any(|d| d.column == column)
        });
        if let Some((offset, _)) = stray {
            return Err(DtError::ShapeMismatch(format!(
                "row {} has a value in column {} which declares no input",
                raw.row,
                anchor.anchor_col + offset
            )));
        }
    }

    let inputs = definitions
        .iter()
        .enumerate()
        .map(|(position, definition)| {
            let value = raw.input_at(anchor, definition.column);
            let above = previous.and_then(|rule| rule.inputs.get(position));
            forward_fill(value, above, policy)
        })
        .collect();

    Ok(Some(Rule {
        inputs,
        output: raw.output.to_trimmed(),
        guidance: raw.guidance.to_trimmed(),
        annotation: raw.annotation.to_trimmed(),
        reference: raw.reference.to_trimmed(),
        row: raw.row,
    }))
}

/// Single-line short text that reads like a name rather than a sentence
fn is_identifier_like(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && !text.contains('\n')
        && text.chars().count() <= text::ID_MAX_LEN
        && !text.ends_with(['.', ':', '?', '!'])
}

fn register_rule(rule: &Rule, ids: &TableIds, registry: &mut ExpressionRegistry) {
    let mut register = |value: &str, kind: ExpressionKind| {
        let (name, expression) = text::split_name_expression(value);
        registry.register(Sighting {
            name: &name,
            definition: expression.as_deref(),
            kind,
            tab_id: &ids.tab_id,
            table_id: &ids.table_id,
        });
    };

    for value in rule.inputs.iter().filter(|v| !v.is_vacant()) {
        if let Some(text) = value.as_text() {
            register(&text, ExpressionKind::Input);
        }
    }
    if let Some(output) = rule.output.as_deref() {
        register(output, ExpressionKind::Output);
    }
    if let Some(annotation) = rule.annotation.as_deref().filter(|a| is_identifier_like(a)) {
        register(annotation, ExpressionKind::Annotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locator::locate;
    use pretty_assertions::assert_eq;

    const HEADER: [&str; 7] = [
        "Inputs",
        "",
        "",
        "Output",
        "Guidance displayed to health worker",
        "Annotations",
        "Reference(s)",
    ];

    fn table_grid(body: &[[&str; 7]]) -> Grid {
        let mut rows: Vec<Vec<&str>> = vec![
            vec!["Decision ID", "IMMZ.D2.DT.BCG"],
            vec!["Business rule", "Determine if BCG is due"],
            vec!["Trigger", "T1 Patient encounter"],
            HEADER.to_vec(),
        ];
        rows.extend(body.iter().map(|r| r.to_vec()));
        Grid::from_rows("BCG", rows)
    }

    fn walk_grid(grid: &Grid, policy: FillPolicy) -> (WalkOutcome, ExpressionRegistry) {
        let anchors = locate(grid);
        let anchor = anchors.values().next().expect("anchor");
        let ids = TableIds::new("DT", &anchor.tab, &anchor.decision_id);
        let mut registry = ExpressionRegistry::new();
        let outcome = walk(grid, anchor, &ids, policy, &mut registry).unwrap();
        (outcome, registry)
    }

    #[test]
    fn test_dash_definitions_occupy_no_position() {
        let grid = table_grid(&[
            ["Age < 5\nPatient age in months", "-", "-", "", "", "", ""],
            ["Yes", "-", "-", "Give BCG", "", "", ""],
            ["No", "", "", "Do not give BCG", "", "", ""],
        ]);
        let (outcome, registry) = walk_grid(&grid, FillPolicy::Blank);
        let table = outcome.table;

        assert_eq!(table.inputs.len(), 1);
        assert_eq!(table.inputs[0].display_name, "Age < 5");
        assert_eq!(table.inputs[0].expression_text.as_deref(), Some("Patient age in months"));
        assert_eq!(table.rules.len(), 2);
        assert!(table.rules.iter().all(|r| r.inputs.len() == table.inputs.len()));

        let entry = registry.get("Age < 5").unwrap();
        assert_eq!(entry.definition.as_deref(), Some("Patient age in months"));
        assert!(registry.get("Give BCG").is_some());
    }

    #[test]
    fn test_pre_annotation_merges_into_next_rule() {
        let grid = table_grid(&[
            ["Age < 5", "HIV positive", "", "", "", "", ""],
            ["Note: applies to outpatient only", "", "", "", "", "", ""],
            ["Yes", "No", "", "Give BCG", "", "See footnote", ""],
            ["No", "No", "", "Do not give BCG", "", "", ""],
        ]);
        let (outcome, _) = walk_grid(&grid, FillPolicy::Blank);
        let rules = outcome.table.rules;

        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].annotation.as_deref(),
            Some("Note: applies to outpatient only\n\nSee footnote")
        );
        assert_eq!(rules[1].annotation, None);
    }

    #[test]
    fn test_single_input_definitions_row_is_flagged() {
        let grid = table_grid(&[
            ["Age < 5", "", "", "", "", "", ""],
            ["Yes", "", "", "Give BCG", "", "", ""],
            ["No", "", "", "Do not give BCG", "", "", ""],
        ]);
        let (outcome, _) = walk_grid(&grid, FillPolicy::Blank);

        // the definitions row looks like a pre-annotation, so the first rule
        // row is taken as the definitions
        assert_eq!(outcome.table.inputs[0].display_name, "Yes");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("row 4 was read as a pre-annotation and row 5"));

        let marked = table_grid(&[
            ["Age < 5", "-", "-", "", "", "", ""],
            ["Yes", "", "", "Give BCG", "", "", ""],
        ]);
        let (outcome, _) = walk_grid(&marked, FillPolicy::Blank);
        assert_eq!(outcome.table.inputs[0].display_name, "Age < 5");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_consecutive_pre_annotations_join_with_newline() {
        let grid = table_grid(&[
            ["Age < 5", "HIV positive", "", "", "", "", ""],
            ["First note", "", "", "", "", "", ""],
            ["Second note", "", "", "", "", "", ""],
            ["Yes", "No", "", "Give BCG", "", "", ""],
        ]);
        let (outcome, _) = walk_grid(&grid, FillPolicy::Blank);
        assert_eq!(
            outcome.table.rules[0].annotation.as_deref(),
            Some("First note\nSecond note")
        );
    }

    #[test]
    fn test_forward_fill_matches_literal_values() {
        let merged = table_grid(&[
            ["Age < 5", "HIV positive", "", "", "", "", ""],
            ["Yes", "Yes", "", "Refer", "Counsel", "", "WHO 2018"],
            ["", "No", "", "Give BCG", "", "", ""],
            ["No", "", "", "Do not give BCG", "", "", ""],
        ]);
        let literal = table_grid(&[
            ["Age < 5", "HIV positive", "", "", "", "", ""],
            ["Yes", "Yes", "", "Refer", "Counsel", "", "WHO 2018"],
            ["Yes", "No", "", "Give BCG", "", "", ""],
            ["No", "No", "", "Do not give BCG", "", "", ""],
        ]);
        let (merged, _) = walk_grid(&merged, FillPolicy::Blank);
        let (literal, _) = walk_grid(&literal, FillPolicy::Blank);
        assert_eq!(merged.table.rules, literal.table.rules);
        assert_eq!(
            merged.table.rules[1].inputs,
            vec![CellValue::text("Yes"), CellValue::text("No")]
        );
    }

    #[test]
    fn test_fill_policy_for_dashes() {
        let grid = table_grid(&[
            ["Age < 5", "HIV positive", "", "", "", "", ""],
            ["Yes", "Yes", "", "Refer", "", "", ""],
            ["-", "No", "", "Give BCG", "", "", ""],
        ]);
        let (blank_only, _) = walk_grid(&grid, FillPolicy::Blank);
        assert_eq!(blank_only.table.rules[1].inputs[0], CellValue::text("-"));

        let (with_dash, _) = walk_grid(&grid, FillPolicy::BlankOrDash);
        assert_eq!(with_dash.table.rules[1].inputs[0], CellValue::text("Yes"));
    }

    #[test]
    fn test_end_of_table_is_final() {
        let grid = table_grid(&[
            ["Age < 5", "HIV positive", "", "", "", "", ""],
            ["Yes", "No", "", "Give BCG", "", "", ""],
            ["", "", "", "", "", "", ""],
            ["No", "No", "", "Stray rule below the table", "", "", ""],
        ]);
        let (outcome, registry) = walk_grid(&grid, FillPolicy::Blank);
        assert_eq!(outcome.table.rules.len(), 1);
        assert_eq!(outcome.end_row, 6);
        assert!(registry.get("Stray rule below the table").is_none());
    }

    #[test]
    fn test_misaligned_row_is_skipped() {
        let grid = table_grid(&[
            ["Age < 5", "-", "", "", "", "", ""],
            ["Yes", "unexpected", "", "Give BCG", "", "", ""],
            ["No", "", "", "Do not give BCG", "", "", ""],
        ]);
        let (outcome, _) = walk_grid(&grid, FillPolicy::Blank);
        assert_eq!(outcome.skipped_rows, 1);
        assert_eq!(outcome.table.rules.len(), 1);
        assert_eq!(outcome.table.rules[0].output.as_deref(), Some("Do not give BCG"));
    }

    #[test]
    fn test_contraindication_table() {
        let grid = Grid::from_rows(
            "BCG",
            [
                vec!["Decision ID", "IMMZ.D2.DT.BCG.Contra"],
                vec!["Business rule", "Check contraindications"],
                vec!["Trigger", "T1 Patient encounter"],
                vec!["Potential contraindications", "", "", "Output", "Guidance displayed to health worker"],
                vec!["Contraindication"],
                vec!["Allergy to BCG", "", "", "Do not vaccinate"],
                vec!["", "", "", "Refer"],
                vec!["Fever"],
                vec!["Malnourished", "", "", "Defer", "Check weight"],
            ],
        );
        let (outcome, registry) = walk_grid(&grid, FillPolicy::Blank);
        let table = outcome.table;

        assert_eq!(table.kind(), TableKind::Contraindication);
        assert_eq!(table.inputs.len(), 1);
        assert_eq!(table.inputs[0].display_name, "Potential contraindications");
        // "Fever" has no output and reads as a pre-annotation for the next rule
        assert_eq!(table.rules.len(), 3);
        assert_eq!(table.rules[1].inputs, vec![CellValue::text("Allergy to BCG")]);
        assert_eq!(table.rules[2].annotation.as_deref(), Some("Fever"));
        assert!(registry.get("Malnourished").is_some());
    }

    #[test]
    fn test_schedule_tables_are_rejected() {
        let mut grid = table_grid(&[["Dose 1", "", "", "Give", "", "", ""]]);
        grid.set(0, 0, CellValue::text("Schedule ID"));
        let anchors = locate(&grid);
        let anchor = anchors.values().next().unwrap();
        let ids = TableIds::new("DT", &anchor.tab, &anchor.decision_id);
        let result = walk(&grid, anchor, &ids, FillPolicy::Blank, &mut ExpressionRegistry::new());
        assert!(matches!(result, Err(DtError::Structural(_))));
    }

    #[test]
    fn test_identifier_like_annotations() {
        assert!(is_identifier_like("See footnote"));
        assert!(!is_identifier_like("This is a sentence."));
        assert!(!is_identifier_like("two\nlines"));
        assert!(!is_identifier_like(&"x".repeat(80)));
    }
}
