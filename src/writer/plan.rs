//! Rule documents: one FSH PlanDefinition per decision table
//!
//! Each rule becomes an `action` whose applicability conditions name the
//! rule's input expressions and whose definition is the output activity.
//! Guidance text becomes a second action communicating with the health
//! worker. References are listed once per table as citations.

use crate::config::IgConfig;
use crate::core::TableIds;
use crate::error::{DtError, DtResult};
use crate::text;
use crate::types::{DecisionTable, Rule};
use crate::writer::activity;
use crate::writer::fsh::FshDocument;

const SHAREABLE_PROFILE: &str =
    "http://hl7.org/fhir/uv/crmi/StructureDefinition/crmi-shareableplandefinition";
const PUBLISHABLE_PROFILE: &str =
    "http://hl7.org/fhir/uv/crmi/StructureDefinition/crmi-publishableplandefinition";
const KNOWLEDGE_CAPABILITY: &str =
    "http://hl7.org/fhir/uv/cpg/StructureDefinition/cpg-knowledgeCapability";

/// Activity that displays guidance to the health worker
pub const GUIDANCE_ACTIVITY: &str = "SGDecisionTableGuidance";

const ALERT_CATEGORY: &str =
    "Code { system: 'http://terminology.hl7.org/CodeSystem/communication-category', code: 'alert' }";
const ROUTINE_PRIORITY: &str = "Code { system: 'http://hl7.org/fhir/request-priority', code: 'routine' }";

pub fn render(
    table: &DecisionTable,
    ids: &TableIds,
    ig: &IgConfig,
    dt_prefix: &str,
    title: &str,
) -> DtResult<String> {
    let mut doc = FshDocument::new();
    doc.keyword("Instance", &ids.table_id)
        .keyword("InstanceOf", "PlanDefinition")
        .keyword_string("Title", &format!("Decision Table {}", title))
        .keyword_markdown("Description", &table.anchor.business_rule_text)
        .keyword("Usage", "#definition")
        .string(0, "meta.profile[+]", SHAREABLE_PROFILE)
        .string(0, "meta.profile[+]", PUBLISHABLE_PROFILE)
        .rule(0, "library", &format!("Canonical({})", ids.library_id()))
        .path(0, "extension[+]")
        .string(1, "url", KNOWLEDGE_CAPABILITY)
        .rule(1, "valueCode", "#computable")
        .string(0, "version", &ig.version)
        .string(0, "name", &ids.table_id)
        .string(0, "title", title)
        .rule(0, "status", "#draft")
        .rule(0, "experimental", "false")
        .string(0, "publisher", ig.publisher_name());

    for reference in table.references() {
        doc.path(0, "relatedArtifact[+]")
            .rule(1, "type", "#citation")
            .markdown(1, "citation", reference);
    }

    for rule in &table.rules {
        write_rule(&mut doc, table, rule, dt_prefix)?;
    }

    Ok(doc.finish())
}

/// Applicability conditions, one per input holding a value
fn conditions(table: &DecisionTable, rule: &Rule) -> FshDocument {
    let mut doc = FshDocument::new();
    for (definition, value) in table.inputs.iter().zip(&rule.inputs) {
        if value.is_vacant() {
            continue;
        }
        let Some(value) = value.to_trimmed() else {
            continue;
        };
        let (name, _) = text::split_name_expression(&value);
        doc.path(1, "condition[+]")
            .rule(2, "kind", "#applicability")
            .path(2, "expression")
            .markdown(3, "description", &format!("{}: {}", definition.display_name, value))
            .rule(3, "language", "#text/cql-identifier")
            .string(3, "expression", &text::escape_code(&name));
    }
    doc
}

fn dynamic_value(doc: &mut FshDocument, path: &str, language: &str, expression: &str) {
    doc.path(1, "dynamicValue[+]")
        .string(2, "path", path)
        .path(2, "expression")
        .rule(3, "language", language)
        .string(3, "expression", expression);
}

fn write_rule(doc: &mut FshDocument, table: &DecisionTable, rule: &Rule, dt_prefix: &str) -> DtResult<()> {
    let output = rule
        .output
        .as_deref()
        .ok_or_else(|| {
            DtError::Generation(format!(
                "rule at row {} of {} has no output",
                rule.row, table.anchor.decision_id
            ))
        })?;
    let (output_name, _) = text::split_name_expression(output);
    let description = match rule.annotation.as_deref() {
        Some(annotation) => format!("{}\n\n{}", output, annotation),
        None => output.to_string(),
    };
    let conditions = conditions(table, rule);

    doc.path(0, "action[+]")
        .string(1, "title", &output_name)
        .markdown(1, "description", &description)
        .rule(
            1,
            "definitionCanonical",
            &format!("Canonical({})", activity::activity_id(dt_prefix, &output_name)),
        );
    dynamic_value(doc, "status", "#text/cql-expression", "draft");
    dynamic_value(doc, "intent", "#text/cql-expression", "proposal");
    doc.append(&conditions);

    if let Some(guidance) = rule.guidance.as_deref() {
        doc.path(0, "action[+]")
            .string(1, "title", "Health worker guidance")
            .string(1, "description", "Communicate guidance to the health worker")
            .rule(1, "definitionCanonical", &format!("Canonical({})", GUIDANCE_ACTIVITY));
        dynamic_value(doc, "status", "#text/cql-expression", "active");
        dynamic_value(doc, "payload.contentString", "#text/cql-identifier", guidance);
        dynamic_value(doc, "category.coding", "#text/cql-expression", ALERT_CATEGORY);
        dynamic_value(doc, "priority", "#text/cql-expression", ROUTINE_PRIORITY);
        doc.append(&conditions);
    }
    Ok(())
}
