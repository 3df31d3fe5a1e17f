//! DMN decision table documents

use crate::config::{IgConfig, DMN_NAMESPACE};
use crate::core::TableIds;
use crate::error::{DtError, DtResult};
use crate::text;
use crate::types::{CellValue, DecisionTable, Rule, TableKind};
use crate::writer::xml::XmlElement;
use std::collections::HashMap;
use tracing::warn;
use url::Url;

/// Output columns of a regular table, with their descriptions
pub const REGULAR_OUTPUTS: [(&str, &str); 4] = [
    ("Care Plan", "Produce a suggested Care Plan for consideration by health worker"),
    ("Guidance displayed to health worker", "Request to communicate guidance to the health worker"),
    ("Annotations", "Additional information for the health worker"),
    ("Reference(s)", "Reference for the source content (L1)"),
];

/// Hash length used for content-addressed rule ids
const RULE_HASH_LEN: usize = 45;

/// `{canonical}/bpmn/{trigger id}.bpmn#{trigger expression}`
pub fn trigger_url(ig: &IgConfig, trigger_id: &str, trigger_expression: &str) -> DtResult<String> {
    let raw = format!("{}/bpmn/{}.bpmn", ig.canonical_base(), trigger_id);
    let mut url = Url::parse(&raw)
        .map_err(|e| DtError::Generation(format!("invalid trigger url '{}': {}", raw, e)))?;
    url.set_fragment(Some(trigger_expression));
    Ok(url.to_string())
}

/// Stable id of a rule, derived from its content so that moving rows does
/// not change it
pub fn rule_id(table: &DecisionTable, ids: &TableIds, rule: &Rule) -> String {
    let hash = text::to_hash(&rule.content_key(), RULE_HASH_LEN);
    let name = match table.kind() {
        TableKind::Contraindication => format!("contra.{}.{}", ids.table_id, hash),
        _ => format!("{}.rule.{}", ids.table_id, hash),
    };
    format!("rule.{}", text::name_to_id(&name))
}

pub fn render(table: &DecisionTable, ids: &TableIds, ig: &IgConfig) -> DtResult<String> {
    build(table, ids, ig)?.to_document()
}

/// Build the `dmn:definitions` tree for one table
pub fn build(table: &DecisionTable, ids: &TableIds, ig: &IgConfig) -> DtResult<XmlElement> {
    let anchor = &table.anchor;
    let dt_id = ids.table_id.as_str();
    let (trigger_id, trigger_expression) = anchor.trigger_parts();

    let mut decision_table = XmlElement::new("dmn:decisionTable").attr("id", dt_id);
    match table.kind() {
        TableKind::Contraindication => {
            let contra_id = text::name_to_id(&format!("{}{}", anchor.header_label, dt_id));
            decision_table.push(
                XmlElement::new("dmn:input")
                    .attr("id", format!("input.{}", contra_id))
                    .attr("label", anchor.header_label.as_str()),
            );
        }
        _ => {
            for definition in &table.inputs {
                decision_table.push(input_element(
                    dt_id,
                    &definition.identifier,
                    definition.expression_text.as_deref(),
                ));
            }
            for (name, description) in REGULAR_OUTPUTS {
                decision_table.push(
                    XmlElement::new("dmn:output")
                        .attr("id", format!("output.{}.{}", dt_id, text::name_to_id(name)))
                        .attr("label", name)
                        .with_child(XmlElement::new("dmn:description").with_text(description)),
                );
            }
        }
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    for rule in &table.rules {
        let id = rule_id(table, ids, rule);
        let count = seen.entry(id.clone()).or_insert(0);
        *count += 1;
        let id = if *count > 1 {
            warn!(table = %ids.table_id, row = rule.row, id = %id, "duplicate rule");
            format!("{}.{}", id, count)
        } else {
            id
        };
        decision_table.push(rule_element(ids, rule, id)?);
    }

    let decision = XmlElement::new("dmn:decision")
        .attr("id", dt_id)
        .attr("label", anchor.business_rule_text.as_str())
        .with_child(XmlElement::new("dmn:question").with_text(anchor.business_rule_text.as_str()))
        .with_child(
            XmlElement::new("dmn:usingTask")
                .attr("href", trigger_url(ig, trigger_id, trigger_expression)?),
        )
        .with_child(decision_table);

    Ok(XmlElement::new("dmn:definitions")
        .attr("xmlns:dmn", DMN_NAMESPACE)
        .attr("namespace", ig.canonical_base())
        .attr("label", anchor.business_rule_text.as_str())
        .attr("id", dt_id)
        .with_child(decision))
}

fn input_element(dt_id: &str, identifier: &str, expression: Option<&str>) -> XmlElement {
    let id = text::name_to_id(identifier);
    let mut input = XmlElement::new("dmn:input")
        .attr("id", format!("input.{}.{}", dt_id, id))
        .attr("label", identifier);
    if let Some(expression) = expression {
        input.push(
            XmlElement::new("dmn:inputExpression")
                .attr("id", format!("inputExpression.{}.{}", dt_id, id))
                .attr("typeRef", "string")
                .with_child(XmlElement::new("dmn:text").with_text(expression)),
        );
    }
    input
}

/// Entry for an expression cell: the first line becomes the code, the rest
/// the description
fn expression_entry(element: &str, value: &str) -> XmlElement {
    let (name, expression) = text::split_name_expression(value);
    let mut entry = XmlElement::new(element);
    if let Some(expression) = expression {
        entry.push(XmlElement::new("dmn:description").with_text(expression));
    }
    entry.with_child(XmlElement::new("dmn:text").with_text(text::escape_code(&name)))
}

fn annotation_entry(value: &str) -> XmlElement {
    XmlElement::new("dmn:annotationEntry")
        .with_child(XmlElement::new("dmn:text").with_text(value))
}

fn rule_element(ids: &TableIds, rule: &Rule, id: String) -> DtResult<XmlElement> {
    let output = rule.output.as_deref().ok_or_else(|| {
        DtError::Generation(format!(
            "rule at row {} of {} has no output",
            rule.row, ids.table_id
        ))
    })?;

    let mut element = XmlElement::new("dmn:rule").attr("id", id);
    for value in &rule.inputs {
        element.push(match value {
            CellValue::Blank => XmlElement::new("dmn:inputEntry")
                .with_child(XmlElement::new("dmn:text").with_text("-")),
            _ => {
                let text = value.as_text().unwrap_or_default();
                expression_entry("dmn:inputEntry", &text)
            }
        });
    }
    element.push(expression_entry("dmn:outputEntry", output));
    if let Some(guidance) = rule.guidance.as_deref() {
        element.push(expression_entry("dmn:outputEntry", guidance));
    }
    if let Some(annotation) = rule.annotation.as_deref() {
        element.push(annotation_entry(annotation));
    }
    if let Some(reference) = rule.reference.as_deref() {
        element.push(annotation_entry(reference));
    }
    Ok(element)
}
