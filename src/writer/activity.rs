//! Output activities: one FSH ActivityDefinition per distinct output

use crate::config::IgConfig;
use crate::core::ExpressionEntry;
use crate::text;
use crate::writer::fsh::FshDocument;

/// Id of the activity proposed by an output, `<prefix>O.<output>`
pub fn activity_id(dt_prefix: &str, output_name: &str) -> String {
    text::name_to_id(&format!("{}O.{}", dt_prefix, output_name))
}

pub fn render(entry: &ExpressionEntry, dt_prefix: &str, ig: &IgConfig) -> (String, String) {
    let id = activity_id(dt_prefix, &entry.display);
    let mut doc = FshDocument::new();
    doc.keyword("Instance", &id)
        .keyword("InstanceOf", "ActivityDefinition")
        .keyword_string("Title", &format!("Decision Table Output {}", entry.display))
        .keyword_markdown("Description", entry.pseudocode())
        .keyword("Usage", "#definition")
        .string(0, "publisher", ig.publisher_name())
        .rule(0, "experimental", "false")
        .string(0, "version", &ig.version)
        .string(0, "name", &id)
        .string(0, "title", &entry.display)
        .rule(0, "status", "#draft")
        .rule(0, "kind", "#CommunicationRequest")
        .rule(0, "intent", "#proposal")
        .rule(0, "doNotPerform", "false");
    (id, doc.finish())
}
