//! CQL expression skeletons, one library per tab
//!
//! Every expression referenced by a tab's tables gets a documented
//! `define` stub for logic authors to fill in. Definitions that already
//! exist in hand-written libraries are copied into the stub as comments.

use crate::config::IgConfig;
use crate::core::ExpressionEntry;
use crate::text;
use crate::writer::fsh::FshDocument;

const LOGIC_LIBRARY_TYPE: &str = "http://terminology.hl7.org/CodeSystem/library-type#logic-library";
const AUTHOR_PLACEHOLDER: &str = "  //CQL AUTHORS: you need to insert stuff here";

pub fn render_library(library_id: &str, tables: &[&str], entries: &[&ExpressionEntry]) -> String {
    let mut cql = String::from("/*\n");
    cql.push_str(&format!("@libname: {}\n", library_id));
    cql.push_str(&format!("@libid: {}\n", library_id));
    cql.push_str(&format!(
        "@description: This library contains Decision Table elements from the decision tables {}\n",
        tables.join(", ")
    ));
    cql.push_str("*/\n");
    cql.push_str(&format!("library {}\n", library_id));
    cql.push_str("\ncontext Patient\n");

    for entry in entries {
        let tables: Vec<&str> = entry.tables.iter().map(String::as_str).collect();
        cql.push_str("\n/*\n");
        cql.push_str("Autogenerated documentation from decision tables\n");
        cql.push_str(&format!("@name: {}\n", text::comment_escape(&entry.display)));
        cql.push_str(&format!("@pseudocode: {}\n", text::comment_escape(entry.pseudocode())));
        cql.push_str(&format!("@decisionTables: {}\n", tables.join(", ")));
        cql.push_str(" */\n");
        cql.push_str(&format!("define \"{}\":\n", text::escape(&entry.identifier)));
        cql.push_str(AUTHOR_PLACEHOLDER);
        cql.push('\n');
        for existing in &entry.external_definitions {
            cql.push_str(&format!("  // Found in {}\n", existing.source));
            for line in existing.body.lines() {
                cql.push_str(&format!("  // {}\n", line));
            }
        }
    }
    cql
}

/// FSH Library resource carrying a generated CQL library
pub fn render_library_resource(library_id: &str, ig: &IgConfig) -> String {
    let mut doc = FshDocument::new();
    doc.keyword("Instance", library_id)
        .keyword("InstanceOf", "Library")
        .keyword_string("Title", library_id)
        .keyword_string(
            "Description",
            &format!("This library defines context-independent elements for {}", library_id),
        )
        .keyword("Usage", "#definition")
        .string(0, "name", library_id)
        .string(0, "version", &ig.version)
        .rule(0, "status", "#draft")
        .rule(0, "experimental", "false")
        .string(0, "publisher", ig.publisher_name())
        .rule(0, "type", LOGIC_LIBRARY_TYPE)
        .string(0, "content.id", &format!("ig-loader-{}.cql", library_id));
    doc.finish()
}
