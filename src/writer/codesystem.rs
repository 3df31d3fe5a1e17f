//! Run-level code system of decision expressions and the value sets that
//! select codes from it per table and per tab

use crate::core::ExpressionEntry;
use crate::text;
use crate::writer::fsh::FshDocument;

/// Properties attached to every code: (code, description)
const CODE_PROPERTIES: [(&str, &str); 2] = [("table", "Decision Table ID"), ("tab", "Decision Tab")];

/// Value set including a list of codes from `code_system`
pub fn render_value_set(id: &str, code_system: &str, title: &str, codes: &[&str]) -> String {
    let mut doc = FshDocument::new();
    doc.keyword("ValueSet", id)
        .keyword_string("Title", title)
        .keyword_string(
            "Description",
            &format!("Value Set for {}. Autogenerated from decision table artifacts", title),
        )
        .rule(0, "^status", "#active");
    for code in codes {
        doc.path(0, &format!("include {}#\"{}\"", code_system, text::escape(code)));
    }
    doc.finish()
}

/// Value set of every code in the code system
pub fn render_all_codes_value_set(code_system: &str, title: &str) -> String {
    let mut doc = FshDocument::new();
    doc.keyword("ValueSet", code_system)
        .keyword_string("Title", title)
        .keyword_string(
            "Description",
            &format!("Value Set for {}. Autogenerated from decision table artifacts", title),
        )
        .rule(0, "^status", "#active")
        .path(0, &format!("include codes from system {}", code_system));
    doc.finish()
}

fn definition(entry: &ExpressionEntry) -> String {
    let tables: Vec<&str> = entry.tables.iter().map(String::as_str).collect();
    let tabs: Vec<&str> = entry.tabs.iter().map(String::as_str).collect();
    format!(
        "{}\nReferenced in the following locations:\n * Decision Tables: {}\n * Tabs: {}\n",
        entry.pseudocode(),
        tables.join(", "),
        tabs.join(", ")
    )
}

pub fn render_code_system(code_system: &str, title: &str, entries: &[&ExpressionEntry]) -> String {
    let mut doc = FshDocument::new();
    doc.keyword("CodeSystem", code_system)
        .keyword_string("Title", title)
        .keyword_string(
            "Description",
            &format!("CodeSystem for {}. Autogenerated from decision table artifacts", title),
        )
        .rule(0, "^caseSensitive", "false")
        .rule(0, "^status", "#active");
    for (code, description) in CODE_PROPERTIES {
        doc.rule(0, "^property[+].code", &format!("#\"{}\"", code))
            .string(0, "^property[=].description", description)
            .rule(0, "^property[=].type", "#string");
    }

    for entry in entries {
        doc.path(
            0,
            &format!("#\"{}\" \"{}\"", text::escape(&entry.identifier), text::escape(&entry.display)),
        )
        .markdown(1, "^definition", &definition(entry));

        if !entry.external_definitions.is_empty() {
            let found: Vec<String> = entry
                .external_definitions
                .iter()
                .map(|d| format!("//Found in {}\n\n{}\n", d.source, d.body))
                .collect();
            doc.markdown(1, "^designation[+].value", &found.join("\n"))
                .rule(1, "^designation[=].language", "#CQL");
        }

        for (property, values) in [("table", &entry.tables), ("tab", &entry.tabs)] {
            for value in values {
                doc.rule(1, "^property[+].code", &format!("#\"{}\"", property))
                    .string(1, "^property[=].valueString", value);
            }
        }
    }
    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExpressionKind, ExpressionRegistry, Sighting};
    use crate::library::CqlCorpus;

    #[test]
    fn test_value_set_lists_codes() {
        let codes = ["Age < 5", "HIV \"positive\""];
        let fsh = render_value_set("DT.BCG", "DD", "Decision Table for DT.BCG", &codes);
        assert!(fsh.starts_with("ValueSet: DT.BCG\nTitle: \"Decision Table for DT.BCG\"\n"));
        assert!(fsh.contains("* ^status = #active\n"));
        assert!(fsh.contains("* include DD#\"Age < 5\"\n"));
        assert!(fsh.contains("* include DD#\"HIV \\\"positive\\\"\"\n"));
    }

    #[test]
    fn test_code_system_entries() {
        let mut registry = ExpressionRegistry::new();
        for table in ["DT.A", "DT.B"] {
            registry.register(Sighting {
                name: "Age < 5",
                definition: Some("Age in months < 60"),
                kind: ExpressionKind::Input,
                tab_id: "DTs.BCG",
                table_id: table,
            });
        }
        let mut corpus = CqlCorpus::new();
        corpus.add_source("Elements.cql", "define \"Age < 5\":\n  AgeInMonths() < 60");
        registry.finalize(&corpus);

        let entries: Vec<&ExpressionEntry> = registry.entries().collect();
        let fsh = render_code_system("DD", "Decision Table", &entries);

        assert!(fsh.starts_with("CodeSystem: DD\n"));
        assert!(fsh.contains("* ^caseSensitive = false\n"));
        assert!(fsh.contains("* #\"Age < 5\" \"Age < 5\"\n"));
        assert!(fsh.contains(" * Decision Tables: DT.A, DT.B\n * Tabs: DTs.BCG\n"));
        assert!(fsh.contains("  * ^designation[=].language = #CQL\n"));
        assert_eq!(fsh.matches("  * ^property[+].code = #\"table\"").count(), 2);
        assert_eq!(fsh.matches("  * ^property[+].code = #\"tab\"").count(), 1);
    }

    #[test]
    fn test_all_codes_value_set() {
        let fsh = render_all_codes_value_set("DD", "Decision Table");
        assert!(fsh.contains("* include codes from system DD\n"));
    }
}
