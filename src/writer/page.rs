//! Decision logic overview page

use quick_xml::escape::escape;

pub const PAGE_ID: &str = "decision-logic";

/// One decision table listed on the overview page
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewRow {
    pub table_id: String,
    pub description: String,
    /// Reference/source column; blank cells continue the source above
    pub source: Option<String>,
}

const INTRODUCTION: &str = "
The decision-support logic component provides the decision logic and algorithms in accordance with the guidelines. The decision tables below label the inputs and outputs to be operationalized in a digital decision-support system.

# Decision Support Logic Overview
The structure of the decision-support tables is based on an adaptation of the Decision Model and Notation (DMN), an industry standard for modeling and executing decision logic.

## Overview of decision logic support tables
<div style=\"width: 100%;\">
  <table border=\"1\" class=\"dataframe table table-striped table-bordered\">
    <thead>
      <tr style=\"text-align: left;\">
        <th>Decision Table ID</th>
        <th>Decision Table Description</th>
        <th>Reference/Source</th>
      </tr>
    </thead>
    <tbody style=\"text-align: left; vertical-align: top\">
";

pub fn render(ig_title: &str, rows: &[OverviewRow]) -> String {
    let mut page = format!(
        "This page describes the decision support logic included in: {}\n",
        escape(ig_title)
    );
    page.push_str(INTRODUCTION);

    let mut source = String::new();
    for row in rows {
        if let Some(current) = row.source.as_deref().filter(|s| !s.trim().is_empty()) {
            source = escape(current).into_owned();
        }
        page.push_str(&format!(
            "      <tr><td>{id}</td><td>{description}<br/>(<a href=\"#{id}\">View</a>, <a href=\"{id}.dmn\">DMN</a>)</td><td>{source}</td></tr>\n",
            id = row.table_id,
            description = escape(&row.description),
            source = source,
        ));
    }
    page.push_str("    </tbody>\n  </table>\n</div>\n");

    page.push_str("\n## Decision logic support tables\n\n");
    for row in rows {
        page.push_str(&format!(
            "### {} <a name=\"{}\"> </a>\n",
            escape(&row.description),
            row.table_id
        ));
        page.push_str(&format!("{{% include {}.xml %}}\n\n", row.table_id));
    }
    page
}
