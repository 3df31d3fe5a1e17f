//! Line builder for FHIR Shorthand documents

use crate::text;

/// Indented FSH document. Each rule is written as `* path = value` at a
/// nesting depth of two spaces per level.
#[derive(Debug, Clone, Default)]
pub struct FshDocument {
    lines: Vec<String>,
}

impl FshDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Keyword: value`
    pub fn keyword(&mut self, keyword: &str, value: &str) -> &mut Self {
        self.lines.push(format!("{}: {}", keyword, value));
        self
    }

    /// `Keyword: "escaped value"`
    pub fn keyword_string(&mut self, keyword: &str, value: &str) -> &mut Self {
        self.lines.push(format!("{}: \"{}\"", keyword, text::escape(value)));
        self
    }

    /// `Keyword: """markdown"""`
    pub fn keyword_markdown(&mut self, keyword: &str, value: &str) -> &mut Self {
        self.lines.push(format!("{}: \"\"\"{}\"\"\"", keyword, text::markdown_escape(value)));
        self
    }

    /// A path without a value, opening a nested block
    pub fn path(&mut self, depth: usize, path: &str) -> &mut Self {
        self.lines.push(format!("{}* {}", indent(depth), path));
        self
    }

    /// `* path = value` with the value written verbatim
    pub fn rule(&mut self, depth: usize, path: &str, value: &str) -> &mut Self {
        self.lines.push(format!("{}* {} = {}", indent(depth), path, value));
        self
    }

    pub fn string(&mut self, depth: usize, path: &str, value: &str) -> &mut Self {
        self.rule(depth, path, &format!("\"{}\"", text::escape(value)))
    }

    pub fn markdown(&mut self, depth: usize, path: &str, value: &str) -> &mut Self {
        self.rule(depth, path, &format!("\"\"\"{}\"\"\"", text::markdown_escape(value)))
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Append another document's lines
    pub fn append(&mut self, other: &FshDocument) -> &mut Self {
        self.lines.extend(other.lines.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn finish(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
