use crate::text;
use serde::Serialize;
use std::borrow::Cow;

//==============================================================================
// Cells
//==============================================================================

/// Value of a single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Text(String),
    Numeric(f64),
    /// Empty cell, whitespace-only text or NaN
    #[default]
    Blank,
}

impl CellValue {
    /// Build a cell from text, folding whitespace-only strings into Blank
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if text::is_blank(&s) {
            CellValue::Blank
        } else {
            CellValue::Text(s)
        }
    }

    /// Build a cell from a number, folding NaN into Blank
    pub fn numeric(n: f64) -> Self {
        if n.is_nan() {
            CellValue::Blank
        } else {
            CellValue::Numeric(n)
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => text::is_blank(s),
            CellValue::Numeric(n) => n.is_nan(),
        }
    }

    pub fn is_dash(&self) -> bool {
        matches!(self, CellValue::Text(s) if text::is_dash(s))
    }

    /// Blank or dash: the cell carries no condition
    pub fn is_vacant(&self) -> bool {
        self.is_blank() || self.is_dash()
    }

    /// Displayed text, `None` for blank cells
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        if self.is_blank() {
            return None;
        }
        match self {
            CellValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::Numeric(n) => Some(Cow::Owned(text::format_number(*n))),
            CellValue::Blank => None,
        }
    }

    /// Displayed text, trimmed, `None` for blank cells
    pub fn to_trimmed(&self) -> Option<String> {
        self.as_text().map(|s| s.trim().to_string())
    }
}

/// A positioned cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub value: CellValue,
}

//==============================================================================
// Table anchors
//==============================================================================

/// Kind of embedded table, decided by the anchor and header labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableKind {
    /// "Decision ID" anchor with an "Inputs" header
    Regular,
    /// "Decision ID" anchor with a "Potential contraindications" header
    Contraindication,
    /// "Schedule ID" anchor, recognized but not extracted
    Schedule,
}

/// Location and header contract of one embedded table
#[derive(Debug, Clone, PartialEq)]
pub struct TableAnchor {
    pub tab: String,
    pub decision_id: String,
    pub anchor_row: usize,
    pub anchor_col: usize,
    pub business_rule_text: String,
    pub trigger_text: String,
    pub header_row: usize,
    /// Label found under the anchor on the header row ("Inputs", ...)
    pub header_label: String,
    pub output_col: usize,
    pub guidance_col: Option<usize>,
    pub annotation_col: Option<usize>,
    pub reference_col: Option<usize>,
    pub kind: TableKind,
}

impl TableAnchor {
    /// First row the walker reads. Contraindication headers carry no
    /// input labels so their data starts one row later.
    pub fn first_data_row(&self) -> usize {
        match self.kind {
            TableKind::Contraindication => self.header_row + 2,
            TableKind::Regular | TableKind::Schedule => self.header_row + 1,
        }
    }

    /// Trigger split into its id and expression ("T1 Patient encounter")
    pub fn trigger_parts(&self) -> (&str, &str) {
        let trigger = self.trigger_text.trim();
        match trigger.split_once(' ') {
            Some((id, expr)) => (id.trim(), expr.trim()),
            None => (trigger, trigger),
        }
    }
}

//==============================================================================
// Decision model
//==============================================================================

/// A decision variable declared once per table
#[derive(Debug, Clone, PartialEq)]
pub struct InputDefinition {
    /// Expression code derived from the display name
    pub identifier: String,
    pub display_name: String,
    pub expression_text: Option<String>,
    /// Absolute sheet column the definition was declared in
    pub column: usize,
}

impl InputDefinition {
    pub fn new(display_name: &str, expression_text: Option<String>, column: usize) -> Self {
        Self {
            identifier: text::escape_code(display_name),
            display_name: display_name.to_string(),
            expression_text,
            column,
        }
    }
}

/// One branch of the decision logic
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rule {
    /// One value per input definition, after forward-fill
    pub inputs: Vec<CellValue>,
    pub output: Option<String>,
    pub guidance: Option<String>,
    pub annotation: Option<String>,
    pub reference: Option<String>,
    /// Sheet row the rule was read from
    pub row: usize,
}

impl Rule {
    /// Every field joined with `|`, used to derive a content-addressed id.
    /// Blank fields stay as empty segments so neighbouring values never run
    /// together.
    pub fn content_key(&self) -> String {
        let inputs = self
            .inputs
            .iter()
            .map(|v| v.as_text().unwrap_or_default().into_owned());
        let fields = [&self.output, &self.guidance, &self.annotation, &self.reference]
            .into_iter()
            .map(|field| field.clone().unwrap_or_default());
        inputs.chain(fields).collect::<Vec<_>>().join("|")
    }
}

/// A fully walked table
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTable {
    pub anchor: TableAnchor,
    pub inputs: Vec<InputDefinition>,
    pub rules: Vec<Rule>,
    pub used: bool,
}

impl DecisionTable {
    pub fn kind(&self) -> TableKind {
        self.anchor.kind
    }

    /// Distinct reference texts in rule order
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        for reference in self.rules.iter().filter_map(|r| r.reference.as_deref()) {
            if !refs.contains(&reference) {
                refs.push(reference);
            }
        }
        refs
    }
}

//==============================================================================
// Cover sheet
//==============================================================================

/// One activity row of a workbook's cover sheet
#[derive(Debug, Clone, PartialEq)]
pub struct CoverEntry {
    pub activity_id: String,
    pub activity_name: String,
    pub tab: String,
    pub decision_id: String,
    pub description: Option<String>,
    pub source: Option<String>,
}
