//! Decision model builder - accumulates one table during the walk

use crate::error::{DtError, DtResult};
use crate::types::{DecisionTable, InputDefinition, Rule, TableAnchor, TableKind};

#[derive(Debug, Clone)]
pub struct TableBuilder {
    anchor: TableAnchor,
    inputs: Vec<InputDefinition>,
    rules: Vec<Rule>,
    definitions_declared: bool,
}

impl TableBuilder {
    /// Contraindication tables have a single implicit input named after
    /// their header label.
    pub fn new(anchor: TableAnchor) -> Self {
        let (inputs, definitions_declared) = match anchor.kind {
            TableKind::Contraindication => (
                vec![InputDefinition::new(&anchor.header_label, None, anchor.anchor_col)],
                true,
            ),
            TableKind::Regular | TableKind::Schedule => (Vec::new(), false),
        };
        Self {
            anchor,
            inputs,
            rules: Vec::new(),
            definitions_declared,
        }
    }

    pub fn anchor(&self) -> &TableAnchor {
        &self.anchor
    }

    pub fn inputs(&self) -> &[InputDefinition] {
        &self.inputs
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn last_rule(&self) -> Option<&Rule> {
        self.rules.last()
    }

    /// True until a regular table has consumed its definitions row
    pub fn expecting_definitions(&self) -> bool {
        self.anchor.kind == TableKind::Regular && !self.definitions_declared && self.rules.is_empty()
    }

    pub fn declare_inputs(&mut self, inputs: Vec<InputDefinition>) -> DtResult<()> {
        if !self.expecting_definitions() {
            return Err(DtError::Structural(format!(
                "input definitions for {} declared after rules",
                self.anchor.decision_id
            )));
        }
        self.inputs = inputs;
        self.definitions_declared = true;
        Ok(())
    }

    pub fn push_rule(&mut self, rule: Rule) -> DtResult<()> {
        if rule.inputs.len() != self.inputs.len() {
            return Err(DtError::ShapeMismatch(format!(
                "row {} of {} has {} inputs, table declares {}",
                rule.row,
                self.anchor.decision_id,
                rule.inputs.len(),
                self.inputs.len()
            )));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Freeze the table and mark it used by an activity
    pub fn finish(self) -> DecisionTable {
        DecisionTable {
            anchor: self.anchor,
            inputs: self.inputs,
            rules: self.rules,
            used: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn anchor(kind: TableKind) -> TableAnchor {
        TableAnchor {
            tab: "BCG".to_string(),
            decision_id: "D1".to_string(),
            anchor_row: 0,
            anchor_col: 1,
            business_rule_text: "rule".to_string(),
            trigger_text: "T1 Encounter".to_string(),
            header_row: 3,
            header_label: "Potential contraindications".to_string(),
            output_col: 3,
            guidance_col: None,
            annotation_col: None,
            reference_col: None,
            kind,
        }
    }

    #[test]
    fn test_contraindication_has_implicit_input() {
        let builder = TableBuilder::new(anchor(TableKind::Contraindication));
        assert!(!builder.expecting_definitions());
        assert_eq!(builder.inputs().len(), 1);
        assert_eq!(builder.inputs()[0].display_name, "Potential contraindications");
    }

    #[test]
    fn test_rule_length_must_match_definitions() {
        let mut builder = TableBuilder::new(anchor(TableKind::Regular));
        assert!(builder.expecting_definitions());
        builder
            .declare_inputs(vec![InputDefinition::new("Age < 5", None, 1)])
            .unwrap();

        let bad = Rule {
            inputs: vec![CellValue::text("Yes"), CellValue::text("No")],
            ..Default::default()
        };
        assert!(matches!(builder.push_rule(bad), Err(DtError::ShapeMismatch(_))));

        let good = Rule {
            inputs: vec![CellValue::text("Yes")],
            output: Some("Vaccinate".to_string()),
            ..Default::default()
        };
        builder.push_rule(good).unwrap();
        assert!(builder.declare_inputs(Vec::new()).is_err());

        let table = builder.finish();
        assert!(table.used);
        assert_eq!(table.rules.len(), 1);
    }
}
