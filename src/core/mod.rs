//! Extraction engine: locate tables, walk rows, register expressions

pub mod builder;
pub mod classifier;
pub mod locator;
pub mod registry;
pub mod walker;

pub use builder::TableBuilder;
pub use classifier::{classify, RawRow, RowClass};
pub use locator::{locate, validate_anchor};
pub use registry::{ExpressionEntry, ExpressionKind, ExpressionRegistry, Registration, Sighting};
pub use walker::{forward_fill, walk, WalkOutcome};

use crate::text;

/// Resource ids derived for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIds {
    /// `<prefix>.<decision id>`, used for the DMN model and PlanDefinition
    pub table_id: String,
    /// `<prefix>s.<tab>`, shared by every table of a tab and by its library
    pub tab_id: String,
}

impl TableIds {
    pub fn new(prefix: &str, tab: &str, decision_id: &str) -> Self {
        Self {
            table_id: text::name_to_id(&format!("{}.{}", prefix, decision_id)),
            tab_id: text::name_to_id(&format!("{}s.{}", prefix, text::name_to_id(tab))),
        }
    }

    /// Library holding the tab's CQL skeleton
    pub fn library_id(&self) -> &str {
        &self.tab_id
    }
}
