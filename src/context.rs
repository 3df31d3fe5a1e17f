//! Run context and run report
//!
//! `RunContext` is the only mutable state of a run. It is created once by
//! the command, threaded by `&mut` through the pipeline and consumed when
//! the bundle is installed.

use crate::config::{ExtractorConfig, IgConfig};
use crate::core::registry::Conflict;
use crate::core::ExpressionRegistry;
use crate::excel::GridCache;
use crate::types::TableKind;
use crate::writer::page::OverviewRow;
use crate::writer::ResourceBundle;
use serde::Serialize;
use tracing::warn;

/// Outcome of one workbook
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileReport {
    pub path: String,
    pub processed: bool,
    /// Cover entries, or located tables when the workbook has no cover sheet
    pub entries: usize,
    pub error: Option<String>,
}

/// Outcome of one decision table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableReport {
    pub tab: String,
    pub decision_id: String,
    pub table_id: String,
    pub kind: TableKind,
    pub inputs: usize,
    pub rules: usize,
    pub skipped_rows: usize,
    pub emitted: bool,
    pub error: Option<String>,
}

/// Registry conflict as listed in the report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConflictReport {
    pub identifier: String,
    pub canonical: String,
    #[serde(flatten)]
    pub conflict: Conflict,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub tables: Vec<TableReport>,
    pub warnings: Vec<String>,
    pub expressions: usize,
    pub conflicts: Vec<ConflictReport>,
    pub resources: usize,
    pub installed: bool,
}

impl RunReport {
    /// Record and log a warning
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn tables_emitted(&self) -> usize {
        self.tables.iter().filter(|t| t.emitted).count()
    }

    pub fn tables_failed(&self) -> usize {
        self.tables.iter().filter(|t| !t.emitted).count()
    }

    /// Copy counts and conflicts from a finalized registry
    pub fn summarize_registry(&mut self, registry: &ExpressionRegistry) {
        self.expressions = registry.len();
        self.conflicts = registry
            .entries()
            .flat_map(|entry| {
                entry.conflicts.iter().map(move |conflict| ConflictReport {
                    identifier: entry.identifier.clone(),
                    canonical: entry.pseudocode().to_string(),
                    conflict: conflict.clone(),
                })
            })
            .collect();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct RunContext {
    pub config: ExtractorConfig,
    pub ig: IgConfig,
    pub grids: GridCache,
    pub registry: ExpressionRegistry,
    pub bundle: ResourceBundle,
    pub report: RunReport,
    /// Tables in the order they were emitted, for the overview page
    pub overview: Vec<OverviewRow>,
}

impl RunContext {
    pub fn new(config: ExtractorConfig, ig: IgConfig) -> Self {
        Self {
            config,
            ig,
            grids: GridCache::new(),
            registry: ExpressionRegistry::new(),
            bundle: ResourceBundle::new(),
            report: RunReport::default(),
            overview: Vec::new(),
        }
    }
}
