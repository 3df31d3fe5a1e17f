//! dtforge - decision table extractor
//!
//! Clinical decision tables are authored in `.xlsx` workbooks, several per
//! tab, each introduced by a "Decision ID" anchor. This library locates
//! the tables, walks their rows into a typed model and renders:
//!
//! - a DMN decision and an FSH PlanDefinition per table
//! - a CQL skeleton and a Library resource per tab
//! - a code system of every decision expression, value sets, output
//!   activities and an overview page, once per run
//!
//! # Example
//!
//! ```no_run
//! use dtforge::config::{ExtractorConfig, IgConfig};
//! use dtforge::context::RunContext;
//! use dtforge::pipeline;
//!
//! let mut ctx = RunContext::new(ExtractorConfig::default(), IgConfig::default());
//! pipeline::run(&mut ctx);
//! let written = pipeline::install(&mut ctx)?;
//!
//! println!("Tables: {}", ctx.report.tables_emitted());
//! println!("Files:  {}", written.len());
//! # Ok::<(), dtforge::error::DtError>(())
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod excel;
pub mod library;
pub mod pipeline;
pub mod text;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use context::{RunContext, RunReport};
pub use error::{DtError, DtResult};
pub use types::{CellValue, DecisionTable, InputDefinition, Rule, TableAnchor, TableKind};
