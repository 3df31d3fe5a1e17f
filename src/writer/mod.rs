//! Resource emitters and the in-memory resource bundle
//!
//! Every emitter renders into the `ResourceBundle`; nothing touches the
//! filesystem until `ResourceBundle::install` runs at the end of the run.

pub mod activity;
pub mod codesystem;
pub mod cql;
pub mod dmn;
pub mod fsh;
pub mod page;
pub mod plan;
pub mod xml;

use crate::error::DtResult;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Kind of generated resource, which decides its location in the output tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResourceKind {
    Dmn,
    PlanDefinition,
    Cql,
    Library,
    ValueSet,
    CodeSystem,
    ActivityDefinition,
    Page,
}

impl ResourceKind {
    pub fn directory(&self) -> &'static str {
        match self {
            ResourceKind::Dmn => "dmn",
            ResourceKind::PlanDefinition => "fsh/plandefinitions",
            ResourceKind::Cql => "cql",
            ResourceKind::Library => "fsh/libraries",
            ResourceKind::ValueSet => "fsh/valuesets",
            ResourceKind::CodeSystem => "fsh/codesystems",
            ResourceKind::ActivityDefinition => "fsh/activitydefinitions",
            ResourceKind::Page => "pagecontent",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ResourceKind::Dmn => "dmn",
            ResourceKind::Cql => "cql",
            ResourceKind::Page => "md",
            _ => "fsh",
        }
    }

    /// Path of a resource relative to the output directory
    pub fn relative_path(&self, id: &str) -> PathBuf {
        Path::new(self.directory()).join(format!("{}.{}", id, self.extension()))
    }
}

/// Generated resources keyed by kind and id, in insertion order
#[derive(Debug, Default)]
pub struct ResourceBundle {
    resources: IndexMap<(ResourceKind, String), String>,
}

impl ResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. A resource with the same kind and id is replaced.
    pub fn add(&mut self, kind: ResourceKind, id: impl Into<String>, content: impl Into<String>) {
        let id = id.into();
        debug!(?kind, id = %id, "adding resource");
        if self.resources.insert((kind, id.clone()), content.into()).is_some() {
            debug!(?kind, id = %id, "replaced existing resource");
        }
    }

    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<&str> {
        self.resources
            .get(&(kind, id.to_string()))
            .map(String::as_str)
    }

    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Ids of every resource of one kind
    pub fn ids(&self, kind: ResourceKind) -> Vec<&str> {
        self.resources
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Write every resource below `dir`, returning the written paths
    pub fn install(&self, dir: &Path) -> DtResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.resources.len());
        for ((kind, id), content) in &self.resources {
            let path = dir.join(kind.relative_path(id));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
            written.push(path);
        }
        info!(count = written.len(), dir = %dir.display(), "installed resources");
        Ok(written)
    }
}
