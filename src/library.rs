//! Lookup of hand-written CQL definitions
//!
//! Emitters only see `DefinitionLookup`. `CqlCorpus` is the regex-based
//! implementation that scans `.cql` sources for `define "<name>": <body>`.

use crate::error::DtResult;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// A definition found in an existing logic source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExistingDefinition {
    /// Name of the file the definition was found in
    pub source: String,
    /// Complete `define` statement
    pub body: String,
}

pub trait DefinitionLookup {
    /// Every existing definition of `identifier`, in source order
    fn lookup(&self, identifier: &str) -> Vec<ExistingDefinition>;
}

/// Lookup that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl DefinitionLookup for NoDefinitions {
    fn lookup(&self, _identifier: &str) -> Vec<ExistingDefinition> {
        Vec::new()
    }
}

/// In-memory set of CQL sources
#[derive(Debug, Clone, Default)]
pub struct CqlCorpus {
    sources: Vec<(String, String)>,
}

impl CqlCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.sources.push((name.into(), content.into()));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Read every `.cql` file of a directory, skipping generated libraries
    /// whose file name starts with `generated_prefix`. A missing directory
    /// yields an empty corpus.
    pub fn load_dir(dir: &Path, generated_prefix: &str) -> DtResult<Self> {
        let mut corpus = Self::new();
        if !dir.is_dir() {
            info!(dir = %dir.display(), "no CQL directory, existing definitions will not be linked");
            return Ok(corpus);
        }

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("cql")))
            .collect();
        paths.sort();

        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !generated_prefix.is_empty() && name.starts_with(generated_prefix) {
                debug!(file = %name, "ignoring generated library");
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(content) => corpus.add_source(name, content),
                Err(e) => warn!(file = %path.display(), error = %e, "could not read CQL file"),
            }
        }
        info!(files = corpus.len(), "loaded CQL corpus");
        Ok(corpus)
    }

    fn pattern(identifier: &str) -> Option<Regex> {
        let pattern = format!(
            r#"(?ims)(^define\s+['"]{}['"]\s*:.*?)(?:/\*|^define\b|\z)"#,
            regex::escape(identifier)
        );
        match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(identifier, error = %e, "could not build definition pattern");
                None
            }
        }
    }
}

impl DefinitionLookup for CqlCorpus {
    fn lookup(&self, identifier: &str) -> Vec<ExistingDefinition> {
        let Some(re) = Self::pattern(identifier) else {
            return Vec::new();
        };
        self.sources
            .iter()
            .filter_map(|(source, content)| {
                let body = re.captures(content)?.get(1)?.as_str().trim();
                (!body.is_empty()).then(|| ExistingDefinition {
                    source: source.clone(),
                    body: body.to_string(),
                })
            })
            .collect()
    }
}
