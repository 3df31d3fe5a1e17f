//! Run configuration
//!
//! `IgConfig` is read from the implementation guide's `sushi-config.yaml`;
//! `ExtractorConfig` carries the paths and switches chosen on the command line.

use crate::error::{DtError, DtResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

/// DMN 1.5 model namespace
pub const DMN_NAMESPACE: &str = "https://www.omg.org/spec/DMN/20240513/MODEL/";

/// Implementation guide metadata used when rendering resources
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IgConfig {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_canonical")]
    pub canonical: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub publisher: Option<Publisher>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Publisher {
    pub name: Option<String>,
}

fn default_id() -> String {
    "smart.example".to_string()
}

fn default_name() -> String {
    "Example".to_string()
}

fn default_title() -> String {
    "Example Implementation Guide".to_string()
}

fn default_canonical() -> String {
    "http://example.org/ig".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl Default for IgConfig {
    fn default() -> Self {
        Self {
            id: default_id(),
            name: default_name(),
            title: default_title(),
            canonical: default_canonical(),
            version: default_version(),
            publisher: None,
        }
    }
}

impl IgConfig {
    /// Parse a sushi-config.yaml document
    pub fn from_yaml(content: &str) -> DtResult<Self> {
        let config: IgConfig = serde_yaml::from_str(content)?;
        config.canonical_url()?;
        Ok(config)
    }

    /// Load the config file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> DtResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "IG config not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn publisher_name(&self) -> &str {
        self.publisher
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("Self Published")
    }

    /// Canonical base without a trailing slash
    pub fn canonical_base(&self) -> &str {
        self.canonical.trim_end_matches('/')
    }

    pub fn canonical_url(&self) -> DtResult<Url> {
        Url::parse(self.canonical_base())
            .map_err(|e| DtError::Config(format!("invalid canonical '{}': {}", self.canonical, e)))
    }
}

/// How forward-fill treats cells in merged regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    /// Only blank cells inherit the value above
    Blank,
    /// Blank and dash cells inherit the value above
    #[default]
    BlankOrDash,
}

/// Settings for one extraction run
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub input_dir: PathBuf,
    pub cql_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Prefix of decision table ids, libraries and output activities
    pub dt_prefix: String,
    /// Id of the run-level code system
    pub dd_prefix: String,
    pub fill_policy: FillPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input/decision-logic"),
            cql_dir: PathBuf::from("input/cql"),
            output_dir: PathBuf::from("output"),
            dt_prefix: "DT".to_string(),
            dd_prefix: "DD".to_string(),
            fill_policy: FillPolicy::default(),
        }
    }
}
