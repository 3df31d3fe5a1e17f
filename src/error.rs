use thiserror::Error;

pub type DtResult<T> = Result<T, DtError>;

#[derive(Error, Debug)]
pub enum DtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::XlsxError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sheet '{0}' not found")]
    MissingSheet(String),

    /// Anchor, header or required column not where the table layout requires it.
    #[error("Structural anomaly: {0}")]
    Structural(String),

    /// Row inputs cannot be aligned with the declared input definitions.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A table cannot be rendered, e.g. a rule without output text.
    #[error("Generation error: {0}")]
    Generation(String),
}
