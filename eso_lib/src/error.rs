//! Error types for the library layer.

use std::fmt;

/// Errors produced by the refresh pipeline, wrapping portal errors and
/// adding normalization, configuration, and sink failures.
#[derive(Debug)]
pub enum EsoError {
    /// An error from the portal client (login, form, or report).
    Api(eso_api::Error),
    /// A record carried a timestamp that could not be interpreted.
    Parse(String),
    /// Strict mode met a label outside the known categories.
    UnknownLabel(String),
    /// Several labels of one cycle resolve to the same statistic id.
    LabelCollision {
        statistic_id: String,
        labels: Vec<String>,
    },
    /// Missing or invalid configuration.
    Config(String),
    /// The statistics sink refused a series.
    Sink(String),
    /// JSON serialization failed.
    Serialization(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for EsoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "Portal error: {}", e),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::UnknownLabel(label) => write!(f, "Unknown series label: {}", label),
            Self::LabelCollision {
                statistic_id,
                labels,
            } => write!(
                f,
                "Series {} share statistic id {}",
                labels.join(", "),
                statistic_id
            ),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Sink(msg) => write!(f, "Sink error: {}", msg),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EsoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<eso_api::Error> for EsoError {
    fn from(e: eso_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<serde_json::Error> for EsoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<std::io::Error> for EsoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
