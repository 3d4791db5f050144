use std::fmt;

use thiserror::Error;

/// Errors that abort generation for a file. Nothing is written when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(
        "{file}: ddprpc compiler requires that api_major_version and api_minor_version are set in the options"
    )]
    MissingVersion { file: String },

    #[error(
        "{file}: ddprpc compiler does not work with generic services, please set \"cc_generic_services = false\""
    )]
    GenericServices { file: String },

    #[error(transparent)]
    Conformance(#[from] ConformanceError),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("{path} would be generated more than once")]
    PathCollision { path: String },

    #[error("{0} is not part of the schema")]
    UnknownFile(String),

    #[error("failed to render {artifact}")]
    Render {
        artifact: String,
        #[source]
        source: fmt::Error,
    },
}

/// A method without the mandatory completion response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Service [{service}] {reason} (method {method})")]
pub struct ConformanceError {
    pub service: String,
    pub method: String,
    pub reason: String,
}

/// Advisory problem that only degrades one artifact; generation continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub artifact: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.artifact, self.message)
    }
}
