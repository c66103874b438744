use thiserror::Error;

/// Bugs in the field registry itself. Field names never come from users, so
/// any of these means the shipped tables are wrong.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("registry has no fields")]
    NoFields,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' is registered more than once")]
    DuplicateField(String),
    #[error("field '{name}' has an empty range: min {min} > max {max}")]
    InvalidRange { name: String, min: f64, max: f64 },
    #[error("default {default} of field '{name}' is outside its range [{min}, {max}]")]
    DefaultOutOfRange {
        name: String,
        default: f64,
        min: f64,
        max: f64,
    },
    #[error("integer field '{name}' has non-integral {what} {value}")]
    NonIntegral {
        name: String,
        what: &'static str,
        value: f64,
    },
}

/// Which side of a range a value fell off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Min => f.write_str("min"),
            Bound::Max => f.write_str("max"),
        }
    }
}

/// Submitted values that cannot form an input record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing value for field '{0}'")]
    MissingField(String),
    #[error("unrecognized field '{0}'")]
    UnknownField(String),
    #[error("field '{field}': '{raw}' is not a number")]
    InvalidNumber { field: String, raw: String },
    #[error("field '{field}': value {value} is not finite")]
    NotFinite { field: String, value: f64 },
    #[error("field '{field}': value {value} must be a whole number")]
    NotInteger { field: String, value: f64 },
    #[error("field '{field}': value {value} violates {bound} bound {limit}")]
    OutOfRange {
        field: String,
        value: f64,
        bound: Bound,
        limit: f64,
    },
}

impl ValidationError {
    /// Field the error is about.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField(f) | ValidationError::UnknownField(f) => f,
            ValidationError::InvalidNumber { field, .. }
            | ValidationError::NotFinite { field, .. }
            | ValidationError::NotInteger { field, .. }
            | ValidationError::OutOfRange { field, .. } => field,
        }
    }
}

/// Failures of the external model call.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("model from {path} is unavailable: {reason}")]
    ModelUnavailable { path: String, reason: String },
    #[error("model expects features {expected:?}, record has {actual:?}")]
    ShapeMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("model '{model}' failed: {source}")]
    Model {
        model: String,
        #[source]
        source: anyhow::Error,
    },
}
