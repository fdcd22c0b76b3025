//! The `ModelingError` categories of §7: every public `Session` operation
//! returns `ModelingResult<T>` rather than throwing across the API boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// UI-facing hints attached to a failure: a human summary, an actionable
/// suggestion, and the parameter names a form should highlight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorHints {
    pub summary: String,
    pub suggestion: Option<String>,
    pub related_params: Vec<String>,
}

impl ErrorHints {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            suggestion: None,
            related_params: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.related_params.push(param.into());
        self
    }
}

/// §7 failure categories and their policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    InvalidInput,
    GeometryError,
    TopologyError,
    ValidationError,
    HealingError,
    Unsupported,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::InvalidInput => "invalidInput",
            ErrorCategory::GeometryError => "geometryError",
            ErrorCategory::TopologyError => "topologyError",
            ErrorCategory::ValidationError => "validationError",
            ErrorCategory::HealingError => "healingError",
            ErrorCategory::Unsupported => "unsupported",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A categorised, user-presentable failure. Never thrown — always returned
/// as the `Err` side of `ModelingResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelingError {
    pub category: ErrorCategory,
    pub message: String,
    pub hints: ErrorHints,
}

impl fmt::Display for ModelingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for ModelingError {}

impl ModelingError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            hints: ErrorHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: ErrorHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidInput, message)
    }

    pub fn geometry_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::GeometryError, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unsupported, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, message)
    }
}

impl From<solidtype_feature_engine::types::EngineError> for ModelingError {
    fn from(e: solidtype_feature_engine::types::EngineError) -> Self {
        use solidtype_feature_engine::types::EngineError as E;
        match &e {
            E::FeatureNotFound { .. } | E::SketchNotFound { .. } | E::ProfileOutOfRange { .. } => {
                ModelingError::new(ErrorCategory::InvalidInput, e.to_string())
            }
            E::ResolutionFailed { .. } => ModelingError::new(ErrorCategory::GeometryError, e.to_string())
                .with_hints(ErrorHints::new("A referenced face or edge could not be found.")
                    .with_suggestion("Check that the feature producing this geometry still exists.")),
            E::KernelError(_) => ModelingError::new(ErrorCategory::Internal, e.to_string()),
            E::OpError(op_err) => map_op_error(op_err, e.to_string()),
            E::RebuildFailed { .. } => ModelingError::new(ErrorCategory::TopologyError, e.to_string()),
        }
    }
}

fn map_op_error(op_err: &solidtype_modeling_ops::OpError, message: String) -> ModelingError {
    use solidtype_modeling_ops::OpError;
    match op_err {
        OpError::InsufficientProfile { .. } => ModelingError::new(ErrorCategory::InvalidInput, message)
            .with_hints(ErrorHints::new("The profile does not have enough points to build this feature.")
                .with_param("profile")),
        OpError::Operation(_) => ModelingError::new(ErrorCategory::GeometryError, message),
        OpError::Boolean(_) => ModelingError::new(ErrorCategory::TopologyError, message)
            .with_hints(ErrorHints::new("The boolean operation could not produce a valid body.")),
        OpError::Invalid { .. } => ModelingError::new(ErrorCategory::TopologyError, message)
            .with_hints(ErrorHints::new("Check that profile edges are not collinear")
                .with_param("profile")),
        OpError::NotFound(_) => ModelingError::new(ErrorCategory::InvalidInput, message),
        OpError::Unsupported(_) => ModelingError::new(ErrorCategory::Unsupported, message),
    }
}

/// `Result<Outcome<T>, ModelingError>`: success carries optional non-fatal
/// warnings alongside the value (§7: "Warnings ... surface things like short
/// edges, slivers below tolerance ... They do not change the produced body.").
pub type ModelingResult<T> = Result<Outcome<T>, ModelingError>;

#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self { value, warnings: Vec::new() }
    }

    pub fn with_warnings(value: T, warnings: Vec<String>) -> Self {
        Self { value, warnings }
    }
}
