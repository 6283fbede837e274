//! Errors raised while building a model.
//!
//! Every fallible operation checks its input before touching the model,
//! so an `Err` always leaves the [Problem](crate::Problem) exactly as it was.

/// Represents an error in the structure of a model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A quadratic term or a nested quadratic function was given
    /// to a linear function or a linear constraint.
    InvalidShape(String),
    /// An argument breaks an invariant of the model: empty left-hand side,
    /// mismatched SOS1 weights, unordered bounds, conflicting variable definitions...
    InvalidArgument(String),
    /// A construct that the consumer of the model cannot express,
    /// such as a quadratic constraint handed to a linear solver.
    Unsupported(String),
}

impl ModelError {
    /// Returns a stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::InvalidShape(_) => "SHAPE_INVALID",
            ModelError::InvalidArgument(_) => "ARGUMENT_INVALID",
            ModelError::Unsupported(_) => "UNSUPPORTED",
        }
    }

    pub(crate) fn argument(message: impl Into<String>) -> Self {
        ModelError::InvalidArgument(message.into())
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InvalidShape(msg) => write!(f, "[{}] {}", self.code(), msg),
            ModelError::InvalidArgument(msg) => write!(f, "[{}] {}", self.code(), msg),
            ModelError::Unsupported(msg) => write!(f, "[{}] {}", self.code(), msg),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code() {
        let err = ModelError::InvalidShape("quadratic term in a linear constraint".into());
        let msg = err.to_string();
        assert!(msg.starts_with("[SHAPE_INVALID]"));
        assert!(msg.contains("quadratic term"));
    }

    #[test]
    fn codes() {
        assert_eq!(ModelError::argument("x").code(), "ARGUMENT_INVALID");
        assert_eq!(ModelError::Unsupported(String::new()).code(), "UNSUPPORTED");
    }
}
