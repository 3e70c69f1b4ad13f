//! Error types surfaced to scripts and to the host
//!
//! Scripts see three kinds: `MissingVariable`, `TypeMismatch` and
//! `UnknownTask`. The remaining variants only come out of the reference host
//! (expression evaluation, definition loading, flow execution).

use crate::values::ValKind;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// An asserting getter found no value for the key.
    #[error("{}", missing_message(key, message.as_deref()))]
    MissingVariable {
        key: String,
        message: Option<String>,
    },

    /// A value is present but cannot be coerced to the requested type.
    #[error("Variable '{key}' has type {actual}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: ValKind,
        actual: ValKind,
    },

    #[error("Task '{name}' is not registered")]
    UnknownTask { name: String },

    #[error("Failed to evaluate '{expression}': {message}")]
    Expression { expression: String, message: String },

    #[error("Flow '{name}' is not defined")]
    UnknownFlow { name: String },

    #[error("Script '{name}' is not registered")]
    UnknownScript { name: String },

    #[error("Invalid process definition: {message}")]
    Definition { message: String },

    /// A task proxy reported a failure of its own.
    #[error("Task '{name}' failed: {message}")]
    Task { name: String, message: String },
}

fn missing_message(key: &str, message: Option<&str>) -> String {
    match message {
        Some(msg) => msg.to_string(),
        None => format!("Variable '{}' is required", key),
    }
}

impl BridgeError {
    pub fn missing(key: impl Into<String>, message: Option<&str>) -> Self {
        BridgeError::MissingVariable {
            key: key.into(),
            message: message.map(str::to_string),
        }
    }

    pub fn mismatch(key: impl Into<String>, expected: ValKind, actual: ValKind) -> Self {
        BridgeError::TypeMismatch {
            key: key.into(),
            expected,
            actual,
        }
    }

    pub fn expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Expression {
            expression: expression.into(),
            message: message.into(),
        }
    }

    pub fn definition(message: impl Into<String>) -> Self {
        BridgeError::Definition {
            message: message.into(),
        }
    }

    /// Short machine-readable code, mirrors the variant name
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MissingVariable { .. } => "MissingVariable",
            BridgeError::TypeMismatch { .. } => "TypeMismatch",
            BridgeError::UnknownTask { .. } => "UnknownTask",
            BridgeError::Expression { .. } => "Expression",
            BridgeError::UnknownFlow { .. } => "UnknownFlow",
            BridgeError::UnknownScript { .. } => "UnknownScript",
            BridgeError::Definition { .. } => "Definition",
            BridgeError::Task { .. } => "Task",
        }
    }
}
