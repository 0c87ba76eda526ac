//! Configuration error types.

use lfc_types::{Diagnostic, ErrorCode};
use thiserror::Error;

/// Errors raised while resolving a target declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No target property has this name.
    #[error("Unrecognized target property: '{0}'.")]
    UnknownProperty(String),

    /// No target has this name.
    #[error("Unrecognized target: '{0}'.")]
    UnknownTarget(String),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::UnknownProperty(_) => ErrorCode::UNKNOWN_PROPERTY,
            ConfigError::UnknownTarget(_) => ErrorCode::UNKNOWN_TARGET,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let subject = match self {
            ConfigError::UnknownProperty(name) | ConfigError::UnknownTarget(name) => name,
        };
        Diagnostic::error(self.code(), subject.as_str(), self.to_string())
    }
}

/// Config result type alias.
pub type ConfigResult<T> = Result<T, ConfigError>;
