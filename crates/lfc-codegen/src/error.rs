//! Codegen error types.

use lfc_types::model::SerializerTag;
use lfc_types::{Diagnostic, ErrorCode, Span};
use thiserror::Error;

/// Structural faults that stop generation for the enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// A reaction names a port or action the self struct has no field for.
    #[error("reaction {reaction} of reactor '{class}' refers to '{field}', which has no field in the self struct")]
    UnresolvedStructField {
        class: String,
        reaction: usize,
        field: String,
        /// Source location of the reaction.
        span: Option<Span>,
    },

    /// A connection crossing a federate boundary needs a serializer that
    /// is not available.
    #[error("no {serializer} serializer is available for the connection from '{from}' to '{to}'")]
    MissingSerializer {
        serializer: SerializerTag,
        from: String,
        to: String,
    },

    /// An action is bound to a mode missing from its owner's mode table.
    #[error("action '{action}' is bound to a mode its reactor does not declare")]
    UnresolvedMode { action: String, span: Option<Span> },

    /// An instance refers to a reactor class that does not exist.
    #[error("instance '{instance}' refers to an unknown reactor class")]
    UnknownReactorClass { instance: String },

    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

impl CodegenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CodegenError::UnresolvedStructField { .. } => ErrorCode::UNRESOLVED_STRUCT_FIELD,
            CodegenError::MissingSerializer { .. } => ErrorCode::MISSING_SERIALIZER,
            CodegenError::UnresolvedMode { .. } => ErrorCode::UNRESOLVED_MODE,
            CodegenError::UnknownReactorClass { .. } => ErrorCode::UNKNOWN_REACTOR_CLASS,
            CodegenError::Internal(_) => ErrorCode::INTERNAL,
        }
    }

    /// The reactor class, action, connection or instance the fault is
    /// attached to.
    pub fn subject(&self) -> String {
        match self {
            CodegenError::UnresolvedStructField { class, .. } => class.clone(),
            CodegenError::MissingSerializer { from, to, .. } => format!("{from} -> {to}"),
            CodegenError::UnresolvedMode { action, .. } => action.clone(),
            CodegenError::UnknownReactorClass { instance } => instance.clone(),
            CodegenError::Internal(_) => String::new(),
        }
    }

    /// Source location of the offending element, when the model has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CodegenError::UnresolvedStructField { span, .. } | CodegenError::UnresolvedMode { span, .. } => {
                *span
            }
            _ => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.code(), self.subject(), self.to_string());
        match self.span() {
            Some(span) => diagnostic.with_span(span),
            None => diagnostic,
        }
    }
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
