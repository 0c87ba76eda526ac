//! Compiler error types.

use std::path::PathBuf;

use lfc_config::Target;
use thiserror::Error;

/// Errors that stop a compilation before or after generation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The target is known but this compiler generates nothing for it.
    #[error("The {0} target is not supported by this code generator.")]
    UnsupportedTarget(Target),

    /// An artifact or manifest could not be written.
    #[error("could not write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest could not be serialized.
    #[error("could not serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Compiler result type alias.
pub type CompilerResult<T> = Result<T, CompileError>;
