//! LFC code generator: lowers a resolved reactor program into the sources
//! the native runtime and the Python bridge need.
//!
//! # Architecture
//!
//! ```text
//! Program + TargetConfig
//!     → trigger lowering (offset, period, mode binding, tokens)
//!     → Python bridge (self structs, reaction shims, Python module, setup)
//!     → per-federate artifacts + manifest
//! ```
//!
//! Generation state lives in a [`GenContext`] created per federate, so
//! federates never share token tables or configuration. Structural faults
//! ([`CodegenError`]) stop the federate they occur in; soft degradations
//! are recorded as warnings on the context and generation continues.

pub mod builder;
pub mod context;
pub mod error;
pub mod federate;
pub mod python;
pub mod tools;
pub mod trigger;

pub use context::{GenContext, TokenEntry, TokenTable};
pub use error::{CodegenError, CodegenResult};
pub use federate::{
    generate_federate, is_generated_target, Artifact, FederateArtifacts, FederateBuilder, Manifest,
    ManifestEntry,
};
pub use tools::{FixedTools, SearchPath, ToolLocator};
pub use trigger::{
    generate_initializers, generate_token_initializer, ModeBinding, Period, TriggerMetadata,
    UNDEFINED_MIN_SPACING,
};
