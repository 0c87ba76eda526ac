//! LFC target configuration.
//!
//! Targets, their reserved words and accepted properties, the typed
//! target-property system and the [`TargetConfig`] it produces.
//!
//! # Usage
//!
//! ```ignore
//! use lfc_config::{configure, CheckContext, Target};
//!
//! let configured = configure(Target::Python, &program.properties, &CheckContext::default());
//! if configured.diagnostics.has_errors() {
//!     // report and stop
//! }
//! ```

pub mod config;
pub mod error;
pub mod property;
pub mod target;
pub mod types;
mod validate;

pub use config::{
    BuildType, ClockSyncMode, ClockSyncOptions, CoordinationType, LogLevel, TargetConfig,
    TracingOptions,
};
pub use error::{ConfigError, ConfigResult};
pub use property::{TargetProperty, TARGET_PROPERTIES};
pub use target::{Target, TargetDescriptor};
pub use types::{CheckContext, PropertyType};
pub use validate::{apply_property, configure, configure_named, Configured};
