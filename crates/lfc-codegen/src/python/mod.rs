//! The Python target's reaction bridge.
//!
//! Reactions of the Python target are written in Python but scheduled by
//! the native runtime. For every federate this module produces:
//!
//! - a C source with the self structs, one invocation shim per reaction
//!   and the trigger-table initialization,
//! - a Python module holding the reactor classes and their instances,
//! - a build descriptor (`setup.py` plus its JSON form).
//!
//! Delay reactors and the top-level reactor of a federated program are
//! generated natively and never pass through the interpreter.

pub mod module;
pub mod network;
pub mod preamble;
pub mod reaction;
pub mod setup;
pub mod structs;

use lfc_types::model::ReactorClass;

/// Port struct shared by every port whose value is a Python object.
pub const GENERIC_PORT_TYPE: &str = "generic_port_instance_struct";
/// Port struct for ports carrying a token.
pub const GENERIC_PORT_TYPE_WITH_TOKEN: &str = "generic_port_instance_with_token_struct";
pub const GENERIC_ACTION_TYPE: &str = "generic_action_instance_struct";

/// Lowercase prefix of every C name derived from `class`.
pub fn c_prefix(class: &ReactorClass) -> String {
    class.name.to_lowercase()
}

/// `<class>_<name>_t`
pub fn alias_type(class: &ReactorClass, name: &str) -> String {
    format!("{}_{name}_t", c_prefix(class))
}

/// `<class>_self_t`
pub fn self_type(class: &ReactorClass) -> String {
    format!("{}_self_t", c_prefix(class))
}

/// Name of the Python module the C extension is built as.
pub fn extension_module(top_level_name: &str) -> String {
    format!("LinguaFranca{top_level_name}")
}
