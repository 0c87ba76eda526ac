//! Token/trigger lowering.
//!
//! Turns the actions and timers of a reactor instance into the trigger
//! metadata the runtime's event queue reads (offset, period, mode binding)
//! and, for actions whose payload travels in a token, into token
//! initializers registered with the end-of-step reclamation table.
//!
//! Iteration always follows declaration order, so the generated code names
//! triggers in the order they were written.

use serde::{Deserialize, Serialize};

use lfc_types::model::{
    token_element_type, ActionInstance, ClassId, FederateInstance, InstanceId, ModeId, Program,
    ReactorTree,
};
use lfc_types::{Span, TimeValue};

use crate::context::GenContext;
use crate::error::{CodegenError, CodegenResult};

/// What the runtime reads as "no minimum spacing".
pub const UNDEFINED_MIN_SPACING: &str = "-1";

// ══════════════════════════════════════════════════════════════════════════════
// References
// ══════════════════════════════════════════════════════════════════════════════

/// The variable holding an instance's self struct: `Main_a_b_self`.
pub fn self_ref(tree: &ReactorTree, instance: InstanceId) -> String {
    format!("{}_self", tree.full_name(instance).replace('.', "_"))
}

/// The trigger struct of `name` inside the self struct `self_ref`.
pub fn trigger_ref(self_ref: &str, name: &str) -> String {
    format!("{self_ref}->_lf__{name}")
}

// ══════════════════════════════════════════════════════════════════════════════
// Trigger metadata
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Spacing(TimeValue),
    /// No minimum spacing was declared.
    Undefined,
}

impl Period {
    pub fn to_runtime_expr(&self) -> String {
        match self {
            Period::Spacing(t) => t.to_runtime_expr(),
            Period::Undefined => UNDEFINED_MIN_SPACING.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeBinding {
    /// Entry `index` of the mode table of the reactor held in `owner`.
    Mode { owner: String, index: usize },
    Unbound,
}

impl ModeBinding {
    pub fn to_runtime_expr(&self) -> String {
        match self {
            ModeBinding::Mode { owner, index } => format!("&{owner}->_lf__modes[{index}]"),
            ModeBinding::Unbound => "NULL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Action,
    Timer,
}

/// Lowered runtime metadata of one action or timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMetadata {
    pub kind: TriggerKind,
    pub name: String,
    /// Dotted path, e.g. `Main.a.act`.
    pub full_name: String,
    /// Trigger struct reference, e.g. `Main_a_self->_lf__act`.
    pub trigger: String,
    pub offset: TimeValue,
    pub period: Period,
    pub mode: ModeBinding,
    pub is_token_type: bool,
}

impl TriggerMetadata {
    /// The comment and the offset, period and mode assignments, in that order.
    pub fn initializer(&self) -> Vec<String> {
        let kind = match self.kind {
            TriggerKind::Action => "action",
            TriggerKind::Timer => "timer",
        };
        vec![
            format!("// Initializing {kind} {}", self.full_name),
            format!("{}.offset = {};", self.trigger, self.offset.to_runtime_expr()),
            format!("{}.period = {};", self.trigger, self.period.to_runtime_expr()),
            format!("{}.mode = {};", self.trigger, self.mode.to_runtime_expr()),
        ]
    }
}

fn mode_binding(
    tree: &ReactorTree,
    mode: Option<ModeId>,
    subject: &str,
    span: Option<Span>,
) -> CodegenResult<ModeBinding> {
    let Some(mode) = mode else {
        return Ok(ModeBinding::Unbound);
    };
    let index = tree
        .mode_index(mode)
        .ok_or_else(|| CodegenError::UnresolvedMode {
            action: subject.to_string(),
            span,
        })?;
    Ok(ModeBinding::Mode {
        owner: self_ref(tree, tree.mode(mode).owner),
        index,
    })
}

/// Actions of `instance` that `federate` generates, excluding shutdown.
fn federate_actions<'p>(
    program: &'p Program,
    instance: InstanceId,
    federate: &'p FederateInstance,
) -> impl Iterator<Item = &'p ActionInstance> + 'p {
    let tree = &program.tree;
    tree.get(instance)
        .actions
        .iter()
        .filter(move |a| !a.is_shutdown && federate.contains_action(tree, instance, &a.name))
}

/// Lower every action of `instance` that belongs to `federate`.
pub fn lower_actions(
    program: &Program,
    instance: InstanceId,
    federate: &FederateInstance,
) -> CodegenResult<Vec<TriggerMetadata>> {
    let tree = &program.tree;
    let owner = self_ref(tree, instance);
    let prefix = tree.full_name(instance);
    federate_actions(program, instance, federate)
        .map(|action| {
            let full_name = format!("{prefix}.{}", action.name);
            Ok(TriggerMetadata {
                kind: TriggerKind::Action,
                name: action.name.clone(),
                trigger: trigger_ref(&owner, &action.name),
                offset: action.min_delay,
                period: action
                    .min_spacing
                    .map_or(Period::Undefined, Period::Spacing),
                mode: mode_binding(tree, action.mode, &full_name, action.span)?,
                is_token_type: action.is_token_type,
                full_name,
            })
        })
        .collect()
}

/// Lower every timer of `instance`; a timer without period fires once.
pub fn lower_timers(
    program: &Program,
    instance: InstanceId,
    federate: &FederateInstance,
) -> CodegenResult<Vec<TriggerMetadata>> {
    let tree = &program.tree;
    if !federate.contains_instance(tree, instance) {
        return Ok(Vec::new());
    }
    let owner = self_ref(tree, instance);
    let prefix = tree.full_name(instance);
    tree.get(instance)
        .timers
        .iter()
        .map(|timer| {
            let full_name = format!("{prefix}.{}", timer.name);
            Ok(TriggerMetadata {
                kind: TriggerKind::Timer,
                name: timer.name.clone(),
                trigger: trigger_ref(&owner, &timer.name),
                offset: timer.offset,
                period: Period::Spacing(timer.period.unwrap_or(TimeValue::ZERO)),
                mode: mode_binding(tree, timer.mode, &full_name, None)?,
                is_token_type: false,
                full_name,
            })
        })
        .collect()
}

/// Offset, period and mode initializers for the actions of `instance`.
/// Actions outside `federate` produce nothing.
pub fn generate_initializers(
    program: &Program,
    instance: InstanceId,
    federate: &FederateInstance,
) -> CodegenResult<Vec<String>> {
    Ok(lower_actions(program, instance, federate)?
        .iter()
        .flat_map(TriggerMetadata::initializer)
        .collect())
}

/// Initializers for the timers of `instance`.
pub fn generate_timer_initializers(
    program: &Program,
    instance: InstanceId,
    federate: &FederateInstance,
) -> CodegenResult<Vec<String>> {
    Ok(lower_timers(program, instance, federate)?
        .iter()
        .flat_map(TriggerMetadata::initializer)
        .collect())
}

// ══════════════════════════════════════════════════════════════════════════════
// Tokens
// ══════════════════════════════════════════════════════════════════════════════

/// Create the reference token of an action and register it for
/// end-of-step reclamation. The token is never freed by ordinary
/// reference counting, so the trigger always holds a valid token.
pub fn generate_token_initializer(self_ref: &str, action_name: &str, payload_size: &str) -> String {
    let trigger = trigger_ref(self_ref, action_name);
    [
        format!("{trigger}.token = _lf_create_token({payload_size});"),
        format!("{trigger}.status = absent;"),
        format!("_lf_tokens_with_ref_count[_lf_tokens_with_ref_count_count].token = &{trigger}.token;"),
        format!("_lf_tokens_with_ref_count[_lf_tokens_with_ref_count_count].status = &{trigger}.status;"),
        "_lf_tokens_with_ref_count[_lf_tokens_with_ref_count_count++].reset_is_present = true;".to_string(),
    ]
    .join("\n")
}

/// `sizeof` of the element a token-carrying action transports. Untyped
/// payloads are interpreter objects.
pub fn payload_size(action: &ActionInstance) -> String {
    match action.payload_type.as_deref() {
        Some(t) if action.is_token_type => format!("sizeof({})", token_element_type(t)),
        Some(t) => format!("sizeof({})", t.trim()),
        None => "sizeof(PyObject*)".to_string(),
    }
}

/// Token initializers for every token-carrying action of `instance` in
/// `federate`, registering each token in the context's table once.
pub fn generate_token_initializers(
    ctx: &mut GenContext<'_>,
    program: &Program,
    instance: InstanceId,
    federate: &FederateInstance,
) -> Vec<String> {
    let owner = self_ref(&program.tree, instance);
    let mut code = Vec::new();
    for action in federate_actions(program, instance, federate).filter(|a| a.is_token_type) {
        if ctx.tokens.register(&trigger_ref(&owner, &action.name)) {
            code.push(generate_token_initializer(
                &owner,
                &action.name,
                &payload_size(action),
            ));
        }
    }
    code
}

// ══════════════════════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════════════════════

/// Self-struct fields and constructor statements for the actions of
/// `class` that `federate` generates.
pub struct ActionDeclarations {
    pub fields: Vec<String>,
    pub constructor: Vec<String>,
}

/// Whether `federate` generates action `name` of `class`. Only the main
/// reactor of a federated program splits its actions between federates.
pub fn class_contains_action(
    program: &Program,
    class: ClassId,
    federate: &FederateInstance,
    name: &str,
) -> bool {
    let root = program.tree.root();
    if program.tree.get(root).class == class {
        federate.contains_action(&program.tree, root, name)
    } else {
        true
    }
}

pub fn generate_action_declarations(
    program: &Program,
    class: ClassId,
    federate: &FederateInstance,
    struct_type: impl Fn(&str) -> String,
) -> ActionDeclarations {
    let mut decls = ActionDeclarations {
        fields: Vec::new(),
        constructor: Vec::new(),
    };
    for action in &program.class(class).actions {
        if !class_contains_action(program, class, federate, &action.name) {
            continue;
        }
        let name = &action.name;
        decls
            .fields
            .push(format!("{} _lf_{name};", struct_type(name)));
        decls
            .constructor
            .push(format!("self->_lf_{name}.trigger = &self->_lf__{name};"));
    }
    decls
}
