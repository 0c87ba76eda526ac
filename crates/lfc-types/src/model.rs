//! The resolved reactor model consumed by the generator.
//!
//! The parser and resolver (not part of this workspace) hand over a
//! [`Program`]: reactor classes, the instantiated reactor tree with timing
//! parameters already resolved, federate assignments and the connections
//! that cross federate boundaries.
//!
//! Instances live in an arena ([`ReactorTree`]) and refer to each other by
//! index. Every `Vec` in this module preserves declaration order; the
//! generator depends on that order.

use serde::{Deserialize, Serialize};

use crate::element::KeyValuePair;
use crate::time::TimeValue;
use crate::Span;

/// Substring marking the synthetic reactor class injected for `after` delays.
pub const GEN_DELAY_CLASS_NAME: &str = "_lf_GenDelay";

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FederateId(pub usize);

// ══════════════════════════════════════════════════════════════════════════════
// Program
// ══════════════════════════════════════════════════════════════════════════════

/// A fully resolved program, ready for code generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Base name of the generated files (the `.lf` file stem).
    pub name: String,
    /// Name of the target as written in the `target` declaration.
    pub target: String,
    /// Raw `target` declaration properties, in source order.
    pub properties: Vec<KeyValuePair>,
    /// Target-language preambles declared at file level.
    pub preambles: Vec<String>,
    pub classes: Vec<ReactorClass>,
    pub tree: ReactorTree,
    /// Federates in declaration order. A non-federated program has exactly
    /// one federate for which [`FederateInstance::is_singleton`] holds.
    pub federates: Vec<FederateInstance>,
    /// Connections that cross a federate boundary.
    pub network_connections: Vec<NetworkConnection>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> &ReactorClass {
        &self.classes[id.0]
    }

    pub fn class_of(&self, instance: InstanceId) -> &ReactorClass {
        self.class(self.tree.get(instance).class)
    }

    pub fn is_federated(&self) -> bool {
        self.federates.iter().any(|f| !f.is_singleton)
    }

    /// Look up a class by name.
    pub fn class_by_name(&self, name: &str) -> Option<(ClassId, &ReactorClass)> {
        self.classes
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
            .map(|(i, c)| (ClassId(i), c))
    }

    pub fn federate(&self, id: FederateId) -> &FederateInstance {
        &self.federates[id.0]
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Reactor classes
// ══════════════════════════════════════════════════════════════════════════════

/// `reactor Name { ... }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactorClass {
    pub name: String,
    pub parameters: Vec<ParameterDecl>,
    pub state_vars: Vec<StateVarDecl>,
    pub inputs: Vec<PortDecl>,
    pub outputs: Vec<PortDecl>,
    pub actions: Vec<ActionDecl>,
    pub timers: Vec<String>,
    /// Reactions in declaration order; the index is the reaction's priority.
    pub reactions: Vec<Reaction>,
    /// Names of the class's modes, in declaration order.
    pub modes: Vec<String>,
    pub preambles: Vec<String>,
    pub is_main: bool,
    pub is_federated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl ReactorClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this is the synthetic delay class injected for `after`.
    pub fn is_delay_class(&self) -> bool {
        self.name.contains(GEN_DELAY_CLASS_NAME)
    }

    pub fn input(&self, name: &str) -> Option<&PortDecl> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&PortDecl> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn port(&self, name: &str) -> Option<&PortDecl> {
        self.input(name).or_else(|| self.output(name))
    }

    pub fn action(&self, name: &str) -> Option<&ActionDecl> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    /// Default value as target-language source text.
    pub default: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVarDecl {
    pub name: String,
    /// Initial value as target-language source text; `None` means `None`.
    pub init: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDecl {
    pub name: String,
    /// Declared type, if any (`int`, `char*`, `int[]`).
    pub type_name: Option<String>,
    /// Width for multiports, `None` for a single port.
    pub width: Option<u32>,
}

impl PortDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            width: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::new(name)
        }
    }

    /// Dynamically sized payloads are carried by reference-counted tokens.
    pub fn is_token_type(&self) -> bool {
        is_token_type(self.type_name.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOrigin {
    Logical,
    Physical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDecl {
    pub name: String,
    pub origin: ActionOrigin,
    pub type_name: Option<String>,
}

impl ActionDecl {
    pub fn logical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: ActionOrigin::Logical,
            type_name: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn is_token_type(&self) -> bool {
        is_token_type(self.type_name.as_deref())
    }
}

/// Whether a declared type denotes a dynamically sized payload (`T*`, `T[]`).
pub fn is_token_type(type_name: Option<&str>) -> bool {
    type_name.is_some_and(|t| {
        let t = t.trim();
        t.ends_with('*') || t.ends_with("[]")
    })
}

/// The element type of a token type: `int[]` → `int`, `char*` → `char`.
pub fn token_element_type(type_name: &str) -> &str {
    let t = type_name.trim();
    t.strip_suffix("[]")
        .or_else(|| t.strip_suffix('*'))
        .unwrap_or(t)
        .trim()
}

/// A reference to a port or action, possibly of a contained reactor
/// (`c.out`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarRef {
    pub container: Option<String>,
    pub variable: String,
}

impl VarRef {
    pub fn local(variable: impl Into<String>) -> Self {
        Self {
            container: None,
            variable: variable.into(),
        }
    }

    pub fn contained(container: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            container: Some(container.into()),
            variable: variable.into(),
        }
    }

    /// Source-level spelling: `out` or `c.out`.
    pub fn to_source(&self) -> String {
        match &self.container {
            Some(c) => format!("{c}.{}", self.variable),
            None => self.variable.clone(),
        }
    }

    /// Identifier-safe spelling: `out` or `c_out`.
    pub fn to_ident(&self) -> String {
        match &self.container {
            Some(c) => format!("{c}_{}", self.variable),
            None => self.variable.clone(),
        }
    }
}

/// What triggers a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRef {
    Startup,
    Shutdown,
    Var(VarRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub delay: TimeValue,
    pub body: String,
}

/// `reaction(triggers) sources -> effects {= body =}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reaction {
    pub triggers: Vec<TriggerRef>,
    pub sources: Vec<VarRef>,
    pub effects: Vec<VarRef>,
    /// Body in the language the reaction is written in.
    pub body: String,
    pub deadline: Option<Deadline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Reaction {
    /// Every port/action the reaction can touch, in trigger, source, effect
    /// order, without duplicates.
    pub fn variables(&self) -> Vec<&VarRef> {
        let mut out: Vec<&VarRef> = Vec::new();
        let triggers = self.triggers.iter().filter_map(|t| match t {
            TriggerRef::Var(v) => Some(v),
            _ => None,
        });
        for v in triggers.chain(&self.sources).chain(&self.effects) {
            if !out.contains(&v) {
                out.push(v);
            }
        }
        out
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instances
// ══════════════════════════════════════════════════════════════════════════════

/// One timer or action of a reactor instance, with resolved timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstance {
    pub name: String,
    pub min_delay: TimeValue,
    pub min_spacing: Option<TimeValue>,
    pub is_shutdown: bool,
    /// Mode the action is exclusively bound to, if any.
    pub mode: Option<ModeId>,
    /// Payload is dynamically sized and travels in a token.
    pub is_token_type: bool,
    pub payload_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl ActionInstance {
    pub fn new(name: impl Into<String>, min_delay: TimeValue) -> Self {
        Self {
            name: name.into(),
            min_delay,
            min_spacing: None,
            is_shutdown: false,
            mode: None,
            is_token_type: false,
            payload_type: None,
            span: None,
        }
    }

    /// Instance of a declared action: token-ness follows the declared type.
    pub fn from_decl(decl: &ActionDecl, min_delay: TimeValue) -> Self {
        Self {
            is_token_type: decl.is_token_type(),
            payload_type: decl.type_name.clone(),
            ..Self::new(decl.name.clone(), min_delay)
        }
    }

    pub fn with_min_spacing(mut self, spacing: TimeValue) -> Self {
        self.min_spacing = Some(spacing);
        self
    }

    pub fn in_mode(mut self, mode: ModeId) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_token_payload(mut self, payload_type: impl Into<String>) -> Self {
        self.is_token_type = true;
        self.payload_type = Some(payload_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerInstance {
    pub name: String,
    pub offset: TimeValue,
    pub period: Option<TimeValue>,
    pub mode: Option<ModeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeInstance {
    pub name: String,
    /// The reactor whose mode table holds this mode.
    pub owner: InstanceId,
}

/// One node of the reactor composition tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorInstance {
    pub name: String,
    pub class: ClassId,
    pub parent: Option<InstanceId>,
    pub children: Vec<InstanceId>,
    pub actions: Vec<ActionInstance>,
    pub timers: Vec<TimerInstance>,
    /// This reactor's mode table, in declaration order.
    pub modes: Vec<ModeId>,
    /// Parameter overrides given at instantiation, as source text.
    pub parameter_values: Vec<(String, String)>,
    pub bank_index: usize,
}

/// Arena holding every reactor instance and mode of a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorTree {
    instances: Vec<ReactorInstance>,
    modes: Vec<ModeInstance>,
}

impl ReactorTree {
    /// A tree holding only the main reactor.
    pub fn new(root_name: impl Into<String>, class: ClassId) -> Self {
        Self {
            instances: vec![ReactorInstance {
                name: root_name.into(),
                class,
                parent: None,
                children: Vec::new(),
                actions: Vec::new(),
                timers: Vec::new(),
                modes: Vec::new(),
                parameter_values: Vec::new(),
                bank_index: 0,
            }],
            modes: Vec::new(),
        }
    }

    pub fn root(&self) -> InstanceId {
        InstanceId(0)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instantiate `class` as the last child of `parent`.
    pub fn add_child(&mut self, parent: InstanceId, name: impl Into<String>, class: ClassId) -> InstanceId {
        let id = InstanceId(self.instances.len());
        self.instances.push(ReactorInstance {
            name: name.into(),
            class,
            parent: Some(parent),
            children: Vec::new(),
            actions: Vec::new(),
            timers: Vec::new(),
            modes: Vec::new(),
            parameter_values: Vec::new(),
            bank_index: 0,
        });
        self.instances[parent.0].children.push(id);
        id
    }

    /// Append a mode to `owner`'s mode table.
    pub fn add_mode(&mut self, owner: InstanceId, name: impl Into<String>) -> ModeId {
        let id = ModeId(self.modes.len());
        self.modes.push(ModeInstance {
            name: name.into(),
            owner,
        });
        self.instances[owner.0].modes.push(id);
        id
    }

    pub fn get(&self, id: InstanceId) -> &ReactorInstance {
        &self.instances[id.0]
    }

    pub fn get_mut(&mut self, id: InstanceId) -> &mut ReactorInstance {
        &mut self.instances[id.0]
    }

    pub fn mode(&self, id: ModeId) -> &ModeInstance {
        &self.modes[id.0]
    }

    /// Position of `mode` in its owner's mode table.
    pub fn mode_index(&self, mode: ModeId) -> Option<usize> {
        let owner = self.modes.get(mode.0)?.owner;
        self.instances
            .get(owner.0)?
            .modes
            .iter()
            .position(|m| *m == mode)
    }

    /// Dotted path from the root: `Main.a.b`.
    pub fn full_name(&self, id: InstanceId) -> String {
        let mut parts = vec![self.get(id).name.as_str()];
        let mut cur = self.get(id).parent;
        while let Some(p) = cur {
            parts.push(self.get(p).name.as_str());
            cur = self.get(p).parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// The child of the root this instance lives under, or `None` for the root.
    pub fn top_level_ancestor(&self, id: InstanceId) -> Option<InstanceId> {
        let mut cur = id;
        loop {
            match self.get(cur).parent {
                None => return None,
                Some(p) if self.get(p).parent.is_none() => return Some(cur),
                Some(p) => cur = p,
            }
        }
    }

    /// Depth-first pre-order traversal in declaration order.
    pub fn preorder(&self) -> Vec<InstanceId> {
        let mut out = Vec::with_capacity(self.instances.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.get(id).children.iter().rev().copied());
        }
        out
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Federation
// ══════════════════════════════════════════════════════════════════════════════

/// One independently compiled and launched process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederateInstance {
    pub id: FederateId,
    pub name: String,
    /// Top-level instances (children of the main reactor) mapped here.
    pub instances: Vec<InstanceId>,
    /// Actions of the main reactor that receive network messages for this
    /// federate.
    pub network_actions: Vec<String>,
    /// Reactions of the main reactor (by index) that belong to this federate.
    pub network_reactions: Vec<usize>,
    /// The single federate of a non-federated program contains everything.
    pub is_singleton: bool,
    pub host: Option<String>,
}

impl FederateInstance {
    /// The federate of an unfederated program.
    pub fn singleton() -> Self {
        Self {
            id: FederateId(0),
            name: String::new(),
            instances: Vec::new(),
            network_actions: Vec::new(),
            network_reactions: Vec::new(),
            is_singleton: true,
            host: None,
        }
    }

    pub fn new(id: usize, name: impl Into<String>, instances: Vec<InstanceId>) -> Self {
        Self {
            id: FederateId(id),
            name: name.into(),
            instances,
            network_actions: Vec::new(),
            network_reactions: Vec::new(),
            is_singleton: false,
            host: None,
        }
    }

    /// Whether `instance` is generated in this federate. The main reactor
    /// is part of every federate.
    pub fn contains_instance(&self, tree: &ReactorTree, instance: InstanceId) -> bool {
        if self.is_singleton {
            return true;
        }
        match tree.top_level_ancestor(instance) {
            None => true,
            Some(top) => self.instances.contains(&top),
        }
    }

    /// Whether the action `name` of `owner` is generated in this federate.
    pub fn contains_action(&self, tree: &ReactorTree, owner: InstanceId, name: &str) -> bool {
        if self.is_singleton {
            return true;
        }
        if tree.get(owner).parent.is_none() {
            return self.network_actions.iter().any(|a| a == name);
        }
        self.contains_instance(tree, owner)
    }

    /// Whether reaction `index` of `owner` is generated in this federate.
    pub fn contains_reaction(&self, tree: &ReactorTree, owner: InstanceId, index: usize) -> bool {
        if self.is_singleton {
            return true;
        }
        if tree.get(owner).parent.is_none() {
            return self.network_reactions.contains(&index);
        }
        self.contains_instance(tree, owner)
    }
}

/// Serializer selected for a connection that crosses a federate boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerTag {
    /// The target language's own encoding (pickle for Python).
    Native,
    /// Protocol buffers.
    Proto,
    /// ROS 2 message serialization.
    Ros2,
}

impl std::fmt::Display for SerializerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Proto => write!(f, "proto"),
            Self::Ros2 => write!(f, "ros2"),
        }
    }
}

/// A connection between ports of two different federates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConnection {
    pub sending_federate: FederateId,
    pub sending_port: VarRef,
    pub receiving_federate: FederateId,
    pub receiving_port: VarRef,
    /// Port id at the receiving federate.
    pub receiving_port_id: usize,
    /// Network input action in the receiving federate's main reactor.
    pub receiving_action: String,
    pub type_name: Option<String>,
    pub is_physical: bool,
    pub delay: Option<TimeValue>,
    /// `None` sends the native value unchanged.
    pub serializer: Option<SerializerTag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_level_tree() -> (ReactorTree, InstanceId, InstanceId, InstanceId) {
        let mut tree = ReactorTree::new("Main", ClassId(0));
        let a = tree.add_child(tree.root(), "a", ClassId(1));
        let b = tree.add_child(tree.root(), "b", ClassId(1));
        let inner = tree.add_child(a, "inner", ClassId(2));
        (tree, a, b, inner)
    }

    #[test]
    fn full_name_and_ancestor() {
        let (tree, a, _, inner) = three_level_tree();
        assert_eq!(tree.full_name(inner), "Main.a.inner");
        assert_eq!(tree.top_level_ancestor(inner), Some(a));
        assert_eq!(tree.top_level_ancestor(a), Some(a));
        assert_eq!(tree.top_level_ancestor(tree.root()), None);
    }

    #[test]
    fn preorder_follows_declaration_order() {
        let (tree, a, b, inner) = three_level_tree();
        assert_eq!(tree.preorder(), vec![tree.root(), a, inner, b]);
    }

    #[test]
    fn mode_index_among_siblings() {
        let (mut tree, a, _, _) = three_level_tree();
        let m0 = tree.add_mode(a, "Idle");
        let m1 = tree.add_mode(a, "Active");
        assert_eq!(tree.mode_index(m0), Some(0));
        assert_eq!(tree.mode_index(m1), Some(1));
        assert_eq!(tree.mode_index(ModeId(99)), None);
    }

    #[test]
    fn federate_containment() {
        let (tree, a, b, inner) = three_level_tree();
        let mut fed = FederateInstance::new(0, "fa", vec![a]);
        fed.network_actions.push("net_in".into());
        assert!(fed.contains_instance(&tree, inner));
        assert!(!fed.contains_instance(&tree, b));
        assert!(fed.contains_action(&tree, tree.root(), "net_in"));
        assert!(!fed.contains_action(&tree, tree.root(), "other"));
        assert!(FederateInstance::singleton().contains_action(&tree, b, "x"));
    }

    #[test]
    fn token_types() {
        assert!(is_token_type(Some("int[]")));
        assert!(is_token_type(Some("char *")));
        assert!(!is_token_type(Some("int")));
        assert!(!is_token_type(None));
        assert_eq!(token_element_type("int[]"), "int");
        assert_eq!(token_element_type("char *"), "char");
    }

    #[test]
    fn reaction_variables_are_deduplicated() {
        let r = Reaction {
            triggers: vec![TriggerRef::Startup, TriggerRef::Var(VarRef::local("x"))],
            sources: vec![VarRef::local("x"), VarRef::local("y")],
            effects: vec![VarRef::contained("c", "in")],
            ..Reaction::default()
        };
        let names: Vec<String> = r.variables().iter().map(|v| v.to_source()).collect();
        assert_eq!(names, vec!["x", "y", "c.in"]);
    }
}
