//! Self-struct layout for Python reactors.
//!
//! The native runtime sees a Python reactor through its self struct. The
//! field names laid out here are the only names reaction shims may use, so
//! shims resolve every port and action through [`ReactorStruct::binding`]
//! instead of spelling field names themselves.

use serde::Serialize;

use lfc_types::model::{ClassId, FederateInstance, PortDecl, Program, ReactorClass, VarRef};

use super::{alias_type, c_prefix, self_type, GENERIC_ACTION_TYPE, GENERIC_PORT_TYPE, GENERIC_PORT_TYPE_WITH_TOKEN};
use crate::trigger::{class_contains_action, generate_action_declarations};

// ══════════════════════════════════════════════════════════════════════════════
// Alias typedefs
// ══════════════════════════════════════════════════════════════════════════════

fn port_typedef(class: &ReactorClass, port: &PortDecl) -> String {
    let generic = if port.is_token_type() {
        GENERIC_PORT_TYPE_WITH_TOKEN
    } else {
        GENERIC_PORT_TYPE
    };
    format!("typedef {generic} {};", alias_type(class, &port.name))
}

/// One typedef per input, output and (federate-included) action of `class`,
/// in that order.
pub fn generate_aux_typedefs(program: &Program, class_id: ClassId, federate: &FederateInstance) -> Vec<String> {
    let class = program.class(class_id);
    let ports = class.inputs.iter().chain(&class.outputs).map(|p| port_typedef(class, p));
    let actions = class
        .actions
        .iter()
        .filter(|a| class_contains_action(program, class_id, federate, &a.name))
        .map(|a| format!("typedef {GENERIC_ACTION_TYPE} {};", alias_type(class, &a.name)));
    ports.chain(actions).collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// ReactorStruct
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Input,
    Output,
    Action,
    /// A port of a contained reactor, reached through its container.
    ContainedPort,
}

/// How a reaction reaches one port or action through the self struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldBinding {
    /// Source spelling: `in`, `act`, `c.out`.
    pub var: String,
    pub kind: FieldKind,
    /// Alias type of the port or action.
    pub type_name: String,
    /// Expression yielding the field, relative to `self`.
    pub access: String,
    /// Width expression for multiports.
    pub width: Option<String>,
}

impl FieldBinding {
    /// Local variable holding the field inside a reaction function.
    pub fn local_name(&self) -> String {
        self.var.replace('.', "_")
    }

    /// Declarations of the local variable (and its width) in a reaction.
    pub fn locals(&self) -> Vec<String> {
        let local = self.local_name();
        let mut out = Vec::with_capacity(2);
        match (self.kind, &self.width) {
            (FieldKind::Input | FieldKind::Output, Some(width)) => {
                out.push(format!("{}** {local} = {};", self.type_name, self.access));
                out.push(format!("int {local}_width = {width};"));
            }
            (FieldKind::Output | FieldKind::Action, None) => {
                out.push(format!("{}* {local} = &{};", self.type_name, self.access));
            }
            _ => out.push(format!("{}* {local} = {};", self.type_name, self.access)),
        }
        out
    }

    /// Conversion of the local into the argument passed to Python.
    pub fn to_python_arg(&self) -> String {
        let local = self.local_name();
        match self.kind {
            FieldKind::Action => format!("convert_C_action_to_py({local})"),
            _ => {
                let width = match self.width {
                    Some(_) => format!("{local}_width"),
                    None => "-2".to_string(),
                };
                format!("convert_C_port_to_py({local}, {width})")
            }
        }
    }
}

/// The generated self struct of one reactor class.
#[derive(Debug, Clone, Serialize)]
pub struct ReactorStruct {
    pub class: String,
    pub type_name: String,
    /// Field declarations in layout order.
    pub fields: Vec<String>,
    pub bindings: Vec<FieldBinding>,
    /// Statements run by the constructor after allocation.
    pub constructor: Vec<String>,
}

impl ReactorStruct {
    pub fn binding(&self, var: &VarRef) -> Option<&FieldBinding> {
        let name = var.to_source();
        self.bindings.iter().find(|b| b.var == name)
    }

    pub fn constructor_name(&self) -> String {
        format!("new_{}", self.class.to_lowercase())
    }

    /// The struct typedef.
    pub fn declaration(&self) -> String {
        let mut out = String::from("typedef struct {\n");
        for field in &self.fields {
            for line in field.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str(&format!("}} {};", self.type_name));
        out
    }

    /// The constructor allocating and wiring one instance.
    pub fn constructor_definition(&self) -> String {
        let ty = &self.type_name;
        let mut out = format!("{ty}* {}() {{\n", self.constructor_name());
        out.push_str(&format!("    {ty}* self = ({ty}*)_lf_new_reactor(sizeof({ty}));\n"));
        for stmt in &self.constructor {
            out.push_str(&format!("    {stmt}\n"));
        }
        out.push_str("    return self;\n}");
        out
    }
}

/// `void _<class>reaction_function_<i>(void* instance_args)`
pub fn reaction_function_name(class: &ReactorClass, index: usize) -> String {
    format!("_{}reaction_function_{index}", c_prefix(class))
}

pub fn deadline_function_name(class: &ReactorClass, index: usize) -> String {
    format!("_{}_deadline_function{index}", c_prefix(class))
}

/// Self-struct field holding the Python callable of reaction `index`.
pub fn py_reaction_field(index: usize) -> String {
    format!("_lf_py_reaction_function_{index}")
}

pub fn py_deadline_field(index: usize) -> String {
    format!("_lf_py_deadline_function_{index}")
}

/// Indices of the reactions of `class_id` generated in `federate`. Only the
/// main reactor of a federated program splits its reactions.
pub fn federate_reactions(program: &Program, class_id: ClassId, federate: &FederateInstance) -> Vec<usize> {
    let root = program.tree.root();
    let is_root_class = program.tree.get(root).class == class_id;
    (0..program.class(class_id).reactions.len())
        .filter(|&i| !is_root_class || federate.contains_reaction(&program.tree, root, i))
        .collect()
}

/// The class of the child named `container` inside some instance of
/// `class_id`.
pub fn contained_class<'p>(program: &'p Program, class_id: ClassId, container: &str) -> Option<&'p ReactorClass> {
    let tree = &program.tree;
    tree.preorder()
        .into_iter()
        .filter(|&id| tree.get(id).class == class_id)
        .find_map(|id| {
            tree.get(id)
                .children
                .iter()
                .find(|&&child| tree.get(child).name == container)
                .map(|&child| program.class_of(child))
        })
}

fn port_binding(class: &ReactorClass, port: &PortDecl, kind: FieldKind) -> FieldBinding {
    FieldBinding {
        var: port.name.clone(),
        kind,
        type_name: alias_type(class, &port.name),
        access: format!("self->_lf_{}", port.name),
        width: port.width.map(|_| format!("self->_lf_{}_width", port.name)),
    }
}

/// Lay out the self struct of `class_id` for `federate`.
pub fn build_reactor_struct(program: &Program, class_id: ClassId, federate: &FederateInstance) -> ReactorStruct {
    let class = program.class(class_id);
    let mut fields = vec![
        "struct self_base_t base;".to_string(),
        "char *_lf_name;".to_string(),
    ];
    let mut bindings = Vec::new();

    // Parameters are mirrored as integers so that they can size multiports.
    for param in &class.parameters {
        fields.push(format!("int {};", param.name));
    }

    for input in &class.inputs {
        let ty = alias_type(class, &input.name);
        if input.width.is_some() {
            fields.push(format!("{ty}** _lf_{};", input.name));
            fields.push(format!("int _lf_{}_width;", input.name));
        } else {
            fields.push(format!("{ty}* _lf_{};", input.name));
        }
        fields.push(format!("trigger_t _lf__{};", input.name));
        bindings.push(port_binding(class, input, FieldKind::Input));
    }

    for output in &class.outputs {
        let ty = alias_type(class, &output.name);
        if output.width.is_some() {
            fields.push(format!("{ty}** _lf_{};", output.name));
            fields.push(format!("int _lf_{}_width;", output.name));
        } else {
            fields.push(format!("{ty} _lf_{};", output.name));
        }
        bindings.push(port_binding(class, output, FieldKind::Output));
    }

    let actions = generate_action_declarations(program, class_id, federate, |name| alias_type(class, name));
    fields.extend(actions.fields);
    for action in &class.actions {
        if class_contains_action(program, class_id, federate, &action.name) {
            fields.push(format!("trigger_t _lf__{};", action.name));
            bindings.push(FieldBinding {
                var: action.name.clone(),
                kind: FieldKind::Action,
                type_name: alias_type(class, &action.name),
                access: format!("self->_lf_{}", action.name),
                width: None,
            });
        }
    }

    for timer in &class.timers {
        fields.push(format!("trigger_t _lf__{timer};"));
    }

    // Ports of contained reactors, grouped by container in first-use order.
    let reactions = federate_reactions(program, class_id, federate);
    let mut containers: Vec<(String, Vec<String>)> = Vec::new();
    for &i in &reactions {
        for var in class.reactions[i].variables() {
            let Some(container) = &var.container else {
                continue;
            };
            let group = match containers.iter().position(|(c, _)| c == container) {
                Some(pos) => &mut containers[pos].1,
                None => {
                    containers.push((container.clone(), Vec::new()));
                    let last = containers.len() - 1;
                    &mut containers[last].1
                }
            };
            if !group.contains(&var.variable) {
                group.push(var.variable.clone());
            }
        }
    }
    for (container, ports) in &containers {
        let Some(child) = contained_class(program, class_id, container) else {
            continue;
        };
        let mut body = String::from("struct {\n");
        for port in ports {
            let Some(decl) = child.port(port) else {
                continue;
            };
            let ty = alias_type(child, &decl.name);
            body.push_str(&format!("    {ty}* {port};\n"));
            bindings.push(FieldBinding {
                var: format!("{container}.{port}"),
                kind: FieldKind::ContainedPort,
                type_name: ty,
                access: format!("self->_lf_{container}.{port}"),
                width: None,
            });
        }
        body.push_str(&format!("}} _lf_{container};"));
        fields.push(body);
    }

    let mut constructor = Vec::new();
    for &i in &reactions {
        fields.push(format!("reaction_t _lf__reaction_{i};"));
        constructor.push(format!("self->_lf__reaction_{i}.number = {i};"));
        constructor.push(format!(
            "self->_lf__reaction_{i}.function = {};",
            reaction_function_name(class, i)
        ));
        constructor.push(format!("self->_lf__reaction_{i}.self = self;"));
        if class.reactions[i].deadline.is_some() {
            constructor.push(format!(
                "self->_lf__reaction_{i}.deadline_violation_handler = {};",
                deadline_function_name(class, i)
            ));
        }
    }
    constructor.extend(actions.constructor);

    if !class.modes.is_empty() {
        fields.push(format!("reactor_mode_t _lf__modes[{}];", class.modes.len()));
    }

    for (i, reaction) in class.reactions.iter().enumerate() {
        fields.push(format!("PyObject* {};", py_reaction_field(i)));
        if reaction.deadline.is_some() {
            fields.push(format!("PyObject* {};", py_deadline_field(i)));
        }
    }

    ReactorStruct {
        class: class.name.clone(),
        type_name: self_type(class),
        fields,
        bindings,
        constructor,
    }
}
