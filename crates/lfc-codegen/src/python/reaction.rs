//! Reaction functions of Python reactors.
//!
//! Each reaction becomes a C function the runtime schedules. For ordinary
//! reactors that function is a shim: it takes the GIL, converts the
//! reaction's ports and actions to Python objects and calls the bound
//! `reaction_function_<i>` of the Python instance. Delay reactors and the
//! main reactor of a federated program get a native body instead.

use lfc_types::model::{
    ClassId, FederateInstance, InstanceId, NetworkConnection, Program, Reaction,
    ReactorClass, TriggerRef, VarRef,
};

use super::network;
use super::structs::{
    deadline_function_name, federate_reactions, py_deadline_field, py_reaction_field,
    reaction_function_name, FieldBinding, FieldKind, ReactorStruct,
};
use crate::builder::CodeBuilder;
use crate::context::GenContext;
use crate::error::{CodegenError, CodegenResult};
use crate::trigger::self_ref;

// ══════════════════════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════════════════════

/// Resolve every variable of reaction `index` of `class` against the self
/// struct. Faults point at the reaction, or at the class if the reaction
/// has no location.
fn resolve<'s>(
    class: &ReactorClass,
    layout: &'s ReactorStruct,
    index: usize,
) -> CodegenResult<Vec<&'s FieldBinding>> {
    let reaction = &class.reactions[index];
    reaction
        .variables()
        .into_iter()
        .map(|var| {
            layout
                .binding(var)
                .ok_or_else(|| CodegenError::UnresolvedStructField {
                    class: layout.class.clone(),
                    reaction: index,
                    field: var.to_source(),
                    span: reaction.span.or(class.span),
                })
        })
        .collect()
}

fn pr_prologue(code: &mut CodeBuilder, layout: &ReactorStruct, bindings: &[&FieldBinding]) {
    code.pr(format!(
        "{ty}* self = ({ty}*)instance_args;",
        ty = layout.type_name
    ));
    for binding in bindings {
        code.pr_all(binding.locals());
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Interpreter shims
// ══════════════════════════════════════════════════════════════════════════════

/// Call `callable` with the converted bindings, failing hard if Python
/// raises.
fn pr_python_call(code: &mut CodeBuilder, callable: &str, what: &str, bindings: &[&FieldBinding]) {
    let format: String = bindings.iter().map(|_| 'O').collect();
    let args: Vec<String> = bindings.iter().map(|b| b.to_python_arg()).collect();
    let build_value = if args.is_empty() {
        format!("Py_BuildValue(\"({format})\")")
    } else {
        format!("Py_BuildValue(\"({format})\", {})", args.join(", "))
    };
    code.pr("PyGILState_STATE gstate;");
    code.pr("gstate = PyGILState_Ensure();");
    code.pr(format!("DEBUG_PRINT(\"Calling {what}\");"));
    code.pr("PyObject *rValue = PyObject_CallObject(");
    code.indent();
    code.pr(format!("self->{callable},"));
    code.pr(build_value);
    code.unindent();
    code.pr(");");
    code.pr("if (rValue == NULL) {");
    code.indent();
    code.pr(format!("error_print(\"FATAL: Calling {what} failed.\");"));
    code.pr("if (PyErr_Occurred()) {");
    code.indent();
    code.pr("PyErr_PrintEx(0);");
    code.pr("PyErr_Clear();");
    code.unindent();
    code.pr("}");
    code.pr("/* Release the thread. No Python API allowed beyond this point. */");
    code.pr("PyGILState_Release(gstate);");
    code.pr("Py_FinalizeEx();");
    code.pr("exit(1);");
    code.unindent();
    code.pr("}");
    code.pr("/* Release the thread. No Python API allowed beyond this point. */");
    code.pr("PyGILState_Release(gstate);");
}

/// The shim invoking `reaction_function_<index>` of the Python instance,
/// followed by the deadline shim if the reaction has a deadline.
pub fn generate_python_shim(class: &ReactorClass, layout: &ReactorStruct, index: usize) -> CodegenResult<String> {
    let reaction = &class.reactions[index];
    let bindings = resolve(class, layout, index)?;
    let mut code = CodeBuilder::new();

    code.pr(format!("void {}(void* instance_args) {{", reaction_function_name(class, index)));
    code.indent();
    pr_prologue(&mut code, layout, &bindings);
    pr_python_call(
        &mut code,
        &py_reaction_field(index),
        &format!("reaction {}.reaction_function_{index}", class.name),
        &bindings,
    );
    code.unindent();
    code.pr("}");

    if reaction.deadline.is_some() {
        code.pr(format!("void {}(void* instance_args) {{", deadline_function_name(class, index)));
        code.indent();
        pr_prologue(&mut code, layout, &bindings);
        pr_python_call(
            &mut code,
            &py_deadline_field(index),
            &format!("deadline handler {}.deadline_function_{index}", class.name),
            &bindings,
        );
        code.unindent();
        code.pr("}");
    }
    Ok(code.into_string())
}

// ══════════════════════════════════════════════════════════════════════════════
// Native bodies
// ══════════════════════════════════════════════════════════════════════════════

/// Body scheduling `action` with a copy of `port`'s value.
pub fn generate_delay_body(action: &str, port: &str, is_token_type: bool) -> String {
    if is_token_type {
        [
            format!("if ({port}->is_present) {{"),
            "    // Put the whole token on the event queue, not just the payload.".to_string(),
            "    // This way, the length and element_size are transported.".to_string(),
            format!("    schedule_token({action}, 0, {port}->token);"),
            "}".to_string(),
        ]
        .join("\n")
    } else {
        [
            "// Create a token.".to_string(),
            "#if NUMBER_OF_WORKERS > 0".to_string(),
            "// Need to lock the mutex first.".to_string(),
            "lf_mutex_lock(&mutex);".to_string(),
            "#endif".to_string(),
            "lf_token_t* t = create_token(sizeof(PyObject*));".to_string(),
            "#if NUMBER_OF_WORKERS > 0".to_string(),
            "lf_mutex_unlock(&mutex);".to_string(),
            "#endif".to_string(),
            format!("t->value = {port}->value;"),
            "t->length = 1; // Length is 1".to_string(),
            String::new(),
            "// Pass the token along".to_string(),
            format!("schedule_token({action}, 0, t);"),
        ]
        .join("\n")
    }
}

/// Body writing `action`'s payload to `port`.
pub fn generate_forward_body(action: &str, port: &str, is_token_type: bool) -> String {
    if is_token_type {
        format!("SET_TOKEN({port}, {action}->token);")
    } else {
        format!("SET({port}, {action}->token->value);")
    }
}

fn first_action_trigger<'r>(reaction: &'r Reaction, layout: &ReactorStruct) -> Option<&'r VarRef> {
    reaction.triggers.iter().find_map(|t| match t {
        TriggerRef::Var(v) if layout.binding(v).is_some_and(|b| b.kind == FieldKind::Action) => Some(v),
        _ => None,
    })
}

fn first_effect_of<'r>(reaction: &'r Reaction, layout: &ReactorStruct, kind: FieldKind) -> Option<&'r VarRef> {
    reaction
        .effects
        .iter()
        .find(|v| layout.binding(v).is_some_and(|b| b.kind == kind))
}

fn first_input_trigger<'r>(reaction: &'r Reaction, layout: &ReactorStruct) -> Option<&'r VarRef> {
    reaction.triggers.iter().find_map(|t| match t {
        TriggerRef::Var(v) if layout.binding(v).is_some_and(|b| b.kind == FieldKind::Input) => Some(v),
        _ => None,
    })
}

/// Native body of a delay reactor's reaction, chosen by its shape: an
/// action triggering an output forwards, an input triggering an action
/// delays. Anything else keeps its written body.
fn delay_class_body(class: &ReactorClass, layout: &ReactorStruct, reaction: &Reaction) -> String {
    let token_action = |name: &str| class.action(name).is_some_and(|a| a.is_token_type());
    if let (Some(action), Some(port)) = (
        first_action_trigger(reaction, layout),
        first_effect_of(reaction, layout, FieldKind::Output),
    ) {
        return generate_forward_body(&action.to_ident(), &port.to_ident(), token_action(&action.variable));
    }
    if let (Some(port), Some(action)) = (
        first_input_trigger(reaction, layout),
        first_effect_of(reaction, layout, FieldKind::Action),
    ) {
        return generate_delay_body(&action.to_ident(), &port.to_ident(), token_action(&action.variable));
    }
    reaction.body.clone()
}

/// Native body of reaction `index` of a federated main reactor. An empty
/// body is filled with the sender or receiver side of the network
/// connection the reaction serves.
fn federated_main_body(
    ctx: &GenContext<'_>,
    program: &Program,
    federate: &FederateInstance,
    reaction: &Reaction,
) -> CodegenResult<String> {
    if !reaction.body.trim().is_empty() {
        return Ok(reaction.body.clone());
    }
    let triggered_by = |var: &VarRef| reaction.triggers.contains(&TriggerRef::Var(var.clone()));
    let sender = program
        .network_connections
        .iter()
        .find(|c| c.sending_federate == federate.id && triggered_by(&c.sending_port));
    if let Some(conn) = sender {
        return network::generate_sender_body(ctx, program, conn);
    }
    let receiver = program.network_connections.iter().find(|c: &&NetworkConnection| {
        c.receiving_federate == federate.id && triggered_by(&VarRef::local(c.receiving_action.clone()))
    });
    match receiver {
        Some(conn) => network::generate_receiver_body(ctx, program, conn),
        None => Ok(String::new()),
    }
}

/// Whether the reactions of `class_id` run natively rather than in Python.
pub fn is_native_class(program: &Program, class_id: ClassId) -> bool {
    let class = program.class(class_id);
    class.is_delay_class() || (class.is_main && program.is_federated())
}

/// A native reaction function for reaction `index`.
pub fn generate_native_reaction(
    ctx: &GenContext<'_>,
    program: &Program,
    class_id: ClassId,
    federate: &FederateInstance,
    layout: &ReactorStruct,
    index: usize,
) -> CodegenResult<String> {
    let class = program.class(class_id);
    let reaction = &class.reactions[index];
    let bindings = resolve(class, layout, index)?;
    let body = if class.is_delay_class() {
        delay_class_body(class, layout, reaction)
    } else {
        federated_main_body(ctx, program, federate, reaction)?
    };

    let mut code = CodeBuilder::new();
    code.pr(format!("void {}(void* instance_args) {{", reaction_function_name(class, index)));
    code.indent();
    pr_prologue(&mut code, layout, &bindings);
    code.pr(body);
    code.unindent();
    code.pr("}");
    if let Some(deadline) = &reaction.deadline {
        code.pr(format!("void {}(void* instance_args) {{", deadline_function_name(class, index)));
        code.indent();
        pr_prologue(&mut code, layout, &bindings);
        code.pr(&deadline.body);
        code.unindent();
        code.pr("}");
    }
    Ok(code.into_string())
}

/// Every reaction function of `class_id` generated in `federate`.
pub fn generate_reactions(
    ctx: &GenContext<'_>,
    program: &Program,
    class_id: ClassId,
    federate: &FederateInstance,
    layout: &ReactorStruct,
) -> CodegenResult<Vec<String>> {
    let class = program.class(class_id);
    let native = is_native_class(program, class_id);
    federate_reactions(program, class_id, federate)
        .into_iter()
        .map(|i| {
            if native {
                generate_native_reaction(ctx, program, class_id, federate, layout, i)
            } else {
                generate_python_shim(class, layout, i)
            }
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Linkers
// ══════════════════════════════════════════════════════════════════════════════

/// Statements binding the Python callables of `instance`'s reactions,
/// run during trigger-object initialization.
pub fn generate_reaction_linkers(program: &Program, instance: InstanceId) -> Vec<String> {
    let tree = &program.tree;
    let class_id = tree.get(instance).class;
    if is_native_class(program, class_id) {
        return Vec::new();
    }
    let class = program.class(class_id);
    let self_var = self_ref(tree, instance);
    let bank = tree.get(instance).bank_index;
    let mut out = Vec::new();
    for (i, reaction) in class.reactions.iter().enumerate() {
        out.push(format!(
            "{self_var}->{} = get_python_function(\"__main__\", {self_var}->_lf_name, {bank}, \"reaction_function_{i}\");",
            py_reaction_field(i)
        ));
        if reaction.deadline.is_some() {
            out.push(format!(
                "{self_var}->{} = get_python_function(\"__main__\", {self_var}->_lf_name, {bank}, \"deadline_function_{i}\");",
                py_deadline_field(i)
            ));
        }
    }
    out
}
