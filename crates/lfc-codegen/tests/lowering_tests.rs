//! Integration tests for token/trigger lowering.
//!
//! Tests validate:
//! - Initializer shape for a token-carrying logical action
//! - Declaration order is preserved regardless of modes
//! - Federate filtering drops actions silently
//! - Token-table registration, once per token action

use lfc_codegen::trigger::{
    generate_token_initializers, lower_actions, ModeBinding, Period, TriggerKind,
};
use lfc_codegen::{generate_initializers, FixedTools, GenContext};
use lfc_config::{Target, TargetConfig};
use lfc_types::model::{
    ActionInstance, ClassId, FederateInstance, InstanceId, Program, ReactorClass, ReactorTree,
};
use lfc_types::TimeValue;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Main reactor with two top-level children `a` and `b`.
fn program() -> (Program, InstanceId, InstanceId) {
    let mut main = ReactorClass::new("Main");
    main.is_main = true;
    let worker = ReactorClass::new("Worker");
    let mut tree = ReactorTree::new("Main", ClassId(0));
    let a = tree.add_child(tree.root(), "a", ClassId(1));
    let b = tree.add_child(tree.root(), "b", ClassId(1));
    let program = Program {
        name: "Lowering".into(),
        target: "Python".into(),
        properties: Vec::new(),
        preambles: Vec::new(),
        classes: vec![main, worker],
        tree,
        federates: vec![FederateInstance::singleton()],
        network_connections: Vec::new(),
    };
    (program, a, b)
}

fn with_actions(program: &mut Program, instance: InstanceId, actions: Vec<ActionInstance>) {
    program.tree.get_mut(instance).actions = actions;
}

// ══════════════════════════════════════════════════════════════════════════════
// Scenario
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn token_action_lowers_to_metadata_and_one_table_entry() {
    let (mut p, a, _) = program();
    with_actions(
        &mut p,
        a,
        vec![ActionInstance::new("act", TimeValue::msec(100)).with_token_payload("int[]")],
    );
    let fed = FederateInstance::singleton();

    let meta = lower_actions(&p, a, &fed).unwrap();
    assert_eq!(meta.len(), 1);
    assert_eq!(meta[0].kind, TriggerKind::Action);
    assert_eq!(meta[0].offset, TimeValue::msec(100));
    assert_eq!(meta[0].period, Period::Undefined);
    assert_eq!(meta[0].mode, ModeBinding::Unbound);
    assert!(meta[0].is_token_type);

    let code = generate_initializers(&p, a, &fed).unwrap();
    assert_eq!(
        code,
        vec![
            "// Initializing action Main.a.act",
            "Main_a_self->_lf__act.offset = MSEC(100);",
            "Main_a_self->_lf__act.period = -1;",
            "Main_a_self->_lf__act.mode = NULL;",
        ]
    );

    let config = TargetConfig::new(Target::Python);
    let tools = FixedTools::none();
    let mut ctx = GenContext::new(&config, &tools);
    let tokens = generate_token_initializers(&mut ctx, &p, a, &fed);
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].starts_with("Main_a_self->_lf__act.token = _lf_create_token(sizeof(int));"));
    assert_eq!(ctx.tokens.len(), 1);
    assert!(ctx.tokens.entries()[0].reset_is_present);
    assert_eq!(ctx.tokens.entries()[0].token_ref, "&Main_a_self->_lf__act.token");
}

// ══════════════════════════════════════════════════════════════════════════════
// Ordering
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn initializers_follow_declaration_order_across_modes() {
    let (mut p, a, _) = program();
    let idle = p.tree.add_mode(a, "Idle");
    let busy = p.tree.add_mode(a, "Busy");
    with_actions(
        &mut p,
        a,
        vec![
            ActionInstance::new("a1", TimeValue::ZERO).in_mode(busy),
            ActionInstance::new("a2", TimeValue::ZERO),
            ActionInstance::new("a3", TimeValue::ZERO).in_mode(idle),
        ],
    );
    let code = generate_initializers(&p, a, &FederateInstance::singleton()).unwrap();
    let named: Vec<&str> = code
        .iter()
        .filter_map(|l| l.strip_prefix("// Initializing action Main.a."))
        .collect();
    assert_eq!(named, vec!["a1", "a2", "a3"]);
    assert_eq!(code[3], "Main_a_self->_lf__a1.mode = &Main_a_self->_lf__modes[1];");
    assert_eq!(code[11], "Main_a_self->_lf__a3.mode = &Main_a_self->_lf__modes[0];");
}

#[test]
fn lowering_is_deterministic() {
    let (mut p, a, _) = program();
    with_actions(
        &mut p,
        a,
        (0..10)
            .map(|i| ActionInstance::new(format!("act{i}"), TimeValue::msec(i)))
            .collect(),
    );
    let fed = FederateInstance::singleton();
    let first = generate_initializers(&p, a, &fed).unwrap();
    for _ in 0..100 {
        assert_eq!(generate_initializers(&p, a, &fed).unwrap(), first);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Federate filtering
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn excluded_reactor_emits_nothing() {
    let (mut p, a, b) = program();
    with_actions(&mut p, b, vec![ActionInstance::new("x", TimeValue::msec(1))]);
    let only_a = FederateInstance::new(0, "fa", vec![a]);
    assert!(generate_initializers(&p, b, &only_a).unwrap().is_empty());
    assert!(lower_actions(&p, b, &only_a).unwrap().is_empty());
}

#[test]
fn value_actions_register_no_tokens() {
    let (mut p, a, _) = program();
    with_actions(
        &mut p,
        a,
        vec![
            ActionInstance::new("plain", TimeValue::ZERO),
            ActionInstance::new("tok", TimeValue::ZERO).with_token_payload("char*"),
            ActionInstance::new("plain2", TimeValue::ZERO),
        ],
    );
    let config = TargetConfig::new(Target::Python);
    let tools = FixedTools::none();
    let mut ctx = GenContext::new(&config, &tools);
    let fed = FederateInstance::singleton();
    generate_token_initializers(&mut ctx, &p, a, &fed);
    // A second pass over the same instance must not register twice.
    generate_token_initializers(&mut ctx, &p, a, &fed);
    assert_eq!(ctx.tokens.len(), 1);
    assert_eq!(ctx.tokens.entries()[0].status_ref, "&Main_a_self->_lf__tok.status");
}
