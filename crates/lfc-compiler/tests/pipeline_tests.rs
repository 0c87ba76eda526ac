//! End-to-end pipeline tests.
//!
//! Tests verify the full pipeline: target properties → configuration →
//! per-federate lowering and bridge emission → written artifacts, plus the
//! error scoping rules and the orchestration interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lfc_codegen::{FederateArtifacts, FixedTools, Manifest};
use lfc_compiler::{
    compile, write_artifacts, CompileOptions, CompileResult, ExecutionOutcome, FederateOutput,
    Orchestrator, DEFAULT_TIMEOUT, MANIFEST_FILE,
};
use lfc_config::{LogLevel, Target};
use lfc_types::model::{
    ActionInstance, ClassId, FederateId, FederateInstance, NetworkConnection, PortDecl, Program,
    Reaction, ReactorClass, ReactorTree, SerializerTag, TriggerRef, VarRef,
};
use lfc_types::{Element, ErrorCode, KeyValuePair, TimeUnit, TimeValue};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// `Main { s = new Source(); k = new Sink(); }` for the Python target.
fn program() -> Program {
    let mut source = ReactorClass::new("Source");
    source.outputs.push(PortDecl::new("out"));
    source.reactions.push(Reaction {
        triggers: vec![TriggerRef::Startup],
        effects: vec![VarRef::local("out")],
        body: "out.set(42)".into(),
        ..Reaction::default()
    });
    let mut sink = ReactorClass::new("Sink");
    sink.inputs.push(PortDecl::new("value"));
    sink.reactions.push(Reaction {
        triggers: vec![TriggerRef::Var(VarRef::local("value"))],
        body: "print(value.value)".into(),
        ..Reaction::default()
    });
    let mut main = ReactorClass::new("Main");
    main.is_main = true;

    let mut tree = ReactorTree::new("Main", ClassId(2));
    let s = tree.add_child(tree.root(), "s", ClassId(0));
    tree.get_mut(s)
        .actions
        .push(ActionInstance::new("tick", TimeValue::msec(10)).with_token_payload("char*"));
    tree.add_child(tree.root(), "k", ClassId(1));
    Program {
        name: "Pipe".into(),
        target: "Python".into(),
        properties: Vec::new(),
        preambles: Vec::new(),
        classes: vec![source, sink, main],
        tree,
        federates: vec![FederateInstance::singleton()],
        network_connections: Vec::new(),
    }
}

/// `program()` split so that `s` and `k` run in separate federates, plus a
/// third, unconnected federate.
fn federated(serializer: Option<SerializerTag>) -> Program {
    let mut p = program();
    let root = p.tree.root();
    let extra = p.tree.add_child(root, "x", ClassId(1));
    let children = p.tree.get(root).children.clone();
    p.federates = vec![
        FederateInstance::new(0, "src", vec![children[0]]),
        FederateInstance::new(1, "dst", vec![children[1]]),
        FederateInstance::new(2, "idle", vec![extra]),
    ];
    p.network_connections = vec![NetworkConnection {
        sending_federate: FederateId(0),
        sending_port: VarRef::contained("s", "out"),
        receiving_federate: FederateId(1),
        receiving_port: VarRef::contained("k", "value"),
        receiving_port_id: 0,
        receiving_action: "networkMessage".into(),
        type_name: None,
        is_physical: false,
        delay: None,
        serializer,
    }];
    p
}

fn options() -> CompileOptions {
    CompileOptions::default().with_tools(FixedTools::none())
}

fn run(program: &Program, properties: &[KeyValuePair]) -> CompileResult {
    compile(program, properties, &options())
}

fn prop(name: &str, value: Element) -> KeyValuePair {
    KeyValuePair::new(name, value)
}

/// A fresh, empty scratch directory for one test.
fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lfc-{}-{test}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

// ══════════════════════════════════════════════════════════════════════════════
// 1. Successful compilation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn python_program_compiles_end_to_end() {
    let result = run(&program(), &[]);
    assert!(result.success);
    assert!(!result.diagnostics.has_errors());
    assert_eq!(result.federates.len(), 1);
    let out = result.federates[0].artifacts().unwrap();
    assert_eq!(out.top_level_name, "Pipe");
    assert!(out.artifact("Pipe.c").is_some());
    assert!(out.artifact("Pipe.py").is_some());
    assert_eq!(out.tokens.len(), 1);
}

#[test]
fn properties_reach_the_generated_code() {
    let result = run(
        &program(),
        &[
            prop("logging", Element::id("debug")),
            prop("timeout", Element::time(10, TimeUnit::Msec)),
        ],
    );
    assert!(result.success);
    let config = result.config.as_ref().unwrap();
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(
        config.timeout.map(|t| t.to_duration()),
        Some(Duration::from_millis(10))
    );
    let out = result.federates[0].artifacts().unwrap();
    assert!(out.artifact("Pipe.c").unwrap().contents.starts_with("#define LOG_LEVEL 4\n"));
}

#[test]
fn base_name_option_renames_files() {
    let result = compile(&program(), &[], &options().with_base_name("Renamed"));
    let out = result.federates[0].artifacts().unwrap();
    assert_eq!(out.top_level_name, "Renamed");
    assert!(out.artifact("Renamed.c").is_some());
}

#[test]
fn unsupported_property_warns_but_compiles() {
    let result = run(&program(), &[prop("build-type", Element::id("Debug"))]);
    assert!(result.success);
    assert_eq!(result.diagnostics.warnings.len(), 1);
    assert_eq!(result.diagnostics.warnings[0].code, ErrorCode::UNSUPPORTED_PROPERTY);
}

#[test]
fn natively_lowered_target_compiles() {
    let mut p = program();
    p.target = "C".into();
    let result = run(&p, &[]);
    assert!(result.success);
    assert_eq!(result.config.as_ref().unwrap().target, Target::C);
    let out = result.federates[0].artifacts().unwrap();
    assert!(out.artifact("Pipe_triggers.c").is_some());
}

// ══════════════════════════════════════════════════════════════════════════════
// 2. Error scoping
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn unknown_target_fails_without_config() {
    let mut p = program();
    p.target = "Fortran".into();
    let result = run(&p, &[]);
    assert!(!result.success);
    assert!(result.config.is_none());
    assert!(result.federates.is_empty());
    assert_eq!(result.diagnostics.errors[0].code, ErrorCode::UNKNOWN_TARGET);
}

#[test]
fn known_but_ungenerated_target_is_rejected() {
    let mut p = program();
    p.target = "Cpp".into();
    let result = run(&p, &[]);
    assert!(!result.success);
    assert_eq!(result.config.as_ref().unwrap().target, Target::Cpp);
    assert!(result.federates.is_empty());
    assert_eq!(result.diagnostics.errors[0].subject, "Cpp");
}

#[test]
fn invalid_property_is_reported_but_generation_continues() {
    let result = run(&program(), &[prop("timeout", Element::string("foo"))]);
    assert!(!result.success);
    assert_eq!(result.federates.len(), 1);
    assert!(result.federates[0].artifacts().is_some());
    assert_eq!(result.diagnostics.errors[0].code, ErrorCode::PROPERTY_TYPE_MISMATCH);
    assert_eq!(result.diagnostics.errors[0].subject, "timeout");
    assert_eq!(result.config.unwrap().timeout, None);
}

#[test]
fn unknown_property_leaves_valid_ones_in_effect() {
    let result = run(
        &federated(None),
        &[
            prop("bogus", Element::literal("1")),
            prop("fast", Element::literal("true")),
        ],
    );
    assert!(!result.success);
    assert_eq!(result.diagnostics.total_errors, 1);
    assert_eq!(result.diagnostics.errors[0].code, ErrorCode::UNKNOWN_PROPERTY);
    assert_eq!(result.diagnostics.errors[0].subject, "bogus");
    assert!(result.config.as_ref().unwrap().fast_mode);
    let names: Vec<&str> = result.generated().map(|f| f.federate.as_str()).collect();
    assert_eq!(names, vec!["src", "dst", "idle"]);
}

#[test]
fn missing_serializer_suppresses_only_its_federates() {
    let result = run(&federated(Some(SerializerTag::Ros2)), &[]);
    assert!(!result.success);
    assert_eq!(result.federates.len(), 3);
    let names: Vec<&str> = result.federates.iter().map(FederateOutput::federate).collect();
    assert_eq!(names, vec!["src", "dst", "idle"]);
    for out in &result.federates[..2] {
        match out {
            FederateOutput::Suppressed { reason, .. } => {
                assert_eq!(reason.code, ErrorCode::MISSING_SERIALIZER)
            }
            FederateOutput::Generated(_) => panic!("{} should be suppressed", out.federate()),
        }
    }
    let idle = result.federates[2].artifacts().unwrap();
    assert_eq!(idle.top_level_name, "Pipe_idle");
    assert_eq!(result.diagnostics.total_errors, 2);
}

#[test]
fn unresolved_struct_field_aborts_everything() {
    let mut p = federated(None);
    p.classes[1].reactions[0].sources.push(VarRef::local("missing"));
    let result = run(&p, &[]);
    assert!(!result.success);
    assert!(result.federates.is_empty());
    let error = &result.diagnostics.errors[0];
    assert_eq!(error.code, ErrorCode::UNRESOLVED_STRUCT_FIELD);
    assert_eq!(error.subject, "Sink");
}

// ══════════════════════════════════════════════════════════════════════════════
// 3. Federated programs
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn federates_are_emitted_in_declaration_order() {
    let result = run(&federated(None), &[]);
    assert!(result.success);
    let tops: Vec<&str> = result.generated().map(|f| f.top_level_name.as_str()).collect();
    assert_eq!(tops, vec!["Pipe_src", "Pipe_dst", "Pipe_idle"]);
}

#[test]
fn federates_get_independent_token_tables() {
    let result = run(&federated(None), &[]);
    let tokens: Vec<usize> = result.generated().map(|f| f.tokens.len()).collect();
    assert_eq!(tokens, vec![1, 0, 0]);
}

// ══════════════════════════════════════════════════════════════════════════════
// 4. Writing artifacts
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn unfederated_artifacts_land_in_out_dir() {
    let dir = scratch_dir("unfederated");
    let result = run(&program(), &[]);
    let written = write_artifacts(&result, &dir).unwrap();
    assert_eq!(written.last().unwrap(), &dir.join(MANIFEST_FILE));
    assert!(dir.join("Pipe.c").is_file());
    assert!(dir.join("setup.py").is_file());

    let manifest: Manifest =
        serde_json::from_str(&fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap()).unwrap();
    let out = result.federates[0].artifacts().unwrap();
    assert_eq!(manifest, out.manifest());
    for entry in &manifest.files {
        let on_disk = fs::read_to_string(dir.join(&entry.path)).unwrap();
        assert_eq!(on_disk.len(), entry.bytes);
        assert_eq!(lfc_codegen::federate::sha256_hex(&on_disk), entry.sha256);
    }
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn federates_get_their_own_directories() {
    let dir = scratch_dir("federated");
    let result = run(&federated(Some(SerializerTag::Ros2)), &[]);
    write_artifacts(&result, &dir).unwrap();
    assert!(dir.join("idle").join("Pipe_idle.c").is_file());
    assert!(dir.join("idle").join(MANIFEST_FILE).is_file());
    assert!(!dir.join("src").exists());
    assert!(!dir.join("dst").exists());
    let _ = fs::remove_dir_all(&dir);
}

// ══════════════════════════════════════════════════════════════════════════════
// 5. Determinism and serialization
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn full_pipeline_determinism_100_iterations() {
    let p = federated(None);
    let first = serde_json::to_string(&run(&p, &[])).unwrap();
    for i in 0..100 {
        let again = serde_json::to_string(&run(&p, &[])).unwrap();
        assert_eq!(again, first, "compilation {i} differs");
    }
}

#[test]
fn compile_result_json_roundtrip() {
    let result = run(&federated(Some(SerializerTag::Ros2)), &[]);
    let json = serde_json::to_string(&result).unwrap();
    let rt: CompileResult = serde_json::from_str(&json).unwrap();
    assert_eq!(rt.success, result.success);
    assert_eq!(rt.federates.len(), result.federates.len());
    assert_eq!(rt.diagnostics, result.diagnostics);
    assert!(json.contains("\"status\":\"suppressed\""));
}

// ══════════════════════════════════════════════════════════════════════════════
// 6. Orchestration interface
// ══════════════════════════════════════════════════════════════════════════════

/// Records what it was asked to do; every step passes.
#[derive(Default)]
struct Recorder {
    built: Vec<String>,
    launched: Vec<String>,
}

impl Orchestrator for Recorder {
    fn build(&mut self, federate: &FederateArtifacts, _dir: &Path) -> ExecutionOutcome {
        self.built.push(federate.top_level_name.clone());
        ExecutionOutcome::Pass
    }

    fn launch(&mut self, federates: &[&FederateArtifacts], timeout: Duration) -> ExecutionOutcome {
        assert_eq!(timeout, DEFAULT_TIMEOUT);
        self.launched
            .extend(federates.iter().map(|f| f.top_level_name.clone()));
        ExecutionOutcome::Pass
    }
}

#[test]
fn orchestrator_sees_generated_federates_only() {
    let result = run(&federated(Some(SerializerTag::Ros2)), &[]);
    let mut orchestrator = Recorder::default();
    let generated: Vec<&FederateArtifacts> = result.generated().collect();
    for federate in &generated {
        assert!(orchestrator.build(federate, Path::new("out")).is_pass());
    }
    let outcome = orchestrator.launch(&generated, DEFAULT_TIMEOUT);
    assert_eq!(outcome, ExecutionOutcome::Pass);
    assert_eq!(orchestrator.built, vec!["Pipe_idle"]);
    assert_eq!(orchestrator.launched, vec!["Pipe_idle"]);
}
