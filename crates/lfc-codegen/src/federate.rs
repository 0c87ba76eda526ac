//! Per-federate artifact assembly.
//!
//! Every federate is generated on its own: a fresh [`GenContext`] (and with
//! it a fresh token table and a private copy of the configuration) is
//! created, the classes and instances of the federate are collected, and
//! [`FederateBuilder::finish`] turns the collected sections into finished
//! artifacts. `finish` consumes the builder, so a finalized federate cannot
//! be revisited.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use lfc_config::{Target, TargetConfig};
use lfc_types::model::{ClassId, FederateInstance, InstanceId, Program};
use lfc_types::Diagnostics;
use lfc_types::element::decode_integer;

use crate::context::{GenContext, TokenTable};
use crate::error::{CodegenError, CodegenResult};
use crate::python::module::{generate_python_module, instance_list_name};
use crate::python::network::{enable_serializers, SerializationSupport};
use crate::python::preamble::generate_c_preamble;
use crate::python::reaction::{generate_reaction_linkers, generate_reactions};
use crate::python::setup::BuildDescriptor;
use crate::python::structs::{build_reactor_struct, generate_aux_typedefs, ReactorStruct};
use crate::python::self_type;
use crate::tools::ToolLocator;
use crate::trigger::{
    generate_initializers, generate_timer_initializers, generate_token_initializers, lower_actions,
    lower_timers, self_ref, TriggerMetadata,
};

// ══════════════════════════════════════════════════════════════════════════════
// Artifacts
// ══════════════════════════════════════════════════════════════════════════════

/// Lowercase hex SHA-256 of `contents`.
pub fn sha256_hex(contents: &str) -> String {
    format!("{:x}", Sha256::digest(contents.as_bytes()))
}

/// One generated file, relative to the federate's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub contents: String,
    pub sha256: String,
}

impl Artifact {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        Self {
            path: path.into(),
            sha256: sha256_hex(&contents),
            contents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub sha256: String,
    pub bytes: usize,
}

/// Index of a federate's artifacts, letting orchestration skip federates
/// whose files did not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub federate: String,
    pub top_level_name: String,
    pub files: Vec<ManifestEntry>,
}

/// Everything generated for one finalized federate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederateArtifacts {
    pub federate: String,
    pub top_level_name: String,
    pub artifacts: Vec<Artifact>,
    pub triggers: Vec<TriggerMetadata>,
    pub tokens: TokenTable,
    pub diagnostics: Diagnostics,
}

impl FederateArtifacts {
    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            federate: self.federate.clone(),
            top_level_name: self.top_level_name.clone(),
            files: self
                .artifacts
                .iter()
                .map(|a| ManifestEntry {
                    path: a.path.clone(),
                    sha256: a.sha256.clone(),
                    bytes: a.contents.len(),
                })
                .collect(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Per-federate configuration
// ══════════════════════════════════════════════════════════════════════════════

/// Base name of a federate's files: `<base>` or `<base>_<federate>`.
pub fn top_level_name(program: &Program, base: &str, federate: &FederateInstance) -> String {
    if program.is_federated() {
        format!("{base}_{}", federate.name)
    } else {
        base.to_string()
    }
}

/// The configuration a federate is generated with. Federates need at least
/// one worker thread to handle network input.
pub fn federate_config(config: &TargetConfig, program: &Program) -> TargetConfig {
    let mut config = config.clone();
    if program.is_federated() {
        config.threads = config.threads.max(1);
    }
    config
}

/// Classes with an instance in `federate`, in declaration order.
pub fn federate_classes(program: &Program, federate: &FederateInstance) -> CodegenResult<Vec<ClassId>> {
    let tree = &program.tree;
    let mut used = vec![false; program.classes.len()];
    for id in tree.preorder() {
        if !federate.contains_instance(tree, id) {
            continue;
        }
        let class = tree.get(id).class;
        match used.get_mut(class.0) {
            Some(slot) => *slot = true,
            None => {
                return Err(CodegenError::UnknownReactorClass {
                    instance: tree.full_name(id),
                })
            }
        }
    }
    Ok(used
        .iter()
        .enumerate()
        .filter(|(_, used)| **used)
        .map(|(i, _)| ClassId(i))
        .collect())
}

// ══════════════════════════════════════════════════════════════════════════════
// FederateBuilder
// ══════════════════════════════════════════════════════════════════════════════

/// Collects the sections of one federate's artifacts.
pub struct FederateBuilder<'p, 'c> {
    ctx: GenContext<'c>,
    program: &'p Program,
    federate: &'p FederateInstance,
    top_level_name: String,
    classes: Vec<ClassId>,
    layouts: Vec<ReactorStruct>,

    // ── Collected sections ───────────────────────────────────────────────
    typedefs: Vec<String>,
    reactions: Vec<String>,
    initialization: Vec<String>,
    triggers: Vec<TriggerMetadata>,
    serialization: SerializationSupport,
    python_preamble: Vec<String>,
}

impl<'p, 'c> FederateBuilder<'p, 'c> {
    pub fn new(
        ctx: GenContext<'c>,
        program: &'p Program,
        federate: &'p FederateInstance,
        top_level_name: String,
    ) -> Self {
        Self {
            ctx,
            program,
            federate,
            top_level_name,
            classes: Vec::new(),
            layouts: Vec::new(),
            typedefs: Vec::new(),
            reactions: Vec::new(),
            initialization: Vec::new(),
            triggers: Vec::new(),
            serialization: SerializationSupport::default(),
            python_preamble: Vec::new(),
        }
    }

    /// Collect every class and instance of the federate.
    pub fn collect(&mut self) -> CodegenResult<()> {
        self.classes = federate_classes(self.program, self.federate)?;
        let python = self.ctx.config.target == Target::Python;
        if python {
            self.serialization = enable_serializers(&mut self.ctx, self.program, self.federate)?;
            self.python_preamble.extend(self.program.preambles.iter().cloned());
            for i in 0..self.classes.len() {
                self.collect_class(self.classes[i])?;
            }
            self.python_preamble
                .extend(self.serialization.python_preamble.iter().cloned());
        }
        let program = self.program;
        for id in program.tree.preorder() {
            if self.federate.contains_instance(&program.tree, id) {
                self.collect_instance(id, python)?;
            }
        }
        Ok(())
    }

    fn collect_class(&mut self, class_id: ClassId) -> CodegenResult<()> {
        let class = self.program.class(class_id);
        debug!("collecting reactor class {}", class.name);
        self.python_preamble.extend(class.preambles.iter().cloned());
        self.typedefs
            .extend(generate_aux_typedefs(self.program, class_id, self.federate));
        let layout = build_reactor_struct(self.program, class_id, self.federate);
        self.reactions.extend(generate_reactions(
            &self.ctx,
            self.program,
            class_id,
            self.federate,
            &layout,
        )?);
        self.layouts.push(layout);
        Ok(())
    }

    fn collect_instance(&mut self, id: InstanceId, python: bool) -> CodegenResult<()> {
        let program = self.program;
        let tree = &program.tree;
        let instance = tree.get(id);
        let class = program.class_of(id);
        let self_var = self_ref(tree, id);
        let init = &mut self.initialization;

        init.push(format!(
            "// ***** Start initializing {} of class {}",
            tree.full_name(id),
            class.name
        ));
        if python {
            let ty = self_type(class);
            init.push(format!("{ty}* {self_var} = new_{}();", class.name.to_lowercase()));
            init.push(format!(
                "{self_var}->_lf_name = \"{}\";",
                instance_list_name(tree, id)
            ));
            for param in &class.parameters {
                let value = instance
                    .parameter_values
                    .iter()
                    .find(|(n, _)| *n == param.name)
                    .map_or(param.default.as_str(), |(_, v)| v.as_str());
                // Only integers are mirrored natively; others live in Python.
                if let Some(v) = decode_integer(value) {
                    init.push(format!("{self_var}->{} = {v};", param.name));
                }
            }
        }
        init.extend(generate_initializers(program, id, self.federate)?);
        init.extend(generate_timer_initializers(program, id, self.federate)?);
        self.triggers
            .extend(lower_actions(program, id, self.federate)?);
        self.triggers.extend(lower_timers(program, id, self.federate)?);
        let tokens = generate_token_initializers(&mut self.ctx, program, id, self.federate);
        self.initialization.extend(tokens);
        if python {
            self.initialization
                .extend(generate_reaction_linkers(program, id));
        }
        Ok(())
    }

    fn initialize_function(&self) -> String {
        let mut out = String::from("void _lf_initialize_trigger_objects() {\n");
        for stmt in &self.initialization {
            for line in stmt.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('}');
        out
    }

    fn c_source(&self) -> String {
        let federated = self.program.is_federated();
        let mut sections: Vec<String> = Vec::new();
        sections.push(
            generate_c_preamble(self.ctx.config, federated, self.program.federates.len()).join("\n"),
        );
        if !self.serialization.c_preamble.is_empty() {
            sections.push(self.serialization.c_preamble.join("\n"));
        }
        if !self.typedefs.is_empty() {
            sections.push(self.typedefs.join("\n"));
        }
        sections.extend(self.layouts.iter().map(ReactorStruct::declaration));
        sections.extend(self.reactions.iter().cloned());
        sections.extend(self.layouts.iter().map(ReactorStruct::constructor_definition));
        sections.push(self.ctx.tokens.declaration());
        sections.push(self.initialize_function());
        let mut source = sections.join("\n\n");
        source.push('\n');
        source
    }

    fn trigger_table_source(&self) -> String {
        format!(
            "{}\n\n{}\n",
            self.ctx.tokens.declaration(),
            self.initialize_function()
        )
    }

    /// Assemble the artifacts. Consumes the builder.
    pub fn finish(self) -> CodegenResult<FederateArtifacts> {
        let top = &self.top_level_name;
        let triggers_json = serde_json::to_string_pretty(&self.triggers)
            .map_err(|e| CodegenError::Internal(e.to_string()))?;
        let mut artifacts = Vec::new();
        if self.ctx.config.target == Target::Python {
            artifacts.push(Artifact::new(format!("{top}.c"), self.c_source()));
            let module = generate_python_module(
                self.program,
                self.federate,
                &self.classes,
                top,
                &self.python_preamble,
            );
            artifacts.push(Artifact::new(format!("{top}.py"), module));
            let descriptor = BuildDescriptor::new(
                self.ctx.config,
                top,
                &self.serialization.install_requires,
                self.serialization.pre_build.clone(),
            );
            artifacts.push(Artifact::new("setup.py", descriptor.to_setup_py()));
            let json = descriptor
                .to_json()
                .map_err(|e| CodegenError::Internal(e.to_string()))?;
            artifacts.push(Artifact::new("setup.json", json));
        } else {
            artifacts.push(Artifact::new(
                format!("{top}_triggers.c"),
                self.trigger_table_source(),
            ));
        }
        artifacts.push(Artifact::new("triggers.json", triggers_json));

        Ok(FederateArtifacts {
            federate: self.federate.name.clone(),
            top_level_name: self.top_level_name,
            artifacts,
            triggers: self.triggers,
            tokens: self.ctx.tokens,
            diagnostics: self.ctx.diagnostics,
        })
    }
}

/// Targets whose reactions this generator can bridge or lower.
pub fn is_generated_target(target: Target) -> bool {
    matches!(target, Target::Python | Target::C | Target::CCpp)
}

/// Generate one federate from start to finish.
pub fn generate_federate(
    program: &Program,
    config: &TargetConfig,
    tools: &dyn ToolLocator,
    source_dir: Option<&std::path::Path>,
    federate: &FederateInstance,
    base_name: &str,
) -> CodegenResult<FederateArtifacts> {
    let config = federate_config(config, program);
    let name = top_level_name(program, base_name, federate);
    info!("generating federate {name}");
    let mut ctx = GenContext::new(&config, tools);
    if let Some(dir) = source_dir {
        ctx = ctx.with_source_dir(dir);
    }
    let mut builder = FederateBuilder::new(ctx, program, federate, name);
    builder.collect()?;
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex() {
        let d = sha256_hex("");
        assert_eq!(d, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert_eq!(Artifact::new("a.c", "").sha256, d);
    }
}
