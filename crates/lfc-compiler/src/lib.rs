//! LFC compiler: orchestrates the code-generation pipeline.
//!
//! ```text
//! target properties → configure → per-federate lowering + bridge → artifacts + manifest
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lfc_compiler::{compile, write_artifacts, CompileOptions};
//!
//! let result = compile(&program, &program.properties, &CompileOptions::default());
//! if result.success {
//!     write_artifacts(&result, Path::new("src-gen"))?;
//! }
//! ```

mod error;
pub mod orchestration;

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use lfc_codegen::{
    generate_federate, is_generated_target, CodegenError, FederateArtifacts, SearchPath,
    ToolLocator,
};
use lfc_config::{configure_named, CheckContext, TargetConfig};
use lfc_types::model::Program;
use lfc_types::{Diagnostic, Diagnostics, ErrorCode, KeyValuePair};

pub use error::{CompileError, CompilerResult};
pub use orchestration::{classify_exit, ExecutionOutcome, Orchestrator, DEFAULT_TIMEOUT};

/// Name of the manifest written next to each federate's artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

// ══════════════════════════════════════════════════════════════════════════════
// Options
// ══════════════════════════════════════════════════════════════════════════════

/// Generator settings that are not target properties.
pub struct CompileOptions {
    /// Directory relative paths in properties (files, protobufs) resolve against.
    pub source_dir: Option<PathBuf>,
    /// Base name of the generated files. Defaults to the program name.
    pub base_name: Option<String>,
    pub tools: Box<dyn ToolLocator>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_dir: None,
            base_name: None,
            tools: Box::new(SearchPath),
        }
    }
}

impl CompileOptions {
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = Some(name.into());
        self
    }

    pub fn with_tools(mut self, tools: impl ToolLocator + 'static) -> Self {
        self.tools = Box::new(tools);
        self
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Result
// ══════════════════════════════════════════════════════════════════════════════

/// What became of one federate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FederateOutput {
    Generated(FederateArtifacts),
    /// A structural fault stopped this federate; others are unaffected.
    Suppressed { federate: String, reason: Diagnostic },
}

impl FederateOutput {
    pub fn federate(&self) -> &str {
        match self {
            FederateOutput::Generated(artifacts) => &artifacts.federate,
            FederateOutput::Suppressed { federate, .. } => federate,
        }
    }

    pub fn artifacts(&self) -> Option<&FederateArtifacts> {
        match self {
            FederateOutput::Generated(artifacts) => Some(artifacts),
            FederateOutput::Suppressed { .. } => None,
        }
    }
}

/// Result of one compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    pub success: bool,
    /// The normalized configuration, absent when the target was rejected.
    pub config: Option<TargetConfig>,
    /// One entry per federate, in declaration order.
    pub federates: Vec<FederateOutput>,
    pub diagnostics: Diagnostics,
}

impl CompileResult {
    fn failed(config: Option<TargetConfig>, diagnostics: Diagnostics) -> Self {
        Self {
            success: false,
            config,
            federates: Vec::new(),
            diagnostics,
        }
    }

    /// Artifacts of every federate that was generated.
    pub fn generated(&self) -> impl Iterator<Item = &FederateArtifacts> {
        self.federates.iter().filter_map(FederateOutput::artifacts)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Pipeline
// ══════════════════════════════════════════════════════════════════════════════

/// Compile `program` with the target properties `properties`.
///
/// Only an unknown or ungenerated target stops the compilation up front.
/// Invalid properties are reported and otherwise ignored; every federate
/// is then generated on its own in declaration order.
/// A structural fault suppresses only its federate, except an unresolvable
/// struct field, which leaves the memory layout of a reactor class
/// undefined and aborts the whole compilation.
pub fn compile(program: &Program, properties: &[KeyValuePair], options: &CompileOptions) -> CompileResult {
    info!("compiling {} for target {}", program.name, program.target);
    let check = CheckContext {
        base_dir: options.source_dir.as_deref(),
    };
    let configured = match configure_named(&program.target, properties, &check) {
        Ok(configured) => configured,
        Err(err) => {
            let mut diagnostics = Diagnostics::empty();
            diagnostics.push(err.to_diagnostic());
            return CompileResult::failed(None, diagnostics);
        }
    };
    let config = configured.config;
    let mut diagnostics = configured.diagnostics;

    if !is_generated_target(config.target) {
        let err = CompileError::UnsupportedTarget(config.target);
        diagnostics.push(Diagnostic::error(
            ErrorCode::UNKNOWN_TARGET,
            config.target.to_string(),
            err.to_string(),
        ));
        return CompileResult::failed(Some(config), diagnostics);
    }
    if diagnostics.has_errors() {
        warn!("{} configuration error(s); generating anyway", diagnostics.total_errors);
    }

    let base_name = options.base_name.as_deref().unwrap_or(&program.name);
    let mut federates = Vec::with_capacity(program.federates.len());
    for federate in &program.federates {
        match generate_federate(
            program,
            &config,
            options.tools.as_ref(),
            options.source_dir.as_deref(),
            federate,
            base_name,
        ) {
            Ok(artifacts) => {
                diagnostics.merge(artifacts.diagnostics.clone());
                federates.push(FederateOutput::Generated(artifacts));
            }
            Err(err @ CodegenError::UnresolvedStructField { .. }) => {
                warn!("{err}; aborting compilation");
                diagnostics.push(err.to_diagnostic());
                return CompileResult::failed(Some(config), diagnostics);
            }
            Err(err) => {
                warn!("suppressing federate '{}': {err}", federate.name);
                let reason = err.to_diagnostic();
                diagnostics.push(reason.clone());
                federates.push(FederateOutput::Suppressed {
                    federate: federate.name.clone(),
                    reason,
                });
            }
        }
    }

    CompileResult {
        success: !diagnostics.has_errors(),
        config: Some(config),
        federates,
        diagnostics,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Output
// ══════════════════════════════════════════════════════════════════════════════

/// Directory the artifacts of `federate` are written to: `out_dir` itself
/// for an unfederated program, `<out_dir>/<federate>` otherwise.
pub fn federate_dir(out_dir: &Path, federate: &FederateArtifacts) -> PathBuf {
    if federate.federate.is_empty() {
        out_dir.to_path_buf()
    } else {
        out_dir.join(&federate.federate)
    }
}

fn write_file(path: &Path, contents: &str) -> CompilerResult<()> {
    fs::write(path, contents).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write every generated federate with its manifest. Suppressed federates
/// are skipped. Returns the paths written, in order.
pub fn write_artifacts(result: &CompileResult, out_dir: &Path) -> CompilerResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for federate in result.generated() {
        let dir = federate_dir(out_dir, federate);
        fs::create_dir_all(&dir).map_err(|source| CompileError::Io {
            path: dir.clone(),
            source,
        })?;
        for artifact in &federate.artifacts {
            let path = dir.join(&artifact.path);
            write_file(&path, &artifact.contents)?;
            written.push(path);
        }
        let manifest = serde_json::to_string_pretty(&federate.manifest())?;
        let path = dir.join(MANIFEST_FILE);
        write_file(&path, &manifest)?;
        written.push(path);
        info!("wrote federate {} to {}", federate.top_level_name, dir.display());
    }
    Ok(written)
}
