//! Native preamble of the generated extension source.

use lfc_config::{CoordinationType, TargetConfig};

/// Directives selecting the federated runtime.
pub fn federated_directive(coordination: CoordinationType) -> Vec<String> {
    let mode = match coordination {
        CoordinationType::Centralized => "FEDERATED_CENTRALIZED",
        CoordinationType::Decentralized => "FEDERATED_DECENTRALIZED",
    };
    vec!["#define FEDERATED".to_string(), format!("#define {mode}")]
}

/// Defines and includes opening the C file of one federate.
pub fn generate_c_preamble(config: &TargetConfig, federated: bool, federate_count: usize) -> Vec<String> {
    let mut out = vec![format!("#define LOG_LEVEL {}", config.log_level.runtime_level())];
    if federated {
        out.extend(federated_directive(config.coordination));
    }
    out.push("#define _LF_GARBAGE_COLLECTED".to_string());
    if let Some(tracing) = &config.tracing {
        let file = tracing.trace_file_name.as_deref().unwrap_or_default();
        out.push(format!("#define LINGUA_FRANCA_TRACE {file}").trim_end().to_string());
    }
    out.push("#include \"pythontarget.c\"".to_string());
    if config.tracing.is_some() {
        out.push("#include \"core/trace.c\"".to_string());
    }
    out.push(format!("#define NUMBER_OF_FEDERATES {federate_count}"));
    out
}
