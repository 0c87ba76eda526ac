//! Build descriptor of the Python extension module.
//!
//! Rendered twice: as the `setup.py` setuptools runs, and as JSON for
//! orchestration tooling that wants the same facts without parsing Python.

use serde::{Deserialize, Serialize};

use lfc_config::TargetConfig;

use super::extension_module;

/// Base support package every generated module depends on.
pub const BASE_REQUIREMENT: &str = "LinguaFrancaBase";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    pub module_name: String,
    pub sources: Vec<String>,
    /// `(name, value)` preprocessor macros.
    pub define_macros: Vec<(String, String)>,
    pub install_requires: Vec<String>,
    /// Commands run in the output directory before the extension is built.
    pub pre_build: Vec<Vec<String>>,
}

impl BuildDescriptor {
    /// Descriptor of the extension built from `<top_level_name>.c` plus the
    /// configured additional sources.
    pub fn new(
        config: &TargetConfig,
        top_level_name: &str,
        extra_requires: &[String],
        pre_build: Vec<Vec<String>>,
    ) -> Self {
        let module_name = extension_module(top_level_name);
        let mut sources = vec![format!("{top_level_name}.c")];
        sources.extend(config.file_names.iter().filter(|f| f.ends_with(".c")).cloned());

        let mut define_macros = vec![("MODULE_NAME".to_string(), module_name.clone())];
        if config.threads != 0 || config.tracing_enabled() {
            define_macros.push(("NUMBER_OF_WORKERS".to_string(), config.threads.to_string()));
        }

        let mut install_requires: Vec<String> = extra_requires.to_vec();
        install_requires.push(BASE_REQUIREMENT.to_string());

        Self {
            module_name,
            sources,
            define_macros,
            install_requires,
            pre_build,
        }
    }

    /// The `setup.py` script.
    pub fn to_setup_py(&self) -> String {
        let quote = |s: &String| format!("\"{s}\"");
        let sources: Vec<String> = self.sources.iter().map(quote).collect();
        let macros: Vec<String> = self
            .define_macros
            .iter()
            .map(|(k, v)| format!("(\"{k}\", \"{v}\")"))
            .collect();
        let requires: Vec<String> = self.install_requires.iter().map(quote).collect();
        let ext_var = format!("{}module", self.module_name.to_lowercase());
        [
            "from setuptools import setup, Extension".to_string(),
            String::new(),
            format!("{ext_var} = Extension(\"{}\",", self.module_name),
            format!("                                            sources = [{}],", sources.join(", ")),
            format!("                                            define_macros=[{}])", macros.join(", ")),
            String::new(),
            format!("setup(name=\"{}\", version=\"1.0\",", self.module_name),
            format!("        ext_modules = [{ext_var}],"),
            format!("        install_requires=[{}])", requires.join(", ")),
        ]
        .join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfc_config::{Target, TracingOptions};

    #[test]
    fn unthreaded_module_has_only_the_name_macro() {
        let config = TargetConfig::new(Target::Python);
        let d = BuildDescriptor::new(&config, "Hello", &[], Vec::new());
        assert_eq!(d.module_name, "LinguaFrancaHello");
        assert_eq!(d.define_macros, vec![("MODULE_NAME".to_string(), "LinguaFrancaHello".to_string())]);
        assert_eq!(d.install_requires, vec!["LinguaFrancaBase"]);
        let py = d.to_setup_py();
        assert!(py.contains("linguafrancahellomodule = Extension(\"LinguaFrancaHello\","));
        assert!(py.contains("sources = [\"Hello.c\"],"));
        assert!(py.ends_with("install_requires=[\"LinguaFrancaBase\"])"));
    }

    #[test]
    fn tracing_adds_worker_count() {
        let mut config = TargetConfig::new(Target::Python);
        config.tracing = Some(TracingOptions::default());
        let d = BuildDescriptor::new(&config, "Hello", &[], Vec::new());
        assert_eq!(d.define_macros[1], ("NUMBER_OF_WORKERS".to_string(), "0".to_string()));
    }

    #[test]
    fn proto_requirement_precedes_base() {
        let mut config = TargetConfig::new(Target::Python);
        config.threads = 2;
        let d = BuildDescriptor::new(&config, "Fed_src", &["google-api-python-client".to_string()], Vec::new());
        assert_eq!(d.install_requires, vec!["google-api-python-client", "LinguaFrancaBase"]);
        assert!(d.to_setup_py().contains("(\"NUMBER_OF_WORKERS\", \"2\")"));
        let back: BuildDescriptor = serde_json::from_str(&d.to_json().unwrap()).unwrap();
        assert_eq!(back, d);
    }
}
