//! Locating external tools the generated build depends on.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

/// Resolves an executable name to a path, if it is installed.
pub trait ToolLocator {
    fn find(&self, tool: &str) -> Option<PathBuf>;
}

/// Searches the directories of the `PATH` environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchPath;

impl ToolLocator for SearchPath {
    fn find(&self, tool: &str) -> Option<PathBuf> {
        let path = env::var_os("PATH")?;
        env::split_paths(&path)
            .map(|dir| dir.join(tool))
            .find(|candidate| candidate.is_file())
    }
}

/// A fixed tool table, for tests and hermetic builds.
#[derive(Debug, Clone, Default)]
pub struct FixedTools {
    tools: BTreeMap<String, PathBuf>,
}

impl FixedTools {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: &str, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(tool.to_string(), path.into());
        self
    }
}

impl ToolLocator for FixedTools {
    fn find(&self, tool: &str) -> Option<PathBuf> {
        self.tools.get(tool).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_tools_resolve_only_registered_names() {
        let tools = FixedTools::none().with("protoc", "/opt/bin/protoc");
        assert_eq!(tools.find("protoc"), Some(PathBuf::from("/opt/bin/protoc")));
        assert_eq!(tools.find("cmake"), None);
    }

    #[test]
    fn search_path_misses_nonsense() {
        assert_eq!(SearchPath.find("definitely-not-a-real-tool-xyz"), None);
    }
}
