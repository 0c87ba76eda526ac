//! Per-compilation-unit generation state.
//!
//! One [`GenContext`] is created for every federate that is generated and
//! dropped when that federate is finalized. Nothing in it outlives the
//! federate, so federates never observe each other's token tables or
//! diagnostics.

use std::collections::HashSet;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use lfc_config::TargetConfig;
use lfc_types::{Diagnostic, Diagnostics, ErrorCode};

use crate::tools::ToolLocator;

// ══════════════════════════════════════════════════════════════════════════════
// Token table
// ══════════════════════════════════════════════════════════════════════════════

/// One row of the runtime's `_lf_tokens_with_ref_count` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// `&<trigger>.token`
    pub token_ref: String,
    /// `&<trigger>.status`
    pub status_ref: String,
    /// Clear the trigger's presence at the start of every time step.
    pub reset_is_present: bool,
}

/// Tokens registered for end-of-step reclamation in one compilation unit.
/// Serialized as the plain list of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TokenEntry>", into = "Vec<TokenEntry>")]
pub struct TokenTable {
    entries: Vec<TokenEntry>,
    registered: HashSet<String>,
}

impl From<Vec<TokenEntry>> for TokenTable {
    fn from(entries: Vec<TokenEntry>) -> Self {
        let mut table = TokenTable::default();
        for entry in entries {
            if table.registered.insert(entry.token_ref.clone()) {
                table.entries.push(entry);
            }
        }
        table
    }
}

impl From<TokenTable> for Vec<TokenEntry> {
    fn from(table: TokenTable) -> Self {
        table.entries
    }
}

impl TokenTable {
    /// Register the token of `trigger` (a trigger struct reference).
    /// Returns `false` if it was already registered.
    pub fn register(&mut self, trigger: &str) -> bool {
        let token_ref = format!("&{trigger}.token");
        if !self.registered.insert(token_ref.clone()) {
            return false;
        }
        self.entries.push(TokenEntry {
            token_ref,
            status_ref: format!("&{trigger}.status"),
            reset_is_present: true,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TokenEntry] {
        &self.entries
    }

    /// The table's declaration. Sized to at least one entry so that the
    /// array stays valid C when nothing is registered.
    pub fn declaration(&self) -> String {
        format!(
            "token_present_t _lf_tokens_with_ref_count[{}];\nint _lf_tokens_with_ref_count_count = 0;",
            self.entries.len().max(1)
        )
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// GenContext
// ══════════════════════════════════════════════════════════════════════════════

pub struct GenContext<'a> {
    pub config: &'a TargetConfig,
    pub tools: &'a dyn ToolLocator,
    /// Directory relative paths of the program (`.proto` files) resolve against.
    pub source_dir: Option<PathBuf>,
    pub tokens: TokenTable,
    pub diagnostics: Diagnostics,
}

impl<'a> GenContext<'a> {
    pub fn new(config: &'a TargetConfig, tools: &'a dyn ToolLocator) -> Self {
        Self {
            config,
            tools,
            source_dir: None,
            tokens: TokenTable::default(),
            diagnostics: Diagnostics::empty(),
        }
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// Record a soft degradation: logged, and kept as a warning diagnostic.
    pub fn degrade(&mut self, code: ErrorCode, subject: &str, message: impl Into<String>) {
        let message = message.into();
        warn!("{subject}: {message}");
        self.diagnostics
            .push(Diagnostic::warning(code, subject, message));
    }
}
