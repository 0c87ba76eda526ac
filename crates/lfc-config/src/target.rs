//! Code-generation targets and their static descriptors.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use lfc_types::lookup::{match_ignore_case, Named};

use crate::property::{TargetProperty, TARGET_PROPERTIES};

// ══════════════════════════════════════════════════════════════════════════════
// Reserved words
// ══════════════════════════════════════════════════════════════════════════════

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic", "_Bool",
    "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "atomic_cancel", "atomic_commit",
    "atomic_noexcept", "auto", "bitand", "bitor", "bool", "break", "case", "catch", "char",
    "char8_t", "char16_t", "char32_t", "class", "compl", "concept", "const", "consteval",
    "constexpr", "constinit", "const_cast", "continue", "co_await", "co_return", "co_yield",
    "decltype", "default", "delete", "do", "double", "dynamic_cast", "else", "enum", "explicit",
    "export", "extern", "false", "float", "for", "friend", "goto", "if", "inline", "int", "long",
    "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr", "operator", "or",
    "or_eq", "private", "protected", "public", "reflexpr", "register", "reinterpret_cast",
    "requires", "return", "short", "signed", "sizeof", "static", "static_assert", "static_cast",
    "struct", "switch", "synchronized", "template", "this", "thread_local", "throw", "true",
    "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "wchar_t", "while", "xor", "xor_eq",
];

const TS_KEYWORDS: &[&str] = &[
    // reserved
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with",
    // strict mode
    "as", "implements", "interface", "let", "package", "private", "protected", "public",
    "static", "yield",
    // contextual
    "any", "boolean", "constructor", "declare", "get", "module", "require", "number", "set",
    "string", "symbol", "type", "from", "of",
];

// Python reactions compile against the C runtime, so C keywords are reserved too.
const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "auto", "break", "case", "char", "class", "const", "continue", "def",
    "default", "del", "do", "double", "elif", "else", "enum", "except", "extern", "False",
    "finally", "float", "for", "from", "global", "goto", "if", "import", "inline", "int", "in",
    "is", "lambda", "long", "None", "nonlocal", "not", "or", "pass", "raise", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "True",
    "try", "typedef", "union", "unsigned", "void", "volatile", "while", "with", "yield",
    "_Alignas", "_Alignof", "_Atomic", "_Bool", "_Complex", "_Generic", "_Imaginary",
    "_Noreturn", "_Static_assert", "_Thread_local",
];

// ══════════════════════════════════════════════════════════════════════════════
// Target
// ══════════════════════════════════════════════════════════════════════════════

/// A code-generation target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    C,
    CCpp,
    Cpp,
    TypeScript,
    Python,
}

impl Target {
    /// All targets, in declaration order.
    pub const ALL: [Target; 5] = [
        Self::C,
        Self::CCpp,
        Self::Cpp,
        Self::TypeScript,
        Self::Python,
    ];

    /// The name used in `target <Name>` declarations.
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::CCpp => "CCpp",
            Self::Cpp => "Cpp",
            Self::TypeScript => "TypeScript",
            Self::Python => "Python",
        }
    }

    /// Case-insensitive lookup; the first declared target wins.
    pub fn for_name(name: &str) -> Option<Self> {
        match_ignore_case(name, &Self::ALL).copied()
    }

    pub fn has_for_name(name: &str) -> bool {
        Self::for_name(name).is_some()
    }

    /// Whether programs in this target must annotate ports, actions and
    /// parameters with types.
    pub const fn requires_types(self) -> bool {
        !matches!(self, Self::TypeScript | Self::Python)
    }

    pub fn descriptor(self) -> &'static TargetDescriptor {
        &DESCRIPTORS[self as usize]
    }

    pub fn is_reserved(self, word: &str) -> bool {
        self.descriptor().reserved_words.contains(word)
    }

    /// Make `name` usable as an identifier in generated code by appending
    /// `_` to reserved words.
    pub fn sanitize_identifier(self, name: &str) -> String {
        if self.is_reserved(name) {
            format!("{name}_")
        } else {
            name.to_string()
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::C | Self::CCpp => C_KEYWORDS,
            Self::Cpp => CPP_KEYWORDS,
            Self::TypeScript => TS_KEYWORDS,
            Self::Python => PYTHON_KEYWORDS,
        }
    }
}

impl Named for Target {
    fn name(&self) -> &str {
        self.identifier()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TargetDescriptor
// ══════════════════════════════════════════════════════════════════════════════

/// Immutable, process-wide facts about one target.
#[derive(Debug)]
pub struct TargetDescriptor {
    pub target: Target,
    pub identifier: &'static str,
    pub requires_types: bool,
    pub reserved_words: HashSet<&'static str>,
    /// Properties this target accepts, in table order.
    pub properties: Vec<&'static TargetProperty>,
}

impl TargetDescriptor {
    fn build(target: Target) -> Self {
        Self {
            target,
            identifier: target.identifier(),
            requires_types: target.requires_types(),
            reserved_words: target.keywords().iter().copied().collect(),
            properties: TARGET_PROPERTIES
                .iter()
                .filter(|p| p.supports(target))
                .collect(),
        }
    }

    pub fn accepts(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p.name == property)
    }
}

static DESCRIPTORS: Lazy<Vec<TargetDescriptor>> =
    Lazy::new(|| Target::ALL.iter().map(|t| TargetDescriptor::build(*t)).collect());
