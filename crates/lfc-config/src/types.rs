//! The target-property type system.
//!
//! Every property declares a [`PropertyType`]. Four families exist:
//! primitives (validated by a predicate over the raw element), homogeneous
//! arrays, unions (first matching option wins) and dictionaries (a fixed set
//! of typed keys). `validate` is a pure predicate; `check` reports every
//! problem as a [`Diagnostic`] without aborting.

use std::fmt;
use std::path::Path;

use lfc_types::element::decode_integer;
use lfc_types::lookup::{match_ignore_case, Named};
use lfc_types::{Diagnostic, Element, ErrorCode};

use crate::config::{BuildType, ClockSyncMode, CoordinationType, LogLevel};

// ══════════════════════════════════════════════════════════════════════════════
// Check context
// ══════════════════════════════════════════════════════════════════════════════

/// Environment consulted by checks that look beyond the element itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckContext<'a> {
    /// Directory relative file paths are resolved against.
    pub base_dir: Option<&'a Path>,
}

impl<'a> CheckContext<'a> {
    pub fn new(base_dir: &'a Path) -> Self {
        Self {
            base_dir: Some(base_dir),
        }
    }

    pub fn file_exists(&self, file: &str) -> bool {
        let path = Path::new(file);
        if path.is_absolute() {
            return path.exists();
        }
        match self.base_dir {
            Some(dir) => dir.join(path).exists(),
            None => path.exists(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// PropertyType
// ══════════════════════════════════════════════════════════════════════════════

/// Shared behavior of all property types.
pub trait PropertyType: Send + Sync {
    /// Whether `element` conforms to this type.
    fn validate(&self, element: &Element) -> bool;

    /// Report every nonconformance of `element`, attributing diagnostics to
    /// the property (or dictionary key path) `name`.
    fn check(&self, element: &Element, name: &str, ctx: &CheckContext<'_>) -> Vec<Diagnostic>;

    /// Human-readable description used in diagnostics.
    fn description(&self) -> String;
}

impl fmt::Debug for dyn PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// The uniform type-mismatch diagnostic.
pub fn type_error(name: &str, description: &str) -> Diagnostic {
    Diagnostic::error(
        ErrorCode::PROPERTY_TYPE_MISMATCH,
        name,
        format!("Target property '{name}' is required to be {description}."),
    )
}

// ══════════════════════════════════════════════════════════════════════════════
// Primitives
// ══════════════════════════════════════════════════════════════════════════════

/// A primitive type: a name, a description and a validator.
pub struct PrimitiveType {
    pub name: &'static str,
    description: &'static str,
    validator: fn(&Element) -> bool,
    /// Values name files that should exist on disk.
    is_file: bool,
}

impl PrimitiveType {
    const fn new(name: &'static str, description: &'static str, validator: fn(&Element) -> bool) -> Self {
        Self {
            name,
            description,
            validator,
            is_file: false,
        }
    }
}

impl PropertyType for PrimitiveType {
    fn validate(&self, element: &Element) -> bool {
        (self.validator)(element)
    }

    fn check(&self, element: &Element, name: &str, ctx: &CheckContext<'_>) -> Vec<Diagnostic> {
        if !self.validate(element) {
            return vec![type_error(name, self.description)];
        }
        let file = element.to_text();
        if self.is_file && !ctx.file_exists(&file) {
            return vec![Diagnostic::warning(
                ErrorCode::FILE_NOT_FOUND,
                name,
                format!("Could not find file: '{file}'."),
            )];
        }
        Vec::new()
    }

    fn description(&self) -> String {
        self.description.to_string()
    }
}

fn is_boolean(e: &Element) -> bool {
    matches!(e.to_text().to_ascii_lowercase().as_str(), "true" | "false")
}

fn is_integer(e: &Element) -> bool {
    e.is_literal() && decode_integer(&e.to_text()).is_some()
}

fn is_non_negative_integer(e: &Element) -> bool {
    e.is_literal() && decode_integer(&e.to_text()).is_some_and(|n| n >= 0)
}

fn is_time_value(e: &Element) -> bool {
    e.to_time_value().is_some()
}

fn is_string(e: &Element) -> bool {
    e.is_literal() || e.is_id()
}

pub static BOOLEAN: PrimitiveType = PrimitiveType::new("BOOLEAN", "'true' or 'false'", is_boolean);
pub static INTEGER: PrimitiveType = PrimitiveType::new("INTEGER", "an integer", is_integer);
pub static NON_NEGATIVE_INTEGER: PrimitiveType =
    PrimitiveType::new("NON_NEGATIVE_INTEGER", "a non-negative integer", is_non_negative_integer);
pub static TIME_VALUE: PrimitiveType =
    PrimitiveType::new("TIME_VALUE", "a time value with units", is_time_value);
pub static STRING: PrimitiveType = PrimitiveType::new("STRING", "a string", is_string);
pub static FILE: PrimitiveType = PrimitiveType {
    is_file: true,
    ..PrimitiveType::new("FILE", "a path to a file", is_string)
};

// ══════════════════════════════════════════════════════════════════════════════
// Arrays
// ══════════════════════════════════════════════════════════════════════════════

/// A homogeneous array of one element type.
pub struct ArrayType {
    pub name: &'static str,
    pub element_type: &'static dyn PropertyType,
}

impl PropertyType for ArrayType {
    fn validate(&self, element: &Element) -> bool {
        element
            .as_array()
            .is_some_and(|items| items.iter().all(|e| self.element_type.validate(e)))
    }

    fn check(&self, element: &Element, name: &str, ctx: &CheckContext<'_>) -> Vec<Diagnostic> {
        match element.as_array() {
            None => vec![type_error(name, &self.description())],
            Some(items) => items
                .iter()
                .enumerate()
                .flat_map(|(i, e)| self.element_type.check(e, &format!("{name}[{i}]"), ctx))
                .collect(),
        }
    }

    fn description(&self) -> String {
        format!(
            "an array of which each element is {}",
            self.element_type.description()
        )
    }
}

pub static STRING_ARRAY: ArrayType = ArrayType {
    name: "STRING_ARRAY",
    element_type: &STRING,
};
pub static FILE_ARRAY: ArrayType = ArrayType {
    name: "FILE_ARRAY",
    element_type: &FILE,
};

// ══════════════════════════════════════════════════════════════════════════════
// Unions
// ══════════════════════════════════════════════════════════════════════════════

/// One alternative of a union: a nested type or a literal keyword.
pub enum UnionOption {
    Type(&'static dyn PropertyType),
    Literal(&'static str),
}

impl UnionOption {
    fn matches(&self, element: &Element) -> bool {
        match self {
            UnionOption::Type(ty) => ty.validate(element),
            UnionOption::Literal(word) => {
                (element.is_id() || element.is_literal())
                    && element.to_text().eq_ignore_ascii_case(word)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            UnionOption::Type(ty) => ty.description(),
            UnionOption::Literal(word) => (*word).to_string(),
        }
    }
}

/// An ordered list of alternatives with an optional default.
pub struct UnionType {
    pub name: &'static str,
    pub options: &'static [UnionOption],
    /// Index of the default option.
    pub default: Option<usize>,
}

impl UnionType {
    /// The first option that `element` conforms to.
    pub fn match_option(&self, element: &Element) -> Option<&UnionOption> {
        self.options.iter().find(|o| o.matches(element))
    }

    /// The literal option spelled `name`, ignoring case.
    pub fn for_name(&self, name: &str) -> Option<&'static str> {
        let literals: Vec<&'static str> = self
            .options
            .iter()
            .filter_map(|o| match o {
                UnionOption::Literal(word) => Some(*word),
                UnionOption::Type(_) => None,
            })
            .collect();
        match_ignore_case(name, &literals).copied()
    }

    pub fn default_option(&self) -> Option<&UnionOption> {
        self.default.and_then(|i| self.options.get(i))
    }
}

impl PropertyType for UnionType {
    fn validate(&self, element: &Element) -> bool {
        self.match_option(element).is_some()
    }

    fn check(&self, element: &Element, name: &str, ctx: &CheckContext<'_>) -> Vec<Diagnostic> {
        match self.match_option(element) {
            Some(UnionOption::Type(ty)) => ty.check(element, name, ctx),
            Some(UnionOption::Literal(_)) => Vec::new(),
            None => vec![type_error(name, &self.description())],
        }
    }

    fn description(&self) -> String {
        let options: Vec<String> = self
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| {
                if self.default == Some(i) {
                    format!("{} (default)", o.describe())
                } else {
                    o.describe()
                }
            })
            .collect();
        format!("one of the following: {}", options.join(", "))
    }
}

pub static STRING_OR_STRING_ARRAY: UnionType = UnionType {
    name: "STRING_OR_STRING_ARRAY",
    options: &[UnionOption::Type(&STRING), UnionOption::Type(&STRING_ARRAY)],
    default: None,
};

pub static FILE_OR_FILE_ARRAY: UnionType = UnionType {
    name: "FILE_OR_FILE_ARRAY",
    options: &[UnionOption::Type(&FILE), UnionOption::Type(&FILE_ARRAY)],
    default: None,
};

pub static BUILD_TYPE_UNION: UnionType = UnionType {
    name: "BUILD_TYPE_UNION",
    options: &[
        UnionOption::Literal(BuildType::Release.alias()),
        UnionOption::Literal(BuildType::Debug.alias()),
        UnionOption::Literal(BuildType::RelWithDebInfo.alias()),
        UnionOption::Literal(BuildType::MinSizeRel.alias()),
    ],
    default: None,
};

pub static CLOCK_SYNC_UNION: UnionType = UnionType {
    name: "CLOCK_SYNC_UNION",
    options: &[
        UnionOption::Literal(ClockSyncMode::Off.alias()),
        UnionOption::Literal(ClockSyncMode::Initial.alias()),
        UnionOption::Literal(ClockSyncMode::On.alias()),
    ],
    default: Some(1),
};

pub static COORDINATION_UNION: UnionType = UnionType {
    name: "COORDINATION_UNION",
    options: &[
        UnionOption::Literal(CoordinationType::Centralized.alias()),
        UnionOption::Literal(CoordinationType::Decentralized.alias()),
    ],
    default: Some(0),
};

pub static LOGGING_UNION: UnionType = UnionType {
    name: "LOGGING_UNION",
    options: &[
        UnionOption::Literal(LogLevel::Error.alias()),
        UnionOption::Literal(LogLevel::Warn.alias()),
        UnionOption::Literal(LogLevel::Info.alias()),
        UnionOption::Literal(LogLevel::Log.alias()),
        UnionOption::Literal(LogLevel::Debug.alias()),
    ],
    default: Some(2),
};

// ══════════════════════════════════════════════════════════════════════════════
// Dictionaries
// ══════════════════════════════════════════════════════════════════════════════

/// A typed key of a dictionary.
pub struct DictionaryEntry {
    pub key: &'static str,
    pub ty: &'static dyn PropertyType,
}

impl Named for DictionaryEntry {
    fn name(&self) -> &str {
        self.key
    }
}

/// A fixed set of keys, each with its own type.
pub struct DictionaryType {
    pub name: &'static str,
    pub entries: &'static [DictionaryEntry],
}

impl DictionaryType {
    pub fn for_name(&self, key: &str) -> Option<&'static DictionaryEntry> {
        match_ignore_case(key, self.entries)
    }
}

impl PropertyType for DictionaryType {
    fn validate(&self, element: &Element) -> bool {
        element.as_key_value().is_some()
    }

    fn check(&self, element: &Element, name: &str, ctx: &CheckContext<'_>) -> Vec<Diagnostic> {
        let Some(pairs) = element.as_key_value() else {
            return vec![type_error(name, &self.description())];
        };
        let mut diagnostics = Vec::new();
        for pair in pairs {
            let path = format!("{name}.{}", pair.name);
            match self.for_name(&pair.name) {
                Some(entry) => diagnostics.extend(entry.ty.check(&pair.value, &path, ctx)),
                None => diagnostics.push(Diagnostic::error(
                    ErrorCode::PROPERTY_TYPE_MISMATCH,
                    &path,
                    format!(
                        "Unknown key '{}'. Target property '{name}' is required to be {}.",
                        pair.name,
                        self.description()
                    ),
                )),
            }
        }
        diagnostics
    }

    fn description(&self) -> String {
        let keys: Vec<&str> = self.entries.iter().map(|e| e.key).collect();
        format!(
            "a dictionary with one or more of the following keys: {}",
            keys.join(", ")
        )
    }
}

pub static CLOCK_SYNC_OPTION_DICT: DictionaryType = DictionaryType {
    name: "CLOCK_SYNC_OPTION_DICT",
    entries: &[
        DictionaryEntry {
            key: "attenuation",
            ty: &NON_NEGATIVE_INTEGER,
        },
        DictionaryEntry {
            key: "local-federates-on",
            ty: &BOOLEAN,
        },
        DictionaryEntry {
            key: "period",
            ty: &TIME_VALUE,
        },
        DictionaryEntry {
            key: "test-offset",
            ty: &TIME_VALUE,
        },
        DictionaryEntry {
            key: "trials",
            ty: &NON_NEGATIVE_INTEGER,
        },
        DictionaryEntry {
            key: "collect-stats",
            ty: &BOOLEAN,
        },
    ],
};
