use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of errors stored before further errors are only counted.
pub const MAX_ERRORS: usize = 20;

/// Diagnostic severity.
///
/// Warnings never block artifact emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic category, determined by code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// A configuration value does not conform to its declared type, or a
    /// property name has no match.
    Validation,
    /// Generated layout or linkage cannot be verified; the affected scope
    /// emits nothing.
    Structural,
    /// An optional capability is missing; the feature is omitted.
    Degradation,
}

/// Numeric diagnostic code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Validation (E100–E199) ──
    pub const UNKNOWN_PROPERTY: Self = Self(100);
    pub const PROPERTY_TYPE_MISMATCH: Self = Self(101);
    pub const UNSUPPORTED_PROPERTY: Self = Self(102);
    pub const UNKNOWN_TARGET: Self = Self(103);

    // ── Structural (E200–E299) ──
    pub const UNRESOLVED_STRUCT_FIELD: Self = Self(200);
    pub const MISSING_SERIALIZER: Self = Self(201);
    pub const UNRESOLVED_MODE: Self = Self(202);
    pub const UNKNOWN_REACTOR_CLASS: Self = Self(203);
    /// A consistency check inside the generator failed.
    pub const INTERNAL: Self = Self(299);

    // ── Soft degradations (E300–E399) ──
    pub const FILE_NOT_FOUND: Self = Self(300);
    pub const MISSING_TOOL: Self = Self(301);
    pub const CAPABILITY_OMITTED: Self = Self(302);

    /// Get the category for this code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Validation,
            200..=299 => ErrorCategory::Structural,
            300..=399 => ErrorCategory::Degradation,
            _ => ErrorCategory::Validation,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured diagnostic.
///
/// Every diagnostic names the `subject` it is attached to (a property path
/// such as `clock-sync-options.period`, a reactor class, an action's full
/// name, or a federate) so tooling can point at the originating element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub category: ErrorCategory,
    pub message: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    /// Create an error attached to `subject`.
    pub fn error(code: ErrorCode, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            subject: subject.into(),
            span: None,
        }
    }

    /// Create a warning attached to `subject`.
    pub fn warning(code: ErrorCode, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, subject, message)
        }
    }

    /// Attach a source location.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span {
            write!(f, "{span}: ")?;
        }
        write!(
            f,
            "{} [{}] {}: {}",
            self.code, self.category, self.subject, self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Structural => write!(f, "structural"),
            Self::Degradation => write!(f, "degradation"),
        }
    }
}

/// Accumulated errors and warnings of one compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl Diagnostics {
    /// Create an empty result (no diagnostics).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add a diagnostic, routing it by severity.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                if self.errors.len() < MAX_ERRORS {
                    self.errors.push(diagnostic);
                }
                self.total_errors += 1;
            }
            Severity::Warning => {
                self.warnings.push(diagnostic);
                self.total_warnings += 1;
            }
        }
    }

    /// Move every diagnostic of `other` into `self`.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        for d in other {
            self.push(d);
        }
    }

    /// Merge another accumulator, keeping its totals even for dropped errors.
    pub fn merge(&mut self, other: Diagnostics) {
        let dropped = other.total_errors - other.errors.len();
        self.extend(other.errors);
        self.extend(other.warnings);
        self.total_errors += dropped;
    }

    /// Iterate errors then warnings.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::UNKNOWN_PROPERTY.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ErrorCode::MISSING_SERIALIZER.category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            ErrorCode::FILE_NOT_FOUND.category(),
            ErrorCategory::Degradation
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::PROPERTY_TYPE_MISMATCH), "E101");
        assert_eq!(format!("{}", ErrorCode::UNRESOLVED_STRUCT_FIELD), "E200");
        assert_eq!(format!("{}", ErrorCode::INTERNAL), "E299");
    }

    #[test]
    fn test_warning_keeps_code_category() {
        let w = Diagnostic::warning(ErrorCode::UNSUPPORTED_PROPERTY, "tracing", "ignored");
        assert_eq!(w.severity, Severity::Warning);
        assert_eq!(w.category, ErrorCategory::Validation);
        assert!(!w.is_error());
    }

    #[test]
    fn test_diagnostic_display_with_span() {
        let d = Diagnostic::error(ErrorCode::UNKNOWN_PROPERTY, "bogus", "Unknown target property")
            .with_span(Span::point(2, 9));
        assert_eq!(
            d.to_string(),
            "2:9: E100 [validation] bogus: Unknown target property"
        );
    }

    #[test]
    fn test_diagnostics_max_limit() {
        let mut diags = Diagnostics::empty();
        for i in 0..25 {
            diags.push(Diagnostic::error(
                ErrorCode::PROPERTY_TYPE_MISMATCH,
                format!("p{i}"),
                "bad",
            ));
        }
        assert_eq!(diags.errors.len(), 20);
        assert_eq!(diags.total_errors, 25);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_diagnostics_merge_keeps_dropped_count() {
        let mut a = Diagnostics::empty();
        let mut b = Diagnostics::empty();
        for i in 0..22 {
            b.push(Diagnostic::error(ErrorCode::UNKNOWN_PROPERTY, format!("k{i}"), "x"));
        }
        b.push(Diagnostic::warning(ErrorCode::FILE_NOT_FOUND, "files", "y"));
        a.merge(b);
        assert_eq!(a.total_errors, 22);
        assert_eq!(a.errors.len(), 20);
        assert_eq!(a.total_warnings, 1);
    }

    #[test]
    fn test_diagnostics_json_output() {
        let mut diags = Diagnostics::empty();
        diags.push(Diagnostic::warning(
            ErrorCode::FILE_NOT_FOUND,
            "files[0]",
            "Could not find file: 'a.py'.",
        ));
        let json = serde_json::to_string(&diags).unwrap();
        assert!(json.contains("\"total_errors\":0"));
        assert!(json.contains("\"total_warnings\":1"));
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(!json.contains("\"span\""));
    }
}
