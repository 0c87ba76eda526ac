//! Indentation-aware text buffer for generated sources.

use std::fmt;

const INDENT: &str = "    ";

/// Accumulates generated code line by line at the current indentation.
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    code: String,
    indent: usize,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text`, one output line per input line, each at the current
    /// indentation. Blank lines stay blank.
    pub fn pr(&mut self, text: impl AsRef<str>) -> &mut Self {
        for line in text.as_ref().lines() {
            if line.trim().is_empty() {
                self.code.push('\n');
            } else {
                for _ in 0..self.indent {
                    self.code.push_str(INDENT);
                }
                self.code.push_str(line);
                self.code.push('\n');
            }
        }
        self
    }

    /// Append every item of `lines`.
    pub fn pr_all<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.pr(line);
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.code.push('\n');
        self
    }

    pub fn indent(&mut self) -> &mut Self {
        self.indent += 1;
        self
    }

    pub fn unindent(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn into_string(self) -> String {
        self.code
    }
}

impl fmt::Display for CodeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_every_line_of_a_block() {
        let mut b = CodeBuilder::new();
        b.pr("void f() {").indent().pr("int x;\nx = 1;").unindent().pr("}");
        assert_eq!(b.as_str(), "void f() {\n    int x;\n    x = 1;\n}\n");
    }

    #[test]
    fn blank_lines_carry_no_indentation() {
        let mut b = CodeBuilder::new();
        b.indent().pr("a\n\nb");
        assert_eq!(b.into_string(), "    a\n\n    b\n");
    }

    #[test]
    fn unindent_saturates() {
        let mut b = CodeBuilder::new();
        b.unindent().pr("x");
        assert_eq!(b.to_string(), "x\n");
    }
}
