//! Error taxonomy and accumulation for the pub/sub resource pipeline.
//!
//! Validators never fail through the call stack: they report into an
//! [`ErrorSink`] and return `None`/`false` so scanning can continue with the
//! next candidate. The sink preserves insertion order and merges
//! deterministically across parallel scan workers.

use serde::Serialize;
use thiserror::Error;

/// Stable source position: file path plus 1-based line and column.
///
/// Carried by every resource and every error instead of AST node identity,
/// so two positions compare equal iff they name the same source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pos {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One failure produced anywhere in the pipeline.
///
/// The variants are the closed set of failure classes this subsystem can
/// produce. `Placement` is reported by the scanner on behalf of the
/// surrounding framework (a directive in a disallowed location).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("{pos}: {message}")]
    DirectiveSyntax { pos: Pos, message: String },

    #[error("{pos}: {message}")]
    Signature { pos: Pos, message: String },

    #[error("{pos}: {message}")]
    FieldValidation { pos: Pos, message: String },

    #[error("{pos}: {message}")]
    SubjectGrammar { pos: Pos, message: String },

    #[error("{pos}: {message}")]
    TypeConflict { pos: Pos, message: String },

    #[error("{pos}: {message}")]
    Placement { pos: Pos, message: String },
}

impl ResourceError {
    pub fn pos(&self) -> &Pos {
        match self {
            ResourceError::DirectiveSyntax { pos, .. }
            | ResourceError::Signature { pos, .. }
            | ResourceError::FieldValidation { pos, .. }
            | ResourceError::SubjectGrammar { pos, .. }
            | ResourceError::TypeConflict { pos, .. }
            | ResourceError::Placement { pos, .. } => pos,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ResourceError::DirectiveSyntax { message, .. }
            | ResourceError::Signature { message, .. }
            | ResourceError::FieldValidation { message, .. }
            | ResourceError::SubjectGrammar { message, .. }
            | ResourceError::TypeConflict { message, .. }
            | ResourceError::Placement { message, .. } => message,
        }
    }
}

/// Ordered error accumulator threaded through every validation call.
///
/// Scan workers own private sinks; [`ErrorSink::merge`] folds them back in
/// file order so the rendered output is stable regardless of scheduling.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Vec<ResourceError>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, err: ResourceError) {
        self.errors.push(err);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ResourceError] {
        &self.errors
    }

    /// Append another sink's errors, preserving both insertion orders.
    pub fn merge(&mut self, other: ErrorSink) {
        self.errors.extend(other.errors);
    }

    /// Render the full accumulated set, one entry per line.
    pub fn format_errors(&self) -> String {
        let mut out = String::new();
        for err in &self.errors {
            out.push_str(&err.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_display() {
        let pos = Pos::new("src/orders.rs", 14, 1);
        assert_eq!(pos.to_string(), "src/orders.rs:14:1");
    }

    #[test]
    fn test_sink_preserves_order_across_merge() {
        let mut a = ErrorSink::new();
        a.report(ResourceError::DirectiveSyntax {
            pos: Pos::new("a.rs", 1, 1),
            message: "first".into(),
        });

        let mut b = ErrorSink::new();
        b.report(ResourceError::Signature {
            pos: Pos::new("b.rs", 2, 1),
            message: "second".into(),
        });
        b.report(ResourceError::FieldValidation {
            pos: Pos::new("b.rs", 3, 1),
            message: "third".into(),
        });

        a.merge(b);
        assert_eq!(a.len(), 3);
        let rendered = a.format_errors();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "a.rs:1:1: first");
        assert_eq!(lines[1], "b.rs:2:1: second");
        assert_eq!(lines[2], "b.rs:3:1: third");
    }
}
