//! The `trellis:` annotation grammar.
//!
//! A directive is one doc-comment line of the form
//! `trellis:<name> [options] [tag:value ...] [key=value ...]` immediately
//! preceding a function declaration. This module tokenizes that line into a
//! [`Directive`], strips it out of the surrounding doc text, and dispatches
//! the result through an explicit [`DirectiveRegistry`].

use std::collections::HashMap;

use crate::errors::{ErrorSink, Pos, ResourceError};
use crate::resource::Resource;
use crate::signature::HandlerSignature;

/// Marker prefix recognizing a directive line inside a doc comment.
pub const DIRECTIVE_MARKER: &str = "trellis:";

/// A single directive token: bare options and tags carry only `value`,
/// `key=value` tokens carry both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl Field {
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            key: String::new(),
            value: value.into(),
        }
    }

    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A parsed annotation: name, positional options, key=value fields, tags.
/// All sequences preserve source order; field keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub options: Vec<Field>,
    pub fields: Vec<Field>,
    pub tags: Vec<Field>,
}

impl Directive {
    /// Value of a keyed field, or "" when absent.
    pub fn get(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '*' | '>' | '-')
}

fn valid_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_name_char)
}

/// Parse the directive text following the marker into a [`Directive`].
///
/// Reports a `DirectiveSyntaxError` and returns `None` on the first
/// malformed token.
pub fn parse_directive(errs: &mut ErrorSink, pos: &Pos, text: &str) -> Option<Directive> {
    let mut tokens = text.split_whitespace();

    let name = match tokens.next() {
        Some(name) => name,
        None => {
            errs.report(ResourceError::DirectiveSyntax {
                pos: pos.clone(),
                message: "Missing directive name.".into(),
            });
            return None;
        }
    };
    if !valid_name(name) {
        errs.report(ResourceError::DirectiveSyntax {
            pos: pos.clone(),
            message: format!("Invalid directive name {:?}.", name),
        });
        return None;
    }

    let mut dir = Directive {
        name: name.to_string(),
        ..Directive::default()
    };

    for token in tokens {
        if let Some(tag) = token.strip_prefix("tag:") {
            if !valid_name(tag) {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: format!("Invalid tag name {:?}.", token),
                });
                return None;
            }
            if dir.tags.iter().any(|t| t.value == token) {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: format!("The tag {:?} is already defined on this declaration.", token),
                });
                return None;
            }
            dir.tags.push(Field::bare(token));
        } else if let Some((key, value)) = token.split_once('=') {
            if !valid_name(key) {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: format!("Invalid field name {:?}.", key),
                });
                return None;
            }
            if value.trim().is_empty() {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: "Directive fields must have a value.".into(),
                });
                return None;
            }
            if dir.fields.iter().any(|f| f.key == key) {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: format!("The field {:?} is already defined on this directive.", key),
                });
                return None;
            }
            dir.fields.push(Field::keyed(key, value));
        } else {
            if !valid_name(token) {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: format!("Invalid option name {:?}.", token),
                });
                return None;
            }
            if dir.options.iter().any(|o| o.value == token) {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: format!("The option {:?} is already defined on this directive.", token),
                });
                return None;
            }
            dir.options.push(Field::bare(token));
        }
    }

    Some(dir)
}

/// Outcome of looking for a directive inside a doc comment.
#[derive(Debug)]
pub enum DocParse {
    /// No line carries the directive marker.
    NoDirective,
    /// A marker line was found but failed to parse; errors are in the sink.
    Invalid,
    /// The parsed directive plus the doc text with the directive line removed.
    Directive { directive: Directive, doc: String },
}

/// Extract the directive from a doc comment.
///
/// Only the directive line is stripped; every other line survives verbatim
/// in declaration order. More than one marker line is an error.
pub fn parse_doc_comment(errs: &mut ErrorSink, pos: &Pos, lines: &[String]) -> DocParse {
    let mut directive_text: Option<&str> = None;
    let mut doc_lines: Vec<&str> = Vec::new();

    for line in lines {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(DIRECTIVE_MARKER) {
            if directive_text.is_some() {
                errs.report(ResourceError::DirectiveSyntax {
                    pos: pos.clone(),
                    message: "Multiple directives defined on this declaration.".into(),
                });
                return DocParse::Invalid;
            }
            directive_text = Some(rest);
        } else {
            doc_lines.push(line);
        }
    }

    let text = match directive_text {
        Some(text) => text,
        None => return DocParse::NoDirective,
    };

    match parse_directive(errs, pos, text) {
        Some(directive) => DocParse::Directive {
            directive,
            doc: doc_lines.join("\n").trim().to_string(),
        },
        None => DocParse::Invalid,
    }
}

/// Everything a directive handler needs to assemble a resource.
pub struct DirectiveInput<'a> {
    pub directive: &'a Directive,
    pub signature: &'a HandlerSignature,
    pub handler_name: &'a str,
    pub doc: &'a str,
    pub pos: &'a Pos,
}

/// A registered directive handler: validates the directive against the
/// annotated declaration and assembles a resource, or reports into the sink
/// and returns `None`.
pub type DirectiveHandler = fn(&mut ErrorSink, DirectiveInput<'_>) -> Option<Resource>;

/// Explicit directive-name dispatch table, constructed at scan setup and
/// passed by reference to the scanning phase.
#[derive(Default)]
pub struct DirectiveRegistry {
    handlers: HashMap<&'static str, DirectiveHandler>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with all built-in directives. Currently only `nats`;
    /// the legacy `pubsub` directive is superseded and not registered.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register("nats", crate::resource::parse_subscription);
        reg
    }

    pub fn register(&mut self, name: &'static str, handler: DirectiveHandler) {
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<DirectiveHandler> {
        self.handlers.get(name).copied()
    }
}
