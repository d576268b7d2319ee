//! Diagnostic and error types for parsing, validation, and resolution.
//!
//! Parsing and validation never abort on malformed input: [`ParseError`] and
//! [`ValidationError`] are informational records collected into a result
//! type, not propagated as `Result::Err`. Only resolver failures and
//! explicit `validate_and_throw` requests produce a real `Err`.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::ast::Node;
use crate::token::Span;

/// A non-fatal lexical or syntactic problem recorded while parsing.
///
/// Parsing always returns a best-effort [`crate::parser::ParseResult`] even
/// when this list is non-empty.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// Byte offset where the problem was detected.
    pub position: usize,
    /// Byte length of the offending token, if known.
    pub length: usize,
    /// 1-based line number of `position`.
    pub line: usize,
    /// 1-based column number of `position`.
    pub column: usize,
}

impl ParseError {
    /// Builds a `ParseError` anchored at `span`.
    pub fn at(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            position: span.start_offset,
            length: span.len(),
            line: span.start_line,
            column: span.start_column,
        }
    }
}

/// A problem recorded by a validation pass or a rewrite visitor
/// (circular include, unresolved reference, disallowed field/operation).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Human-readable description.
    pub message: String,
    /// Index into whatever ordered collection the producing pass is
    /// walking (e.g. clause index), for passes that can supply one.
    pub index: Option<usize>,
}

impl ValidationError {
    /// Builds a `ValidationError` with no index.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            index: None,
        }
    }

    /// Builds a `ValidationError` anchored at `index`.
    pub fn at(message: impl Into<String>, index: usize) -> Self {
        Self {
            message: message.into(),
            index: Some(index),
        }
    }
}

/// Accumulated result of a [`crate::visitor::validate::ValidationVisitor`]
/// pass, or of the include/field-resolution visitors (which share the same
/// bookkeeping structure).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    /// Every problem recorded during the walk.
    pub errors: Vec<ValidationError>,
    /// Every field name the walk encountered.
    pub referenced_fields: HashSet<String>,
    /// Every `@include` name the walk encountered.
    pub referenced_includes: HashSet<String>,
    /// `@include` names whose resolver call returned null/empty/whitespace.
    pub unresolved_includes: HashSet<String>,
    /// Field names whose resolver call returned null.
    pub unresolved_fields: HashSet<String>,
    /// Deepest `Group` nesting level observed.
    pub max_node_depth: usize,
    /// Operation name (`range`, `wildcard`, `prefix`, `regex`, `boolean`,
    /// `exists`, `missing`) mapped to the set of fields it was used on.
    pub operations: HashMap<String, HashSet<String>>,
}

impl ValidationResult {
    /// Whether the walk recorded no errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records that `operation` was used, optionally scoped to `field`.
    pub fn record_operation(&mut self, operation: &str, field: Option<&str>) {
        self.operations
            .entry(operation.to_string())
            .or_default()
            .insert(field.unwrap_or("").to_string());
    }
}

/// Raised by [`crate::visitor::validate::validate_and_throw`] when
/// `should_throw` is set and the walk recorded at least one error.
#[derive(Debug, Clone, Error)]
#[error("query validation failed with {} error(s)", .result.errors.len())]
pub struct ValidationException {
    /// The full result, including every recorded error.
    pub result: ValidationResult,
}

/// A fatal error raised by a user-supplied include or field resolver.
///
/// This is the one place the visitor framework is allowed to propagate a
/// real `Err`: a resolver is external code, and its invariant violations
/// (panicking, returning an inconsistent value) should not be silently
/// swallowed the way a malformed query string is.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolver function itself returned an error.
    #[error("resolver failed for '{name}': {message}")]
    Failed {
        /// The include or field name being resolved.
        name: String,
        /// The resolver's error message.
        message: String,
    },
}

/// Outcome of a single [`crate::parse`] call: always a usable document plus
/// whatever diagnostics were collected along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// The parsed document. Never absent, even for malformed input.
    pub document: Node,
    /// Lexical and syntactic diagnostics, in source order.
    pub errors: Vec<ParseError>,
    /// The default operator this document was parsed with. Clauses left
    /// [`crate::ast::Operator::Implicit`] combine using this.
    pub default_operator: crate::parser::DefaultOperator,
}

impl ParseResult {
    /// Whether parsing recorded no diagnostics.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
