//! Query abstract syntax tree.
//!
//! Represents a parsed query as a closed sum type. Every variant carries a
//! [`Span`] pointing back at the source text it was parsed from; rewrites
//! that keep a node must keep its span, and every node's span must lie
//! inside its parent's (enforced by the parser, not by this module).

use crate::token::Span;

/// How a clause inside a [`Node::Boolean`] participates in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match (`+term`).
    Must,
    /// The clause may match (the default).
    Should,
    /// The clause must not match (`-term`).
    MustNot,
}

/// How a clause combines with the clause before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Explicit `AND`.
    And,
    /// Explicit `OR`.
    Or,
    /// No explicit connector was written; the caller's default operator
    /// (passed to [`crate::parse`]) decides how to combine this clause with
    /// the previous one.
    Implicit,
}

/// Comparison operator for a shorthand range (`>5`, `>=5`, `<5`, `<=5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

/// One element of a [`Node::Boolean`]'s clause list.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// The clause's inner expression. `None` only for a synthesized
    /// placeholder left behind by parser error recovery.
    pub query: Option<Box<Node>>,
    /// Whether this clause must, may, or must not match.
    pub occur: Occur,
    /// How this clause connects to the previous one in the list.
    pub operator: Operator,
    /// Span of the clause including its occurrence/operator prefix.
    pub span: Span,
}

/// A parsed query expression.
///
/// Closed by design: the visitor framework dispatches on this enum, and
/// adding a variant is a breaking change to every visitor in the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Root of a parsed document; holds at most one top-level expression.
    Document {
        /// The document's sole top-level expression, or `None` for an
        /// empty query.
        query: Option<Box<Node>>,
        /// Span of the whole document (the whole input).
        span: Span,
    },
    /// A parenthesized subexpression, with an optional boost.
    Group {
        /// The parenthesized expression, or `None` for an empty `()`.
        query: Option<Box<Node>>,
        /// Trailing `^boost`, if present.
        boost: Option<f32>,
        span: Span,
    },
    /// A flat list of clauses combined per each clause's occurrence and
    /// operator. Never nests another `Boolean` directly. A parenthesized
    /// boolean is always wrapped in a `Group` first.
    Boolean {
        /// The clauses, in source order.
        clauses: Vec<Clause>,
        span: Span,
    },
    /// Binds a field name to an inner expression (`field:value`).
    Field {
        /// Field name, unescaped for consumption by resolvers/backends.
        field: String,
        /// The value expression. Never a bare `Boolean`; a boolean field
        /// value is always wrapped in a `Group`.
        query: Option<Box<Node>>,
        span: Span,
    },
    /// A bare or wildcarded word.
    Term {
        /// Exactly as written, escapes intact. Used for rendering.
        raw_term: String,
        /// Escapes resolved. Used for semantic comparison.
        unescaped_term: String,
        /// Trailing `*` only.
        is_prefix: bool,
        /// Any other `*`/`?` placement.
        is_wildcard: bool,
        /// Trailing `^boost`, if present.
        boost: Option<f32>,
        span: Span,
    },
    /// A double-quoted phrase.
    Phrase {
        /// Phrase content, escapes resolved.
        phrase: String,
        /// Trailing `^boost`, if present.
        boost: Option<f32>,
        span: Span,
    },
    /// A bracketed or shorthand range.
    Range {
        /// Field this range applies to. A range written after `name:` is
        /// parsed directly as this node, with `field` set and no enclosing
        /// `Field` wrapper; a range with no field prefix (e.g. inside a
        /// bare top-level clause) leaves this `None`.
        field: Option<String>,
        /// Lower bound, or `None`/`"*"` for unbounded.
        min: Option<String>,
        /// Upper bound, or `None`/`"*"` for unbounded.
        max: Option<String>,
        /// Whether `min` is inclusive (`[`).
        min_inclusive: bool,
        /// Whether `max` is inclusive (`]`).
        max_inclusive: bool,
        /// Shorthand comparison operator (`>`, `>=`, `<`, `<=`), if this
        /// range was written in shorthand form rather than bracketed form.
        op: Option<RangeOp>,
        span: Span,
    },
    /// A `/regex/` literal.
    Regex {
        /// Pattern text, escapes resolved.
        pattern: String,
        span: Span,
    },
    /// A prefix `NOT`.
    Not {
        /// The negated expression, or `None` for a dangling `NOT`.
        query: Option<Box<Node>>,
        span: Span,
    },
    /// Presence check (`field:*`).
    Exists {
        /// The field that must be present.
        field: String,
        span: Span,
    },
    /// Negated presence check.
    Missing {
        /// The field that must be absent.
        field: String,
        span: Span,
    },
    /// A single `*` at the query root: matches everything.
    MatchAll {
        span: Span,
    },
    /// Adjacent unquoted terms inside a field value (`field:foo bar baz`
    /// parsed as one multi-word value rather than three separate clauses).
    MultiTerm {
        /// The individual words, in source order.
        terms: Vec<String>,
        span: Span,
    },
}

impl Node {
    /// The span this node covers in the original source text.
    pub fn span(&self) -> Span {
        match self {
            Self::Document { span, .. }
            | Self::Group { span, .. }
            | Self::Boolean { span, .. }
            | Self::Field { span, .. }
            | Self::Term { span, .. }
            | Self::Phrase { span, .. }
            | Self::Range { span, .. }
            | Self::Regex { span, .. }
            | Self::Not { span, .. }
            | Self::Exists { span, .. }
            | Self::Missing { span, .. }
            | Self::MatchAll { span }
            | Self::MultiTerm { span, .. } => *span,
        }
    }

    /// Name of the variant, used in diagnostics and validation operation
    /// bookkeeping.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Document { .. } => "document",
            Self::Group { .. } => "group",
            Self::Boolean { .. } => "boolean",
            Self::Field { .. } => "field",
            Self::Term { .. } => "term",
            Self::Phrase { .. } => "phrase",
            Self::Range { .. } => "range",
            Self::Regex { .. } => "regex",
            Self::Not { .. } => "not",
            Self::Exists { .. } => "exists",
            Self::Missing { .. } => "missing",
            Self::MatchAll { .. } => "match_all",
            Self::MultiTerm { .. } => "multi_term",
        }
    }

    /// The field name carried by this node, if it carries one directly.
    ///
    /// `Field`, `Exists`, `Missing`, and `Range` (when scoped) all carry a
    /// field name; other variants do not.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } | Self::Exists { field, .. } | Self::Missing { field, .. } => {
                Some(field)
            }
            Self::Range { field: Some(f), .. } => Some(f),
            _ => None,
        }
    }

    /// Renders this node's subtree as an indented debug tree, for
    /// inspection and test failure messages. Not the canonical query-string
    /// form; use [`crate::render::render`] for that.
    pub fn debug_tree(&self) -> String {
        let mut out = String::new();
        self.fmt_tree(&mut out, 0);
        out
    }

    fn fmt_tree(&self, out: &mut String, indent: usize) {
        use std::fmt::Write as _;
        let prefix = "  ".repeat(indent);
        match self {
            Self::Document { query, .. } => {
                let _ = writeln!(out, "{prefix}Document");
                if let Some(q) = query {
                    q.fmt_tree(out, indent + 1);
                }
            }
            Self::Group { query, boost, .. } => {
                let _ = writeln!(out, "{prefix}Group(boost={boost:?})");
                if let Some(q) = query {
                    q.fmt_tree(out, indent + 1);
                }
            }
            Self::Boolean { clauses, .. } => {
                let _ = writeln!(out, "{prefix}Boolean");
                for clause in clauses {
                    let _ = writeln!(
                        out,
                        "{}  Clause(occur={:?}, operator={:?})",
                        prefix, clause.occur, clause.operator
                    );
                    if let Some(q) = &clause.query {
                        q.fmt_tree(out, indent + 2);
                    }
                }
            }
            Self::Field { field, query, .. } => {
                let _ = writeln!(out, "{prefix}Field({field:?})");
                if let Some(q) = query {
                    q.fmt_tree(out, indent + 1);
                }
            }
            Self::Term {
                raw_term,
                is_prefix,
                is_wildcard,
                ..
            } => {
                let _ = writeln!(
                    out,
                    "{prefix}Term({raw_term:?}, prefix={is_prefix}, wildcard={is_wildcard})"
                );
            }
            Self::Phrase { phrase, boost, .. } => {
                let _ = writeln!(out, "{prefix}Phrase({phrase:?}, boost={boost:?})");
            }
            Self::Range {
                field,
                min,
                max,
                min_inclusive,
                max_inclusive,
                op,
                ..
            } => {
                let _ = writeln!(
                    out,
                    "{prefix}Range(field={field:?}, min={min:?}, max={max:?}, min_inclusive={min_inclusive}, max_inclusive={max_inclusive}, op={op:?})"
                );
            }
            Self::Regex { pattern, .. } => {
                let _ = writeln!(out, "{prefix}Regex({pattern:?})");
            }
            Self::Not { query, .. } => {
                let _ = writeln!(out, "{prefix}Not");
                if let Some(q) = query {
                    q.fmt_tree(out, indent + 1);
                }
            }
            Self::Exists { field, .. } => {
                let _ = writeln!(out, "{prefix}Exists({field:?})");
            }
            Self::Missing { field, .. } => {
                let _ = writeln!(out, "{prefix}Missing({field:?})");
            }
            Self::MatchAll { .. } => {
                let _ = writeln!(out, "{prefix}MatchAll");
            }
            Self::MultiTerm { terms, .. } => {
                let _ = writeln!(out, "{prefix}MultiTerm({terms:?})");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span {
            start_offset: 0,
            end_offset: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    #[test]
    fn field_name_reads_through_scoped_range() {
        let node = Node::Range {
            field: Some("price".into()),
            min: Some("1".into()),
            max: Some("10".into()),
            min_inclusive: true,
            max_inclusive: true,
            op: None,
            span: span(),
        };
        assert_eq!(node.field_name(), Some("price"));
    }

    #[test]
    fn term_has_no_field_name() {
        let node = Node::Term {
            raw_term: "x".into(),
            unescaped_term: "x".into(),
            is_prefix: false,
            is_wildcard: false,
            boost: None,
            span: span(),
        };
        assert_eq!(node.field_name(), None);
    }

    #[test]
    fn debug_tree_is_indented() {
        let node = Node::Boolean {
            clauses: vec![Clause {
                query: Some(Box::new(Node::Term {
                    raw_term: "a".into(),
                    unescaped_term: "a".into(),
                    is_prefix: false,
                    is_wildcard: false,
                    boost: None,
                    span: span(),
                })),
                occur: Occur::Should,
                operator: Operator::Implicit,
                span: span(),
            }],
            span: span(),
        };
        let tree = node.debug_tree();
        assert!(tree.contains("Boolean"));
        assert!(tree.contains("Term(\"a\""));
    }
}
