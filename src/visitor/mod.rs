//! AST rewrite framework: a visitor is a set of per-variant handlers with a
//! single dispatch entry point, [`accept`]. The default handler recursively
//! visits children and returns the node unchanged; a visitor overrides only
//! the variants it cares about.
//!
//! Dispatch is plain pattern matching, not trait-object double-dispatch:
//! `Node` is closed, so matching on it is no less exhaustive than a visitor
//! interface with one method per variant, and it avoids the boilerplate of
//! wiring up `accept`/`visit` on every AST node type.

pub mod chain;
pub mod context;
pub mod field_resolve;
pub mod include;
pub mod validate;

use crate::ast::{Clause, Node};

pub use chain::ChainedVisitor;
pub use context::VisitorContext;

/// A single pass over an AST. Implementors override only the variants they
/// rewrite; [`Visitor::visit`]'s default body dispatches to per-variant
/// methods that, by default, recurse into children via [`walk_children`] and
/// return the node unchanged.
pub trait Visitor {
    /// A short, stable name used in diagnostics and `ChainedVisitor`
    /// replacement lookups.
    fn name(&self) -> &'static str;

    /// Visits `node`, returning the (possibly replaced) node.
    ///
    /// The default implementation dispatches to the per-variant methods
    /// below; most visitors only need to override one or two of those
    /// rather than this method.
    fn visit(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        match node {
            Node::Document { .. } => self.visit_document(node, ctx),
            Node::Group { .. } => self.visit_group(node, ctx),
            Node::Boolean { .. } => self.visit_boolean(node, ctx),
            Node::Field { .. } => self.visit_field(node, ctx),
            Node::Term { .. } => self.visit_term(node, ctx),
            Node::Phrase { .. } => self.visit_phrase(node, ctx),
            Node::Range { .. } => self.visit_range(node, ctx),
            Node::Regex { .. } => self.visit_regex(node, ctx),
            Node::Not { .. } => self.visit_not(node, ctx),
            Node::Exists { .. } => self.visit_exists(node, ctx),
            Node::Missing { .. } => self.visit_missing(node, ctx),
            Node::MatchAll { .. } => self.visit_match_all(node, ctx),
            Node::MultiTerm { .. } => self.visit_multi_term(node, ctx),
        }
    }

    /// Handles [`Node::Document`]. Default: walk the child.
    fn visit_document(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        walk_children(self, node, ctx)
    }

    /// Handles [`Node::Group`]. Default: walk the child.
    fn visit_group(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        walk_children(self, node, ctx)
    }

    /// Handles [`Node::Boolean`]. Default: walk each clause's query.
    fn visit_boolean(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        walk_children(self, node, ctx)
    }

    /// Handles [`Node::Field`]. Default: walk the value.
    fn visit_field(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        walk_children(self, node, ctx)
    }

    /// Handles [`Node::Term`]. Default: unchanged (a leaf).
    fn visit_term(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }

    /// Handles [`Node::Phrase`]. Default: unchanged (a leaf).
    fn visit_phrase(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }

    /// Handles [`Node::Range`]. Default: unchanged (a leaf).
    fn visit_range(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }

    /// Handles [`Node::Regex`]. Default: unchanged (a leaf).
    fn visit_regex(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }

    /// Handles [`Node::Not`]. Default: walk the negated expression.
    fn visit_not(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        walk_children(self, node, ctx)
    }

    /// Handles [`Node::Exists`]. Default: unchanged (a leaf).
    fn visit_exists(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }

    /// Handles [`Node::Missing`]. Default: unchanged (a leaf).
    fn visit_missing(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }

    /// Handles [`Node::MatchAll`]. Default: unchanged (a leaf).
    fn visit_match_all(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }

    /// Handles [`Node::MultiTerm`]. Default: unchanged (a leaf).
    fn visit_multi_term(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
        node
    }
}

/// Runs `visitor` over `node`, dispatching through [`Visitor::visit`].
pub fn accept<V: Visitor + ?Sized>(visitor: &mut V, node: Node, ctx: &mut VisitorContext) -> Node {
    visitor.visit(node, ctx)
}

/// Recurses into `node`'s children, re-running the whole visitor (via
/// [`Visitor::visit`], not a single per-variant method) on each one. Used as
/// the default body for every branching variant's handler.
fn walk_children<V: Visitor + ?Sized>(visitor: &mut V, node: Node, ctx: &mut VisitorContext) -> Node {
    match node {
        Node::Document { query, span } => Node::Document {
            query: query.map(|q| Box::new(visitor.visit(*q, ctx))),
            span,
        },
        Node::Group { query, boost, span } => Node::Group {
            query: query.map(|q| Box::new(visitor.visit(*q, ctx))),
            boost,
            span,
        },
        Node::Boolean { clauses, span } => Node::Boolean {
            clauses: clauses
                .into_iter()
                .map(|clause| walk_clause(visitor, clause, ctx))
                .collect(),
            span,
        },
        Node::Field { field, query, span } => Node::Field {
            field,
            query: query.map(|q| Box::new(visitor.visit(*q, ctx))),
            span,
        },
        Node::Not { query, span } => Node::Not {
            query: query.map(|q| Box::new(visitor.visit(*q, ctx))),
            span,
        },
        leaf => leaf,
    }
}

fn walk_clause<V: Visitor + ?Sized>(visitor: &mut V, clause: Clause, ctx: &mut VisitorContext) -> Clause {
    Clause {
        query: clause.query.map(|q| Box::new(visitor.visit(*q, ctx))),
        occur: clause.occur,
        operator: clause.operator,
        span: clause.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;

    fn span() -> Span {
        Span {
            start_offset: 0,
            end_offset: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    struct UppercaseTerms;

    impl Visitor for UppercaseTerms {
        fn name(&self) -> &'static str {
            "uppercase_terms"
        }

        fn visit_term(&mut self, node: Node, _ctx: &mut VisitorContext) -> Node {
            match node {
                Node::Term {
                    raw_term,
                    unescaped_term,
                    is_prefix,
                    is_wildcard,
                    boost,
                    span,
                } => Node::Term {
                    raw_term: raw_term.to_uppercase(),
                    unescaped_term: unescaped_term.to_uppercase(),
                    is_prefix,
                    is_wildcard,
                    boost,
                    span,
                },
                other => other,
            }
        }
    }

    #[test]
    fn default_visit_walks_into_document_child() {
        let node = Node::Document {
            query: Some(Box::new(Node::Term {
                raw_term: "hi".into(),
                unescaped_term: "hi".into(),
                is_prefix: false,
                is_wildcard: false,
                boost: None,
                span: span(),
            })),
            span: span(),
        };
        let mut visitor = UppercaseTerms;
        let mut ctx = VisitorContext::new();
        let result = accept(&mut visitor, node, &mut ctx);
        match result {
            Node::Document { query, .. } => match query.as_deref() {
                Some(Node::Term { raw_term, .. }) => assert_eq!(raw_term, "HI"),
                other => panic!("expected Term, got {other:?}"),
            },
            other => panic!("expected Document, got {other:?}"),
        }
    }

    #[test]
    fn default_visit_recurses_through_boolean_clauses() {
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
                occur: crate::ast::Occur::Should,
                operator: crate::ast::Operator::Implicit,
                span: span(),
            }],
            span: span(),
        };
        let mut visitor = UppercaseTerms;
        let mut ctx = VisitorContext::new();
        let result = accept(&mut visitor, node, &mut ctx);
        match result {
            Node::Boolean { clauses, .. } => match clauses[0].query.as_deref() {
                Some(Node::Term { raw_term, .. }) => assert_eq!(raw_term, "A"),
                other => panic!("expected Term, got {other:?}"),
            },
            other => panic!("expected Boolean, got {other:?}"),
        }
    }
}
