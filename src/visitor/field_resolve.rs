//! Field-resolution visitor.
//!
//! Rewrites every field name a node carries directly (`Field`, `Exists`,
//! `Missing`, a scoped `Range`) through the context's field resolver,
//! recording the name it replaced so a later pass can still ask what a node
//! was originally called.

use crate::ast::Node;

use super::{Visitor, VisitorContext, walk_children};

/// Replaces field names using the context's installed field resolver. A
/// field the resolver doesn't recognize (`None`) is left unchanged and
/// recorded in [`crate::error::ValidationResult::unresolved_fields`].
pub struct FieldResolveVisitor;

impl FieldResolveVisitor {
    /// Builds a field-resolution visitor. Stateless: all resolution state
    /// lives in the [`VisitorContext`] it's run with.
    pub fn new() -> Self {
        Self
    }

    fn resolve(&self, ctx: &mut VisitorContext, span: crate::token::Span, field: &str) -> String {
        ctx.validation_result_mut().referenced_fields.insert(field.to_string());
        let Some(resolver) = ctx.field_resolver() else {
            return field.to_string();
        };
        match resolver(field) {
            Some(resolved) => {
                ctx.record_original_field(span, field.to_string());
                resolved
            }
            None => {
                ctx.validation_result_mut().unresolved_fields.insert(field.to_string());
                field.to_string()
            }
        }
    }
}

impl Default for FieldResolveVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for FieldResolveVisitor {
    fn name(&self) -> &'static str {
        "field_resolve"
    }

    fn visit_field(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        match node {
            Node::Field { field, query, span } => {
                let resolved = self.resolve(ctx, span, &field);
                let rewritten = Node::Field {
                    field: resolved,
                    query,
                    span,
                };
                walk_children(self, rewritten, ctx)
            }
            other => walk_children(self, other, ctx),
        }
    }

    fn visit_exists(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        match node {
            Node::Exists { field, span } => {
                let resolved = self.resolve(ctx, span, &field);
                Node::Exists {
                    field: resolved,
                    span,
                }
            }
            other => other,
        }
    }

    fn visit_missing(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        match node {
            Node::Missing { field, span } => {
                let resolved = self.resolve(ctx, span, &field);
                Node::Missing {
                    field: resolved,
                    span,
                }
            }
            other => other,
        }
    }

    fn visit_range(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        match node {
            Node::Range {
                field: Some(field),
                min,
                max,
                min_inclusive,
                max_inclusive,
                op,
                span,
            } => {
                let resolved = self.resolve(ctx, span, &field);
                Node::Range {
                    field: Some(resolved),
                    min,
                    max,
                    min_inclusive,
                    max_inclusive,
                    op,
                    span,
                }
            }
            other => other,
        }
    }
}
