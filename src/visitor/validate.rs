//! Validation visitor.
//!
//! Walks a tree once, populating a [`ValidationResult`] with referenced
//! fields, tracked operations, and any violations of the supplied
//! [`ValidationOptions`]. Unlike the include and field-resolution visitors,
//! this one never rewrites the tree; every handler returns its node
//! unchanged and reports purely through `ctx`.

use std::collections::HashSet;

use crate::ast::Node;
use crate::error::{ValidationError, ValidationException, ValidationResult};

use super::{Visitor, VisitorContext, walk_children};

/// Constraints a [`ValidationVisitor`] checks while walking a tree.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// If non-empty, every referenced field must be in this set.
    pub allowed_fields: HashSet<String>,
    /// Fields that may never be referenced.
    pub restricted_fields: HashSet<String>,
    /// Whether a term may start with `*` or `?`.
    pub allow_leading_wildcards: bool,
    /// Maximum allowed `Group` nesting depth; `0` means unlimited.
    pub allowed_max_node_depth: usize,
    /// If non-empty, every operation used must be in this set.
    pub allowed_operations: HashSet<String>,
    /// Operations that may never be used.
    pub restricted_operations: HashSet<String>,
    /// Raise a [`ValidationException`] instead of returning a result that
    /// merely carries errors.
    pub should_throw: bool,
}

/// Walks a tree, recording field/operation usage and flagging anything
/// [`ValidationOptions`] disallows. Run it directly with
/// [`super::accept`], or call [`validate`] / [`validate_and_throw`] for the
/// common case of a fresh context.
pub struct ValidationVisitor {
    depth: usize,
    current_field: Option<String>,
}

impl ValidationVisitor {
    /// Builds a fresh validator with depth 0 and no field context.
    pub fn new() -> Self {
        Self {
            depth: 0,
            current_field: None,
        }
    }

    fn options<'c>(&self, ctx: &'c VisitorContext) -> ValidationOptions {
        ctx.validation_options().cloned().unwrap_or_default()
    }

    fn record_field(&self, ctx: &mut VisitorContext, field: &str) {
        let options = self.options(ctx);
        let result = ctx.validation_result_mut();
        result.referenced_fields.insert(field.to_string());
        if !options.allowed_fields.is_empty() && !options.allowed_fields.contains(field) {
            result.errors.push(ValidationError::new(format!(
                "field '{field}' is not in the allowed field list"
            )));
        }
        if options.restricted_fields.contains(field) {
            result
                .errors
                .push(ValidationError::new(format!("field '{field}' is restricted")));
        }
    }

    fn record_operation(&self, ctx: &mut VisitorContext, operation: &str) {
        let options = self.options(ctx);
        let field = self.current_field.clone();
        let result = ctx.validation_result_mut();
        result.record_operation(operation, field.as_deref());
        if !options.allowed_operations.is_empty() && !options.allowed_operations.contains(operation) {
            result.errors.push(ValidationError::new(format!(
                "operation '{operation}' is not in the allowed operation list"
            )));
        }
        if options.restricted_operations.contains(operation) {
            result
                .errors
                .push(ValidationError::new(format!(
                    "operation '{operation}' is restricted"
                )));
        }
    }
}

impl Default for ValidationVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for ValidationVisitor {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn visit_group(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        self.depth += 1;
        {
            let options = self.options(ctx);
            let result = ctx.validation_result_mut();
            result.max_node_depth = result.max_node_depth.max(self.depth);
            if options.allowed_max_node_depth > 0 && self.depth > options.allowed_max_node_depth {
                result.errors.push(ValidationError::new(format!(
                    "group nesting depth {} exceeds the allowed maximum of {}",
                    self.depth, options.allowed_max_node_depth
                )));
            }
        }
        let result = walk_children(self, node, ctx);
        self.depth -= 1;
        result
    }

    fn visit_boolean(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        self.record_operation(ctx, "boolean");
        walk_children(self, node, ctx)
    }

    fn visit_field(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        let field = node.field_name().map(str::to_string);
        if let Some(field) = &field {
            self.record_field(ctx, field);
        }
        let previous = self.current_field.clone();
        self.current_field = field;
        let result = walk_children(self, node, ctx);
        self.current_field = previous;
        result
    }

    fn visit_range(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        if let Some(field) = node.field_name() {
            self.record_field(ctx, field);
        }
        self.record_operation(ctx, "range");
        node
    }

    fn visit_regex(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        self.record_operation(ctx, "regex");
        node
    }

    fn visit_exists(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        if let Some(field) = node.field_name() {
            self.record_field(ctx, field);
        }
        self.record_operation(ctx, "exists");
        node
    }

    fn visit_missing(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        if let Some(field) = node.field_name() {
            self.record_field(ctx, field);
        }
        self.record_operation(ctx, "missing");
        node
    }

    fn visit_term(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        if let Node::Term {
            is_prefix,
            is_wildcard,
            ref unescaped_term,
            ..
        } = node
        {
            if is_prefix {
                self.record_operation(ctx, "prefix");
            } else if is_wildcard {
                self.record_operation(ctx, "wildcard");
            }

            let options = self.options(ctx);
            let leads_with_wildcard = unescaped_term
                .chars()
                .next()
                .is_some_and(|c| c == '*' || c == '?');
            if (is_prefix || is_wildcard) && leads_with_wildcard && !options.allow_leading_wildcards
            {
                ctx.validation_result_mut().errors.push(ValidationError::new(format!(
                    "leading wildcard is not allowed in term '{unescaped_term}'"
                )));
            }
        }
        node
    }
}

/// Validates `node` against `options`, returning the accumulated result.
pub fn validate(node: &Node, options: ValidationOptions) -> ValidationResult {
    let mut ctx = VisitorContext::new().with_validation_options(options);
    let mut visitor = ValidationVisitor::new();
    let _ = visitor.visit(node.clone(), &mut ctx);
    ctx.take_validation_result()
}

/// Like [`validate`], but returns `Err` carrying the full result when
/// `options.should_throw` is set and the walk recorded at least one error.
pub fn validate_and_throw(
    node: &Node,
    options: ValidationOptions,
) -> Result<ValidationResult, ValidationException> {
    let should_throw = options.should_throw;
    let result = validate(node, options);
    if should_throw && !result.is_success() {
        Err(ValidationException { result })
    } else {
        Ok(result)
    }
}
