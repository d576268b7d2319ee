//! Include-expansion visitor.
//!
//! Expands `@include:name` field references into the query text an
//! [`crate::visitor::context::IncludeResolver`] resolves them to, recursively
//! expanding any further includes the resolved text itself contains. Runs
//! before field resolution and validation in a typical chain, since both of
//! those should see the expanded tree rather than the reference.

use crate::ast::Node;
use crate::error::{ParseError, ValidationError};
use crate::parser::{parse, DefaultOperator};

use super::{Visitor, VisitorContext, walk_children};

const INCLUDE_FIELD: &str = "@include";

/// Expands `@include:name` references using the context's include resolver.
/// A chain typically runs one instance of this before field resolution and
/// validation.
pub struct IncludeVisitor {
    default_operator: DefaultOperator,
    skip: Option<Box<dyn Fn(&Node) -> bool>>,
}

impl IncludeVisitor {
    /// Builds an include visitor that parses resolved query text with
    /// `default_operator`.
    pub fn new(default_operator: DefaultOperator) -> Self {
        Self {
            default_operator,
            skip: None,
        }
    }

    /// Installs a predicate consulted before expanding each `@include` node;
    /// a node it returns `true` for is left unchanged.
    pub fn with_skip_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + 'static,
    {
        self.skip = Some(Box::new(predicate));
        self
    }

    fn reference_name(node: &Node) -> Option<String> {
        let Node::Field { field, query, .. } = node else {
            return None;
        };
        if !field.eq_ignore_ascii_case(INCLUDE_FIELD) {
            return None;
        }
        match query.as_deref() {
            Some(Node::Term { unescaped_term, .. }) => Some(unescaped_term.clone()),
            Some(Node::Phrase { phrase, .. }) => Some(phrase.clone()),
            _ => None,
        }
    }

    fn expand(&mut self, node: Node, name: &str, ctx: &mut VisitorContext) -> Node {
        if ctx.is_include_active(name) {
            ctx.validation_result_mut().errors.push(ValidationError::new(format!(
                "Circular include: '{name}'"
            )));
            return node;
        }

        let resolved = match ctx.include_resolver() {
            Some(resolver) => resolver(name),
            None => Ok(None),
        };

        let text = match resolved {
            Ok(Some(text)) => text,
            Ok(None) => {
                ctx.validation_result_mut().unresolved_includes.insert(name.to_string());
                return node;
            }
            Err(err) => {
                ctx.validation_result_mut().errors.push(ValidationError::new(format!(
                    "Error resolving include '{name}': {err}"
                )));
                return node;
            }
        };

        if text.trim().is_empty() {
            ctx.validation_result_mut().unresolved_includes.insert(name.to_string());
            return node;
        }

        let result = parse(&text, self.default_operator);
        if !result.is_success() {
            ctx.validation_result_mut().errors.push(ValidationError::new(format!(
                "Invalid include query for '{name}': {}",
                describe_errors(&result.errors)
            )));
            return node;
        }

        let span = node.span();
        ctx.include_stack_mut().push(name.to_string());
        let expanded = self.visit(result.document, ctx);
        ctx.include_stack_mut().pop();

        let inner = match expanded {
            Node::Document { query, .. } => query,
            other => Some(Box::new(other)),
        };

        Node::Group {
            query: inner,
            boost: None,
            span,
        }
    }
}

fn describe_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Visitor for IncludeVisitor {
    fn name(&self) -> &'static str {
        "include"
    }

    fn visit_field(&mut self, node: Node, ctx: &mut VisitorContext) -> Node {
        if let Some(name) = Self::reference_name(&node) {
            ctx.validation_result_mut().referenced_includes.insert(name.clone());
            if self.skip.as_ref().is_some_and(|skip| skip(&node)) {
                return node;
            }
            return self.expand(node, &name, ctx);
        }
        walk_children(self, node, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Node {
        parse(text, DefaultOperator::Or).document
    }

    #[test]
    fn expands_a_simple_include() {
        let doc = parsed("@include:common");
        let mut ctx = VisitorContext::new().with_include_resolver(|name| {
            if name == "common" {
                Ok(Some("title:rust".to_string()))
            } else {
                Ok(None)
            }
        });
        let mut visitor = IncludeVisitor::new(DefaultOperator::Or);
        let result = visitor.visit(doc, &mut ctx);
        match result {
            Node::Document { query, .. } => match query.as_deref() {
                Some(Node::Group { query, .. }) => match query.as_deref() {
                    Some(Node::Field { field, .. }) => assert_eq!(field, "title"),
                    other => panic!("expected Field, got {other:?}"),
                },
                other => panic!("expected Group, got {other:?}"),
            },
            other => panic!("expected Document, got {other:?}"),
        }
        assert!(ctx.validation_result().referenced_includes.contains("common"));
    }

    #[test]
    fn unknown_include_is_recorded_unresolved_and_node_left_unchanged() {
        let doc = parsed("@include:missing");
        let mut ctx = VisitorContext::new().with_include_resolver(|_| Ok(None));
        let mut visitor = IncludeVisitor::new(DefaultOperator::Or);
        let result = visitor.visit(doc.clone(), &mut ctx);
        assert!(ctx.validation_result().unresolved_includes.contains("missing"));
        assert_eq!(result, doc);
    }

    #[test]
    fn circular_include_is_an_error_and_node_left_unchanged() {
        let doc = parsed("@include:a");
        let mut ctx = VisitorContext::new().with_include_resolver(|name| {
            if name == "a" {
                Ok(Some("@include:a".to_string()))
            } else {
                Ok(None)
            }
        });
        let mut visitor = IncludeVisitor::new(DefaultOperator::Or);
        let result = visitor.visit(doc.clone(), &mut ctx);
        assert!(!ctx.validation_result().errors.is_empty());
        assert!(ctx
            .validation_result()
            .errors
            .iter()
            .any(|e| e.message.contains("Circular")));
        assert_eq!(result, doc);
    }

    #[test]
    fn resolver_failure_is_recorded_as_error_and_node_left_unchanged() {
        use crate::error::ResolveError;
        let doc = parsed("@include:broken");
        let mut ctx = VisitorContext::new().with_include_resolver(|name| {
            Err(ResolveError::Failed {
                name: name.to_string(),
                message: "boom".to_string(),
            })
        });
        let mut visitor = IncludeVisitor::new(DefaultOperator::Or);
        let result = visitor.visit(doc.clone(), &mut ctx);
        assert!(!ctx.validation_result().errors.is_empty());
        assert!(ctx
            .validation_result()
            .errors
            .iter()
            .any(|e| e.message.contains("Error resolving include")));
        assert_eq!(result, doc);
    }

    #[test]
    fn invalid_resolved_query_is_an_error_and_node_left_unchanged() {
        let doc = parsed("@include:broken_syntax");
        let mut ctx = VisitorContext::new().with_include_resolver(|_| {
            Ok(Some("title:(unclosed".to_string()))
        });
        let mut visitor = IncludeVisitor::new(DefaultOperator::Or);
        let result = visitor.visit(doc.clone(), &mut ctx);
        assert!(ctx
            .validation_result()
            .errors
            .iter()
            .any(|e| e.message.contains("Invalid include query")));
        assert_eq!(result, doc);
    }

    #[test]
    fn skip_predicate_leaves_matching_node_unchanged() {
        let doc = parsed("@include:common");
        let mut ctx = VisitorContext::new().with_include_resolver(|_| {
            Ok(Some("title:rust".to_string()))
        });
        let mut visitor = IncludeVisitor::new(DefaultOperator::Or).with_skip_predicate(|_| true);
        let result = visitor.visit(doc.clone(), &mut ctx);
        assert_eq!(result, doc);
        assert!(ctx.validation_result().referenced_includes.contains("common"));
    }

    #[test]
    fn nested_includes_expand_recursively() {
        let doc = parsed("@include:outer");
        let mut ctx = VisitorContext::new().with_include_resolver(|name| match name {
            "outer" => Ok(Some("@include:inner".to_string())),
            "inner" => Ok(Some("title:rust".to_string())),
            _ => Ok(None),
        });
        let mut visitor = IncludeVisitor::new(DefaultOperator::Or);
        let result = visitor.visit(doc, &mut ctx);
        let text = result.debug_tree();
        assert!(text.contains("Field(\"title\")"));
        assert!(ctx.validation_result().referenced_includes.contains("outer"));
        assert!(ctx.validation_result().referenced_includes.contains("inner"));
    }
}
