//! Parser, AST, and visitor pipeline for a Lucene-style query language.
//!
//! ```
//! use lucenequery::{parse, render, DefaultOperator};
//!
//! let result = parse("title:rust AND tags:(async OR tokio)", DefaultOperator::Or);
//! assert!(result.is_success());
//! assert_eq!(render(&result.document), "title:rust AND tags:(async OR tokio)");
//! ```
//!
//! The pipeline is three independent stages, each usable on its own:
//!
//! 1. [`parse`] turns query text into a [`Node`] tree plus diagnostics. It
//!    never fails: malformed input produces a best-effort tree and a list of
//!    [`ParseError`]s rather than an `Err`.
//! 2. The [`visitor`] module rewrites and inspects that tree: expanding
//!    `@include` references, resolving field names, and validating the
//!    result against a policy, composed through a [`ChainedVisitor`].
//! 3. [`render`] turns a (possibly rewritten) tree back into canonical query
//!    text.

mod ast;
mod error;
mod escape;
mod lexer;
mod parser;
mod render;
mod token;
pub mod visitor;

pub use ast::{Clause, Node, Occur, Operator, RangeOp};
pub use error::{ParseError, ParseResult, ResolveError, ValidationError, ValidationException, ValidationResult};
pub use parser::{parse, DefaultOperator};
pub use render::render;
pub use token::Span;

pub use visitor::context::{hierarchical_field_resolver, FieldResolver, IncludeResolver};
pub use visitor::field_resolve::FieldResolveVisitor;
pub use visitor::include::IncludeVisitor;
pub use visitor::validate::{validate, validate_and_throw, ValidationOptions, ValidationVisitor};
pub use visitor::{ChainedVisitor, Visitor, VisitorContext};

/// Expands every `@include` reference in `document`, using `resolver` to
/// turn a name into the query text it stands for. Returns the rewritten
/// tree; check `ctx.validation_result()` for unresolved or circular
/// includes recorded along the way.
pub fn expand_includes<'a>(
    document: Node,
    default_operator: DefaultOperator,
    ctx: &mut VisitorContext<'a>,
) -> Node {
    let mut visitor = IncludeVisitor::new(default_operator);
    visitor.visit(document, ctx)
}

/// Resolves every field name in `document` through `ctx`'s field resolver.
/// Returns the rewritten tree; unresolved field names are left unchanged
/// and recorded on `ctx.validation_result()`.
pub fn resolve_fields<'a>(document: Node, ctx: &mut VisitorContext<'a>) -> Node {
    let mut visitor = FieldResolveVisitor::new();
    visitor.visit(document, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_render_round_trips_a_complex_query() {
        let text = "title:rust AND tags:(async OR tokio) -draft:true score:[1 TO 10]";
        let result = parse(text, DefaultOperator::Or);
        assert!(result.is_success());
        let rendered = render(&result.document);
        let reparsed = parse(&rendered, DefaultOperator::Or);
        assert!(reparsed.is_success());
        assert_eq!(reparsed.document, result.document);
    }

    #[test]
    fn pipeline_expands_includes_then_resolves_fields_then_validates() {
        let result = parse("@include:saved", DefaultOperator::Or);
        let mut ctx = VisitorContext::new()
            .with_include_resolver(|name| {
                if name == "saved" {
                    Ok(Some("legacy:rust".to_string()))
                } else {
                    Ok(None)
                }
            })
            .with_field_resolver(|f| {
                if f == "legacy" {
                    Some("modern".to_string())
                } else {
                    None
                }
            });

        let expanded = expand_includes(result.document, DefaultOperator::Or, &mut ctx);
        let resolved = resolve_fields(expanded, &mut ctx);
        assert!(render(&resolved).contains("modern:rust"));

        let validation = validate(&resolved, ValidationOptions::default());
        assert!(validation.is_success());
    }
}
