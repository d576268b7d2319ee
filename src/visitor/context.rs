//! Per-run state shared across a [`super::ChainedVisitor`] invocation.
//!
//! The heterogeneous context is kept untyped on purpose: resolvers, include
//! bookkeeping, and validation state all live behind typed accessor methods
//! rather than being threaded through every visitor's method signature, so
//! adding a new kind of shared state later doesn't ripple through every
//! existing visitor. A `VisitorContext` belongs to exactly one chain run; it
//! is not `Sync` and should not be shared across concurrent runs.

use std::collections::HashMap;

use crate::error::{ResolveError, ValidationResult};
use crate::token::Span;

/// Resolves a field name to the concrete name it should be replaced with,
/// or `None` if the field is unknown. Blocking: this crate's visitor
/// surface is synchronous (see [`crate::visitor`] module docs), so an
/// asynchronous resolver must be wrapped by the caller to block on I/O.
pub type FieldResolver<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Resolves an `@include:name` reference to the query text it expands to.
/// Returns `Ok(None)` for an unknown name and `Err` only when the resolver
/// itself fails (a real fault, not "not found").
pub type IncludeResolver<'a> = dyn Fn(&str) -> Result<Option<String>, ResolveError> + 'a;

/// Builds a [`FieldResolver`] from a flat map, resolving `data.x.y` to
/// `resolved.x.y` by finding the longest dotted-prefix match in `mapping`
/// (e.g. `{"data" => "resolved"}` resolves `data.x.y` to `resolved.x.y`).
pub fn hierarchical_field_resolver(
    mapping: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> {
    move |field: &str| {
        let segments: Vec<&str> = field.split('.').collect();
        for prefix_len in (1..=segments.len()).rev() {
            let prefix = segments[..prefix_len].join(".");
            if let Some(replacement) = mapping.get(&prefix) {
                let rest = &segments[prefix_len..];
                return Some(if rest.is_empty() {
                    replacement.clone()
                } else {
                    format!("{}.{}", replacement, rest.join("."))
                });
            }
        }
        None
    }
}

/// Shared state for a single visitor-chain run.
#[derive(Default)]
pub struct VisitorContext<'a> {
    field_resolver: Option<Box<FieldResolver<'a>>>,
    include_resolver: Option<Box<IncludeResolver<'a>>>,
    validation_options: Option<crate::visitor::validate::ValidationOptions>,
    validation_result: ValidationResult,
    include_stack: Vec<String>,
    original_field: HashMap<Span, String>,
}

impl<'a> VisitorContext<'a> {
    /// Builds an empty context with no resolvers and default validation
    /// state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the field resolver used by the field-resolution visitor.
    pub fn with_field_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'a,
    {
        self.field_resolver = Some(Box::new(resolver));
        self
    }

    /// Installs the include resolver used by the include visitor.
    pub fn with_include_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> Result<Option<String>, ResolveError> + 'a,
    {
        self.include_resolver = Some(Box::new(resolver));
        self
    }

    /// Installs validation options for the validation visitor.
    pub fn with_validation_options(
        mut self,
        options: crate::visitor::validate::ValidationOptions,
    ) -> Self {
        self.validation_options = Some(options);
        self
    }

    /// The installed field resolver, if any.
    pub fn field_resolver(&self) -> Option<&FieldResolver<'a>> {
        self.field_resolver.as_deref()
    }

    /// The installed include resolver, if any.
    pub fn include_resolver(&self) -> Option<&IncludeResolver<'a>> {
        self.include_resolver.as_deref()
    }

    /// The installed validation options, if any (defaults are used when
    /// absent).
    pub fn validation_options(&self) -> Option<&crate::visitor::validate::ValidationOptions> {
        self.validation_options.as_ref()
    }

    /// Mutable access to the accumulated validation/resolution result.
    pub fn validation_result_mut(&mut self) -> &mut ValidationResult {
        &mut self.validation_result
    }

    /// The accumulated validation/resolution result.
    pub fn validation_result(&self) -> &ValidationResult {
        &self.validation_result
    }

    /// Takes the accumulated validation/resolution result, leaving an empty
    /// one behind.
    pub fn take_validation_result(&mut self) -> ValidationResult {
        std::mem::take(&mut self.validation_result)
    }

    /// Mutable access to the LIFO stack of currently-expanding include
    /// names, used for cycle detection.
    pub fn include_stack_mut(&mut self) -> &mut Vec<String> {
        &mut self.include_stack
    }

    /// Whether `name` is already being expanded (case-insensitive).
    pub fn is_include_active(&self, name: &str) -> bool {
        self.include_stack.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Records the field name a node carried before the field-resolution
    /// visitor replaced it, keyed by the node's span.
    pub fn record_original_field(&mut self, span: Span, original: String) {
        self.original_field.insert(span, original);
    }

    /// The field name a node carried before resolution, if the
    /// field-resolution visitor rewrote it.
    pub fn original_field(&self, span: Span) -> Option<&str> {
        self.original_field.get(&span).map(String::as_str)
    }
}
