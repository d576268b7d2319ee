//! Ordered composition of visitors.
//!
//! `ChainedVisitor` runs each of its member visitors over the *entire* tree
//! in ascending priority order, each one seeing the full result of every
//! visitor before it. This is different from [`super::Visitor::visit`]
//! itself, which dispatches a single node through a single visitor's
//! handlers; a chain's [`ChainedVisitor::run`] instead walks the whole tree
//! once per member visitor.

use crate::ast::Node;

use super::{Visitor, VisitorContext, accept};

struct Entry<'a> {
    priority: i64,
    insertion_order: usize,
    visitor: Box<dyn Visitor + 'a>,
}

/// An ordered list of `(priority, visitor)` pairs, run in ascending
/// priority (lower runs first). Ties keep insertion order.
#[derive(Default)]
pub struct ChainedVisitor<'a> {
    entries: Vec<Entry<'a>>,
    next_insertion_order: usize,
}

impl<'a> ChainedVisitor<'a> {
    /// Builds an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `visitor` at `priority`. Visitors with equal priority run in
    /// the order they were added.
    pub fn add<V: Visitor + 'a>(&mut self, visitor: V, priority: i64) -> &mut Self {
        let insertion_order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.entries.push(Entry {
            priority,
            insertion_order,
            visitor: Box::new(visitor),
        });
        self.sort();
        self
    }

    /// Removes the visitor named `T::name()`, if one named `name` is
    /// present.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.entries.retain(|e| e.visitor.name() != name);
        self
    }

    /// Replaces the visitor named `name` with `visitor`, keeping its
    /// existing priority unless `priority` is given.
    pub fn replace<V: Visitor + 'a>(&mut self, name: &str, visitor: V, priority: Option<i64>) -> &mut Self {
        let existing_priority = self
            .entries
            .iter()
            .find(|e| e.visitor.name() == name)
            .map(|e| e.priority);
        self.remove(name);
        let priority = priority.or(existing_priority).unwrap_or(0);
        self.add(visitor, priority)
    }

    /// Inserts `visitor` immediately before the visitor named `reference`
    /// (priority = reference's priority - 1).
    pub fn before<V: Visitor + 'a>(&mut self, reference: &str, visitor: V) -> &mut Self {
        let priority = self
            .entries
            .iter()
            .find(|e| e.visitor.name() == reference)
            .map(|e| e.priority - 1)
            .unwrap_or(0);
        self.add(visitor, priority)
    }

    /// Inserts `visitor` immediately after the visitor named `reference`
    /// (priority = reference's priority + 1).
    pub fn after<V: Visitor + 'a>(&mut self, reference: &str, visitor: V) -> &mut Self {
        let priority = self
            .entries
            .iter()
            .find(|e| e.visitor.name() == reference)
            .map(|e| e.priority + 1)
            .unwrap_or(0);
        self.add(visitor, priority)
    }

    fn sort(&mut self) {
        self.entries
            .sort_by_key(|e| (e.priority, e.insertion_order));
    }

    /// The names of every visitor in the chain, in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.visitor.name()).collect()
    }

    /// Runs every visitor over `node` in order, threading the possibly
    /// replaced root through each one.
    pub fn run(&mut self, mut node: Node, ctx: &mut VisitorContext) -> Node {
        for entry in &mut self.entries {
            node = accept(entry.visitor.as_mut(), node, ctx);
        }
        node
    }
}
