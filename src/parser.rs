//! Recursive-descent parser.
//!
//! # Grammar
//!
//! ```text
//! document    → clause_list?
//! clause_list → clause (connector? clause)*
//! connector   → "AND" | "OR"                          (absent ⇒ Operator::Implicit)
//! clause      → occur? unary
//! occur       → "+" | "-"                              (absent ⇒ Occur::Should)
//! unary       → "NOT" unary | primary
//! primary     → group | field_expr | range | shorthand_range
//!             | regex | phrase | term | "*"
//! group       → "(" clause_list? ")" boost?
//! field_expr  → TERM ":" field_value
//! field_value → "*" | range | shorthand_range | regex | phrase_or_terms | group
//! boost       → "^" number
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping `(...)` and field binding `name:`
//! 2. `NOT` / prefix `+` / prefix `-`
//! 3. Implicit/explicit `AND`
//! 4. Explicit `OR`
//!
//! Unlike the grammar sketch above (written for readability), clause
//! combination is flat, not a nested and/or tree: every clause at a given
//! level carries its own [`Operator`] (`And`/`Or`/`Implicit`) inside one
//! [`Node::Boolean`] clause list, rather than a tree of binary and/or nodes.
//!
//! On any unexpected token the parser records a [`ParseError`], synthesizes
//! a placeholder, and resynchronizes at the next clause boundary or closing
//! delimiter. It never returns `Err`. See [`parse`].

use crate::ast::{Clause, Node, Occur, Operator, RangeOp};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind, WildcardKind};

/// The default connector implied between two clauses with no explicit
/// `AND`/`OR` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOperator {
    /// Juxtaposed clauses behave as `OR`. The common default.
    Or,
    /// Juxtaposed clauses behave as `AND`.
    And,
}

impl DefaultOperator {
    /// Resolves this default to the concrete operator an
    /// [`Operator::Implicit`] clause should be treated as.
    pub fn as_operator(self) -> Operator {
        match self {
            Self::Or => Operator::Or,
            Self::And => Operator::And,
        }
    }
}

impl Default for DefaultOperator {
    fn default() -> Self {
        Self::Or
    }
}

/// Parses `text` into a document, never failing outright.
///
/// `default_operator` only affects how an [`Operator::Implicit`] clause
/// should be interpreted by later passes (rendering never materializes it);
/// the parser itself just records `Implicit` and moves on.
#[tracing::instrument(skip(text))]
pub fn parse(text: &str, default_operator: DefaultOperator) -> crate::error::ParseResult {
    let mut parser = Parser::new(text);
    let document = parser.parse_document();
    for err in &parser.errors {
        tracing::debug!(message = %err.message, position = err.position, "parse diagnostic");
    }
    crate::error::ParseResult {
        document,
        errors: parser.errors,
        default_operator,
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    errors: Vec<ParseError>,
    input_len: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let mut lexer = Lexer::new(text);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            errors: Vec::new(),
            input_len: text.len(),
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(ParseError::at(message, span));
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.current.kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    /// Consumes and returns the current token, pulling the next one from
    /// the lexer (merging in any lexer-side diagnostics as they surface).
    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        self.drain_lexer_diagnostics();
        std::mem::replace(&mut self.current, next)
    }

    fn drain_lexer_diagnostics(&mut self) {
        for err in self.lexer.diagnostics() {
            if !self.errors.contains(err) {
                self.errors.push(err.clone());
            }
        }
    }

    fn end_of_input_span(&self) -> Span {
        Span {
            start_offset: self.input_len,
            end_offset: self.input_len,
            start_line: self.current.span.start_line,
            start_column: self.current.span.start_column,
        }
    }

    /// Resynchronizes after an error: skip tokens until a clause boundary
    /// (AND/OR), a closing delimiter, or end of input.
    fn resync(&mut self) {
        loop {
            match &self.current.kind {
                TokenKind::And
                | TokenKind::Or
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn placeholder_term(span: Span) -> Node {
        Node::Term {
            raw_term: String::new(),
            unescaped_term: String::new(),
            is_prefix: false,
            is_wildcard: false,
            boost: None,
            span,
        }
    }

    // ---- document / clause list ------------------------------------------------

    fn parse_document(&mut self) -> Node {
        self.drain_lexer_diagnostics();
        if self.at_eof() {
            return Node::Document {
                query: None,
                span: Span {
                    start_offset: 0,
                    end_offset: self.input_len,
                    start_line: 1,
                    start_column: 1,
                },
            };
        }

        let start_span = self.current.span;
        let query = self.parse_clause_list();

        if !self.at_eof() {
            let span = self.current.span;
            self.error(
                format!("unexpected {} after query", self.current.kind.describe()),
                span,
            );
            self.resync();
        }

        let end = self.end_of_input_span();
        Node::Document {
            span: start_span.merge(&end),
            query: Some(Box::new(query)),
        }
    }

    /// Parses a flat clause list, collapsing a single trivial clause
    /// (`Should` occurrence, `Implicit` operator) down to its bare inner
    /// expression so a bare single term round-trips without acquiring a
    /// spurious `Boolean` wrapper.
    fn parse_clause_list(&mut self) -> Node {
        let mut clauses = Vec::new();
        let start = self.current.span;

        while self.can_start_clause() {
            let clause = self.parse_clause(clauses.is_empty());
            clauses.push(clause);
        }

        if clauses.is_empty() {
            let span = self.current.span;
            self.error("expected a query term", span);
            return Self::placeholder_term(span);
        }

        let end_span = clauses.last().map(|c| c.span).unwrap_or(start);
        let span = start.merge(&end_span);

        if clauses.len() == 1
            && clauses[0].occur == Occur::Should
            && clauses[0].operator == Operator::Implicit
        {
            if let Some(inner) = clauses.into_iter().next().unwrap().query {
                return *inner;
            }
        }

        Node::Boolean { clauses, span }
    }

    fn can_start_clause(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Term { .. }
                | TokenKind::Phrase { .. }
                | TokenKind::Regex { .. }
                | TokenKind::Not
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Gt
                | TokenKind::Gte
                | TokenKind::Lt
                | TokenKind::Lte
                | TokenKind::Star
        )
    }

    fn parse_clause(&mut self, is_first: bool) -> Clause {
        let start = self.current.span;

        let operator = if is_first {
            Operator::Implicit
        } else {
            match self.peek_kind() {
                TokenKind::And => {
                    self.advance();
                    Operator::And
                }
                TokenKind::Or => {
                    self.advance();
                    Operator::Or
                }
                _ => Operator::Implicit,
            }
        };

        let occur = match self.peek_kind() {
            TokenKind::Plus => {
                self.advance();
                Occur::Must
            }
            TokenKind::Minus => {
                self.advance();
                Occur::MustNot
            }
            _ => Occur::Should,
        };

        let query = if self.can_start_unary() {
            Some(Box::new(self.parse_unary()))
        } else {
            let span = self.current.span;
            self.error(
                format!(
                    "expected an expression after '{}'",
                    if occur == Occur::Must { "+" } else { "-" }
                ),
                span,
            );
            Some(Box::new(Self::placeholder_term(span)))
        };

        let end = query.as_ref().map(|q| q.span()).unwrap_or(start);
        Clause {
            query,
            occur,
            operator,
            span: start.merge(&end),
        }
    }

    fn can_start_unary(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Term { .. }
                | TokenKind::Phrase { .. }
                | TokenKind::Regex { .. }
                | TokenKind::Not
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Gt
                | TokenKind::Gte
                | TokenKind::Lt
                | TokenKind::Lte
                | TokenKind::Star
        )
    }

    // ---- unary / primary --------------------------------------------------------

    fn parse_unary(&mut self) -> Node {
        if matches!(self.peek_kind(), TokenKind::Not) {
            let start = self.current.span;
            self.advance();
            let inner = if self.can_start_unary() {
                Some(Box::new(self.parse_unary()))
            } else {
                let span = self.current.span;
                self.error("expected an expression after NOT", span);
                None
            };
            let end = inner.as_ref().map(|q| q.span()).unwrap_or(start);
            return Node::Not {
                query: inner,
                span: start.merge(&end),
            };
        }
        self.parse_primary_with_boost()
    }

    fn parse_primary_with_boost(&mut self) -> Node {
        let node = self.parse_primary();
        if matches!(self.peek_kind(), TokenKind::Caret) {
            let caret_span = self.current.span;
            self.advance();
            self.apply_boost(node, caret_span)
        } else {
            node
        }
    }

    fn apply_boost(&mut self, node: Node, caret_span: Span) -> Node {
        let factor = match self.read_boost_factor() {
            Some(f) => f,
            None => {
                self.error("expected a number after '^'", caret_span);
                return node;
            }
        };

        match node {
            Node::Term {
                raw_term,
                unescaped_term,
                is_prefix,
                is_wildcard,
                span,
                ..
            } => Node::Term {
                raw_term,
                unescaped_term,
                is_prefix,
                is_wildcard,
                boost: Some(factor),
                span: span.merge(&caret_span),
            },
            Node::Phrase { phrase, span, .. } => Node::Phrase {
                phrase,
                boost: Some(factor),
                span: span.merge(&caret_span),
            },
            Node::Group { query, span, .. } => Node::Group {
                query,
                boost: Some(factor),
                span: span.merge(&caret_span),
            },
            other => {
                self.error(
                    "boost is only supported on groups, phrases, and terms",
                    caret_span,
                );
                other
            }
        }
    }

    fn read_boost_factor(&mut self) -> Option<f32> {
        if let TokenKind::Term { raw, wildcard } = self.peek_kind().clone() {
            if wildcard == WildcardKind::None {
                if let Ok(value) = raw.parse::<f32>() {
                    self.advance();
                    return Some(value);
                }
            }
        }
        None
    }

    fn parse_primary(&mut self) -> Node {
        let start = self.current.span;
        match self.current.kind.clone() {
            TokenKind::LParen => self.parse_group(),
            TokenKind::LBracket | TokenKind::LBrace => self.parse_range(None),
            TokenKind::Gt | TokenKind::Gte | TokenKind::Lt | TokenKind::Lte => {
                self.parse_shorthand_range(None)
            }
            TokenKind::Regex { raw, terminated } => {
                self.advance();
                if !terminated {
                    self.error("unterminated regex literal", start);
                }
                Node::Regex {
                    pattern: crate::escape::unescape(&raw),
                    span: start,
                }
            }
            TokenKind::Phrase { raw, terminated } => {
                self.advance();
                if !terminated {
                    self.error("unterminated quoted phrase", start);
                }
                Node::Phrase {
                    phrase: crate::escape::unescape(&raw),
                    boost: None,
                    span: start,
                }
            }
            TokenKind::Star => {
                self.advance();
                Node::MatchAll { span: start }
            }
            TokenKind::Term { raw, wildcard } => {
                self.advance();
                if matches!(self.peek_kind(), TokenKind::Colon) {
                    self.parse_field_expr(raw, start)
                } else {
                    self.finish_term_or_multi_term(raw, wildcard, start)
                }
            }
            _ => {
                self.error(
                    format!("unexpected {}", self.current.kind.describe()),
                    start,
                );
                let span = start;
                self.advance();
                Self::placeholder_term(span)
            }
        }
    }

    /// After a bare term outside a field, adjacent bare terms with no
    /// connector between them stay part of the *same* clause only when
    /// they're inside a field value (`field:foo bar` → `MultiTerm`); at the
    /// top level adjacent terms are separate implicit clauses, handled by
    /// `parse_clause_list`. So outside a field this just returns the term.
    fn finish_term_or_multi_term(
        &mut self,
        raw: String,
        wildcard: WildcardKind,
        span: Span,
    ) -> Node {
        self.term_node(raw, wildcard, span)
    }

    fn term_node(&self, raw: String, wildcard: WildcardKind, span: Span) -> Node {
        Node::Term {
            unescaped_term: crate::escape::unescape(&raw),
            raw_term: raw,
            is_prefix: wildcard == WildcardKind::Prefix,
            is_wildcard: wildcard == WildcardKind::Wildcard,
            boost: None,
            span,
        }
    }

    fn parse_group(&mut self) -> Node {
        let start = self.current.span;
        self.advance(); // consume (

        let inner = if self.can_start_clause() {
            Some(Box::new(self.parse_clause_list()))
        } else {
            None
        };

        let end = if matches!(self.peek_kind(), TokenKind::RParen) {
            let span = self.current.span;
            self.advance();
            span
        } else {
            let span = self.current.span;
            self.error("expected closing parenthesis", span);
            span
        };

        Node::Group {
            query: inner,
            boost: None,
            span: start.merge(&end),
        }
    }

    // ---- field binding ------------------------------------------------------

    fn parse_field_expr(&mut self, name_raw: String, start: Span) -> Node {
        self.advance(); // consume ':'
        let field = crate::escape::unescape(&name_raw);

        match self.current.kind.clone() {
            TokenKind::Star => {
                let star_span = self.current.span;
                self.advance();
                Node::Exists {
                    field,
                    span: start.merge(&star_span),
                }
            }
            TokenKind::LBracket | TokenKind::LBrace => self.parse_range(Some(field)),
            TokenKind::Gt | TokenKind::Gte | TokenKind::Lt | TokenKind::Lte => {
                self.parse_shorthand_range(Some(field))
            }
            TokenKind::LParen => {
                let group = self.parse_group();
                Node::Field {
                    field,
                    span: start.merge(&group.span()),
                    query: Some(Box::new(group)),
                }
            }
            TokenKind::Regex { .. } | TokenKind::Phrase { .. } => {
                let value = self.parse_primary_with_boost();
                Node::Field {
                    field,
                    span: start.merge(&value.span()),
                    query: Some(Box::new(value)),
                }
            }
            TokenKind::Term { raw, wildcard } => {
                let term_span = self.current.span;
                self.advance();
                let value = self.parse_field_term_value(raw, wildcard, term_span);
                Node::Field {
                    field,
                    span: start.merge(&value.span()),
                    query: Some(Box::new(value)),
                }
            }
            _ => {
                let span = self.current.span;
                self.error(
                    format!("expected a value after '{field}:'"),
                    span,
                );
                Node::Field {
                    field,
                    span: start.merge(&span),
                    query: Some(Box::new(Self::placeholder_term(span))),
                }
            }
        }
    }

    /// Parses the value following `field:`, gathering adjacent bare terms
    /// into a `MultiTerm` (e.g. `tags:rust async` inside one field clause is
    /// `MultiTerm(["rust", "async"])`, not two implicit clauses). A field
    /// value never collapses into a `Boolean`.
    fn parse_field_term_value(&mut self, raw: String, wildcard: WildcardKind, span: Span) -> Node {
        let first = self.term_node(raw, wildcard, span);

        let mut words = match &first {
            Node::Term {
                is_prefix: false,
                is_wildcard: false,
                unescaped_term,
                ..
            } => vec![unescaped_term.clone()],
            _ => return self.maybe_boost_primary(first),
        };

        let mut last_span = span;
        let mut collected_more = false;
        while let TokenKind::Term {
            raw: next_raw,
            wildcard: next_wildcard,
        } = self.peek_kind().clone()
        {
            if next_wildcard != WildcardKind::None {
                break;
            }
            let next_span = self.current.span;
            self.advance();
            words.push(crate::escape::unescape(&next_raw));
            last_span = next_span;
            collected_more = true;
        }

        if !collected_more {
            return self.maybe_boost_primary(first);
        }

        self.maybe_boost_primary(Node::MultiTerm {
            terms: words,
            span: span.merge(&last_span),
        })
    }

    fn maybe_boost_primary(&mut self, node: Node) -> Node {
        if matches!(self.peek_kind(), TokenKind::Caret) {
            let caret_span = self.current.span;
            self.advance();
            self.apply_boost(node, caret_span)
        } else {
            node
        }
    }

    // ---- ranges ---------------------------------------------------------------

    fn parse_range(&mut self, field: Option<String>) -> Node {
        let start = self.current.span;
        let min_inclusive = matches!(self.peek_kind(), TokenKind::LBracket);
        self.advance(); // consume [ or {

        let (min, _) = self.parse_range_endpoint();

        if matches!(self.peek_kind(), TokenKind::To) {
            self.advance();
        } else {
            let span = self.current.span;
            self.error("expected 'TO' in range", span);
        }

        let (max, _) = self.parse_range_endpoint();

        let (max_inclusive, end) = match self.peek_kind() {
            TokenKind::RBracket => {
                let span = self.current.span;
                self.advance();
                (true, span)
            }
            TokenKind::RBrace => {
                let span = self.current.span;
                self.advance();
                (false, span)
            }
            _ => {
                let span = self.current.span;
                self.error("expected closing ']' or '}' in range", span);
                (true, span)
            }
        };

        Node::Range {
            field,
            min,
            max,
            min_inclusive,
            max_inclusive,
            op: None,
            span: start.merge(&end),
        }
    }

    /// Reads one range endpoint: `*` (unbounded), a bare term, or a
    /// negative number written as an adjacent `-`/term pair (the lexer has
    /// no range context, so `-5` arrives as `Minus` then `Term("5")`; we
    /// stitch them back together here when they're not separated by
    /// whitespace). Returns the endpoint value and the span it was read
    /// from.
    fn parse_range_endpoint(&mut self) -> (Option<String>, Span) {
        match self.current.kind.clone() {
            TokenKind::Star => {
                let span = self.current.span;
                self.advance();
                (None, span)
            }
            TokenKind::Minus => {
                let minus_span = self.current.span;
                self.advance();
                if let TokenKind::Term { raw, .. } = self.peek_kind().clone() {
                    if self.current.span.start_offset == minus_span.end_offset {
                        let term_span = self.current.span;
                        self.advance();
                        return (
                            Some(format!("-{}", crate::escape::unescape(&raw))),
                            minus_span.merge(&term_span),
                        );
                    }
                }
                self.error("expected a range endpoint", minus_span);
                (Some(String::new()), minus_span)
            }
            TokenKind::Term { raw, .. } => {
                let span = self.current.span;
                self.advance();
                (Some(crate::escape::unescape(&raw)), span)
            }
            _ => {
                let span = self.current.span;
                self.error("expected a range endpoint", span);
                (Some(String::new()), span)
            }
        }
    }

    fn parse_shorthand_range(&mut self, field: Option<String>) -> Node {
        let start = self.current.span;
        let op = match self.peek_kind() {
            TokenKind::Gt => RangeOp::Gt,
            TokenKind::Gte => RangeOp::Gte,
            TokenKind::Lt => RangeOp::Lt,
            TokenKind::Lte => RangeOp::Lte,
            _ => unreachable!("parse_shorthand_range called on non-comparison token"),
        };
        self.advance();

        let (value, end) = self.parse_range_endpoint();

        let (min, max) = match op {
            RangeOp::Gt | RangeOp::Gte => (value, None),
            RangeOp::Lt | RangeOp::Lte => (None, value),
        };

        Node::Range {
            field,
            min,
            max,
            min_inclusive: matches!(op, RangeOp::Gte),
            max_inclusive: matches!(op, RangeOp::Lte),
            op: Some(op),
            span: start.merge(&end),
        }
    }
}
