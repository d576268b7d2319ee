//! Canonical query-string renderer.
//!
//! Produces a string that re-parses to a tree equivalent to its input
//! (`parse(render(t)) ≈ t` modulo source positions and whitespace). The
//! renderer is infallible: every AST the parser or a conforming visitor can
//! produce renders without failure, so this stays `String`-returning like
//! the [`Node`] tree it walks, with no `Result` in sight.

use crate::ast::{Clause, Node, Occur, Operator};

/// Renders `node` to its canonical query-string form.
pub fn render(node: &Node) -> String {
    fmt_node(node, false)
}

fn fmt_node(node: &Node, in_field: bool) -> String {
    match node {
        Node::Document { query, .. } => query
            .as_deref()
            .map(|q| fmt_node(q, false))
            .unwrap_or_default(),
        Node::Group { query, boost, .. } => {
            let inner = query
                .as_deref()
                .map(|q| fmt_node(q, false))
                .unwrap_or_default();
            format_boost(format!("({inner})"), *boost)
        }
        Node::Boolean { clauses, .. } => fmt_clauses(clauses, in_field),
        Node::Field { field, query, .. } => {
            let value = query
                .as_deref()
                .map(|q| fmt_node(q, true))
                .unwrap_or_default();
            format!("{}:{value}", crate::escape::escape(field))
        }
        Node::Term {
            raw_term,
            unescaped_term,
            boost,
            ..
        } => {
            let text = if raw_term.is_empty() && !unescaped_term.is_empty() {
                crate::escape::escape(unescaped_term)
            } else {
                raw_term.clone()
            };
            format_boost(text, *boost)
        }
        Node::Phrase { phrase, boost, .. } => {
            let escaped = phrase.replace('\\', "\\\\").replace('"', "\\\"");
            format_boost(format!("\"{escaped}\""), *boost)
        }
        Node::Range {
            field,
            min,
            max,
            min_inclusive,
            max_inclusive,
            op,
            ..
        } => {
            let body = fmt_range(min.as_deref(), max.as_deref(), *min_inclusive, *max_inclusive, *op);
            match field {
                Some(f) => format!("{}:{body}", crate::escape::escape(f)),
                None => body,
            }
        }
        Node::Regex { pattern, .. } => format!("/{pattern}/"),
        Node::Not { query, .. } => {
            let inner = query
                .as_deref()
                .map(|q| fmt_node(q, in_field))
                .unwrap_or_default();
            format!("NOT {inner}")
        }
        Node::Exists { field, .. } => format!("{}:*", crate::escape::escape(field)),
        Node::Missing { field, .. } => format!("_missing_:{}", crate::escape::escape(field)),
        Node::MatchAll { .. } => "*".to_string(),
        Node::MultiTerm { terms, .. } => terms
            .iter()
            .map(|t| crate::escape::escape(t))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn format_boost(text: String, boost: Option<f32>) -> String {
    match boost {
        Some(factor) => format!("{text}^{factor}"),
        None => text,
    }
}

fn fmt_range(
    min: Option<&str>,
    max: Option<&str>,
    min_inclusive: bool,
    max_inclusive: bool,
    op: Option<crate::ast::RangeOp>,
) -> String {
    use crate::ast::RangeOp;

    if let Some(op) = op {
        let endpoint = match op {
            RangeOp::Gt | RangeOp::Gte => min.unwrap_or("*"),
            RangeOp::Lt | RangeOp::Lte => max.unwrap_or("*"),
        };
        let symbol = match op {
            RangeOp::Gt => ">",
            RangeOp::Gte => ">=",
            RangeOp::Lt => "<",
            RangeOp::Lte => "<=",
        };
        return format!("{symbol}{endpoint}");
    }

    let open = if min_inclusive { '[' } else { '{' };
    let close = if max_inclusive { ']' } else { '}' };
    format!(
        "{open}{} TO {}{close}",
        min.unwrap_or("*"),
        max.unwrap_or("*")
    )
}

/// Renders a flat clause list: each clause's connector (`AND `/`OR `, or
/// nothing for `Implicit`) precedes it, and `Must`/`MustNot` clauses get
/// their `+`/`-` prefix. The whole list is parenthesized when it's nested
/// inside a field value, matching the parser's rule that a boolean field
/// value is always re-parsed through a `Group`.
fn fmt_clauses(clauses: &[Clause], in_field: bool) -> String {
    let mut parts = Vec::with_capacity(clauses.len());
    for (i, clause) in clauses.iter().enumerate() {
        let connector = if i == 0 {
            ""
        } else {
            match clause.operator {
                Operator::And => "AND ",
                Operator::Or => "OR ",
                Operator::Implicit => "",
            }
        };
        let occur_prefix = match clause.occur {
            Occur::Must => "+",
            Occur::MustNot => "-",
            Occur::Should => "",
        };
        let body = clause
            .query
            .as_deref()
            .map(|q| fmt_node(q, in_field))
            .unwrap_or_default();
        parts.push(format!("{connector}{occur_prefix}{body}"));
    }
    let joined = parts.join(" ");
    if in_field {
        format!("({joined})")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, DefaultOperator};

    fn roundtrip(text: &str) -> String {
        render(&parse(text, DefaultOperator::Or).document)
    }

    #[test]
    fn bare_term_round_trips() {
        assert_eq!(roundtrip("hello"), "hello");
    }

    #[test]
    fn occurrence_prefixes_round_trip() {
        assert_eq!(roundtrip("+a -b c"), "+a -b c");
    }

    #[test]
    fn explicit_and_or_round_trip() {
        assert_eq!(roundtrip("a AND b OR c"), "a AND b OR c");
    }

    #[test]
    fn field_with_group_value_round_trips() {
        assert_eq!(
            roundtrip("status:(active OR pending)"),
            "status:(active OR pending)"
        );
    }

    #[test]
    fn bracket_range_round_trips() {
        assert_eq!(roundtrip("price:[100 TO 500]"), "price:[100 TO 500]");
        assert_eq!(roundtrip("price:[100 TO 500}"), "price:[100 TO 500}");
    }

    #[test]
    fn shorthand_range_round_trips() {
        assert_eq!(roundtrip(">=5"), ">=5");
    }

    #[test]
    fn phrase_and_boost_round_trip() {
        assert_eq!(roundtrip("\"hello world\"^2.5"), "\"hello world\"^2.5");
    }

    #[test]
    fn not_round_trips() {
        assert_eq!(roundtrip("NOT deleted:true"), "NOT deleted:true");
    }

    #[test]
    fn exists_round_trips() {
        assert_eq!(roundtrip("title:*"), "title:*");
    }

    #[test]
    fn match_all_round_trips() {
        assert_eq!(roundtrip("*"), "*");
    }

    #[test]
    fn complex_query_round_trips_to_equivalent_string() {
        let original =
            "title:\"hello world\" AND (status:active OR status:pending) AND price:[100 TO 500] AND NOT deleted:true";
        let rendered = roundtrip(original);
        let reparsed = parse(&rendered, DefaultOperator::Or);
        assert!(reparsed.is_success());
        assert_eq!(render(&reparsed.document), rendered);
    }
}
