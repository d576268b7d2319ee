//! Query lexer (tokenizer).
//!
//! Converts a query string into a lazy stream of tokens for the parser.
//! Unlike a conventional hand-written lexer, this one never returns `Err`:
//! an unterminated quote/regex or an unsupported byte becomes an `Invalid`
//! token plus a recorded [`ParseError`], and scanning continues to the end
//! of input. The parser pulls tokens one at a time through [`Lexer::next_token`]
//! rather than receiving a pre-materialized `Vec<Token>`.

use std::{iter::Peekable, str::Chars};

use crate::error::ParseError;
use crate::token::{Span, Token, TokenKind, WildcardKind};

/// Characters that terminate a bare-term scan when unescaped.
///
/// `+`, `-`, `!`, `>`, `<` are deliberately excluded: they are only
/// recognized as operators when they are the first character the
/// tokenizer's dispatch sees (i.e. at a token boundary); occurring mid-word
/// they are ordinary term characters.
const TERM_STOP_CHARS: &[char] = &[
    '(', ')', '[', ']', '{', '}', '"', '/', '^', ':', '~',
];

/// Tokenizes a query string, one token at a time.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
    position: usize,
    line: usize,
    column: usize,
    diagnostics: Vec<ParseError>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
            line: 1,
            column: 1,
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics recorded so far (unterminated literals, unsupported
    /// bytes). Grows as tokens are pulled; read after exhausting the
    /// stream for the complete list.
    pub fn diagnostics(&self) -> &[ParseError] {
        &self.diagnostics
    }

    fn mark(&self) -> (usize, usize, usize) {
        (self.position, self.line, self.column)
    }

    fn span_from(&self, mark: (usize, usize, usize)) -> Span {
        Span {
            start_offset: mark.0,
            end_offset: self.position,
            start_line: mark.1,
            start_column: mark.2,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Pulls the next token. Returns `TokenKind::Eof` forever once input is
    /// exhausted, so callers can poll without tracking exhaustion
    /// themselves.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let mark = self.mark();

        let Some(&ch) = self.chars.peek() else {
            return Token {
                kind: TokenKind::Eof,
                span: self.span_from(mark),
            };
        };

        let kind = match ch {
            '"' => return self.read_phrase(mark),
            '/' => return self.read_regex(mark),
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '[' => {
                self.advance();
                TokenKind::LBracket
            }
            ']' => {
                self.advance();
                TokenKind::RBracket
            }
            '{' => {
                self.advance();
                TokenKind::LBrace
            }
            '}' => {
                self.advance();
                TokenKind::RBrace
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            '^' => {
                self.advance();
                TokenKind::Caret
            }
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '-' => {
                self.advance();
                TokenKind::Minus
            }
            '!' => {
                self.advance();
                TokenKind::Not
            }
            '>' => {
                self.advance();
                if self.chars.peek() == Some(&'=') {
                    self.advance();
                    TokenKind::Gte
                } else {
                    TokenKind::Gt
                }
            }
            '<' => {
                self.advance();
                if self.chars.peek() == Some(&'=') {
                    self.advance();
                    TokenKind::Lte
                } else {
                    TokenKind::Lt
                }
            }
            '~' => {
                self.advance();
                let span = self.span_from(mark);
                self.diagnostics.push(ParseError::at(
                    "unsupported operator '~' (fuzzy/proximity search is not supported)",
                    span,
                ));
                TokenKind::Invalid("~".to_string())
            }
            _ => return self.read_term(mark),
        };

        Token {
            kind,
            span: self.span_from(mark),
        }
    }

    fn read_phrase(&mut self, mark: (usize, usize, usize)) -> Token {
        self.advance(); // opening quote
        let mut raw = String::new();
        loop {
            match self.chars.peek() {
                Some(&'"') => {
                    self.advance();
                    return Token {
                        kind: TokenKind::Phrase {
                            raw,
                            terminated: true,
                        },
                        span: self.span_from(mark),
                    };
                }
                Some(&'\\') => {
                    self.advance();
                    raw.push('\\');
                    if let Some(esc) = self.advance() {
                        raw.push(esc);
                    }
                }
                Some(&ch) => {
                    raw.push(ch);
                    self.advance();
                }
                None => {
                    let span = self.span_from(mark);
                    self.diagnostics
                        .push(ParseError::at("unterminated quoted phrase", span));
                    return Token {
                        kind: TokenKind::Phrase {
                            raw,
                            terminated: false,
                        },
                        span,
                    };
                }
            }
        }
    }

    fn read_regex(&mut self, mark: (usize, usize, usize)) -> Token {
        self.advance(); // opening slash
        let mut raw = String::new();
        loop {
            match self.chars.peek() {
                Some(&'/') => {
                    self.advance();
                    return Token {
                        kind: TokenKind::Regex {
                            raw,
                            terminated: true,
                        },
                        span: self.span_from(mark),
                    };
                }
                Some(&'\\') => {
                    self.advance();
                    raw.push('\\');
                    if let Some(esc) = self.advance() {
                        raw.push(esc);
                    }
                }
                Some(&ch) => {
                    raw.push(ch);
                    self.advance();
                }
                None => {
                    let span = self.span_from(mark);
                    self.diagnostics
                        .push(ParseError::at("unterminated regex literal", span));
                    return Token {
                        kind: TokenKind::Regex {
                            raw,
                            terminated: false,
                        },
                        span,
                    };
                }
            }
        }
    }

    fn read_term(&mut self, mark: (usize, usize, usize)) -> Token {
        let mut raw = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch == '\\' {
                self.advance();
                raw.push('\\');
                if let Some(esc) = self.advance() {
                    raw.push(esc);
                }
                continue;
            }
            if ch.is_whitespace() || TERM_STOP_CHARS.contains(&ch) {
                break;
            }
            raw.push(ch);
            self.advance();
        }

        let span = self.span_from(mark);
        let kind = if raw == "AND" {
            TokenKind::And
        } else if raw == "OR" {
            TokenKind::Or
        } else if raw == "NOT" {
            TokenKind::Not
        } else if raw == "TO" {
            TokenKind::To
        } else if raw == "*" {
            TokenKind::Star
        } else {
            TokenKind::Term {
                wildcard: classify_wildcard(&raw),
                raw,
            }
        };

        Token { kind, span }
    }
}

/// Classifies a raw term's wildcard usage: `*` anywhere but a single
/// trailing position makes it a general wildcard; a single trailing `*`
/// makes it a prefix query; no unescaped `*`/`?` makes it plain.
fn classify_wildcard(raw: &str) -> WildcardKind {
    let chars: Vec<char> = raw.chars().collect();
    let mut wildcard_positions = Vec::new();
    let mut escaped = false;
    for (i, &ch) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '*' || ch == '?' {
            wildcard_positions.push(i);
        }
    }

    match wildcard_positions.as_slice() {
        [] => WildcardKind::None,
        [pos] if chars[*pos] == '*' && *pos == chars.len() - 1 => WildcardKind::Prefix,
        _ => WildcardKind::Wildcard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            if matches!(tok.kind, TokenKind::Eof) {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    fn term(s: &str) -> TokenKind {
        TokenKind::Term {
            raw: s.to_string(),
            wildcard: classify_wildcard(s),
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(kinds(""), vec![]);
    }

    #[test]
    fn single_term() {
        assert_eq!(kinds("hello"), vec![term("hello")]);
    }

    #[test]
    fn and_or_not_to_keywords() {
        assert_eq!(
            kinds("a AND b OR NOT c TO d"),
            vec![
                term("a"),
                TokenKind::And,
                term("b"),
                TokenKind::Or,
                TokenKind::Not,
                term("c"),
                TokenKind::To,
                term("d"),
            ]
        );
    }

    #[test]
    fn lowercase_keywords_are_terms() {
        assert_eq!(
            kinds("and or not to"),
            vec![term("and"), term("or"), term("not"), term("to")]
        );
    }

    #[test]
    fn quoted_phrase() {
        let mut lexer = Lexer::new("\"hello world\"");
        let tok = lexer.next_token();
        assert_eq!(
            tok.kind,
            TokenKind::Phrase {
                raw: "hello world".into(),
                terminated: true
            }
        );
    }

    #[test]
    fn unterminated_phrase_reaches_eof_and_records_error() {
        let mut lexer = Lexer::new("\"hello");
        let tok = lexer.next_token();
        assert_eq!(
            tok.kind,
            TokenKind::Phrase {
                raw: "hello".into(),
                terminated: false
            }
        );
        assert_eq!(lexer.diagnostics().len(), 1);
        assert!(lexer.diagnostics()[0].message.contains("unterminated"));
    }

    #[test]
    fn regex_literal() {
        let mut lexer = Lexer::new("/ab+c/");
        let tok = lexer.next_token();
        assert_eq!(
            tok.kind,
            TokenKind::Regex {
                raw: "ab+c".into(),
                terminated: true
            }
        );
    }

    #[test]
    fn plus_and_minus_at_boundary_are_modifiers() {
        assert_eq!(
            kinds("+a -b"),
            vec![TokenKind::Plus, term("a"), TokenKind::Minus, term("b")]
        );
    }

    #[test]
    fn hyphen_mid_word_is_a_term_character() {
        assert_eq!(kinds("non-word"), vec![term("non-word")]);
    }

    #[test]
    fn field_prefix_is_term_then_colon() {
        assert_eq!(
            kinds("status:active"),
            vec![term("status"), TokenKind::Colon, term("active")]
        );
    }

    #[test]
    fn range_brackets_and_to() {
        assert_eq!(
            kinds("[1 TO 10]"),
            vec![
                TokenKind::LBracket,
                term("1"),
                TokenKind::To,
                term("10"),
                TokenKind::RBracket
            ]
        );
    }

    #[test]
    fn shorthand_comparisons() {
        assert_eq!(
            kinds(">5 >=5 <5 <=5"),
            vec![
                TokenKind::Gt,
                term("5"),
                TokenKind::Gte,
                term("5"),
                TokenKind::Lt,
                term("5"),
                TokenKind::Lte,
                term("5"),
            ]
        );
    }

    #[test]
    fn bare_star_is_its_own_token() {
        assert_eq!(kinds("*"), vec![TokenKind::Star]);
    }

    #[test]
    fn prefix_wildcard_classification() {
        assert_eq!(
            kinds("foo*"),
            vec![TokenKind::Term {
                raw: "foo*".into(),
                wildcard: WildcardKind::Prefix
            }]
        );
    }

    #[test]
    fn general_wildcard_classification() {
        assert_eq!(
            kinds("f?o*bar"),
            vec![TokenKind::Term {
                raw: "f?o*bar".into(),
                wildcard: WildcardKind::Wildcard
            }]
        );
    }

    #[test]
    fn escaped_colon_stays_in_term() {
        assert_eq!(kinds(r"a\:b"), vec![term(r"a\:b")]);
    }

    #[test]
    fn escaped_space_stays_in_term() {
        assert_eq!(kinds(r"foo\ bar"), vec![term(r"foo\ bar")]);
    }

    #[test]
    fn boost_is_caret_then_term() {
        assert_eq!(kinds("a^2"), vec![term("a"), TokenKind::Caret, term("2")]);
        assert_eq!(
            kinds("a^2.5"),
            vec![term("a"), TokenKind::Caret, term("2.5")]
        );
    }

    #[test]
    fn unknown_fuzzy_operator_becomes_invalid() {
        let mut lexer = Lexer::new("a~ b");
        let t1 = lexer.next_token();
        assert_eq!(t1.kind, term("a"));
        let t2 = lexer.next_token();
        assert_eq!(t2.kind, TokenKind::Invalid("~".into()));
        assert_eq!(lexer.diagnostics().len(), 1);
        let t3 = lexer.next_token();
        assert_eq!(t3.kind, term("b"));
    }

    #[test]
    fn line_and_column_tracking() {
        let mut lexer = Lexer::new("a\nbb");
        let t1 = lexer.next_token();
        assert_eq!(t1.span.start_line, 1);
        assert_eq!(t1.span.start_column, 1);
        let t2 = lexer.next_token();
        assert_eq!(t2.span.start_line, 2);
        assert_eq!(t2.span.start_column, 1);
    }

    #[test]
    fn span_offsets_are_byte_accurate() {
        let mut lexer = Lexer::new("foo bar");
        let t1 = lexer.next_token();
        assert_eq!((t1.span.start_offset, t1.span.end_offset), (0, 3));
        let t2 = lexer.next_token();
        assert_eq!((t2.span.start_offset, t2.span.end_offset), (4, 7));
    }

    #[test]
    fn repeated_eof_is_stable() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
