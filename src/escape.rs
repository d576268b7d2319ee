//! Escaping and unescaping of Lucene special characters.
//!
//! Kept as a private module rather than a standalone crate: the lexer and
//! renderer both need the same escape table internally, and nothing outside
//! this crate needs it as a separate collaborator.

/// The characters that must be backslash-escaped to appear literally in a
/// term, phrase, or field name, plus whitespace.
pub const SPECIAL_CHARS: &[char] = &[
    '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '/', '\\',
];

/// Whether `ch` needs escaping to appear literally outside a phrase/regex.
pub fn is_special(ch: char) -> bool {
    ch.is_whitespace() || SPECIAL_CHARS.contains(&ch)
}

/// Backslash-escapes every special character and whitespace run in `input`.
///
/// `unescape(&escape(s)) == s` for any `s`.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if is_special(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Resolves backslash escapes: `\X` becomes `X` for any character `X`.
///
/// A trailing, unpaired backslash is kept literally (there is nothing left
/// to escape).
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
