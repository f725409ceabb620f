//! Literal redaction for SQL text
//!
//! Tokenizes with the Postgres dialect and swaps literal tokens for `?`; every
//! other token is written back as it was read. Statement text is often cut at
//! a fixed length, so input ending inside a string or comment is redacted up
//! to the last point the tokenizer accepts.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

const PLACEHOLDER: &str = "?";

/// Replace string, dollar-quoted and numeric literals with `?`.
///
/// Identifiers, quoted identifiers, `$n` parameters, casts, comments and
/// whitespace are kept verbatim.
pub fn redact_sql(sql: &str) -> String {
    if let Some(tokens) = tokenize(sql) {
        return render(&tokens);
    }

    match truncated_tail(sql) {
        Some((cut, tokens)) => {
            let mut out = render(&tokens);
            out.push_str(&redact_tail(&sql[cut..]));
            out
        }
        // Nothing tokenizes; leak nothing
        None => PLACEHOLDER.to_string(),
    }
}

fn tokenize(sql: &str) -> Option<Vec<Token>> {
    let dialect = PostgreSqlDialect {};
    Tokenizer::new(&dialect, sql).tokenize().ok()
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| match token {
            Token::Number(_, _)
            | Token::SingleQuotedString(_)
            | Token::NationalStringLiteral(_)
            | Token::EscapedStringLiteral(_)
            | Token::HexStringLiteral(_)
            | Token::DollarQuotedString(_) => PLACEHOLDER.to_string(),
            other => other.to_string(),
        })
        .collect()
}

/// Latest byte offset where an unterminated quote or comment could start
/// and the text before it tokenizes.
fn truncated_tail(sql: &str) -> Option<(usize, Vec<Token>)> {
    let candidates = sql
        .char_indices()
        .filter(|(_, c)| matches!(c, '\'' | '"' | '$' | '/'))
        .map(|(i, _)| i)
        .collect::<Vec<_>>();

    candidates.into_iter().rev().find_map(|cut| {
        // the second quote of a doubled `''` escape does not open a string
        if sql[cut..].starts_with('\'') && sql[..cut].ends_with('\'') {
            return None;
        }
        let mut tokens = tokenize(&sql[..cut])?;
        // `E'...` leaves the `E` prefix behind as a word
        if sql[cut..].starts_with('\'') {
            if let Some(Token::Word(word)) = tokens.last() {
                if word.quote_style.is_none() && word.value.eq_ignore_ascii_case("e") {
                    tokens.pop();
                }
            }
        }
        Some((cut, tokens))
    })
}

/// Comments and quoted identifiers are kept; a cut-off literal is not.
fn redact_tail(tail: &str) -> String {
    if tail.starts_with("/*") || tail.starts_with('"') {
        tail.to_string()
    } else {
        PLACEHOLDER.to_string()
    }
}
