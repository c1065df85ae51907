//! Read-only guard for raw SQL
//!
//! Raw statements are screened before they reach the database: one
//! statement, starting with SELECT or WITH, no mutating keyword outside a
//! quoted literal, and a placeholder count that matches the bound params.
//! Comments are stripped before any of these checks.

use crate::error::QueryServiceError;
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Literals first, so `--` inside a string is not taken for a comment
    static ref LITERAL_OR_COMMENT: Regex = Regex::new(
        r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|--[^\n]*|/\*(?s:.*?)(?:\*/|$)"#
    )
    .expect("literal or comment pattern");
    static ref QUOTED: Regex =
        Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*""#).expect("quoted literal pattern");
    static ref MUTATING: Regex = Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|create|replace|attach|detach|pragma|vacuum|reindex)\b"
    )
    .expect("mutating keyword pattern");
    static ref NUMBERED_PARAM: Regex =
        Regex::new(r"[?][0-9]+|[:@$][A-Za-z_][A-Za-z0-9_]*").expect("numbered param pattern");
}

/// Validate `sql` and return it without comments or trailing semicolons.
pub fn read_only_statement(sql: &str, param_count: usize) -> Result<String> {
    let uncommented = strip_comments(sql);
    let statement = uncommented.trim().trim_end_matches(';').trim_end();

    if statement.is_empty() {
        return Err(QueryServiceError::QueryError("empty SQL statement".to_string()));
    }

    let unquoted = QUOTED.replace_all(statement, "''");

    if unquoted.contains(';') {
        return Err(QueryServiceError::QueryError(
            "only a single statement is allowed".to_string(),
        ));
    }

    let first_keyword = unquoted
        .split_whitespace()
        .next()
        .map(|word| word.trim_start_matches('(').to_ascii_lowercase())
        .unwrap_or_default();

    if first_keyword != "select" && first_keyword != "with" {
        return Err(QueryServiceError::QueryError(format!(
            "only SELECT statements are allowed (got '{}')",
            first_keyword
        )));
    }

    if let Some(keyword) = MUTATING.find(&unquoted) {
        return Err(QueryServiceError::QueryError(format!(
            "statement contains forbidden keyword '{}'",
            keyword.as_str().to_ascii_uppercase()
        )));
    }

    // Numbered and named placeholders are left to the driver.
    if !NUMBERED_PARAM.is_match(&unquoted) {
        let placeholders = unquoted.matches('?').count();
        if placeholders != param_count {
            return Err(QueryServiceError::QueryError(format!(
                "statement expects {} parameter(s) but {} were supplied",
                placeholders, param_count
            )));
        }
    }

    Ok(statement.to_string())
}

/// Replace each comment with a space, leaving quoted literals untouched.
fn strip_comments(sql: &str) -> String {
    LITERAL_OR_COMMENT
        .replace_all(sql, |caps: &regex::Captures| {
            let matched = &caps[0];
            if matched.starts_with("--") || matched.starts_with("/*") {
                " ".to_string()
            } else {
                matched.to_string()
            }
        })
        .into_owned()
}
