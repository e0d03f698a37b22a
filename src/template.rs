//! Placeholder substitution for SQL templates
//!
//! Templates carry two placeholder forms:
//!
//! - `{name}` is replaced with the parameter rendered as a SQL literal. Text
//!   is double-quoted, numbers are written bare.
//! - `@{name}` is replaced with the parameter's plain text, unquoted. This is
//!   meant for identifiers and raw fragments such as table names.
//!
//! Names match parameters without regard to ASCII case. When a parameter is
//! used in the raw form anywhere in a template, that parameter only fills raw
//! placeholders in that template. Placeholders left without a value become
//! `NULL`.
//!
//! The template is scanned once, left to right, so text introduced by a
//! substituted value is never itself treated as a placeholder.

use crate::value::Params;
use std::collections::HashSet;

/// A placeholder occurrence inside a template.
#[derive(Debug, PartialEq)]
struct Placeholder<'t> {
    /// Byte offset of the first character, `@` included for the raw form.
    start: usize,
    /// Byte offset one past the closing brace.
    end: usize,
    name: &'t str,
    raw: bool,
}

/// Substitute `params` into `template`, producing executable SQL.
///
/// With no parameters the template is only trimmed; placeholders are left as
/// they are.
///
/// ```
/// use rust_sqlmapper::{make_query, Params};
///
/// let params = Params::new().with_value("name", "a").with_value("age", 21);
/// assert_eq!(
///     make_query("INSERT developer(name, age) VALUES({name}, {age})", &params),
///     "INSERT developer(name, age) VALUES(\"a\", 21)"
/// );
/// ```
pub fn make_query(template: &str, params: &Params) -> String {
    let template = template.trim();
    if params.is_empty() {
        return template.to_string();
    }

    let placeholders = scan(template);
    let raw_names: HashSet<String> = placeholders
        .iter()
        .filter(|p| p.raw)
        .map(|p| p.name.to_ascii_lowercase())
        .collect();

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for placeholder in &placeholders {
        out.push_str(&template[cursor..placeholder.start]);
        cursor = placeholder.end;

        let value = params.lookup(placeholder.name);
        match value {
            Some(value) if placeholder.raw => out.push_str(&value.to_raw_sql()),
            Some(value) if !raw_names.contains(&placeholder.name.to_ascii_lowercase()) => {
                out.push_str(&value.to_quoted_sql())
            }
            _ if is_identifier(placeholder.name) => out.push_str("NULL"),
            _ => out.push_str(&template[placeholder.start..placeholder.end]),
        }
    }
    out.push_str(&template[cursor..]);
    out
}

/// Find every `{name}` and `@{name}` in `template`, in order.
fn scan(template: &str) -> Vec<Placeholder<'_>> {
    let bytes = template.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let close = template[i + 1..]
            .find(|c: char| c == '{' || c == '}')
            .map(|offset| i + 1 + offset);
        match close {
            Some(j) if bytes[j] == b'}' => {
                let name = &template[i + 1..j];
                if is_placeholder_name(name) {
                    let raw = i > 0 && bytes[i - 1] == b'@';
                    found.push(Placeholder {
                        start: if raw { i - 1 } else { i },
                        end: j + 1,
                        name,
                        raw,
                    });
                    i = j + 1;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    found
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

fn is_identifier(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
