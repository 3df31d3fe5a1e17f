//! Text normalization shared by every emitter
//!
//! Two identifier forms exist:
//! - `name_to_id`: resource ids and file names (`[0-9A-Za-z.-]`, at most 55 chars)
//! - `escape_code`: expression codes, which keep spaces but lose quotes (at most 245 chars)
//!
//! Both fall back to `to_hash` when the input exceeds the cap, so long names
//! stay unique and stable across runs.

use sha2::{Digest, Sha256};
use tracing::debug;

/// Maximum length of a resource id
pub const ID_MAX_LEN: usize = 55;

/// Maximum length of an expression code (file names are capped at 255)
pub const CODE_MAX_LEN: usize = 245;

/// Number of hex characters appended by `to_hash`
const HASH_SUFFIX_LEN: usize = 10;

/// Truncate `input` so the result is at most `length` characters, replacing
/// the tail with a 10 character hex digest of the whole input.
pub fn to_hash(input: &str, length: usize) -> String {
    let keep = length.saturating_sub(HASH_SUFFIX_LEN);
    let digest = Sha256::digest(input.as_bytes());
    let suffix: String = digest[..HASH_SUFFIX_LEN / 2]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    let prefix: String = input.chars().take(keep).collect();
    format!("{}{}", prefix, suffix)
}

/// Convert free text to a resource id
pub fn name_to_id(name: &str) -> String {
    let id: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.')
        .collect();
    // Trailing periods break the page generator
    let id = id.trim_end_matches('.');

    if id.len() > ID_MAX_LEN {
        debug!(id, "id too long, hashing");
        to_hash(id, ID_MAX_LEN)
    } else {
        id.to_string()
    }
}

/// Lowercase variant of `name_to_id`, used for label comparison
pub fn name_to_lower_id(name: &str) -> String {
    name_to_id(&name.to_lowercase())
}

/// Case and punctuation insensitive label comparison
pub fn labels_match(a: &str, b: &str) -> bool {
    let a = name_to_lower_id(a);
    !a.is_empty() && a == name_to_lower_id(b)
}

/// Normalize an expression name into a code
pub fn escape_code(input: &str) -> String {
    let stripped: String = input.trim().chars().filter(|c| *c != '"' && *c != '\'').collect();
    let code = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if code.chars().count() > CODE_MAX_LEN {
        debug!(code = %code, "code too long, hashing");
        to_hash(&code, CODE_MAX_LEN)
    } else {
        code
    }
}

/// Escape text for a double-quoted FSH string
pub fn escape(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape text for a triple-quoted FSH markdown string
pub fn markdown_escape(input: &str) -> String {
    input.replace("\"\"\"", "\\\"\\\"\\\"")
}

/// Keep text from terminating a CQL block comment
pub fn comment_escape(input: &str) -> String {
    input.replace("*/", "*\\/")
}

pub fn is_blank(input: &str) -> bool {
    input.trim().is_empty()
}

/// A lone `-` or `–` marks a cell as intentionally empty
pub fn is_dash(input: &str) -> bool {
    matches!(input.trim(), "-" | "–")
}

/// Split cell text on the first newline into a name and an optional expression
pub fn split_name_expression(text: &str) -> (String, Option<String>) {
    let text = text.trim();
    match text.split_once('\n') {
        Some((name, expr)) if !is_blank(expr) => {
            (name.trim().to_string(), Some(expr.trim().to_string()))
        }
        Some((name, _)) => (name.trim().to_string(), None),
        None => (text.to_string(), None),
    }
}

/// Format a number the way a spreadsheet displays it
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let rounded = (n * 1e6).round() / 1e6;
        format!("{:.6}", rounded)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
