//! Parameter extraction helpers shared by the built-in handlers.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::outcome::TaskError;

static FILE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w./-]+\.[A-Za-z0-9]+$").expect("static regex"));

/// Strips quotes and trailing sentence punctuation from a captured target.
pub fn target(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim_end_matches(['.', ',', ';', '!', '?'])
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .to_string()
}

/// Positive count parsed from a regex capture.
pub fn count(raw: &str, what: &str) -> Result<usize, TaskError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(TaskError::BadRequest(format!("{what} must be at least 1"))),
        Ok(n) => Ok(n),
        Err(_) => Err(TaskError::BadRequest(format!("invalid {what}: {raw}"))),
    }
}

/// First whitespace-separated token that looks like a file name, skipping
/// URLs and addresses.
pub fn file_token(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(target)
        .filter(|t| !t.contains("://") && !t.contains('@'))
        .find(|t| FILE_TOKEN.is_match(t))
}

/// First file-like token with the given extension.
pub fn file_with_extension(text: &str, ext: &str) -> Option<String> {
    text.split_whitespace()
        .map(target)
        .filter(|t| !t.contains("://") && !t.contains('@'))
        .find(|t| {
            FILE_TOKEN.is_match(t)
                && Path::new(t)
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
}

/// Sibling of `input` named `<stem><suffix>`, kept root-relative.
pub fn derived_name(input: &str, suffix: &str) -> String {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = format!("{stem}{suffix}");
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name).to_string_lossy().into_owned(),
        _ => name,
    }
}
