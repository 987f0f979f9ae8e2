//! Built-in handlers and the registry that wires them up.

pub mod contacts;
pub mod destructive;
pub mod email;
pub mod extract;
pub mod fetch;
pub mod files;
pub mod format;
pub mod git;
pub mod logs;
pub mod markdown;
pub mod weekdays;
pub mod words;

use serde::Serialize;
use serde_json::Value;

use crate::outcome::TaskError;
use crate::registry::{Predicate, Registry, RegistryError};

pub use contacts::ContactSorter;
pub use destructive::DestructiveGuard;
pub use email::EmailSender;
pub use fetch::ApiFetch;
pub use files::{HeadLines, ListFiles, Sha256File, TailLines};
pub use format::PrettierFormat;
pub use git::GitUpdate;
pub use logs::RecentLogs;
pub use markdown::MarkdownIndex;
pub use weekdays::WeekdayCounter;
pub use words::TopWords;

/// Registration order is priority order. `B2` comes first so a request to
/// delete something is refused even when it names a file another handler
/// would accept.
pub const BUILTIN_ORDER: [&str; 14] = [
    "B2", "A2", "A3", "A4", "A5", "A6", "A7", "B3", "B4", "B6", "B7", "B8", "B9", "B10",
];

pub fn builtin_registry() -> Result<Registry, RegistryError> {
    let markdown_index = Predicate::all(vec![
        Predicate::pattern(markdown::PATTERN).map_err(|source| RegistryError::Pattern {
            id: "A6".to_string(),
            source,
        })?,
        Predicate::contains_all(&["markdown"]),
    ]);

    Registry::builder()
        .register_pattern("B2", destructive::PATTERN, DestructiveGuard)
        .register("A2", Predicate::contains_all(&["format", "prettier"]), PrettierFormat)
        .register_pattern("A3", weekdays::PATTERN, WeekdayCounter)
        .register("A4", Predicate::contains_all(&["sort", "contacts"]), ContactSorter)
        .register_pattern("A5", logs::PATTERN, RecentLogs)
        .register("A6", markdown_index, MarkdownIndex)
        .register_pattern("A7", email::PATTERN, EmailSender)
        .register("B3", Predicate::contains_all(&["fetch", "api"]), ApiFetch)
        .register("B4", Predicate::contains_all(&["clone", "git"]), GitUpdate)
        .register("B6", Predicate::contains_all(&["list files", "directory"]), ListFiles)
        .register("B7", Predicate::contains_all(&["read first", "lines of"]), HeadLines)
        .register("B8", Predicate::contains_all(&["read last", "lines of"]), TailLines)
        .register_pattern("B9", r"\bcompute sha-?256\b.*\bhash of\b", Sha256File)
        .register("B10", Predicate::contains_all(&["extract top", "words from"]), TopWords)
        .build()
}

/// JSON rendered with four-space indentation, the layout every JSON artifact uses.
pub(crate) fn to_indented_json(value: &Value) -> Result<Vec<u8>, TaskError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| TaskError::Internal(e.into()))?;
    Ok(buf)
}
