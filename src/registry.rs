//! Ordered dispatch table from task text to handlers.
//!
//! Entries are tried in registration order and the first predicate that
//! accepts the text wins. Later predicates are not evaluated. Predicate
//! authors are responsible for keeping patterns apart; when two entries can
//! both accept a text, the earlier one silently shadows the later one.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::handler::Handler;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("duplicate handler id: {0}")]
    DuplicateId(String),
    #[error("invalid predicate pattern for {id}: {source}")]
    Pattern {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Raw instruction plus an NFKC copy for parameter extraction and a folded
/// copy (NFKC, lowercase) for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskText {
    raw: String,
    normalized: String,
    folded: String,
}

impl TaskText {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = raw.nfkc().collect::<String>();
        let folded = normalized.to_lowercase();
        Self {
            raw,
            normalized,
            folded,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Same characters predicates see, with the original case kept.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

impl From<&str> for TaskText {
    fn from(s: &str) -> Self {
        TaskText::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId(Arc<str>);

impl HandlerId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for HandlerId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

type MatchFn = dyn Fn(&TaskText) -> bool + Send + Sync;

/// Pure, deterministic test over task text.
pub struct Predicate(Box<MatchFn>);

impl Predicate {
    pub fn new(f: impl Fn(&TaskText) -> bool + Send + Sync + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Every keyword must occur as a substring of the folded text.
    pub fn contains_all(keywords: &[&str]) -> Self {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        Self::new(move |task| keywords.iter().all(|k| task.folded().contains(k.as_str())))
    }

    /// Case-insensitive regex over the folded text.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let re: Regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self::new(move |task| re.is_match(task.folded())))
    }

    /// Accepts only when every part accepts.
    pub fn all(parts: Vec<Predicate>) -> Self {
        Self::new(move |task| parts.iter().all(|p| p.test(task)))
    }

    pub fn test(&self, task: &TaskText) -> bool {
        (self.0)(task)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

pub struct RegistryEntry {
    pub id: HandlerId,
    pub predicate: Predicate,
    pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry").field("id", &self.id).finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn first_match(&self, task: &TaskText) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.predicate.test(task))
    }

    /// Every entry accepting `task`, in priority order. Diagnostics only;
    /// routing never evaluates past the first match.
    pub fn matching_ids(&self, task: &TaskText) -> Vec<&HandlerId> {
        self.entries
            .iter()
            .filter(|e| e.predicate.test(task))
            .map(|e| &e.id)
            .collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<RegistryEntry>,
    error: Option<RegistryError>,
}

impl RegistryBuilder {
    pub fn register(
        mut self,
        id: &str,
        predicate: Predicate,
        handler: impl Handler + 'static,
    ) -> Self {
        self.push(id, predicate, Arc::new(handler));
        self
    }

    pub fn register_pattern(
        mut self,
        id: &str,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Self {
        match Predicate::pattern(pattern) {
            Ok(predicate) => self.push(id, predicate, Arc::new(handler)),
            Err(source) => {
                self.error.get_or_insert(RegistryError::Pattern {
                    id: id.to_string(),
                    source,
                });
            }
        }
        self
    }

    pub fn register_shared(mut self, id: &str, predicate: Predicate, handler: Arc<dyn Handler>) -> Self {
        self.push(id, predicate, handler);
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(RegistryError::DuplicateId(entry.id.to_string()));
            }
        }
        Ok(Registry {
            entries: self.entries,
        })
    }

    fn push(&mut self, id: &str, predicate: Predicate, handler: Arc<dyn Handler>) {
        self.entries.push(RegistryEntry {
            id: HandlerId::new(id),
            predicate,
            handler,
        });
    }
}
