use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

pub mod process;

pub use process::{CommandSpec, ExecError, ExecOutcome, Executor, NativeExecutor};

/// Absolute prefix that task text uses to address the data root.
pub const DEFAULT_MOUNT_PREFIX: &str = "/data";

/// Markers that make a path count as a destructive operation.
pub const DEFAULT_DESTRUCTIVE_MARKERS: &[&str] = &["delete", "remove"];

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("sandbox root is not usable: {0}")]
    Root(#[from] std::io::Error),
    #[error("sandbox root is not a directory")]
    NotADirectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Empty,
    Invalid,
    OutsideRoot,
    Destructive,
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::Empty => "Access Denied: empty path.",
            Denial::Invalid => "Access Denied: path cannot be resolved.",
            Denial::OutsideRoot => "Access Denied: attempt to access files outside the data root.",
            Denial::Destructive => "Access Denied: deleting files is not allowed.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxDecision {
    /// Carries the canonical path; callers must act on it rather than the raw candidate.
    Allowed(PathBuf),
    Denied(Denial),
}

impl SandboxDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SandboxDecision::Allowed(_))
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            SandboxDecision::Allowed(_) => None,
            SandboxDecision::Denied(denial) => Some(denial.reason()),
        }
    }

    pub fn denial(&self) -> Option<Denial> {
        match self {
            SandboxDecision::Allowed(_) => None,
            SandboxDecision::Denied(denial) => Some(*denial),
        }
    }
}

/// Containment boundary for every path a handler touches.
///
/// Two independent checks must both pass: the canonical candidate lies at or
/// under the root, and its lowercased text carries no destructive marker.
/// The marker check is a plain substring match, so a file such as
/// `removed-users.csv` is refused as well. That over-broad rule is kept as is.
///
/// An optional mount prefix (normally `/data`) stands for the root, so
/// `/data/dates.txt` names `<root>/dates.txt`.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    markers: Vec<String>,
    mount: Option<PathBuf>,
}

impl Sandbox {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SandboxError> {
        Self::with_markers(root, DEFAULT_DESTRUCTIVE_MARKERS.iter().copied())
    }

    pub fn with_markers<I, S>(root: impl AsRef<Path>, markers: I) -> Result<Self, SandboxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(SandboxError::NotADirectory);
        }
        let markers = markers
            .into_iter()
            .map(|m| m.as_ref().nfkc().collect::<String>().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Ok(Self {
            root,
            markers,
            mount: None,
        })
    }

    /// Treats absolute candidates under `prefix` as paths under the root.
    pub fn with_mount(mut self, prefix: impl AsRef<Path>) -> Self {
        let prefix = prefix.as_ref();
        self.mount = (prefix.is_absolute() && prefix.parent().is_some()).then(|| prefix.to_path_buf());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mount(&self) -> Option<&Path> {
        self.mount.as_deref()
    }

    pub fn check_path(&self, candidate: &str) -> SandboxDecision {
        let normalized: String = candidate.nfkc().collect();
        if normalized.trim().is_empty() {
            return SandboxDecision::Denied(Denial::Empty);
        }
        let candidate = self.unmount(Path::new(&normalized));
        let Some(resolved) = self.resolve(&candidate) else {
            debug!(candidate = %candidate.display(), "sandbox could not resolve path");
            return SandboxDecision::Denied(Denial::Invalid);
        };
        if !resolved.starts_with(&self.root) {
            return SandboxDecision::Denied(Denial::OutsideRoot);
        }
        if self.is_destructive(&resolved.to_string_lossy()) {
            return SandboxDecision::Denied(Denial::Destructive);
        }
        SandboxDecision::Allowed(resolved)
    }

    /// Like [`Sandbox::check_path`], with the operation verb subjected to the
    /// destructive-marker check too.
    pub fn check_operation(&self, verb: &str, candidate: &str) -> SandboxDecision {
        match self.check_path(candidate) {
            SandboxDecision::Allowed(_) if self.is_destructive(verb) => {
                SandboxDecision::Denied(Denial::Destructive)
            }
            decision => decision,
        }
    }

    /// Root-relative rendering of a path, for messages that leave the core.
    pub fn display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => "<outside root>".to_string(),
        }
    }

    /// Strips the absolute root prefix out of free text.
    pub fn redact(&self, text: &str) -> String {
        let root = self.root.to_string_lossy();
        let with_sep = format!("{root}{}", std::path::MAIN_SEPARATOR);
        text.replace(&with_sep, "").replace(root.as_ref(), ".")
    }

    fn is_destructive(&self, text: &str) -> bool {
        let folded = text.nfkc().collect::<String>().to_lowercase();
        self.markers.iter().any(|m| folded.contains(m.as_str()))
    }

    fn unmount(&self, candidate: &Path) -> PathBuf {
        match self.mount.as_deref().map(|m| candidate.strip_prefix(m)) {
            Some(Ok(rest)) => self.root.join(rest),
            _ => candidate.to_path_buf(),
        }
    }

    fn resolve(&self, candidate: &Path) -> Option<PathBuf> {
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        let lexical = normalize_lexically(&joined)?;

        // Canonicalize the deepest existing ancestor so symlinks are followed,
        // then re-attach the components that do not exist yet.
        let mut pending: Vec<OsString> = Vec::new();
        let mut probe = lexical.as_path();
        loop {
            match probe.canonicalize() {
                Ok(mut base) => {
                    for part in pending.iter().rev() {
                        base.push(part);
                    }
                    return Some(base);
                }
                Err(_) => {
                    pending.push(probe.file_name()?.to_os_string());
                    probe = probe.parent()?;
                }
            }
        }
    }
}

fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the filesystem root stays at the root.
                out.pop();
            }
            Component::Normal(part) => {
                if part.to_string_lossy().contains('\0') {
                    return None;
                }
                out.push(part);
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_normalization() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            Some(PathBuf::from("/a/c/d"))
        );
        assert_eq!(
            normalize_lexically(Path::new("/../../etc")),
            Some(PathBuf::from("/etc"))
        );
    }

    #[test]
    fn test_display_is_root_relative() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let inner = sandbox.root().join("docs").join("index.json");
        assert_eq!(sandbox.display(&inner), format!("docs{}index.json", std::path::MAIN_SEPARATOR));
        assert_eq!(sandbox.display(sandbox.root()), ".");
        assert_eq!(sandbox.display(Path::new("/etc/passwd")), "<outside root>");
    }

    #[test]
    fn test_redact_removes_root() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let msg = format!("failed on {}", sandbox.root().join("head.txt").display());
        assert_eq!(sandbox.redact(&msg), "failed on head.txt");
    }

    #[test]
    fn test_markers_are_case_folded() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::with_markers(dir.path(), ["PURGE"]).unwrap();
        assert_eq!(
            sandbox.check_path("purge-me.txt").denial(),
            Some(Denial::Destructive)
        );
        assert!(sandbox.check_path("delete-me.txt").is_allowed());
    }
}
