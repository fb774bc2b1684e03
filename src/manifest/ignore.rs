//! Exclusion rules for manifest discovery.
//!
//! Rules come from two sources: built-in exclusions (hidden entries and
//! dependency-manager directories) and an optional ignore-list file at the
//! scanned root. Each non-empty, non-comment line of that file is either a path
//! (absolute or relative to the root) or a pattern where `*` matches any run of
//! characters, `/` included.

use crate::config::ScanConfig;
use crate::manifest::store::ManifestStore;
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Outcome of looking up the ignore-list file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IgnoreFileStatus {
    NotPresent,
    Loaded { path: PathBuf, patterns: usize },
    /// The file exists but could not be read; only built-in rules apply
    Unreadable { path: PathBuf, message: String },
}

/// One line of the ignore-list file
#[derive(Debug, Clone)]
pub enum IgnorePattern {
    /// A file or directory; directories exclude everything beneath them
    Path(PathBuf),
    Wildcard { raw: String, pattern: Pattern },
}

impl IgnorePattern {
    fn parse(root: &Path, line: &str) -> Option<Self> {
        if line.contains('*') {
            let raw = line.strip_prefix("./").unwrap_or(line).to_string();
            match Pattern::new(&wildcard_to_glob(&raw)) {
                Ok(pattern) => Some(Self::Wildcard { raw, pattern }),
                Err(e) => {
                    log::warn!("Skipping ignore pattern {:?}: {}", line, e);
                    None
                }
            }
        } else {
            let path = Path::new(line);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            Some(Self::Path(normalize(&absolute)))
        }
    }

    /// Human-readable form, relative to `root` where possible
    pub fn display(&self, root: &Path) -> String {
        match self {
            Self::Path(path) => path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned(),
            Self::Wildcard { raw, .. } => raw.clone(),
        }
    }
}

/// Immutable exclusion predicate for one scan
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    patterns: Vec<IgnorePattern>,
    dependency_dirs: Vec<String>,
    status: IgnoreFileStatus,
}

impl IgnoreRules {
    /// Rules with only the built-in exclusions
    pub fn builtin(root: &Path, config: &ScanConfig) -> Self {
        Self {
            root: normalize(root),
            patterns: Vec::new(),
            dependency_dirs: config.dependency_dirs.clone(),
            status: IgnoreFileStatus::NotPresent,
        }
    }

    /// Built-in rules plus the patterns of an ignore-list file's content
    pub fn from_content(root: &Path, config: &ScanConfig, content: &str) -> Self {
        let mut rules = Self::builtin(root, config);
        rules.patterns = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| IgnorePattern::parse(&rules.root, line))
            .collect();
        rules
    }

    /// Load the ignore-list file at `root`.
    ///
    /// Never fails: an unreadable file is recorded in [`IgnoreRules::status`]
    /// and resolution continues with the built-in rules only.
    pub async fn load<S: ManifestStore>(store: &S, root: &Path, config: &ScanConfig) -> Self {
        let path = root.join(&config.ignore_file);

        match store.read(&path).await {
            Ok(content) => {
                let mut rules = Self::from_content(root, config, &content);
                rules.status = IgnoreFileStatus::Loaded {
                    path,
                    patterns: rules.patterns.len(),
                };
                rules
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::builtin(root, config),
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                let mut rules = Self::builtin(root, config);
                rules.status = IgnoreFileStatus::Unreadable {
                    path,
                    message: e.to_string(),
                };
                rules
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    pub fn status(&self) -> &IgnoreFileStatus {
        &self.status
    }

    /// Whether `path` (a file or directory) must be left out of the scan
    pub fn is_ignored(&self, path: &Path) -> bool {
        let absolute = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root.join(path))
        };
        let relative = absolute.strip_prefix(&self.root).unwrap_or(&absolute);

        self.is_builtin_excluded(relative)
            || self.patterns.iter().any(|pattern| match pattern {
                IgnorePattern::Path(ignored) => absolute.starts_with(ignored),
                IgnorePattern::Wildcard { raw, pattern } => {
                    let subject = if Path::new(raw).is_absolute() {
                        absolute.as_path()
                    } else {
                        relative
                    };
                    matches_self_or_ancestor(pattern, subject)
                }
            })
    }

    fn is_builtin_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                name.starts_with('.') || self.dependency_dirs.iter().any(|d| *d == name)
            }
            _ => false,
        })
    }
}

/// Collapse runs of `*` and escape every other glob metacharacter so the only
/// wildcard left is a single `*` that also crosses `/`.
fn wildcard_to_glob(raw: &str) -> String {
    let mut glob = String::new();
    for (index, part) in raw.split('*').enumerate() {
        if index > 0 && !glob.ends_with('*') {
            glob.push('*');
        }
        glob.push_str(&Pattern::escape(part));
    }
    glob
}

/// A pattern naming a directory also excludes everything below it
fn matches_self_or_ancestor(pattern: &Pattern, subject: &Path) -> bool {
    subject
        .ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .any(|p| pattern.matches_with(&p.to_string_lossy(), MATCH_OPTIONS))
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
