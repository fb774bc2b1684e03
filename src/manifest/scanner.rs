//! Manifest discovery and resource extraction.
//!
//! Walks the scanned root for `.yaml`/`.yml` files (honouring [`IgnoreRules`]),
//! parses each file as a multi-document stream and extracts Deployment or
//! Ingress records. Files are read one at a time in traversal order. A file
//! that cannot be read or parsed is recorded and skipped; only a failure at the
//! root itself aborts the scan.

use crate::error::ScanError;
use crate::manifest::document::DocumentSet;
use crate::manifest::ignore::{IgnoreFileStatus, IgnoreRules};
use crate::manifest::resource::{
    DeploymentRecord, DeploymentView, IngressRecord, IngressView, InvalidResource,
    KubernetesResource, ResourceKind,
};
use crate::manifest::store::ManifestStore;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file left out of the scan after it was found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything one scan found
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport<R> {
    pub root: PathBuf,
    pub ignore_status: IgnoreFileStatus,
    /// Number of YAML files enumerated after exclusions
    pub files_scanned: usize,
    pub records: Vec<R>,
    pub invalid: Vec<InvalidResource>,
    pub skipped: Vec<SkippedFile>,
}

impl<R> ScanReport<R> {
    fn new(rules: &IgnoreRules) -> Self {
        Self {
            root: rules.root().to_path_buf(),
            ignore_status: rules.status().clone(),
            files_scanned: 0,
            records: Vec::new(),
            invalid: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<R: KubernetesResource> ScanReport<R> {
    /// Record count per namespace
    pub fn namespaces(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.namespace().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of distinct files holding at least one record
    pub fn unique_files(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.file_path())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Canonicalize the scan root and check that it is a readable directory
pub fn resolve_root(directory: &Path) -> Result<PathBuf, ScanError> {
    let root = directory.canonicalize().map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ScanError::NotFound(directory.to_path_buf())
        } else {
            ScanError::Unreadable {
                path: directory.to_path_buf(),
                source,
            }
        }
    })?;

    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root));
    }
    std::fs::read_dir(&root).map_err(|source| ScanError::Unreadable {
        path: root.clone(),
        source,
    })?;

    Ok(root)
}

/// Enumerate YAML files under the rules' root, in traversal order.
///
/// Returns the files plus the entries that could not be visited below the root.
pub fn find_manifest_files(
    rules: &IgnoreRules,
) -> Result<(Vec<PathBuf>, Vec<SkippedFile>), ScanError> {
    let root = rules.root();
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !rules.is_ignored(entry.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                log::warn!("Skipping {}: {}", path.display(), e);
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if entry.file_type().is_file() && is_yaml_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    log::debug!("Found {} YAML files under {}", files.len(), root.display());
    Ok((files, skipped))
}

/// Scan for `apps/v1` Deployments
pub async fn scan_deployments<S: ManifestStore>(
    store: &S,
    rules: &IgnoreRules,
) -> Result<ScanReport<DeploymentRecord>, ScanError> {
    scan_with(store, rules, extract_deployments).await
}

/// Scan for Ingresses
pub async fn scan_ingresses<S: ManifestStore>(
    store: &S,
    rules: &IgnoreRules,
) -> Result<ScanReport<IngressRecord>, ScanError> {
    scan_with(store, rules, extract_ingresses).await
}

async fn scan_with<S, R>(
    store: &S,
    rules: &IgnoreRules,
    extract: fn(&DocumentSet, &mut ScanReport<R>),
) -> Result<ScanReport<R>, ScanError>
where
    S: ManifestStore,
{
    let mut report = ScanReport::new(rules);
    let (files, skipped) = find_manifest_files(rules)?;
    report.files_scanned = files.len();
    report.skipped = skipped;

    for path in files {
        match DocumentSet::load(store, &path).await {
            Ok(set) => extract(&set, &mut report),
            Err(e) => {
                log::warn!("{}", e);
                report.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

fn extract_deployments(set: &DocumentSet, report: &mut ScanReport<DeploymentRecord>) {
    for (position, doc) in set.documents().iter().enumerate() {
        let Some(view) = DeploymentView::from_document(doc) else {
            continue;
        };
        match view.record(set.path(), position) {
            Ok(record) => report.records.push(record),
            Err(violations) => report.invalid.push(InvalidResource {
                file_path: set.path().to_path_buf(),
                position,
                kind: ResourceKind::Deployment,
                name: view.name().map(String::from),
                violations,
            }),
        }
    }
}

fn extract_ingresses(set: &DocumentSet, report: &mut ScanReport<IngressRecord>) {
    for (position, doc) in set.documents().iter().enumerate() {
        let Some(view) = IngressView::from_document(doc) else {
            continue;
        };
        match view.record(set.path(), position) {
            Ok(record) => report.records.push(record),
            Err(violations) => report.invalid.push(InvalidResource {
                file_path: set.path().to_path_buf(),
                position,
                kind: ResourceKind::Ingress,
                name: view.name().map(String::from),
                violations,
            }),
        }
    }
}

fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
