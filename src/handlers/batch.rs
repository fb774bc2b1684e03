//! Batch sequencing shared by every command.
//!
//! A command scans and classifies, then hands its actionable set here as a
//! list of [`PlannedChange`]s: select → preview → confirm → apply one item at
//! a time. A failing item is recorded in the tally and the loop moves on.

use crate::error::Result;
use crate::handlers::report::Reporter;
use crate::manifest::mutate::{self, DesiredChange, MutationOutcome, MutationTarget};
use crate::manifest::{
    IgnoreFileStatus, IgnoreRules, InvalidResource, KubernetesResource, ManifestStore, ResourceKind,
    ScanReport, SkippedFile,
};
use crate::wizard::{Prompter, Selection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Flags shared by every command
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Preview only; nothing is written
    pub dry_run: bool,
    /// Skip the selection prompt and take every actionable resource
    pub select_all: bool,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
}

/// One actionable resource and the edit it needs
#[derive(Debug, Clone, Serialize)]
pub struct PlannedChange {
    pub target: MutationTarget,
    pub namespace: String,
    /// File path relative to the scanned root
    pub relative_path: String,
    /// Short status tag shown in the selection list
    pub status: String,
    /// Preview lines describing the edit
    pub details: Vec<String>,
    pub change: DesiredChange,
}

impl PlannedChange {
    /// `<status> <namespace>/<name> (<relative path>)`
    pub fn label(&self) -> String {
        format!(
            "{} {}/{} ({})",
            self.status, self.namespace, self.target.name, self.relative_path
        )
    }
}

/// Counts and findings of one scan, independent of resource kind
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub kind: ResourceKind,
    pub ignore_status: IgnoreFileStatus,
    pub ignore_patterns: Vec<String>,
    pub files_scanned: usize,
    pub resources: usize,
    pub unique_files: usize,
    pub namespaces: BTreeMap<String, usize>,
    /// Resources already matching the policy
    pub correct: usize,
    pub invalid: Vec<InvalidResource>,
    pub skipped: Vec<SkippedFile>,
}

impl ScanSummary {
    pub fn from_report<R: KubernetesResource>(
        kind: ResourceKind,
        report: &ScanReport<R>,
        rules: &IgnoreRules,
        correct: usize,
    ) -> Self {
        Self {
            root: report.root.clone(),
            kind,
            ignore_status: report.ignore_status.clone(),
            ignore_patterns: rules
                .patterns()
                .iter()
                .map(|pattern| pattern.display(rules.root()))
                .collect(),
            files_scanned: report.files_scanned,
            resources: report.records.len(),
            unique_files: report.unique_files(),
            namespaces: report.namespaces(),
            correct,
            invalid: report.invalid.clone(),
            skipped: report.skipped.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Applied,
    /// Already in the desired state; the file was left alone
    Unchanged,
    Failed,
}

/// Result of applying one planned change
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub namespace: String,
    pub name: String,
    pub file_path: PathBuf,
    pub status: ItemStatus,
    pub error: Option<String>,
}

impl ItemResult {
    fn new(item: &PlannedChange, status: ItemStatus, error: Option<String>) -> Self {
        Self {
            namespace: item.namespace.clone(),
            name: item.target.name.clone(),
            file_path: item.target.file_path.clone(),
            status,
            error,
        }
    }
}

/// Final counts, in application order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchTally {
    pub processed: usize,
    pub errored: usize,
    pub results: Vec<ItemResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// No YAML file under the root
    NoManifests,
    /// YAML files, but no resource of the scanned kind
    NoResources,
    AllCorrect { correct: usize },
    /// Empty selection, aborted prompt or declined confirmation
    Cancelled,
    DryRun { planned: Vec<PlannedChange> },
    Completed(BatchTally),
}

/// Everything a command run produced
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub summary: ScanSummary,
    pub outcome: BatchOutcome,
}

/// Decide whether a run stops before selection
pub fn early_exit(summary: &ScanSummary, planned: usize) -> Option<BatchOutcome> {
    if summary.files_scanned == 0 {
        Some(BatchOutcome::NoManifests)
    } else if summary.resources == 0 {
        Some(BatchOutcome::NoResources)
    } else if planned == 0 {
        Some(BatchOutcome::AllCorrect {
            correct: summary.correct,
        })
    } else {
        None
    }
}

/// Path of `path` relative to `root`, for display
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Run selection, preview, confirmation and application for `plan`
pub async fn execute<S: ManifestStore>(
    store: &S,
    prompter: &dyn Prompter,
    reporter: &mut dyn Reporter,
    kind: ResourceKind,
    plan: Vec<PlannedChange>,
    options: BatchOptions,
) -> Result<BatchOutcome> {
    let selected = if options.select_all {
        plan
    } else {
        let labels: Vec<String> = plan.iter().map(PlannedChange::label).collect();
        let message = format!("Select the {}s to update:", kind);
        match prompter.select(&message, &labels)? {
            Selection::Chosen(indices) => {
                let mut plan: Vec<Option<PlannedChange>> = plan.into_iter().map(Some).collect();
                indices
                    .into_iter()
                    .filter_map(|i| plan.get_mut(i).and_then(Option::take))
                    .collect()
            }
            Selection::Cancelled => Vec::new(),
        }
    };

    if selected.is_empty() {
        return Ok(BatchOutcome::Cancelled);
    }

    reporter.preview(&selected);

    if options.dry_run {
        return Ok(BatchOutcome::DryRun { planned: selected });
    }

    if !options.assume_yes {
        let message = format!("Apply changes to {} {}(s)?", selected.len(), kind);
        if !prompter.confirm(&message)? {
            return Ok(BatchOutcome::Cancelled);
        }
    }

    let total = selected.len();
    let mut tally = BatchTally::default();

    for (index, item) in selected.iter().enumerate() {
        reporter.item_started(index, total, item);

        let result = match mutate::apply(store, &item.target, &item.change).await {
            Ok(outcome) => {
                tally.processed += 1;
                let status = match outcome {
                    MutationOutcome::Applied => ItemStatus::Applied,
                    MutationOutcome::Unchanged => ItemStatus::Unchanged,
                };
                ItemResult::new(item, status, None)
            }
            Err(e) => {
                log::warn!("{}/{}: {}", item.namespace, item.target.name, e);
                tally.errored += 1;
                ItemResult::new(item, ItemStatus::Failed, Some(e.to_string()))
            }
        };

        reporter.item_finished(&result);
        tally.results.push(result);
    }

    Ok(BatchOutcome::Completed(tally))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::report::SilentReporter;
    use crate::manifest::FsStore;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    struct ScriptedPrompter {
        selection: Selection,
        confirm: bool,
        confirmations: RefCell<usize>,
    }

    impl ScriptedPrompter {
        fn new(selection: Selection, confirm: bool) -> Self {
            Self {
                selection,
                confirm,
                confirmations: RefCell::new(0),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn select(&self, _message: &str, _candidates: &[String]) -> Result<Selection> {
            Ok(self.selection.clone())
        }

        fn confirm(&self, _message: &str) -> Result<bool> {
            *self.confirmations.borrow_mut() += 1;
            Ok(self.confirm)
        }
    }

    const INGRESS: &str = "apiVersion: networking.k8s.io/v1\nkind: Ingress\nmetadata:\n  name: NAME\n";

    fn plan_for(dir: &TempDir, names: &[&str]) -> Vec<PlannedChange> {
        names
            .iter()
            .map(|name| {
                let path = dir.path().join(format!("{name}.yaml"));
                fs::write(&path, INGRESS.replace("NAME", name)).unwrap();
                PlannedChange {
                    target: MutationTarget {
                        file_path: path,
                        kind: ResourceKind::Ingress,
                        name: name.to_string(),
                        position: Some(0),
                    },
                    namespace: "default".to_string(),
                    relative_path: format!("{name}.yaml"),
                    status: "Add".to_string(),
                    details: Vec::new(),
                    change: DesiredChange::SetAnnotation {
                        key: "cert-manager.io/cluster-issuer".to_string(),
                        value: "letsencrypt".to_string(),
                    },
                }
            })
            .collect()
    }

    #[test]
    fn test_label() {
        let dir = TempDir::new().unwrap();
        let plan = plan_for(&dir, &["web"]);
        assert_eq!(plan[0].label(), "Add default/web (web.yaml)");
    }

    #[tokio::test]
    async fn test_selection_subset_in_list_order() {
        let dir = TempDir::new().unwrap();
        let plan = plan_for(&dir, &["a", "b", "c"]);
        let prompter = ScriptedPrompter::new(Selection::Chosen(vec![0, 2]), true);

        let outcome = execute(
            &FsStore,
            &prompter,
            &mut SilentReporter,
            ResourceKind::Ingress,
            plan,
            BatchOptions::default(),
        )
        .await
        .unwrap();

        let BatchOutcome::Completed(tally) = outcome else {
            panic!("expected completed batch");
        };
        assert_eq!(tally.processed, 2);
        assert_eq!(tally.results[0].name, "a");
        assert_eq!(tally.results[1].name, "c");
        assert!(!fs::read_to_string(dir.path().join("b.yaml")).unwrap().contains("letsencrypt"));
        assert!(fs::read_to_string(dir.path().join("c.yaml")).unwrap().contains("letsencrypt"));
    }

    #[tokio::test]
    async fn test_cancelled_selection_and_declined_confirmation() {
        let dir = TempDir::new().unwrap();

        let prompter = ScriptedPrompter::new(Selection::Cancelled, true);
        let outcome = execute(
            &FsStore,
            &prompter,
            &mut SilentReporter,
            ResourceKind::Ingress,
            plan_for(&dir, &["a"]),
            BatchOptions::default(),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, BatchOutcome::Cancelled));
        assert_eq!(*prompter.confirmations.borrow(), 0);

        let prompter = ScriptedPrompter::new(Selection::Chosen(vec![0]), false);
        let outcome = execute(
            &FsStore,
            &prompter,
            &mut SilentReporter,
            ResourceKind::Ingress,
            plan_for(&dir, &["a"]),
            BatchOptions::default(),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, BatchOutcome::Cancelled));
        assert!(!fs::read_to_string(dir.path().join("a.yaml")).unwrap().contains("letsencrypt"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let prompter = ScriptedPrompter::new(Selection::Cancelled, true);
        let options = BatchOptions {
            dry_run: true,
            select_all: true,
            assume_yes: false,
        };

        let outcome = execute(
            &FsStore,
            &prompter,
            &mut SilentReporter,
            ResourceKind::Ingress,
            plan_for(&dir, &["a", "b"]),
            options,
        )
        .await
        .unwrap();

        match outcome {
            BatchOutcome::DryRun { planned } => assert_eq!(planned.len(), 2),
            other => panic!("expected dry run, got {other:?}"),
        }
        assert_eq!(*prompter.confirmations.borrow(), 0);
        assert!(!fs::read_to_string(dir.path().join("a.yaml")).unwrap().contains("letsencrypt"));
    }

    #[tokio::test]
    async fn test_missing_resource_is_isolated() {
        let dir = TempDir::new().unwrap();
        let mut plan = plan_for(&dir, &["a", "b"]);
        plan[0].target.name = "renamed".to_string();

        let prompter = ScriptedPrompter::new(Selection::Cancelled, true);
        let options = BatchOptions {
            dry_run: false,
            select_all: true,
            assume_yes: true,
        };
        let outcome = execute(
            &FsStore,
            &prompter,
            &mut SilentReporter,
            ResourceKind::Ingress,
            plan,
            options,
        )
        .await
        .unwrap();

        let BatchOutcome::Completed(tally) = outcome else {
            panic!("expected completed batch");
        };
        assert_eq!(tally.processed, 1);
        assert_eq!(tally.errored, 1);
        assert_eq!(tally.results[0].status, ItemStatus::Failed);
        assert!(tally.results[0].error.as_deref().unwrap().contains("not found"));
        assert_eq!(tally.results[1].status, ItemStatus::Applied);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(BatchOutcome::AllCorrect { correct: 3 }).unwrap();
        assert_eq!(json["outcome"], "all_correct");
        assert_eq!(json["correct"], 3);

        let json = serde_json::to_value(BatchOutcome::Completed(BatchTally::default())).unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["processed"], 0);
    }
}
