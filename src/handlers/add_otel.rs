//! Handler for the `add-otel` command.
//!
//! Finds `apps/v1` Deployments whose first container lacks the OpenTelemetry
//! variable block (or holds a stale one) and rewrites that block.

use crate::config::{Config, load_config};
use crate::error::Result;
use crate::handlers::batch::{
    self, BatchOptions, CommandReport, PlannedChange, ScanSummary, early_exit, relative_display,
};
use crate::handlers::report::{ConsoleReporter, Reporter, SilentReporter};
use crate::manifest::{
    DeploymentRecord, DesiredChange, FsStore, IgnoreRules, ManifestStore, MutationTarget,
    ResourceKind, resolve_root, scan_deployments,
};
use crate::policy::otel::{self, OTEL_PREFIX, OtelAssessment, OtelStatus};
use crate::wizard::{InquirePrompter, Prompter};
use std::path::Path;

/// Handle the `add-otel` command against the real filesystem and terminal
pub async fn handle_add_otel(
    directory: &Path,
    config_path: Option<&Path>,
    options: BatchOptions,
    json: bool,
) -> Result<CommandReport> {
    let config = load_config(config_path, directory)?;

    let mut console = ConsoleReporter::new();
    let mut silent = SilentReporter;
    let reporter: &mut dyn Reporter = if json { &mut silent } else { &mut console };

    scan_and_fix_otel(&FsStore, &InquirePrompter, reporter, directory, &config, options).await
}

/// Scan `directory` for Deployments and fix their OTEL variables
pub async fn scan_and_fix_otel<S: ManifestStore>(
    store: &S,
    prompter: &dyn Prompter,
    reporter: &mut dyn Reporter,
    directory: &Path,
    config: &Config,
    options: BatchOptions,
) -> Result<CommandReport> {
    let root = resolve_root(directory)?;
    reporter.scan_started(&root);

    let rules = IgnoreRules::load(store, &root, &config.scan).await;
    let report = scan_deployments(store, &rules).await?;
    let prefixes = &config.otel.known_prefixes;

    let mut correct = 0;
    let mut plan = Vec::new();
    for record in &report.records {
        let assessment = otel::classify(record, prefixes);
        log::debug!(
            "{}/{}: {:?} (missing {})",
            record.namespace,
            record.name,
            assessment.status,
            assessment.missing.len()
        );
        if assessment.needs_change() {
            plan.push(plan_change(&root, record, &assessment, prefixes));
        } else {
            correct += 1;
        }
    }

    let summary = ScanSummary::from_report(ResourceKind::Deployment, &report, &rules, correct);
    reporter.scan_summary(&summary);

    let outcome = match early_exit(&summary, plan.len()) {
        Some(outcome) => outcome,
        None => {
            batch::execute(store, prompter, reporter, ResourceKind::Deployment, plan, options)
                .await?
        }
    };
    reporter.outcome(&outcome);

    Ok(CommandReport { summary, outcome })
}

fn plan_change(
    root: &Path,
    record: &DeploymentRecord,
    assessment: &OtelAssessment,
    prefixes: &[String],
) -> PlannedChange {
    let variables = otel::otel_env_vars(&record.namespace, &record.name, prefixes);

    PlannedChange {
        target: MutationTarget {
            file_path: record.file_path.clone(),
            kind: ResourceKind::Deployment,
            name: record.name.clone(),
            position: Some(record.position),
        },
        namespace: record.namespace.clone(),
        relative_path: relative_display(root, &record.file_path),
        status: assessment.status.to_string(),
        details: preview_lines(record, assessment, variables.len()),
        change: DesiredChange::ReplacePrefixedEnv {
            prefix: OTEL_PREFIX.to_string(),
            variables,
        },
    }
}

fn preview_lines(
    record: &DeploymentRecord,
    assessment: &OtelAssessment,
    variable_count: usize,
) -> Vec<String> {
    let mut lines = vec![format!("Subsystem: {}", assessment.subsystem)];
    if let Some(container) = &record.container_name {
        lines.push(format!("Container: {}", container));
    }

    match assessment.status {
        OtelStatus::Missing => {
            lines.push(format!("➕ Adds {} OTEL variables", variable_count));
        }
        OtelStatus::Incomplete => {
            if !assessment.service_name_ok {
                lines.push(format!("🔧 {}: {}", otel::SERVICE_NAME, record.namespace));
            }
            if !assessment.resource_attributes_ok {
                lines.push(format!(
                    "🔧 {}: {}",
                    otel::RESOURCE_ATTRIBUTES,
                    otel::resource_attributes(&record.namespace, &assessment.subsystem)
                ));
            }
            if !assessment.missing.is_empty() {
                lines.push(format!("➕ Missing: {}", assessment.missing.join(", ")));
            }
            lines.push(format!(
                "♻️ Replaces {} existing OTEL variable(s)",
                assessment.existing.len()
            ));
        }
        OtelStatus::Correct => {}
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::batch::BatchOutcome;
    use crate::wizard::Selection;
    use std::fs;
    use tempfile::TempDir;

    struct NoPrompt;

    impl Prompter for NoPrompt {
        fn select(&self, _message: &str, _candidates: &[String]) -> Result<Selection> {
            panic!("selection prompt should not be shown");
        }

        fn confirm(&self, _message: &str) -> Result<bool> {
            panic!("confirmation prompt should not be shown");
        }
    }

    fn deployment(namespace: &str, name: &str, env: &str) -> String {
        format!(
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {name}\n  namespace: {namespace}\nspec:\n  template:\n    spec:\n      containers:\n      - name: app\n        image: app:1\n{env}"
        )
    }

    fn unattended() -> BatchOptions {
        BatchOptions {
            dry_run: false,
            select_all: true,
            assume_yes: true,
        }
    }

    #[tokio::test]
    async fn test_fixes_and_then_reports_all_correct() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploy.yaml");
        fs::write(&path, deployment("billing", "billing-vertc-invoicer", "")).unwrap();
        let config = Config::default();

        let report = scan_and_fix_otel(
            &FsStore,
            &NoPrompt,
            &mut SilentReporter,
            dir.path(),
            &config,
            unattended(),
        )
        .await
        .unwrap();
        let BatchOutcome::Completed(tally) = report.outcome else {
            panic!("expected completed batch");
        };
        assert_eq!(tally.processed, 1);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("cx.application.name=billing,cx.subsystem.name=billing-invoicer"));
        assert!(content.contains("status.hostIP"));

        let report = scan_and_fix_otel(
            &FsStore,
            &NoPrompt,
            &mut SilentReporter,
            dir.path(),
            &config,
            unattended(),
        )
        .await
        .unwrap();
        assert!(matches!(report.outcome, BatchOutcome::AllCorrect { correct: 1 }));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let report = scan_and_fix_otel(
            &FsStore,
            &NoPrompt,
            &mut SilentReporter,
            dir.path(),
            &Config::default(),
            unattended(),
        )
        .await
        .unwrap();
        assert!(matches!(report.outcome, BatchOutcome::NoManifests));
    }

    #[tokio::test]
    async fn test_no_deployments() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("cm.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n",
        )
        .unwrap();

        let report = scan_and_fix_otel(
            &FsStore,
            &NoPrompt,
            &mut SilentReporter,
            dir.path(),
            &Config::default(),
            unattended(),
        )
        .await
        .unwrap();
        assert!(matches!(report.outcome, BatchOutcome::NoResources));
        assert_eq!(report.summary.files_scanned, 1);
    }

    #[tokio::test]
    async fn test_incomplete_preview() {
        let dir = TempDir::new().unwrap();
        let env = "        env:\n        - name: OTEL_SERVICE_NAME\n          value: wrong\n";
        fs::write(dir.path().join("deploy.yaml"), deployment("shop", "shop-cart", env)).unwrap();

        let options = BatchOptions {
            dry_run: true,
            select_all: true,
            assume_yes: false,
        };
        let report = scan_and_fix_otel(
            &FsStore,
            &NoPrompt,
            &mut SilentReporter,
            dir.path(),
            &Config::default(),
            options,
        )
        .await
        .unwrap();

        let BatchOutcome::DryRun { planned } = report.outcome else {
            panic!("expected dry run");
        };
        assert_eq!(planned.len(), 1);
        assert!(planned[0].label().ends_with("shop/shop-cart (deploy.yaml)"));
        assert!(planned[0].details.iter().any(|l| l.contains("OTEL_SERVICE_NAME: shop")));
        assert!(planned[0].details.iter().any(|l| l.starts_with("➕ Missing:")));
        assert_eq!(planned[0].details[0], "Subsystem: shop-cart");
        assert!(planned[0].details.iter().all(|l| !l.contains('\u{1b}')));
    }
}
