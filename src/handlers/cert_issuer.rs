//! Handler for the `cert-issuer` command.
//!
//! Moves Ingresses off the deprecated cert-manager cluster issuer, either by
//! setting the canonical issuer (replace mode) or by dropping the deprecated
//! annotation (remove mode).

use crate::config::{CertIssuerConfig, Config, load_config};
use crate::error::Result;
use crate::handlers::batch::{
    self, BatchOptions, CommandReport, PlannedChange, ScanSummary, early_exit, relative_display,
};
use crate::handlers::report::{ConsoleReporter, Reporter, SilentReporter};
use crate::manifest::{
    FsStore, IgnoreRules, IngressRecord, ManifestStore, MutationTarget, ResourceKind, resolve_root,
    scan_ingresses,
};
use crate::policy::cert_issuer::{self, IssuerAssessment, IssuerMode, IssuerStatus};
use crate::wizard::{InquirePrompter, Prompter};
use std::path::Path;

/// Handle the `cert-issuer` command against the real filesystem and terminal
pub async fn handle_cert_issuer(
    directory: &Path,
    config_path: Option<&Path>,
    mode: IssuerMode,
    options: BatchOptions,
    json: bool,
) -> Result<CommandReport> {
    let config = load_config(config_path, directory)?;

    let mut console = ConsoleReporter::new();
    let mut silent = SilentReporter;
    let reporter: &mut dyn Reporter = if json { &mut silent } else { &mut console };

    scan_and_fix_cert_issuer(
        &FsStore,
        &InquirePrompter,
        reporter,
        directory,
        &config,
        mode,
        options,
    )
    .await
}

/// Scan `directory` for Ingresses and converge their cluster-issuer annotation
pub async fn scan_and_fix_cert_issuer<S: ManifestStore>(
    store: &S,
    prompter: &dyn Prompter,
    reporter: &mut dyn Reporter,
    directory: &Path,
    config: &Config,
    mode: IssuerMode,
    options: BatchOptions,
) -> Result<CommandReport> {
    let root = resolve_root(directory)?;
    reporter.scan_started(&root);

    let rules = IgnoreRules::load(store, &root, &config.scan).await;
    let report = scan_ingresses(store, &rules).await?;
    let policy = &config.cert_issuer;

    let mut correct = 0;
    let mut plan = Vec::new();
    for record in &report.records {
        let assessment = cert_issuer::classify(record, policy, mode);
        log::debug!("{}/{}: {:?}", record.namespace, record.name, assessment.status);
        match plan_change(&root, record, &assessment, policy) {
            Some(change) => plan.push(change),
            None => correct += 1,
        }
    }

    let summary = ScanSummary::from_report(ResourceKind::Ingress, &report, &rules, correct);
    reporter.scan_summary(&summary);

    let outcome = match early_exit(&summary, plan.len()) {
        Some(outcome) => outcome,
        None => {
            batch::execute(store, prompter, reporter, ResourceKind::Ingress, plan, options).await?
        }
    };
    reporter.outcome(&outcome);

    Ok(CommandReport { summary, outcome })
}

fn plan_change(
    root: &Path,
    record: &IngressRecord,
    assessment: &IssuerAssessment,
    policy: &CertIssuerConfig,
) -> Option<PlannedChange> {
    let change = assessment.change(policy)?;
    let current = assessment.current.as_deref().unwrap_or("<none>");

    let detail = match assessment.status {
        IssuerStatus::NeedsAdd => format!("➕ {}: {}", policy.annotation, policy.canonical),
        IssuerStatus::NeedsReplace => format!(
            "🔄 {}: {} → {}",
            policy.annotation, current, policy.canonical
        ),
        IssuerStatus::NeedsRemove => format!("🗑️ {}: {}", policy.annotation, current),
        IssuerStatus::Correct => return None,
    };

    Some(PlannedChange {
        target: MutationTarget {
            file_path: record.file_path.clone(),
            kind: ResourceKind::Ingress,
            name: record.name.clone(),
            position: Some(record.position),
        },
        namespace: record.namespace.clone(),
        relative_path: relative_display(root, &record.file_path),
        status: assessment.status.to_string(),
        details: vec![detail],
        change,
    })
}
