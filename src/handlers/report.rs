//! Console rendering of scan summaries, previews and batch results.
//!
//! The manifest engine never prints; commands hand their structured results to
//! a [`Reporter`].

use crate::handlers::batch::{
    BatchOutcome, BatchTally, ItemResult, ItemStatus, PlannedChange, ScanSummary,
};
use crate::manifest::IgnoreFileStatus;
use crate::manifest::resource::describe_violations;
use crate::wizard::{counted, outcome_mark, print_step_banner};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Receives progress of one command run
pub trait Reporter {
    fn scan_started(&mut self, root: &Path);
    fn scan_summary(&mut self, summary: &ScanSummary);
    fn preview(&mut self, items: &[PlannedChange]);
    fn item_started(&mut self, index: usize, total: usize, item: &PlannedChange);
    fn item_finished(&mut self, result: &ItemResult);
    fn outcome(&mut self, outcome: &BatchOutcome);
}

/// Reporter that renders nothing (JSON output and tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn scan_started(&mut self, _root: &Path) {}
    fn scan_summary(&mut self, _summary: &ScanSummary) {}
    fn preview(&mut self, _items: &[PlannedChange]) {}
    fn item_started(&mut self, _index: usize, _total: usize, _item: &PlannedChange) {}
    fn item_finished(&mut self, _result: &ItemResult) {}
    fn outcome(&mut self, _outcome: &BatchOutcome) {}
}

/// Colored terminal output with a spinner per applied item
#[derive(Default)]
pub struct ConsoleReporter {
    step: u8,
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_step(&mut self, name: &str, description: &str) {
        self.step += 1;
        print_step_banner(self.step, name, description);
    }

    fn start_spinner(&mut self, message: String) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("  {spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn print_ignore_status(summary: &ScanSummary) {
        match &summary.ignore_status {
            IgnoreFileStatus::NotPresent => {
                println!("  {}", "No ignore file found".dimmed());
            }
            IgnoreFileStatus::Loaded { path, patterns } => {
                println!(
                    "  {} {} ({})",
                    "Ignore file:".dimmed(),
                    path.display(),
                    counted(*patterns, "patterns")
                );
                for pattern in &summary.ignore_patterns {
                    println!("    {} {}", "-".dimmed(), pattern.dimmed());
                }
            }
            IgnoreFileStatus::Unreadable { path, message } => {
                println!(
                    "  {} Cannot read {}: {}",
                    "⚠".yellow(),
                    path.display(),
                    message
                );
            }
        }
    }

    fn print_tally(tally: &BatchTally) {
        println!();
        println!(
            "{} {} processed, {} errored",
            "Done:".bold(),
            tally.processed.to_string().green(),
            if tally.errored > 0 {
                tally.errored.to_string().red()
            } else {
                tally.errored.to_string().normal()
            }
        );

        let failures: Vec<_> = tally
            .results
            .iter()
            .filter(|r| r.status == ItemStatus::Failed)
            .collect();
        for failure in failures {
            println!(
                "  {} {}/{}: {}",
                outcome_mark(false),
                failure.namespace,
                failure.name,
                failure.error.as_deref().unwrap_or("unknown error").red()
            );
        }
    }
}

impl Reporter for ConsoleReporter {
    fn scan_started(&mut self, root: &Path) {
        self.next_step("Scan", &format!("Looking for manifests under {}", root.display()));
        self.start_spinner("Scanning YAML files...".to_string());
    }

    fn scan_summary(&mut self, summary: &ScanSummary) {
        self.stop_spinner();
        Self::print_ignore_status(summary);

        for skipped in &summary.skipped {
            println!(
                "  {} Skipped {}: {}",
                "⚠".yellow(),
                skipped.path.display(),
                skipped.reason.dimmed()
            );
        }

        println!(
            "  {} · {} · {}",
            counted(summary.files_scanned, "YAML files"),
            counted(summary.resources, &format!("{}s", summary.kind)),
            counted(summary.unique_files, "files with matches")
        );

        if !summary.namespaces.is_empty() {
            let namespaces: Vec<String> = summary
                .namespaces
                .iter()
                .map(|(ns, count)| format!("{} ({})", ns.cyan(), count))
                .collect();
            println!("  {} {}", "Namespaces:".dimmed(), namespaces.join(", "));
        }

        if !summary.invalid.is_empty() {
            println!(
                "  {} {} invalid {}(s) excluded:",
                "⚠".yellow(),
                summary.invalid.len(),
                summary.kind
            );
            for invalid in &summary.invalid {
                println!(
                    "    {} {} ({}): {}",
                    "-".dimmed(),
                    invalid.name.as_deref().unwrap_or("<unnamed>").yellow(),
                    invalid.file_path.display(),
                    describe_violations(&invalid.violations)
                );
            }
        }

        if summary.correct > 0 {
            println!(
                "  {} {} already correct",
                outcome_mark(true),
                counted(summary.correct, &format!("{}(s)", summary.kind))
            );
        }
    }

    fn preview(&mut self, items: &[PlannedChange]) {
        self.next_step("Preview", &format!("{} resource(s) will be changed", items.len()));
        for item in items {
            println!();
            println!(
                "  {} {}/{}",
                item.status,
                item.namespace.cyan(),
                item.target.name.yellow()
            );
            println!("     {}", item.relative_path.dimmed());
            for detail in &item.details {
                println!("     {}", style_detail(detail));
            }
        }
        println!();
    }

    fn item_started(&mut self, index: usize, total: usize, item: &PlannedChange) {
        if index == 0 {
            self.next_step("Apply", &format!("Updating {} resource(s)", total));
        }
        self.start_spinner(format!(
            "[{}/{}] {}/{}",
            index + 1,
            total,
            item.namespace,
            item.target.name
        ));
    }

    fn item_finished(&mut self, result: &ItemResult) {
        self.stop_spinner();
        let subject = format!("{}/{}", result.namespace, result.name);
        match result.status {
            ItemStatus::Applied => {
                println!("  {} {} updated", outcome_mark(true), subject);
            }
            ItemStatus::Unchanged => {
                println!(
                    "  {} {} {}",
                    outcome_mark(true),
                    subject,
                    "already up to date".dimmed()
                );
            }
            ItemStatus::Failed => {
                println!(
                    "  {} {}: {}",
                    outcome_mark(false),
                    subject,
                    result.error.as_deref().unwrap_or("unknown error").red()
                );
            }
        }
    }

    fn outcome(&mut self, outcome: &BatchOutcome) {
        self.stop_spinner();
        match outcome {
            BatchOutcome::NoManifests => println!("{}", "No YAML files found.".yellow()),
            BatchOutcome::NoResources => {
                println!("{}", "No matching resources found.".yellow())
            }
            BatchOutcome::AllCorrect { correct } => println!(
                "{} All {} resource(s) are already correct.",
                outcome_mark(true),
                correct
            ),
            BatchOutcome::Cancelled => println!("{}", "Operation cancelled.".yellow()),
            BatchOutcome::DryRun { planned } => println!(
                "{} Dry run: {} resource(s) would be changed, nothing was written.",
                "ℹ".cyan(),
                planned.len()
            ),
            BatchOutcome::Completed(tally) => Self::print_tally(tally),
        }
    }
}

/// Color the value part of a `label: value` preview line; `old → new` values
/// show the old side in red and the new side in green
fn style_detail(detail: &str) -> String {
    let Some((label, value)) = detail.split_once(": ") else {
        return detail.to_string();
    };

    match value.split_once(" → ") {
        Some((old, new)) => format!("{}: {} → {}", label, old.red(), new.green()),
        None => format!("{}: {}", label, value.cyan()),
    }
}
