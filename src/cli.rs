use crate::handlers::BatchOptions;
use crate::policy::IssuerMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ykubeedit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bulk-edit Kubernetes YAML manifests")]
#[command(long_about = "Scans a directory tree of Kubernetes manifests and rewrites selected resources in place: OpenTelemetry environment variables on Deployments and the cert-manager cluster issuer annotation on Ingresses.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging; console progress and errors are still printed
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the final result as JSON instead of console output
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add or fix OpenTelemetry env vars on Deployments
    AddOtel {
        /// Directory to scan
        #[arg(value_name = "DIRECTORY", default_value = ".")]
        directory: PathBuf,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Replace, add or remove the cert-manager cluster issuer on Ingresses
    CertIssuer {
        /// Directory to scan
        #[arg(value_name = "DIRECTORY", default_value = ".")]
        directory: PathBuf,

        /// Add-or-replace with the canonical issuer, or only remove the deprecated one
        #[arg(long, value_enum, default_value = "replace")]
        mode: CertIssuerMode,

        #[command(flatten)]
        batch: BatchArgs,
    },
}

#[derive(Debug, Clone, Copy, Args)]
pub struct BatchArgs {
    /// Show the changes without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Select every resource that needs a change without prompting
    #[arg(long)]
    pub select_all: bool,

    /// Apply without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CertIssuerMode {
    Replace,
    Remove,
}

impl From<BatchArgs> for BatchOptions {
    fn from(args: BatchArgs) -> Self {
        Self {
            dry_run: args.dry_run,
            select_all: args.select_all,
            assume_yes: args.yes,
        }
    }
}

impl From<CertIssuerMode> for IssuerMode {
    fn from(mode: CertIssuerMode) -> Self {
        match mode {
            CertIssuerMode::Replace => Self::Replace,
            CertIssuerMode::Remove => Self::Remove,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
