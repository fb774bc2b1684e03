//! # ykubeedit
//!
//! Bulk editor for Kubernetes YAML manifests. It scans a directory tree,
//! classifies Deployments and Ingresses against a policy, lets an operator pick
//! which ones to change, and rewrites only the targeted fields in place.
//!
//! ## Commands
//!
//! - **add-otel**: adds or fixes the OpenTelemetry env vars of a Deployment's
//!   first container
//! - **cert-issuer**: moves Ingresses off a deprecated cert-manager cluster issuer
//!
//! ## Example
//!
//! ```rust,no_run
//! use ykubeedit::config::Config;
//! use ykubeedit::handlers::{BatchOptions, SilentReporter, scan_and_fix_otel};
//! use ykubeedit::manifest::FsStore;
//! use ykubeedit::wizard::InquirePrompter;
//! use std::path::Path;
//!
//! # async fn run() -> ykubeedit::Result<()> {
//! let options = BatchOptions { dry_run: true, select_all: true, assume_yes: false };
//! let report = scan_and_fix_otel(
//!     &FsStore,
//!     &InquirePrompter,
//!     &mut SilentReporter,
//!     Path::new("./k8s"),
//!     &Config::default(),
//!     options,
//! )
//! .await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod manifest;
pub mod policy;
pub mod wizard;

pub use error::{KubeEditError, Result};
pub use handlers::CommandReport;
use cli::{Cli, Commands};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn run_command(cli: Cli) -> Result<CommandReport> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::AddOtel { directory, batch } => {
            handlers::handle_add_otel(&directory, config_path, batch.into(), cli.json).await
        }
        Commands::CertIssuer {
            directory,
            mode,
            batch,
        } => {
            handlers::handle_cert_issuer(
                &directory,
                config_path,
                mode.into(),
                batch.into(),
                cli.json,
            )
            .await
        }
    }
}
