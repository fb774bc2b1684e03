//! Manifest engine: discovery, parsing, typed resource views and
//! structure-preserving edits.

pub mod document;
pub mod ignore;
pub mod mutate;
pub mod resource;
pub mod scanner;
pub mod store;

pub use document::DocumentSet;
pub use ignore::{IgnoreFileStatus, IgnorePattern, IgnoreRules};
pub use mutate::{DesiredChange, EnvValue, EnvVar, MutationOutcome, MutationTarget};
pub use resource::{
    DeploymentRecord, IngressRecord, InvalidResource, KubernetesResource, ResourceKind,
    StructuralViolation,
};
pub use scanner::{ScanReport, SkippedFile, resolve_root, scan_deployments, scan_ingresses};
pub use store::{FsStore, ManifestStore};
