//! Desired-state policies and the classification of scanned resources.

pub mod cert_issuer;
pub mod otel;

pub use cert_issuer::{IssuerAssessment, IssuerMode, IssuerStatus};
pub use otel::{OtelAssessment, OtelStatus};
