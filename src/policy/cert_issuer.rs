//! cert-manager cluster-issuer annotation policy for Ingresses.

use crate::config::CertIssuerConfig;
use crate::manifest::{DesiredChange, IngressRecord};
use serde::Serialize;
use std::fmt;

/// Which policy a run enforces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuerMode {
    /// Back-fill or replace the annotation with the canonical issuer
    #[default]
    Replace,
    /// Only delete the annotation when it holds the deprecated issuer
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssuerStatus {
    NeedsAdd,
    NeedsReplace,
    NeedsRemove,
    Correct,
}

impl IssuerStatus {
    pub fn needs_change(&self) -> bool {
        *self != Self::Correct
    }
}

impl fmt::Display for IssuerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NeedsAdd => "➕ Add",
            Self::NeedsReplace => "🔄 Replace",
            Self::NeedsRemove => "🗑️ Remove",
            Self::Correct => "✅ OK",
        })
    }
}

/// How an Ingress compares to the issuer policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuerAssessment {
    pub status: IssuerStatus,
    /// Current annotation value; empty strings count as absent
    pub current: Option<String>,
}

impl IssuerAssessment {
    /// The edit that brings the Ingress in line, if any
    pub fn change(&self, config: &CertIssuerConfig) -> Option<DesiredChange> {
        match self.status {
            IssuerStatus::NeedsAdd | IssuerStatus::NeedsReplace => Some(DesiredChange::SetAnnotation {
                key: config.annotation.clone(),
                value: config.canonical.clone(),
            }),
            IssuerStatus::NeedsRemove => Some(DesiredChange::RemoveAnnotation {
                key: config.annotation.clone(),
                expected: config.deprecated.clone(),
            }),
            IssuerStatus::Correct => None,
        }
    }
}

/// Classify the issuer annotation of one Ingress.
///
/// Any value other than the deprecated one belongs to another issuer and is
/// never overwritten.
pub fn classify(record: &IngressRecord, config: &CertIssuerConfig, mode: IssuerMode) -> IssuerAssessment {
    let current = record
        .annotations
        .get(&config.annotation)
        .filter(|value| !value.is_empty())
        .cloned();

    let is_deprecated = current.as_deref() == Some(config.deprecated.as_str());
    let status = match (mode, &current) {
        (IssuerMode::Replace, None) => IssuerStatus::NeedsAdd,
        (IssuerMode::Replace, Some(_)) if is_deprecated => IssuerStatus::NeedsReplace,
        (IssuerMode::Remove, Some(_)) if is_deprecated => IssuerStatus::NeedsRemove,
        _ => IssuerStatus::Correct,
    };

    IssuerAssessment { status, current }
}
