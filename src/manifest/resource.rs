//! Typed views over Kubernetes resource documents.
//!
//! Views read an untyped YAML tree through named accessors that return
//! `Option` instead of probing nested maps ad hoc. Each kind has a single
//! structural check listing every violation that would prevent a later edit.

use crate::manifest::document::{lookup, str_at};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use yaml_rust2::Yaml;

/// Namespace assumed when `metadata.namespace` is absent or empty
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resource kinds this tool edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Deployment,
    Ingress,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::Ingress => "Ingress",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A required field that is absent or has the wrong shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructuralViolation {
    MissingMetadata,
    MissingName,
    MissingSpec,
    MissingTemplate,
    MissingTemplateSpec,
    MissingContainers,
    ContainersNotList,
    EmptyContainers,
    InvalidContainer,
    InvalidEnv,
    InvalidAnnotations,
}

impl fmt::Display for StructuralViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::MissingMetadata => "missing metadata",
            Self::MissingName => "missing metadata.name",
            Self::MissingSpec => "missing spec",
            Self::MissingTemplate => "missing spec.template",
            Self::MissingTemplateSpec => "missing spec.template.spec",
            Self::MissingContainers => "missing spec.template.spec.containers",
            Self::ContainersNotList => "spec.template.spec.containers is not a list",
            Self::EmptyContainers => "empty containers list",
            Self::InvalidContainer => "first container is not a mapping",
            Self::InvalidEnv => "first container env is not a list",
            Self::InvalidAnnotations => "metadata.annotations is not a mapping",
        };
        f.write_str(message)
    }
}

/// Join violations for one-line display
pub fn describe_violations(violations: &[StructuralViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Common identity of every resource record
pub trait KubernetesResource {
    fn kind(&self) -> ResourceKind;
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;
    fn file_path(&self) -> &Path;
    /// Index of the resource's document inside its file
    fn position(&self) -> usize;
}

/// One entry of a container's `env` list, as found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub name: String,
    /// Literal `value`, when the entry has one
    pub value: Option<String>,
}

/// A Deployment that can be edited
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentRecord {
    pub file_path: PathBuf,
    pub position: usize,
    pub namespace: String,
    pub name: String,
    pub container_name: Option<String>,
    /// Env entries of the first container
    pub env: Vec<EnvEntry>,
}

/// An Ingress that can be edited
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngressRecord {
    pub file_path: PathBuf,
    pub position: usize,
    pub namespace: String,
    pub name: String,
    /// String-valued annotations
    pub annotations: BTreeMap<String, String>,
}

/// A document of a known kind that fails its structural check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidResource {
    pub file_path: PathBuf,
    pub position: usize,
    pub kind: ResourceKind,
    pub name: Option<String>,
    pub violations: Vec<StructuralViolation>,
}

macro_rules! impl_resource {
    ($record:ty, $kind:expr) => {
        impl KubernetesResource for $record {
            fn kind(&self) -> ResourceKind {
                $kind
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn namespace(&self) -> &str {
                &self.namespace
            }
            fn file_path(&self) -> &Path {
                &self.file_path
            }
            fn position(&self) -> usize {
                self.position
            }
        }
    };
}

impl_resource!(DeploymentRecord, ResourceKind::Deployment);
impl_resource!(IngressRecord, ResourceKind::Ingress);

// ============================================================================
// Deployment view
// ============================================================================

/// Read-only view of an `apps/v1` Deployment document
#[derive(Debug, Clone, Copy)]
pub struct DeploymentView<'a> {
    doc: &'a Yaml,
}

impl<'a> DeploymentView<'a> {
    /// Returns a view when the document is an `apps/v1` Deployment
    pub fn from_document(doc: &'a Yaml) -> Option<Self> {
        let is_deployment = str_at(doc, &["kind"]) == Some("Deployment")
            && str_at(doc, &["apiVersion"]) == Some("apps/v1");
        is_deployment.then_some(Self { doc })
    }

    pub fn name(&self) -> Option<&'a str> {
        str_at(self.doc, &["metadata", "name"])
    }

    pub fn namespace(&self) -> &'a str {
        str_at(self.doc, &["metadata", "namespace"])
            .filter(|namespace| !namespace.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn containers(&self) -> Option<&'a [Yaml]> {
        lookup(self.doc, &["spec", "template", "spec", "containers"])
            .and_then(Yaml::as_vec)
            .map(Vec::as_slice)
    }

    pub fn first_container(&self) -> Option<&'a Yaml> {
        self.containers().and_then(<[Yaml]>::first)
    }

    /// Env entries of the first container. Entries without a string name are skipped.
    pub fn env(&self) -> Vec<EnvEntry> {
        self.first_container()
            .and_then(|c| lookup(c, &["env"]))
            .and_then(Yaml::as_vec)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(EnvEntry {
                            name: str_at(entry, &["name"])?.to_string(),
                            value: str_at(entry, &["value"]).map(String::from),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every missing or malformed field needed to rewrite the env list
    pub fn violations(&self) -> Vec<StructuralViolation> {
        let mut violations = metadata_violations(self.doc);

        let spec = lookup(self.doc, &["spec"]);
        let template = spec.and_then(|s| lookup(s, &["template"]));
        let pod_spec = template.and_then(|t| lookup(t, &["spec"]));
        let containers = pod_spec.and_then(|p| lookup(p, &["containers"]));

        if !spec.is_some_and(is_mapping) {
            violations.push(StructuralViolation::MissingSpec);
        } else if !template.is_some_and(is_mapping) {
            violations.push(StructuralViolation::MissingTemplate);
        } else if !pod_spec.is_some_and(is_mapping) {
            violations.push(StructuralViolation::MissingTemplateSpec);
        } else {
            match containers {
                None | Some(Yaml::Null) => violations.push(StructuralViolation::MissingContainers),
                Some(Yaml::Array(list)) => match list.first() {
                    None => violations.push(StructuralViolation::EmptyContainers),
                    Some(first) if !is_mapping(first) => {
                        violations.push(StructuralViolation::InvalidContainer)
                    }
                    Some(first) => {
                        if let Some(env) = lookup(first, &["env"])
                            && !matches!(env, Yaml::Array(_) | Yaml::Null)
                        {
                            violations.push(StructuralViolation::InvalidEnv);
                        }
                    }
                },
                Some(_) => violations.push(StructuralViolation::ContainersNotList),
            }
        }

        violations
    }

    /// Build the record, or the list of violations that prevent it
    pub fn record(
        &self,
        file_path: &Path,
        position: usize,
    ) -> Result<DeploymentRecord, Vec<StructuralViolation>> {
        let violations = self.violations();
        let name = match self.name() {
            Some(name) if violations.is_empty() => name,
            _ => return Err(violations),
        };

        Ok(DeploymentRecord {
            file_path: file_path.to_path_buf(),
            position,
            namespace: self.namespace().to_string(),
            name: name.to_string(),
            container_name: self
                .first_container()
                .and_then(|c| str_at(c, &["name"]))
                .map(String::from),
            env: self.env(),
        })
    }
}

// ============================================================================
// Ingress view
// ============================================================================

/// Read-only view of an Ingress document
#[derive(Debug, Clone, Copy)]
pub struct IngressView<'a> {
    doc: &'a Yaml,
}

impl<'a> IngressView<'a> {
    /// Returns a view when the document is an Ingress (any apiVersion)
    pub fn from_document(doc: &'a Yaml) -> Option<Self> {
        (str_at(doc, &["kind"]) == Some("Ingress")).then_some(Self { doc })
    }

    pub fn name(&self) -> Option<&'a str> {
        str_at(self.doc, &["metadata", "name"])
    }

    pub fn namespace(&self) -> &'a str {
        str_at(self.doc, &["metadata", "namespace"])
            .filter(|namespace| !namespace.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn annotation(&self, key: &str) -> Option<&'a str> {
        lookup(self.doc, &["metadata", "annotations"])
            .and_then(|a| lookup(a, &[key]))
            .and_then(Yaml::as_str)
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        lookup(self.doc, &["metadata", "annotations"])
            .and_then(Yaml::as_hash)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn violations(&self) -> Vec<StructuralViolation> {
        let mut violations = metadata_violations(self.doc);
        if let Some(annotations) = lookup(self.doc, &["metadata", "annotations"])
            && !matches!(annotations, Yaml::Hash(_) | Yaml::Null)
        {
            violations.push(StructuralViolation::InvalidAnnotations);
        }
        violations
    }

    pub fn record(
        &self,
        file_path: &Path,
        position: usize,
    ) -> Result<IngressRecord, Vec<StructuralViolation>> {
        let violations = self.violations();
        let name = match self.name() {
            Some(name) if violations.is_empty() => name,
            _ => return Err(violations),
        };

        Ok(IngressRecord {
            file_path: file_path.to_path_buf(),
            position,
            namespace: self.namespace().to_string(),
            name: name.to_string(),
            annotations: self.annotations(),
        })
    }
}

fn is_mapping(node: &Yaml) -> bool {
    matches!(node, Yaml::Hash(_))
}

fn metadata_violations(doc: &Yaml) -> Vec<StructuralViolation> {
    match lookup(doc, &["metadata"]) {
        Some(metadata) if is_mapping(metadata) => {
            if str_at(metadata, &["name"]).is_some() {
                Vec::new()
            } else {
                vec![StructuralViolation::MissingName]
            }
        }
        _ => vec![StructuralViolation::MissingMetadata],
    }
}
