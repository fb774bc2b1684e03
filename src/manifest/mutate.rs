//! Structure-preserving edits of a single resource.
//!
//! Every edit follows the same protocol: load the whole file fresh, locate the
//! target document by `kind` + `metadata.name`, replace one sub-structure of
//! that document, and write every document back. Nothing is cached between
//! calls and no backup copy is made.

use crate::error::MutationError;
use crate::manifest::document::{DocumentSet, key, lookup_mut, str_at};
use crate::manifest::resource::{ResourceKind, StructuralViolation, describe_violations};
use crate::manifest::store::ManifestStore;
use serde::Serialize;
use std::path::PathBuf;
use yaml_rust2::Yaml;
use yaml_rust2::yaml::Hash;

/// Value of a container environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EnvValue {
    Literal(String),
    /// Downward API `valueFrom.fieldRef.fieldPath`
    FieldRef(String),
}

/// A container environment variable to write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: EnvValue,
}

impl EnvVar {
    pub fn literal(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: EnvValue::Literal(value.into()),
        }
    }

    pub fn field_ref(name: &str, field_path: &str) -> Self {
        Self {
            name: name.to_string(),
            value: EnvValue::FieldRef(field_path.to_string()),
        }
    }

    /// Render as a `{name, value}` or `{name, valueFrom}` mapping
    pub fn to_yaml(&self) -> Yaml {
        let mut entry = Hash::new();
        entry.insert(key("name"), Yaml::String(self.name.clone()));
        match &self.value {
            EnvValue::Literal(value) => {
                entry.insert(key("value"), Yaml::String(value.clone()));
            }
            EnvValue::FieldRef(field_path) => {
                let mut field_ref = Hash::new();
                field_ref.insert(key("fieldPath"), Yaml::String(field_path.clone()));
                let mut value_from = Hash::new();
                value_from.insert(key("fieldRef"), Yaml::Hash(field_ref));
                entry.insert(key("valueFrom"), Yaml::Hash(value_from));
            }
        }
        Yaml::Hash(entry)
    }
}

/// A field-level edit of one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DesiredChange {
    /// Drop every env entry of the first container whose name starts with
    /// `prefix`, then append `variables` in order
    ReplacePrefixedEnv {
        prefix: String,
        variables: Vec<EnvVar>,
    },
    /// Create `metadata.annotations` if needed and set `key` to `value`
    SetAnnotation { key: String, value: String },
    /// Delete `key` only when it currently equals `expected`; an annotations
    /// mapping left empty is removed as well
    RemoveAnnotation { key: String, expected: String },
}

/// Identity of the resource to edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationTarget {
    pub file_path: PathBuf,
    pub kind: ResourceKind,
    pub name: String,
    /// Document index recorded during the scan, used to break name ties
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationOutcome {
    /// The document changed and the file was rewritten
    Applied,
    /// The document already matched; the file was not written
    Unchanged,
}

/// Load the target file fresh, apply `change`, and save it when it changed
pub async fn apply<S: ManifestStore>(
    store: &S,
    target: &MutationTarget,
    change: &DesiredChange,
) -> Result<MutationOutcome, MutationError> {
    let mut set = DocumentSet::load(store, &target.file_path).await?;
    let outcome = apply_to_set(&mut set, target, change)?;

    if outcome == MutationOutcome::Applied {
        set.save(store).await?;
        log::debug!("Rewrote {}", target.file_path.display());
    }
    Ok(outcome)
}

/// Apply `change` to the target document of an already loaded set
pub fn apply_to_set(
    set: &mut DocumentSet,
    target: &MutationTarget,
    change: &DesiredChange,
) -> Result<MutationOutcome, MutationError> {
    let index = set
        .locate(target.kind.as_str(), &target.name, target.position)
        .ok_or_else(|| MutationError::ResourceNotFound {
            kind: target.kind.to_string(),
            name: target.name.clone(),
            path: target.file_path.clone(),
        })?;

    let doc = set
        .document_mut(index)
        .ok_or_else(|| MutationError::ResourceNotFound {
            kind: target.kind.to_string(),
            name: target.name.clone(),
            path: target.file_path.clone(),
        })?;

    let before = doc.clone();
    apply_to_document(doc, change).map_err(|violation| MutationError::InvalidStructure {
        kind: target.kind.to_string(),
        name: target.name.clone(),
        violations: describe_violations(&[violation]),
    })?;

    Ok(if *doc == before {
        MutationOutcome::Unchanged
    } else {
        MutationOutcome::Applied
    })
}

/// Apply `change` to a single document tree
pub fn apply_to_document(doc: &mut Yaml, change: &DesiredChange) -> Result<(), StructuralViolation> {
    match change {
        DesiredChange::ReplacePrefixedEnv { prefix, variables } => {
            replace_prefixed_env(doc, prefix, variables)
        }
        DesiredChange::SetAnnotation { key, value } => set_annotation(doc, key, value),
        DesiredChange::RemoveAnnotation { key, expected } => remove_annotation(doc, key, expected),
    }
}

fn replace_prefixed_env(
    doc: &mut Yaml,
    prefix: &str,
    variables: &[EnvVar],
) -> Result<(), StructuralViolation> {
    let containers = lookup_mut(doc, &["spec", "template", "spec", "containers"])
        .ok_or(StructuralViolation::MissingContainers)?;
    let Yaml::Array(containers) = containers else {
        return Err(StructuralViolation::ContainersNotList);
    };
    if containers.is_empty() {
        return Err(StructuralViolation::EmptyContainers);
    }
    let Some(Yaml::Hash(container)) = containers.first_mut() else {
        return Err(StructuralViolation::InvalidContainer);
    };

    let env_key = key("env");
    if !container.contains_key(&env_key) {
        container.insert(env_key.clone(), Yaml::Null);
    }

    let fresh = variables.iter().map(EnvVar::to_yaml);
    match container.get_mut(&env_key) {
        Some(Yaml::Array(entries)) => {
            entries.retain(|entry| {
                !str_at(entry, &["name"]).is_some_and(|name| name.starts_with(prefix))
            });
            entries.extend(fresh);
        }
        Some(env @ Yaml::Null) => *env = Yaml::Array(fresh.collect()),
        _ => return Err(StructuralViolation::InvalidEnv),
    }
    Ok(())
}

fn set_annotation(doc: &mut Yaml, name: &str, value: &str) -> Result<(), StructuralViolation> {
    let Some(Yaml::Hash(metadata)) = lookup_mut(doc, &["metadata"]) else {
        return Err(StructuralViolation::MissingMetadata);
    };

    let annotations_key = key("annotations");
    match metadata.get(&annotations_key) {
        None => {
            metadata.insert(annotations_key.clone(), Yaml::Hash(Hash::new()));
        }
        Some(Yaml::Null) => {
            if let Some(slot) = metadata.get_mut(&annotations_key) {
                *slot = Yaml::Hash(Hash::new());
            }
        }
        Some(Yaml::Hash(_)) => {}
        Some(_) => return Err(StructuralViolation::InvalidAnnotations),
    }
    let Some(Yaml::Hash(annotations)) = metadata.get_mut(&annotations_key) else {
        return Err(StructuralViolation::InvalidAnnotations);
    };

    match annotations.get_mut(&key(name)) {
        Some(existing) => *existing = Yaml::String(value.to_string()),
        None => {
            annotations.insert(key(name), Yaml::String(value.to_string()));
        }
    }
    Ok(())
}

fn remove_annotation(doc: &mut Yaml, name: &str, expected: &str) -> Result<(), StructuralViolation> {
    let Some(Yaml::Hash(metadata)) = lookup_mut(doc, &["metadata"]) else {
        return Err(StructuralViolation::MissingMetadata);
    };

    let now_empty = match metadata.get_mut(&key("annotations")) {
        Some(Yaml::Hash(annotations)) => {
            if annotations.get(&key(name)).and_then(Yaml::as_str) != Some(expected) {
                return Ok(());
            }
            annotations.remove(&key(name));
            annotations.is_empty()
        }
        _ => return Ok(()),
    };

    if now_empty {
        metadata.remove(&key("annotations"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::document::{lookup, str_at};
    use crate::manifest::resource::DeploymentView;

    const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
  namespace: shop
spec:
  template:
    spec:
      containers:
      - name: api
        image: shop/api:2
        env:
        - name: LOG_LEVEL
          value: debug
        - name: OTEL_SERVICE_NAME
          value: wrong
        - name: OTEL_TRACES_SAMPLER
          value: always_on
        ports:
        - containerPort: 8080
      - name: sidecar
        image: envoy
        env:
        - name: OTEL_KEEP
          value: "1"
"#;

    fn target(kind: ResourceKind, name: &str) -> MutationTarget {
        MutationTarget {
            file_path: PathBuf::from("test.yaml"),
            kind,
            name: name.to_string(),
            position: None,
        }
    }

    fn replace_env(variables: Vec<EnvVar>) -> DesiredChange {
        DesiredChange::ReplacePrefixedEnv {
            prefix: "OTEL_".to_string(),
            variables,
        }
    }

    #[test]
    fn test_env_var_yaml_shapes() {
        let literal = EnvVar::literal("A", "1").to_yaml();
        assert_eq!(str_at(&literal, &["value"]), Some("1"));

        let field = EnvVar::field_ref("OTEL_IP", "status.hostIP").to_yaml();
        assert_eq!(
            str_at(&field, &["valueFrom", "fieldRef", "fieldPath"]),
            Some("status.hostIP")
        );
        assert!(lookup(&field, &["value"]).is_none());
    }

    #[test]
    fn test_replace_prefixed_env_first_container_only() {
        let mut set = DocumentSet::parse("test.yaml", DEPLOYMENT).unwrap();
        let change = replace_env(vec![
            EnvVar::literal("OTEL_SERVICE_NAME", "shop"),
            EnvVar::field_ref("OTEL_IP", "status.hostIP"),
        ]);

        let outcome = apply_to_set(&mut set, &target(ResourceKind::Deployment, "api"), &change).unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);

        let view = DeploymentView::from_document(&set.documents()[0]).unwrap();
        let names: Vec<_> = view.env().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["LOG_LEVEL", "OTEL_SERVICE_NAME", "OTEL_IP"]);

        let sidecar = &view.containers().unwrap()[1];
        assert_eq!(
            str_at(&lookup(sidecar, &["env"]).unwrap().as_vec().unwrap()[0], &["name"]),
            Some("OTEL_KEEP")
        );
    }

    #[test]
    fn test_replace_prefixed_env_keeps_key_order() {
        let mut set = DocumentSet::parse("test.yaml", DEPLOYMENT).unwrap();
        apply_to_set(
            &mut set,
            &target(ResourceKind::Deployment, "api"),
            &replace_env(vec![EnvVar::literal("OTEL_SERVICE_NAME", "shop")]),
        )
        .unwrap();

        let container = &DeploymentView::from_document(&set.documents()[0])
            .unwrap()
            .containers()
            .unwrap()[0];
        let keys: Vec<_> = container
            .as_hash()
            .unwrap()
            .keys()
            .filter_map(Yaml::as_str)
            .collect();
        assert_eq!(keys, vec!["name", "image", "env", "ports"]);
    }

    #[test]
    fn test_replace_prefixed_env_creates_missing_list() {
        let content = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: bare\nspec:\n  template:\n    spec:\n      containers:\n      - name: bare\n        env:\n";
        let mut set = DocumentSet::parse("test.yaml", content).unwrap();
        apply_to_set(
            &mut set,
            &target(ResourceKind::Deployment, "bare"),
            &replace_env(vec![EnvVar::literal("OTEL_SERVICE_NAME", "default")]),
        )
        .unwrap();

        let env = DeploymentView::from_document(&set.documents()[0]).unwrap().env();
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_replace_is_idempotent() {
        let mut set = DocumentSet::parse("test.yaml", DEPLOYMENT).unwrap();
        let change = replace_env(vec![EnvVar::literal("OTEL_SERVICE_NAME", "shop")]);
        let target = target(ResourceKind::Deployment, "api");

        assert_eq!(apply_to_set(&mut set, &target, &change).unwrap(), MutationOutcome::Applied);
        let once = set.render().unwrap();
        assert_eq!(apply_to_set(&mut set, &target, &change).unwrap(), MutationOutcome::Unchanged);
        assert_eq!(set.render().unwrap(), once);
    }

    #[test]
    fn test_resource_not_found() {
        let mut set = DocumentSet::parse("test.yaml", DEPLOYMENT).unwrap();
        let err = apply_to_set(
            &mut set,
            &target(ResourceKind::Deployment, "ghost"),
            &replace_env(Vec::new()),
        )
        .unwrap_err();
        assert!(matches!(err, MutationError::ResourceNotFound { .. }));

        let err = apply_to_set(
            &mut set,
            &target(ResourceKind::Ingress, "api"),
            &replace_env(Vec::new()),
        )
        .unwrap_err();
        assert!(matches!(err, MutationError::ResourceNotFound { .. }));
    }

    #[test]
    fn test_set_annotation_creates_mapping() {
        let mut doc = yaml_rust2::YamlLoader::load_from_str("kind: Ingress\nmetadata:\n  name: web\n")
            .unwrap()
            .remove(0);
        set_annotation(&mut doc, "cert-manager.io/cluster-issuer", "letsencrypt").unwrap();
        assert_eq!(
            str_at(&doc, &["metadata", "annotations", "cert-manager.io/cluster-issuer"]),
            Some("letsencrypt")
        );
    }

    #[test]
    fn test_set_annotation_replaces_in_place() {
        let mut doc = yaml_rust2::YamlLoader::load_from_str(
            "kind: Ingress\nmetadata:\n  name: web\n  annotations:\n    a: x\n    cert-manager.io/cluster-issuer: letsencrypt-prod\n    z: y\n",
        )
        .unwrap()
        .remove(0);
        set_annotation(&mut doc, "cert-manager.io/cluster-issuer", "letsencrypt").unwrap();

        let keys: Vec<_> = lookup(&doc, &["metadata", "annotations"])
            .and_then(Yaml::as_hash)
            .unwrap()
            .keys()
            .filter_map(Yaml::as_str)
            .collect();
        assert_eq!(keys, vec!["a", "cert-manager.io/cluster-issuer", "z"]);
    }

    #[test]
    fn test_remove_annotation_drops_empty_mapping() {
        let mut doc = yaml_rust2::YamlLoader::load_from_str(
            "kind: Ingress\nmetadata:\n  name: web\n  annotations:\n    cert-manager.io/cluster-issuer: letsencrypt-prod\n",
        )
        .unwrap()
        .remove(0);
        remove_annotation(&mut doc, "cert-manager.io/cluster-issuer", "letsencrypt-prod").unwrap();
        assert!(lookup(&doc, &["metadata", "annotations"]).is_none());
        assert_eq!(str_at(&doc, &["metadata", "name"]), Some("web"));
    }

    #[test]
    fn test_remove_annotation_only_matching_value() {
        let source = "kind: Ingress\nmetadata:\n  name: web\n  annotations:\n    cert-manager.io/cluster-issuer: internal-ca\n";
        let mut doc = yaml_rust2::YamlLoader::load_from_str(source).unwrap().remove(0);
        let before = doc.clone();
        remove_annotation(&mut doc, "cert-manager.io/cluster-issuer", "letsencrypt-prod").unwrap();
        assert_eq!(doc, before);
    }
}
