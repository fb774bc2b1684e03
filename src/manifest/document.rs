//! Multi-document YAML files.
//!
//! A [`DocumentSet`] is the parsed form of one manifest file: every document in
//! source order. Saving re-emits every document from its parsed tree, so
//! untouched documents keep their content (comments and exact spacing are not
//! preserved).
//!
//! Plain integers whose source text differs from their decimal form (`0644`,
//! `+5`) are loaded as raw numeric text and written back verbatim. YAML 1.1
//! readers treat a leading zero as octal, so re-emitting `644` would change
//! the value.

use crate::error::DocumentError;
use crate::manifest::store::ManifestStore;
use std::path::{Path, PathBuf};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};
use yaml_rust2::{Yaml, YamlEmitter, YamlLoader};

/// Separator written between documents
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// The ordered documents of one manifest file
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    path: PathBuf,
    documents: Vec<Yaml>,
}

impl DocumentSet {
    /// Parse YAML content that was read from `path`
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self, DocumentError> {
        let path = path.into();
        let parse_error = |e: yaml_rust2::ScanError| DocumentError::Parse {
            path: path.clone(),
            message: e.to_string(),
        };

        // Full load first: it reports structural errors such as duplicate keys
        YamlLoader::load_from_str(content).map_err(parse_error)?;

        let mut loader = NumericTextLoader::default();
        Parser::new_from_str(content)
            .load(&mut loader, true)
            .map_err(parse_error)?;
        let documents = loader.inner.documents().to_vec();

        Ok(Self { path, documents })
    }

    /// Read and parse a manifest through the store
    pub async fn load<S: ManifestStore>(store: &S, path: &Path) -> Result<Self, DocumentError> {
        let content = store.read(path).await.map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn documents(&self) -> &[Yaml] {
        &self.documents
    }

    pub fn document_mut(&mut self, index: usize) -> Option<&mut Yaml> {
        self.documents.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Find the document for `kind` + `metadata.name`.
    ///
    /// When several documents carry the same identity, the one at `hint`
    /// (the position recorded during the scan) wins; otherwise the first match.
    pub fn locate(&self, kind: &str, name: &str, hint: Option<usize>) -> Option<usize> {
        let matches = |doc: &Yaml| identity(doc) == Some((kind, name));

        if let Some(index) = hint
            && self.documents.get(index).is_some_and(matches)
        {
            return Some(index);
        }

        self.documents.iter().position(matches)
    }

    /// Serialize every document, joined with `---` separators
    pub fn render(&self) -> Result<String, DocumentError> {
        let mut output = String::new();

        for (index, doc) in self.documents.iter().enumerate() {
            if index > 0 {
                output.push_str(DOCUMENT_SEPARATOR);
            }
            let body = emit_document(doc).map_err(|message| DocumentError::Emit {
                path: self.path.clone(),
                message,
            })?;
            output.push_str(&body);
        }

        Ok(output)
    }

    /// Overwrite the source file with the rendered document set
    pub async fn save<S: ManifestStore>(&self, store: &S) -> Result<(), DocumentError> {
        let content = self.render()?;
        store
            .write(&self.path, &content)
            .await
            .map_err(|source| DocumentError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Event receiver that forwards to [`YamlLoader`], retagging plain integers
/// that would lose their spelling as floats so they load as `Yaml::Real`
#[derive(Default)]
struct NumericTextLoader {
    inner: YamlLoader,
}

impl MarkedEventReceiver for NumericTextLoader {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        let ev = match ev {
            Event::Scalar(value, TScalarStyle::Plain, anchor, None) if is_lossy_integer(&value) => {
                let tag = Tag {
                    handle: "tag:yaml.org,2002:".to_string(),
                    suffix: "float".to_string(),
                };
                Event::Scalar(value, TScalarStyle::Plain, anchor, Some(tag))
            }
            other => other,
        };
        self.inner.on_event(ev, mark);
    }
}

/// Plain scalar that loads as an integer but does not re-emit as the same text
fn is_lossy_integer(value: &str) -> bool {
    match Yaml::from_str(value) {
        Yaml::Integer(parsed) => parsed.to_string() != value && value.parse::<f64>().is_ok(),
        _ => false,
    }
}

/// Emit one document without its `---` header.
///
/// Empty documents produce an empty body so a trailing separator round-trips
/// as a separator rather than as an explicit `~`.
fn emit_document(doc: &Yaml) -> Result<String, String> {
    if doc.is_null() {
        return Ok(String::new());
    }

    let mut raw = String::new();
    {
        let mut emitter = YamlEmitter::new(&mut raw);
        emitter.multiline_strings(true);
        emitter.dump(doc).map_err(|e| e.to_string())?;
    }

    let body = raw
        .strip_prefix("---")
        .unwrap_or(&raw)
        .trim_start_matches([' ', '\n']);

    let mut body = body.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    Ok(body)
}

// ============================================================================
// Tree access helpers
// ============================================================================

/// Build a mapping key
pub fn key(name: &str) -> Yaml {
    Yaml::String(name.to_string())
}

/// Follow a path of mapping keys. Returns `None` as soon as a segment is
/// missing or a non-mapping node is crossed.
pub fn lookup<'a>(node: &'a Yaml, path: &[&str]) -> Option<&'a Yaml> {
    path.iter().try_fold(node, |current, segment| match current {
        Yaml::Hash(map) => map.get(&key(segment)),
        _ => None,
    })
}

/// Mutable variant of [`lookup`]
pub fn lookup_mut<'a>(node: &'a mut Yaml, path: &[&str]) -> Option<&'a mut Yaml> {
    path.iter().try_fold(node, |current, segment| match current {
        Yaml::Hash(map) => map.get_mut(&key(segment)),
        _ => None,
    })
}

/// String scalar at `path`
pub fn str_at<'a>(node: &'a Yaml, path: &[&str]) -> Option<&'a str> {
    lookup(node, path).and_then(Yaml::as_str)
}

/// `kind` and `metadata.name` of a document, when both are strings
pub fn identity(doc: &Yaml) -> Option<(&str, &str)> {
    Some((str_at(doc, &["kind"])?, str_at(doc, &["metadata", "name"])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_DOCS: &str = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: first
data:
  enabled: "true"
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
spec:
  replicas: 2
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: last
data:
  note: plain text
"#;

    #[test]
    fn test_parse_multi_document() {
        let set = DocumentSet::parse("three.yaml", THREE_DOCS).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(identity(&set.documents()[0]), Some(("ConfigMap", "first")));
        assert_eq!(identity(&set.documents()[1]), Some(("Deployment", "api")));
        assert_eq!(identity(&set.documents()[2]), Some(("ConfigMap", "last")));
    }

    #[test]
    fn test_parse_empty_content() {
        let set = DocumentSet::parse("empty.yaml", "").unwrap();
        assert!(set.is_empty());
        assert_eq!(set.render().unwrap(), "");
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = DocumentSet::parse("bad.yaml", "key: [unclosed").unwrap_err();
        match err {
            DocumentError::Parse { path, .. } => assert_eq!(path, PathBuf::from("bad.yaml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_render_preserves_order_and_content() {
        let set = DocumentSet::parse("three.yaml", THREE_DOCS).unwrap();
        let rendered = set.render().unwrap();

        assert_eq!(rendered.matches(DOCUMENT_SEPARATOR).count(), 2);
        assert!(!rendered.starts_with("---"));
        assert!(rendered.ends_with('\n'));

        let reparsed = DocumentSet::parse("three.yaml", &rendered).unwrap();
        assert_eq!(reparsed.documents(), set.documents());
    }

    #[test]
    fn test_render_double_quotes_ambiguous_strings() {
        let set = DocumentSet::parse("cm.yaml", THREE_DOCS).unwrap();
        let rendered = set.render().unwrap();

        assert!(rendered.contains("enabled: \"true\""));
        assert!(rendered.contains("note: plain text"));
        assert!(rendered.contains("replicas: 2"));
    }

    #[test]
    fn test_trailing_empty_document_round_trips() {
        let content = "kind: ConfigMap\nmetadata:\n  name: a\n---\n";
        let set = DocumentSet::parse("a.yaml", content).unwrap();
        let rendered = set.render().unwrap();
        let reparsed = DocumentSet::parse("a.yaml", &rendered).unwrap();

        assert_eq!(reparsed.len(), set.len());
        assert!(!rendered.contains('~'));
    }

    #[test]
    fn test_leading_zero_integers_keep_their_text() {
        let content = "kind: Deployment\nmetadata:\n  name: api\nspec:\n  replicas: 2\n  volumes:\n  - name: config\n    configMap:\n      defaultMode: 0644\n      offset: +5\n";
        let set = DocumentSet::parse("api.yaml", content).unwrap();
        let rendered = set.render().unwrap();

        assert!(rendered.contains("defaultMode: 0644"));
        assert!(rendered.contains("offset: +5"));
        assert!(rendered.contains("replicas: 2"));
        assert_eq!(
            lookup(&set.documents()[0], &["spec", "replicas"]),
            Some(&Yaml::Integer(2))
        );

        let reparsed = DocumentSet::parse("api.yaml", &rendered).unwrap();
        assert_eq!(reparsed.documents(), set.documents());
    }

    #[test]
    fn test_lossy_integer_detection() {
        assert!(is_lossy_integer("0644"));
        assert!(is_lossy_integer("-007"));
        assert!(!is_lossy_integer("644"));
        assert!(!is_lossy_integer("0"));
        assert!(!is_lossy_integer("1.10"));
        assert!(!is_lossy_integer("name"));
    }

    #[test]
    fn test_locate_prefers_hint() {
        let content = "kind: Ingress\nmetadata:\n  name: web\n---\nkind: Ingress\nmetadata:\n  name: web\n";
        let set = DocumentSet::parse("dup.yaml", content).unwrap();

        assert_eq!(set.locate("Ingress", "web", None), Some(0));
        assert_eq!(set.locate("Ingress", "web", Some(1)), Some(1));
        assert_eq!(set.locate("Ingress", "web", Some(7)), Some(0));
        assert_eq!(set.locate("Deployment", "web", Some(1)), None);
    }

    #[test]
    fn test_lookup_stops_at_scalars() {
        let set = DocumentSet::parse("three.yaml", THREE_DOCS).unwrap();
        let doc = &set.documents()[1];

        assert_eq!(lookup(doc, &["spec", "replicas"]).and_then(Yaml::as_i64), Some(2));
        assert!(lookup(doc, &["spec", "replicas", "deeper"]).is_none());
        assert!(lookup(doc, &["status"]).is_none());
    }
}
