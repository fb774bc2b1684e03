use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub otel: OtelConfig,
    pub cert_issuer: CertIssuerConfig,
}

/// Manifest discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Name of the ignore-list file looked up at the scanned root
    pub ignore_file: String,
    /// Dependency-manager directories that are never scanned
    pub dependency_dirs: Vec<String>,
}

/// OpenTelemetry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtelConfig {
    /// Organizational prefixes stripped from deployment names when deriving
    /// the subsystem name. Only the first matching prefix is removed.
    pub known_prefixes: Vec<String>,
}

/// cert-manager cluster issuer policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertIssuerConfig {
    pub annotation: String,
    /// Issuer value being phased out
    pub deprecated: String,
    /// Issuer value every managed Ingress should converge on
    pub canonical: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_file: ".yamlsignore".to_string(),
            dependency_dirs: vec!["node_modules".to_string()],
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            known_prefixes: vec!["vertc-".to_string(), "fundos-gestora-".to_string()],
        }
    }
}

impl Default for CertIssuerConfig {
    fn default() -> Self {
        Self {
            annotation: "cert-manager.io/cluster-issuer".to_string(),
            deprecated: "letsencrypt-prod".to_string(),
            canonical: "letsencrypt".to_string(),
        }
    }
}
