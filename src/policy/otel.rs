//! OpenTelemetry instrumentation policy for Deployments.

use crate::manifest::{DeploymentRecord, EnvVar};
use serde::Serialize;
use std::fmt;

/// Env entries starting with this prefix belong to the instrumentation block
pub const OTEL_PREFIX: &str = "OTEL_";

pub const SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
pub const RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
const HOST_IP: &str = "OTEL_IP";
const EXPORTER_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

const INSTRUMENTATION_TOGGLES: [&str; 5] = [
    "OTEL_PYTHON_DJANGO_INSTRUMENT",
    "OTEL_PYTHON_REQUESTS_INSTRUMENT",
    "OTEL_PYTHON_PSYCOPG2_INSTRUMENT",
    "OTEL_PYTHON_KAFKA_PYTHON_INSTRUMENT",
    "OTEL_PYTHON_LOGGING_AUTO_INSTRUMENTATION_ENABLED",
];

/// Names of every required variable, in the order they are written
pub fn required_names() -> Vec<&'static str> {
    [SERVICE_NAME, RESOURCE_ATTRIBUTES, HOST_IP, EXPORTER_ENDPOINT]
        .into_iter()
        .chain(INSTRUMENTATION_TOGGLES)
        .collect()
}

/// Derive the telemetry subsystem name.
///
/// The deployment name loses a leading `<namespace>-`, then at most one of the
/// known organizational prefixes; the rest is appended to the namespace.
pub fn subsystem_name(namespace: &str, deployment: &str, known_prefixes: &[String]) -> String {
    let suffix = deployment
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(deployment);

    let suffix = known_prefixes
        .iter()
        .find_map(|prefix| suffix.strip_prefix(prefix.as_str()))
        .unwrap_or(suffix);

    format!("{namespace}-{suffix}")
}

pub fn resource_attributes(namespace: &str, subsystem: &str) -> String {
    format!("cx.application.name={namespace},cx.subsystem.name={subsystem}")
}

/// The full variable block for one Deployment
pub fn otel_env_vars(namespace: &str, deployment: &str, known_prefixes: &[String]) -> Vec<EnvVar> {
    let subsystem = subsystem_name(namespace, deployment, known_prefixes);

    let mut vars = vec![
        EnvVar::literal(SERVICE_NAME, namespace),
        EnvVar::literal(RESOURCE_ATTRIBUTES, resource_attributes(namespace, &subsystem)),
        EnvVar::field_ref(HOST_IP, "status.hostIP"),
        EnvVar::literal(EXPORTER_ENDPOINT, "http://$(OTEL_IP):4317"),
    ];
    vars.extend(
        INSTRUMENTATION_TOGGLES
            .iter()
            .map(|name| EnvVar::literal(name, "true")),
    );
    vars
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OtelStatus {
    /// No `OTEL_*` variable at all
    Missing,
    /// Some `OTEL_*` variables, but not the full correct block
    Incomplete,
    Correct,
}

impl fmt::Display for OtelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "❌ Missing",
            Self::Incomplete => "⚠️ Incomplete",
            Self::Correct => "✅ OK",
        })
    }
}

/// How a Deployment compares to the required variable block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtelAssessment {
    pub status: OtelStatus,
    pub subsystem: String,
    /// Required names absent from the first container
    pub missing: Vec<String>,
    /// `OTEL_*` names already present
    pub existing: Vec<String>,
    pub service_name_ok: bool,
    pub resource_attributes_ok: bool,
}

impl OtelAssessment {
    pub fn needs_change(&self) -> bool {
        self.status != OtelStatus::Correct
    }
}

/// Compare the first container's env list against the required block
pub fn classify(record: &DeploymentRecord, known_prefixes: &[String]) -> OtelAssessment {
    let subsystem = subsystem_name(&record.namespace, &record.name, known_prefixes);
    let value_of = |name: &str| {
        record
            .env
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.value.as_deref())
    };

    let missing: Vec<String> = required_names()
        .into_iter()
        .filter(|name| !record.env.iter().any(|entry| entry.name == *name))
        .map(String::from)
        .collect();
    let existing: Vec<String> = record
        .env
        .iter()
        .filter(|entry| entry.name.starts_with(OTEL_PREFIX))
        .map(|entry| entry.name.clone())
        .collect();

    let service_name_ok = value_of(SERVICE_NAME) == Some(record.namespace.as_str());
    let resource_attributes_ok = value_of(RESOURCE_ATTRIBUTES)
        == Some(resource_attributes(&record.namespace, &subsystem).as_str());

    let status = if missing.is_empty() && service_name_ok && resource_attributes_ok {
        OtelStatus::Correct
    } else if existing.is_empty() {
        OtelStatus::Missing
    } else {
        OtelStatus::Incomplete
    };

    OtelAssessment {
        status,
        subsystem,
        missing,
        existing,
        service_name_ok,
        resource_attributes_ok,
    }
}
