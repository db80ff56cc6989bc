use serde::{Deserialize, Serialize};

use super::{null_as_default, Report, ScanResult};

/// Cluster report produced by `trivy kubernetes`, grouped per workload resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KubernetesReport {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vulnerabilities: Vec<Resource>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub misconfigurations: Vec<Resource>,
}

/// A single Kubernetes object and the scan results attributed to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<ScanResult>,
}

impl KubernetesReport {
    /// Collapse the per-resource grouping into a flat report.
    ///
    /// Results keep encounter order: every vulnerability resource first, then
    /// every misconfiguration resource. Nothing is sorted or deduplicated.
    pub fn flatten(self) -> Report {
        let results = self
            .vulnerabilities
            .into_iter()
            .chain(self.misconfigurations)
            .flat_map(|resource| resource.results)
            .collect();
        Report {
            artifact_name: self.cluster_name,
            artifact_type: "kubernetes".to_string(),
            ..Report::from_results(results)
        }
    }
}

impl From<KubernetesReport> for Report {
    fn from(report: KubernetesReport) -> Self {
        report.flatten()
    }
}
