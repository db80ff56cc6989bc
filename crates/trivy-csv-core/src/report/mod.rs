use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

pub mod kubernetes;

/// Vendor identifier → CVSS entry, as emitted under a vulnerability's `CVSS` key.
pub type VendorCvss = BTreeMap<String, Cvss>;

/// Flat scanner report: one entry in `Results` per scanned target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub artifact_name: String,
    #[serde(default)]
    pub artifact_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<ScanResult>,
}

impl Report {
    /// Wrap an already flattened result list.
    pub fn from_results(results: Vec<ScanResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn vulnerability_count(&self) -> usize {
        self.results.iter().map(|r| r.vulnerabilities.len()).sum()
    }

    pub fn misconfiguration_count(&self) -> usize {
        self.results.iter().map(|r| r.misconfigurations.len()).sum()
    }
}

/// Findings for a single scan target (an image layer, a lockfile, a manifest...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanResult {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub class: String,
    #[serde(default, rename = "Type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub misconfigurations: Vec<Misconfiguration>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub secrets: Vec<Secret>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vulnerability {
    #[serde(default, rename = "VulnerabilityID")]
    pub vulnerability_id: String,
    #[serde(default, rename = "PkgID")]
    pub pkg_id: String,
    #[serde(default)]
    pub pkg_name: String,
    #[serde(default)]
    pub pkg_path: String,
    #[serde(default)]
    pub installed_version: String,
    #[serde(default)]
    pub fixed_version: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub severity_source: String,
    #[serde(default, rename = "PrimaryURL")]
    pub primary_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default, rename = "CweIDs", deserialize_with = "null_as_default")]
    pub cwe_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vendor_severity: BTreeMap<String, u8>,
    #[serde(default, rename = "CVSS", deserialize_with = "null_as_default")]
    pub cvss: VendorCvss,
    #[serde(default, deserialize_with = "null_as_default")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
}

/// A single vendor's CVSS scoring. Missing fields decode as zero / empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cvss {
    #[serde(default)]
    pub v2_vector: String,
    #[serde(default)]
    pub v3_vector: String,
    #[serde(default)]
    pub v2_score: f64,
    #[serde(default)]
    pub v3_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Misconfiguration {
    #[serde(default, rename = "Type")]
    pub kind: String,
    #[serde(default, rename = "ID")]
    pub id: String,
    #[serde(default, rename = "AVDID")]
    pub avd_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default, rename = "PrimaryURL")]
    pub primary_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub references: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_metadata: Option<CauseMetadata>,
}

/// Where in the scanned source a misconfiguration was triggered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CauseMetadata {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Secret {
    #[serde(default, rename = "RuleID")]
    pub rule_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default, rename = "Match")]
    pub matched: String,
}

/// Treat an explicit JSON `null` the same as an absent key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_trivy_field_names() {
        let raw = r#"{
            "SchemaVersion": 2,
            "ArtifactName": "alpine:3.19",
            "ArtifactType": "container_image",
            "Results": [{
                "Target": "alpine:3.19 (alpine 3.19.1)",
                "Class": "os-pkgs",
                "Type": "alpine",
                "Vulnerabilities": [{
                    "VulnerabilityID": "CVE-2024-0001",
                    "PkgName": "openssl",
                    "InstalledVersion": "3.1.4-r2",
                    "FixedVersion": "3.1.4-r3",
                    "PrimaryURL": "https://avd.aquasec.com/nvd/cve-2024-0001",
                    "Severity": "HIGH",
                    "CweIDs": ["CWE-787"],
                    "VendorSeverity": {"nvd": 3, "redhat": 2},
                    "CVSS": {
                        "nvd": {"V3Vector": "CVSS:3.1/AV:N", "V3Score": 9.8},
                        "redhat": {"V3Vector": "CVSS:3.1/AV:L", "V3Score": 7.5}
                    }
                }]
            }]
        }"#;

        let report: Report = serde_json::from_str(raw).unwrap();
        assert_eq!(report.schema_version, 2);
        assert_eq!(report.artifact_name, "alpine:3.19");
        let result = &report.results[0];
        assert_eq!(result.kind, "alpine");
        let vuln = &result.vulnerabilities[0];
        assert_eq!(vuln.vulnerability_id, "CVE-2024-0001");
        assert_eq!(vuln.primary_url, "https://avd.aquasec.com/nvd/cve-2024-0001");
        assert_eq!(vuln.cwe_ids, vec!["CWE-787".to_string()]);
        assert_eq!(vuln.vendor_severity.get("nvd"), Some(&3));
        assert!((vuln.cvss["nvd"].v3_score - 9.8).abs() < f64::EPSILON);
        assert_eq!(vuln.cvss["redhat"].v3_vector, "CVSS:3.1/AV:L");
        assert!(result.misconfigurations.is_empty());
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let raw = r#"{"Results": [{"Target": "go.sum", "Vulnerabilities": null, "Misconfigurations": null}]}"#;
        let report: Report = serde_json::from_str(raw).unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].vulnerabilities.is_empty());

        let report: Report = serde_json::from_str(r#"{"Results": null}"#).unwrap();
        assert!(report.results.is_empty());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let err = serde_json::from_str::<Report>(r#"{"Results": {"Target": "x"}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn counts_findings_across_results() {
        let report = Report::from_results(vec![
            ScanResult {
                vulnerabilities: vec![Vulnerability::default(), Vulnerability::default()],
                ..ScanResult::default()
            },
            ScanResult {
                misconfigurations: vec![Misconfiguration::default()],
                ..ScanResult::default()
            },
        ]);
        assert_eq!(report.vulnerability_count(), 2);
        assert_eq!(report.misconfiguration_count(), 1);
    }

    #[test]
    fn serializes_back_to_trivy_keys() {
        let vuln = Vulnerability {
            vulnerability_id: "CVE-1".into(),
            ..Vulnerability::default()
        };
        let value = serde_json::to_value(&vuln).unwrap();
        assert_eq!(value["VulnerabilityID"], "CVE-1");
        assert!(value.get("CVSS").is_some());
        assert!(value.get("PublishedDate").is_none());
    }
}
