use std::{fs::File, io::BufReader, path::Path};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::report::{kubernetes::KubernetesReport, Report};

/// Tokens that switch the scanner into cluster mode.
const KUBERNETES_TOKENS: [&str; 2] = ["kubernetes", "k8s"];

/// JSON layout the scanner is expected to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportShape {
    Flat,
    Kubernetes,
}

impl ReportShape {
    /// Pick the report layout from the raw argument list.
    ///
    /// Any bare `kubernetes` or `k8s` argument selects the cluster layout.
    pub fn detect<S: AsRef<str>>(args: &[S]) -> Self {
        if args
            .iter()
            .any(|arg| KUBERNETES_TOKENS.contains(&arg.as_ref()))
        {
            Self::Kubernetes
        } else {
            Self::Flat
        }
    }
}

/// Decode the report at `path` and normalize it to the flat layout.
pub fn load_report(path: &Path, shape: ReportShape) -> Result<Report> {
    debug!(path = %path.display(), ?shape, "decoding scanner report");
    match shape {
        ReportShape::Flat => read_json::<Report>(path),
        ReportShape::Kubernetes => read_json::<KubernetesReport>(path).map(KubernetesReport::flatten),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| ConvertError::ReadReport {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConvertError::DecodeReport {
        path: path.to_path_buf(),
        source,
    })
}
