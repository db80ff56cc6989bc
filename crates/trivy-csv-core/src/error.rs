use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Failures raised while turning a scanner run into a CSV file.
///
/// Every variant is fatal for the conversion; callers report it and exit.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("expected scanner arguments followed by an output path (got {got} argument(s))")]
    Usage { got: usize },
    #[error("failed to launch scanner `{program}`")]
    ScannerLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("scanner `{program}` exited unsuccessfully ({status})")]
    ScannerFailed { program: String, status: ExitStatus },
    #[error("failed to read report at {}", path.display())]
    ReadReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode report at {}", path.display())]
    DecodeReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to load template from {}", path.display())]
    LoadTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template error")]
    Template(#[from] tera::Error),
    #[error("failed to create output file {}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output file {}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create temporary report file")]
    TempFile(#[source] std::io::Error),
    #[error("failed to remove temporary report file")]
    Cleanup(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
