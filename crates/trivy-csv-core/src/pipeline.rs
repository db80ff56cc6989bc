use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::command::ReportProducer;
use crate::error::{ConvertError, Result};
use crate::render::CsvRenderer;
use crate::shape::{load_report, ReportShape};

const TEMP_PREFIX: &str = "csv-report-";
const TEMP_SUFFIX: &str = ".json";

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub results: usize,
    pub vulnerabilities: usize,
    pub misconfigurations: usize,
    pub bytes_written: usize,
}

/// Split a raw argument list into scanner arguments and the CSV destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub scanner_args: Vec<String>,
    pub output: PathBuf,
}

impl Invocation {
    /// The last argument is the output path, everything before it belongs to the scanner.
    pub fn from_args(mut args: Vec<String>) -> Result<Self> {
        if args.len() < 2 {
            return Err(ConvertError::Usage { got: args.len() });
        }
        let output = args.pop().map(PathBuf::from).unwrap_or_default();
        Ok(Self {
            scanner_args: args,
            output,
        })
    }
}

/// Run the scanner, normalize its report and write the rendered CSV to `output`.
///
/// The intermediate report lives in a temporary file that is removed on every
/// exit path. The output file is only created once rendering has succeeded.
pub fn convert(
    producer: &dyn ReportProducer,
    shape: ReportShape,
    renderer: &CsvRenderer,
    output: &Path,
) -> Result<ConversionSummary> {
    let temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile()
        .map_err(ConvertError::TempFile)?
        .into_temp_path();
    debug!(path = %temp.display(), "allocated temporary report");

    producer.produce(&temp)?;
    let report = load_report(&temp, shape)?;
    let rendered = renderer.render(&report)?;
    write_output(output, rendered.as_bytes())?;
    temp.close().map_err(ConvertError::Cleanup)?;

    let summary = ConversionSummary {
        output: output.to_path_buf(),
        results: report.results.len(),
        vulnerabilities: report.vulnerability_count(),
        misconfigurations: report.misconfiguration_count(),
        bytes_written: rendered.len(),
    };
    info!(
        output = %output.display(),
        results = summary.results,
        vulnerabilities = summary.vulnerabilities,
        misconfigurations = summary.misconfigurations,
        "CSV report written"
    );
    Ok(summary)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(|source| ConvertError::CreateOutput {
        path: path.to_path_buf(),
        source,
    })?;
    let write_error = |source| ConvertError::WriteOutput {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(write_error)?;
    let file = writer
        .into_inner()
        .map_err(|e| write_error(e.into_error()))?;
    file.sync_all().map_err(write_error)
}
