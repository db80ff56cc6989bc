use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Stdio},
};

use tracing::{debug, info};

use crate::error::{ConvertError, Result};

/// Something that writes a JSON scan report to a given path.
pub trait ReportProducer {
    /// Produce the report at `output`, blocking until it is complete.
    fn produce(&self, output: &Path) -> Result<()>;
}

/// Runs the scanner binary with the caller's arguments, forcing JSON output.
#[derive(Debug, Clone)]
pub struct TrivyCommand {
    program: String,
    args: Vec<String>,
}

impl TrivyCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector passed to the scanner for the given report path.
    pub fn command_args(&self, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        args.extend(["--format", "json", "--output"].map(OsString::from));
        args.push(output.as_os_str().to_os_string());
        args
    }
}

impl ReportProducer for TrivyCommand {
    fn produce(&self, output: &Path) -> Result<()> {
        let args = self.command_args(output);
        info!(program = %self.program, args = ?self.args, "running scanner");
        debug!(report = %output.display(), "scanner report destination");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| ConvertError::ScannerLaunch {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ConvertError::ScannerFailed {
                program: self.program.clone(),
                status,
            });
        }
        debug!(%status, "scanner finished");
        Ok(())
    }
}
