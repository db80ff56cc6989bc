use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

/// Runtime configuration, layered from defaults, an optional file and the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Scanner executable, looked up on `PATH` when not absolute.
    pub scanner: String,
    /// Explicit template location; overrides the lookup next to the executable.
    #[serde(default)]
    pub template: Option<PathBuf>,
    /// File name searched for next to the running executable.
    pub template_name: String,
}

impl Settings {
    const ENV_PREFIX: &'static str = "TRIVY_CSV";
    const CONFIG_ENV: &'static str = "TRIVY_CSV_CONFIG";
    const DEFAULT_SCANNER: &'static str = "trivy";
    const DEFAULT_TEMPLATE_NAME: &'static str = "csv.tpl";

    /// Load settings.
    ///
    /// * `TRIVY_CSV_CONFIG`        — optional config file (format from its extension).
    /// * `TRIVY_CSV_SCANNER`       — scanner binary (default: `trivy`).
    /// * `TRIVY_CSV_TEMPLATE`      — explicit template path.
    /// * `TRIVY_CSV_TEMPLATE_NAME` — template file name next to the executable (default: `csv.tpl`).
    pub fn load() -> Result<Self> {
        let config_file = std::env::var_os(Self::CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let mut builder = Config::builder()
            .set_default("scanner", Self::DEFAULT_SCANNER)?
            .set_default("template_name", Self::DEFAULT_TEMPLATE_NAME)?;
        if let Some(path) = &config_file {
            debug!(path = %path.display(), "reading config file");
            builder = builder.add_source(File::from(path.as_path()));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(Self::ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize())
            .with_context(|| match &config_file {
                Some(path) => format!("invalid configuration (config file {})", path.display()),
                None => "invalid configuration".to_string(),
            })?;
        Ok(settings.normalized())
    }

    fn normalized(mut self) -> Self {
        self.scanner = self.scanner.trim().to_string();
        if self.scanner.is_empty() {
            self.scanner = Self::DEFAULT_SCANNER.to_string();
        }
        self.template = self.template.filter(|p| !p.as_os_str().is_empty());
        self
    }

    /// Resolve the template file to load.
    pub fn template_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.template {
            return Ok(path.clone());
        }
        let exe = std::env::current_exe().context("failed to locate the running executable")?;
        let dir = exe
            .parent()
            .with_context(|| format!("executable {} has no parent directory", exe.display()))?;
        Ok(dir.join(&self.template_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn with_env_lock<F: FnOnce()>(func: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_env();
        func();
        reset_env();
    }

    fn reset_env() {
        env::remove_var(Settings::CONFIG_ENV);
        env::remove_var("TRIVY_CSV_SCANNER");
        env::remove_var("TRIVY_CSV_TEMPLATE");
        env::remove_var("TRIVY_CSV_TEMPLATE_NAME");
    }

    #[test]
    fn defaults_to_trivy_and_csv_template() {
        with_env_lock(|| {
            let settings = Settings::load().expect("defaults should load");
            assert_eq!(settings.scanner, "trivy");
            assert_eq!(settings.template_name, "csv.tpl");
            assert!(settings.template.is_none());
        });
    }

    #[test]
    fn environment_overrides_defaults() {
        with_env_lock(|| {
            env::set_var("TRIVY_CSV_SCANNER", "/opt/trivy/bin/trivy");
            env::set_var("TRIVY_CSV_TEMPLATE", "/etc/trivy-csv/custom.tpl");
            let settings = Settings::load().expect("env settings should load");
            assert_eq!(settings.scanner, "/opt/trivy/bin/trivy");
            assert_eq!(
                settings.template_path().unwrap(),
                PathBuf::from("/etc/trivy-csv/custom.tpl")
            );
        });
    }

    #[test]
    fn reads_config_file_below_environment() {
        with_env_lock(|| {
            let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
            std::fs::write(
                file.path(),
                "scanner = \"trivy-from-file\"\ntemplate_name = \"report.tpl\"\n",
            )
            .unwrap();
            env::set_var(Settings::CONFIG_ENV, file.path());

            let settings = Settings::load().expect("file settings should load");
            assert_eq!(settings.scanner, "trivy-from-file");
            assert_eq!(settings.template_name, "report.tpl");

            env::set_var("TRIVY_CSV_SCANNER", "trivy-from-env");
            let settings = Settings::load().expect("env should win over file");
            assert_eq!(settings.scanner, "trivy-from-env");
        });
    }

    #[test]
    fn missing_config_file_errors() {
        with_env_lock(|| {
            let temp = tempfile::tempdir().unwrap();
            env::set_var(Settings::CONFIG_ENV, temp.path().join("absent.toml"));
            let err = Settings::load().expect_err("absent config file should error");
            assert!(err.to_string().contains("absent.toml"));
        });
    }

    #[test]
    fn template_defaults_to_executable_directory() {
        with_env_lock(|| {
            let settings = Settings::load().unwrap();
            let path = settings.template_path().unwrap();
            let exe_dir = env::current_exe().unwrap().parent().unwrap().to_path_buf();
            assert_eq!(path, exe_dir.join("csv.tpl"));
        });
    }

    #[test]
    fn blank_scanner_falls_back_to_default() {
        with_env_lock(|| {
            env::set_var("TRIVY_CSV_SCANNER", "  ");
            let settings = Settings::load().unwrap();
            assert_eq!(settings.scanner, "trivy");
        });
    }
}
