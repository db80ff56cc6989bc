use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use trivy_csv_core::{convert, CsvRenderer, Invocation, ReportShape, Settings, TrivyCommand};

#[derive(Parser, Debug)]
#[command(
    name = "trivy-csv",
    author,
    version,
    about = "Run Trivy and render its JSON report as CSV",
    override_usage = "trivy-csv <TRIVY ARGS>... <OUTPUT>"
)]
struct Cli {
    /// Arguments forwarded to the scanner, followed by the CSV output path
    #[arg(
        value_name = "ARGS",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let shape = ReportShape::detect(&cli.args);
    let invocation = Invocation::from_args(cli.args)?;
    let settings = Settings::load()?;
    debug!(?settings, ?shape, "resolved invocation");

    let template = settings.template_path()?;
    let renderer = CsvRenderer::from_file(&template)
        .with_context(|| format!("failed to initialize template writer from {}", template.display()))?;
    let command = TrivyCommand::new(settings.scanner.as_str(), invocation.scanner_args);

    convert(&command, shape, &renderer, &invocation.output).with_context(|| {
        format!(
            "failed to build CSV report {}",
            invocation.output.display()
        )
    })?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
