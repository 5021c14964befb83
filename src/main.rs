// Command-line entry point for trace-audit.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use trace_audit::application::AuditUsecase;
use trace_audit::domain::Registry;
use trace_audit::infrastructure::concurrency::init_thread_pool;
use trace_audit::infrastructure::config::AuditConfig;
use trace_audit::infrastructure::trace_collector::TraceCollector;
use trace_audit::infrastructure::{JsonExporter, JsonTraceLoader};
use trace_audit::ports::format::OutputFormat;
use trace_audit::ports::text_exporter::TextExporter;
use trace_audit::ports::{ReportExporter, TraceLoader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Plugin whose contract is audited
    #[arg(short, long)]
    plugin: String,

    /// Debug document to audit (can specify multiple)
    #[arg(short, long, required = false)]
    input: Vec<PathBuf>,

    /// Folder(s) searched recursively for *.json debug documents
    #[arg(short = 'd', long = "dir", required = false)]
    dirs: Vec<PathBuf>,

    /// Registry document replacing the plugins embedded in each trace
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file path, `-` for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Output format (text, json); inferred from the output extension when omitted
    #[arg(short, long)]
    format: Option<String>,

    /// Worker threads for batch audits
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print the plugin's declared test sources instead of auditing
    #[arg(long)]
    list_tests: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_format(cli: &Cli) -> Result<OutputFormat> {
    match &cli.format {
        Some(name) => OutputFormat::from_str(name)
            .with_context(|| format!("Unknown output format '{}' (expected text or json)", name)),
        None => Ok(OutputFormat::from_path(std::path::Path::new(&cli.output)).unwrap_or_default()),
    }
}

fn list_tests(cli: &Cli, loader: &JsonTraceLoader, registry: Option<&Registry>, paths: &[PathBuf]) -> Result<()> {
    let embedded;
    let registry = match (registry, paths.first()) {
        (Some(registry), _) => registry,
        (None, Some(path)) => {
            embedded = loader.load_document(path)?.registry()?;
            &embedded
        }
        (None, None) => bail!("--list-tests needs --registry or at least one trace"),
    };

    let contract = registry.get(&cli.plugin).with_context(|| {
        let known: Vec<&str> = registry.plugin_ids().collect();
        format!("Known plugins: {}", known.join(", "))
    })?;
    for source in contract.test_sources() {
        println!("{}", source.describe());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };
    if cli.jobs.is_some() {
        config.jobs = cli.jobs;
    }

    let loader = JsonTraceLoader;
    let registry = cli
        .registry
        .as_deref()
        .map(|path| loader.load_registry(path))
        .transpose()?;
    let paths = TraceCollector::collect(&cli.input, &cli.dirs)?;

    if cli.list_tests {
        list_tests(&cli, &loader, registry.as_ref(), &paths)?;
        return Ok(true);
    }

    if paths.is_empty() {
        bail!("Please provide at least one --input <file> or --dir <folder>");
    }

    if let Err(e) = init_thread_pool(config.jobs) {
        warn!("thread pool not reconfigured: {}", e);
    }

    let format = resolve_format(&cli)?;
    let exporter: &dyn ReportExporter = match format {
        OutputFormat::Text => &TextExporter,
        OutputFormat::Json => &JsonExporter,
    };

    let usecase = AuditUsecase {
        loader: &loader,
        exporter,
        settings: &config.analyzer,
    };
    let report = usecase.run(&cli.plugin, &paths, registry.as_ref(), &cli.output)?;

    if cli.output != "-" {
        eprintln!(
            "Audit completed! {} trace(s) audited, report written to {} (format: {})",
            report.audits.len(),
            cli.output,
            format
        );
    }
    Ok(report.is_clean())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
