use anyhow::{Context, bail};
use clap::{ArgAction, Parser, ValueEnum};
use env_logger::Builder;
use log::{LevelFilter, info};
use std::path::{self, PathBuf};
use std::process::ExitCode;

use deadline_analyzer::analyzer::{AnalysisSummary, ParseErrorPolicy, ReportMetric, analyze_all};
use deadline_analyzer::common::AnalyzerConfig;
use deadline_analyzer::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Deadline-miss statistics for simulator flow logs.
#[derive(Debug, Parser)]
#[command(name = "deadline-analyzer", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Protocol log to analyze, overrides the config entry of the same name
    #[arg(long = "log", value_name = "NAME=PATH", value_parser = parse_log_arg)]
    logs: Vec<(String, PathBuf)>,

    /// Observation window start (inclusive by default)
    #[arg(long)]
    window_start: Option<i64>,

    /// Observation window end (exclusive by default)
    #[arg(long)]
    window_end: Option<i64>,

    /// What to do with malformed records: skip or abort
    #[arg(long, value_name = "POLICY")]
    on_parse_error: Option<ParseErrorPolicy>,

    /// Analyze protocols one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Console output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Also write the JSON summary to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print only these metrics per protocol (mean, p99, p50, miss_ratio, small_miss_ratio, ...)
    #[arg(long = "metric", value_name = "METRIC", value_parser = parse_metric_arg)]
    metrics: Vec<(String, ReportMetric)>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_log_arg(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name.to_string(), PathBuf::from(path))),
        _ => Err(format!("expected NAME=PATH, got '{}'", value)),
    }
}

fn parse_metric_arg(value: &str) -> Result<(String, ReportMetric), String> {
    Ok((value.to_string(), value.parse()?))
}

fn build_config(cli: &Cli) -> anyhow::Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };

    // Command-line paths are relative to the working directory, not log_dir.
    for (name, path) in &cli.logs {
        let path = path::absolute(path).with_context(|| format!("Invalid log path {}", path.display()))?;
        config.set_protocol(name, path);
    }
    if let Some(start) = cli.window_start {
        config.settings.window.start = start;
    }
    if let Some(end) = cli.window_end {
        config.settings.window.end = end;
    }
    if let Some(policy) = cli.on_parse_error {
        config.settings.on_parse_error = policy;
    }
    if cli.sequential {
        config.settings.parallel = false;
    }

    if let Err(e) = config.validate() {
        bail!("Invalid configuration: {}", e);
    }
    Ok(config)
}

fn print_metrics(summary: &AnalysisSummary, metrics: &[(String, ReportMetric)]) {
    for report in &summary.reports {
        for (name, metric) in metrics {
            match report.metric(*metric) {
                Some(value) => println!("{} {} {}", report.protocol_name, name, value),
                None => println!("{} {} n/a", report.protocol_name, name),
            }
        }
    }
}

/// Exit status when a protocol failed or the summary could not be delivered.
const EXIT_FAILURE: u8 = 1;
/// Exit status for configuration errors.
const EXIT_CONFIG_ERROR: u8 = 2;

fn emit_summary(cli: &Cli, summary: &AnalysisSummary) -> anyhow::Result<()> {
    if !cli.metrics.is_empty() {
        print_metrics(summary, &cli.metrics);
    } else {
        match cli.format {
            OutputFormat::Text => print!("{}", output::render_text(summary)?),
            OutputFormat::Json => println!("{}", output::render_json(summary)?),
        }
    }

    if let Some(path) = &cli.output {
        output::write_json(summary, path)?;
        info!("Summary written to {}", path.display());
    }
    Ok(())
}

/// Run the analysis and return the process exit status.
fn run(cli: &Cli) -> u8 {
    let config = match build_config(cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{:#}", e);
            return EXIT_CONFIG_ERROR;
        }
    };
    let protocols = config.protocol_logs();
    info!("Analyzing {} protocol log(s)", protocols.len());

    let summary = analyze_all(&protocols, &config.settings);

    if let Err(e) = emit_summary(cli, &summary) {
        log::error!("{:#}", e);
        return EXIT_FAILURE;
    }
    if summary.has_failures() { EXIT_FAILURE } else { 0 }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging setup
    let crate_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("deadline_analyzer"), crate_level)
        .parse_default_env()
        .init();

    ExitCode::from(run(&cli))
}
