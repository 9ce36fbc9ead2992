use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// Import from ermin-core
use ermin_core::{JsonReport, ValidationConfig, ValidationProcessor};

// Import CLI utilities
use ermin_cli::console::render_run;
use ermin_cli::{resolve_autofix, ConfigOverrides};

#[derive(Parser)]
#[command(name = "ermin-validate")]
#[command(about = "Validate an ERMIN emissions-report CSV against a field specification")]
struct Args {
    /// Path to the field specification CSV
    #[arg(short, long, required_unless_present = "print_default_config")]
    specification: Option<PathBuf>,

    /// Path to the input data CSV
    #[arg(short, long, required_unless_present = "print_default_config")]
    input: Option<PathBuf>,

    /// Write the (repaired) table here; implies --autofix
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print every warning and error instead of the first 10 of each
    #[arg(short, long)]
    all_errors: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Fill missing values with the field default or the sentinel
    #[arg(long)]
    autofix: bool,

    /// Never repair, even when --output is given
    #[arg(long, conflicts_with = "autofix")]
    no_autofix: bool,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Marker written into repaired missing cells (default NULL)
    #[arg(long)]
    sentinel: Option<String>,

    /// Accept allowed values that differ only in case, as warnings
    #[arg(long)]
    case_insensitive: bool,

    /// Warn about input columns the specification does not define
    #[arg(long)]
    strict_extra_columns: bool,

    /// Let autofix also collapse whitespace and apply case suggestions
    #[arg(long)]
    normalize: bool,

    /// Also write a JSON report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Time each pipeline step
    #[arg(long)]
    profile: bool,

    /// Print the default YAML config and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<ExitCode> {
    if args.print_default_config {
        print!("{}", ValidationConfig::default().to_yaml()?);
        return Ok(ExitCode::SUCCESS);
    }

    let spec_path = args.specification.as_deref().context("--specification is required")?;
    let input_path = args.input.as_deref().context("--input is required")?;

    let mut config = ValidationConfig::load_optional(args.config.as_deref())?;
    ConfigOverrides {
        sentinel: args.sentinel.clone(),
        case_insensitive: args.case_insensitive,
        strict_extra_columns: args.strict_extra_columns,
        normalize: args.normalize,
    }
    .apply(&mut config);

    let autofix = resolve_autofix(args.autofix, args.no_autofix, args.output.is_some());

    println!("🦀 ERMIN Validator");
    println!("📄 Input: {}", input_path.display());

    let processor = ValidationProcessor::new(config).with_profiling(args.profile);
    let run = processor
        .run(spec_path, input_path, args.output.as_deref(), autofix)
        .with_context(|| format!("validation of {} failed", input_path.display()))?;

    print!("{}", render_run(&run, args.all_errors));

    if let Some(output) = &args.output {
        println!("💾 Wrote table to: {}", output.display());
    }

    if let Some(report_path) = &args.report {
        JsonReport::new(
            &run.outcome,
            spec_path,
            run.spec_fingerprint.clone(),
            input_path,
            args.output.as_deref(),
        )
        .write_to(report_path)
        .with_context(|| format!("failed to write report {}", report_path.display()))?;
        println!("📝 Wrote report to: {}", report_path.display());
    }

    if args.profile {
        print!("\n{}", run.profile_summary);
    }

    Ok(if run.outcome.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
