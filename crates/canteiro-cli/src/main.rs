//! canteiro CLI - Construction Schedule Leveling Engine
//!
//! Command-line interface for optimizing, checking and inspecting schedules.

mod diagnostics;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canteiro_core::{Constraints, ProjectResources, ProjectSchedule};
use canteiro_solver::{build_daily_histogram, default_constraints, ScheduleOptimizer};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diagnostics::{check_schedule, ExitCode, JsonReport, TerminalEmitter};

#[derive(Parser)]
#[command(name = "canteiro")]
#[command(author, version, about = "Construction schedule leveling engine", long_about = None)]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Level workforce and resolve conflicts in a schedule
    Optimize {
        /// Schedule file (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Constraints file (.toml, otherwise JSON)
        #[arg(short, long, value_name = "FILE")]
        constraints: Option<PathBuf>,

        /// Project resources file (JSON)
        #[arg(short, long, value_name = "FILE")]
        resources: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a schedule file
    Check {
        /// Schedule file (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the daily workforce histogram
    Histogram {
        /// Schedule file (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Workforce limit used to flag overloaded days
        #[arg(short, long)]
        limit: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the default constraints
    Constraints {
        /// Output format (text prints TOML)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v; logs go to stderr so JSON on stdout stays clean
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let code = match cli.command {
        Commands::Optimize {
            file,
            constraints,
            resources,
            format,
            output,
        } => cmd_optimize(
            &file,
            constraints.as_deref(),
            resources.as_deref(),
            format,
            output.as_deref(),
        )?,
        Commands::Check { file, format } => cmd_check(&file, format)?,
        Commands::Histogram {
            file,
            limit,
            format,
        } => cmd_histogram(&file, limit, format)?,
        Commands::Constraints { format } => cmd_constraints(format)?,
    };

    Ok(code.into())
}

fn load_schedule(path: &Path) -> Result<ProjectSchedule> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schedule file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse schedule: {}", path.display()))
}

fn load_resources(path: Option<&Path>) -> Result<ProjectResources> {
    let Some(path) = path else {
        return Ok(ProjectResources::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read resources file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse resources: {}", path.display()))
}

fn load_constraints(path: Option<&Path>) -> Result<Constraints> {
    match path {
        Some(path) => Constraints::load(path)
            .with_context(|| format!("Failed to load constraints: {}", path.display())),
        None => Ok(default_constraints()),
    }
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write output file: {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn cmd_optimize(
    file: &Path,
    constraints: Option<&Path>,
    resources: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let schedule = load_schedule(file)?;
    let constraints = load_constraints(constraints)?;
    let resources = load_resources(resources)?;
    tracing::info!(file = %file.display(), tasks = schedule.tasks.len(), "loaded schedule");

    let result = ScheduleOptimizer::new(constraints).optimize(&schedule, &resources);

    let text = match format {
        OutputFormat::Text => report::render_result(&result),
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
            json.push('\n');
            json
        }
    };
    write_output(&text, output)?;
    if let Some(path) = output {
        eprintln!("Wrote {}", path.display());
    }

    Ok(ExitCode::Success)
}

fn cmd_check(file: &Path, format: OutputFormat) -> Result<ExitCode> {
    let schedule = load_schedule(file)?;
    let findings = check_schedule(&schedule);

    match format {
        OutputFormat::Text => {
            let mut emitter = TerminalEmitter::new(std::io::stderr(), file);
            for finding in &findings {
                emitter.emit(finding)?;
            }
            let code = emitter.exit_code();
            if code.is_success() {
                println!(
                    "{}: {} tasks, {} warning(s)",
                    file.display(),
                    schedule.tasks.len(),
                    emitter.warning_count()
                );
            } else {
                println!(
                    "{}: {} error(s), {} warning(s)",
                    file.display(),
                    emitter.error_count(),
                    emitter.warning_count()
                );
            }
            Ok(code)
        }
        OutputFormat::Json => {
            let report = JsonReport::new(file, &findings);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(report.exit_code())
        }
    }
}

fn cmd_histogram(file: &Path, limit: Option<u32>, format: OutputFormat) -> Result<ExitCode> {
    let schedule = load_schedule(file)?;
    let histogram = build_daily_histogram(&schedule.tasks);

    match format {
        OutputFormat::Text => {
            let limit = limit.unwrap_or_else(|| default_constraints().max_workers_per_floor);
            print!("{}", report::render_histogram(&histogram, limit));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&histogram)?),
    }

    Ok(ExitCode::Success)
}

fn cmd_constraints(format: OutputFormat) -> Result<ExitCode> {
    let constraints = default_constraints();
    match format {
        OutputFormat::Text => print!("{}", constraints.to_toml_string()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&constraints)?),
    }
    Ok(ExitCode::Success)
}
