use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use subsumption_core::{
    check_subsumption, OutputFormat as CoreOutputFormat, RefResolution, SubsumptionOptions,
    SubsumptionResult,
};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "schema-subsume")]
#[command(about = "Decide whether every value a producer schema accepts is also accepted by a consumer schema")]
#[command(version)]
struct Cli {
    /// Producer schema file (P)
    producer_file: PathBuf,

    /// Consumer schema file (C)
    consumer_file: PathBuf,

    /// Caps the array-length bound the encoder reasons about
    #[arg(long, default_value_t = 10)]
    max_array_length: usize,

    /// Reserved for a future bounded-simulation mode over recursive schemas
    #[arg(long, default_value_t = 5)]
    max_recursion_depth: usize,

    /// Solver wall-clock budget, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_seconds: u64,

    /// Run the labeled evaluation and minimization pass to explain a failure
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    explain: bool,

    /// How to render the result
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Pretty)]
    output_format: OutputFormatArg,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormatArg {
    Pretty,
    Json,
    Minimal,
}

impl From<OutputFormatArg> for CoreOutputFormat {
    fn from(val: OutputFormatArg) -> Self {
        match val {
            OutputFormatArg::Pretty => CoreOutputFormat::Pretty,
            OutputFormatArg::Json => CoreOutputFormat::Json,
            OutputFormatArg::Minimal => CoreOutputFormat::Minimal,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let producer = read_schema(&cli.producer_file)?;
    let consumer = read_schema(&cli.consumer_file)?;

    let options = SubsumptionOptions {
        max_array_length: cli.max_array_length,
        max_recursion_depth: cli.max_recursion_depth,
        timeout_seconds: cli.timeout_seconds,
        ref_resolution: RefResolution::Unfold,
        explanations: cli.explain,
        output_format: cli.output_format.into(),
    };

    let result = check_subsumption(&producer, &consumer, &options);
    render(&result, cli.output_format);

    Ok(ExitCode::from(result.exit_code() as u8))
}

/// Read and parse a JSON Schema from a file path.
fn read_schema(path: &PathBuf) -> Result<Value> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open schema file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse schema from: {}", path.display()))
}

fn render(result: &SubsumptionResult, format: OutputFormatArg) {
    match format {
        OutputFormatArg::Json => render_json(result),
        OutputFormatArg::Pretty => render_pretty(result),
        OutputFormatArg::Minimal => render_minimal(result),
    }
}

/// Bit-exact contract shape: `counterexample` is always present, even as
/// `null`; the remaining diagnostic fields are present only when computed.
fn render_json(result: &SubsumptionResult) {
    let mut obj = serde_json::Map::new();
    obj.insert("compatible".to_string(), Value::Bool(result.compatible));
    obj.insert(
        "counterexample".to_string(),
        result.counterexample.clone().unwrap_or(Value::Null),
    );
    obj.insert(
        "solver_time".to_string(),
        serde_json::json!(result.solver_time_seconds),
    );
    if let Some(explanation) = &result.explanation {
        obj.insert("explanation".to_string(), Value::String(explanation.clone()));
    }
    if !result.failed_constraints.is_empty() {
        obj.insert(
            "failed_constraints".to_string(),
            serde_json::json!(result.failed_constraints),
        );
    }
    if !result.recommendations.is_empty() {
        obj.insert(
            "recommendations".to_string(),
            serde_json::json!(result.recommendations),
        );
    }
    if let Some(error) = &result.error {
        obj.insert("error".to_string(), Value::String(error.clone()));
    }

    println!("{}", Value::Object(obj));
}

fn render_pretty(result: &SubsumptionResult) {
    if let Some(error) = &result.error {
        println!("error: {error}");
        return;
    }

    if result.compatible {
        println!("compatible: every value accepted by the producer is accepted by the consumer");
    } else {
        println!("incompatible: found a producer value the consumer rejects");
        if let Some(counterexample) = &result.counterexample {
            println!(
                "counterexample:\n{}",
                serde_json::to_string_pretty(counterexample).unwrap_or_default()
            );
        }
        if let Some(explanation) = &result.explanation {
            println!("\n{explanation}");
        }
        if !result.failed_constraints.is_empty() {
            println!("\nfailed constraints:");
            for (constraint, recommendation) in result
                .failed_constraints
                .iter()
                .zip(result.recommendations.iter())
            {
                println!("  - {constraint}: {recommendation}");
            }
        }
    }
    println!("\nsolver time: {:.3}s", result.solver_time_seconds);
}

/// A single line: `compatible` / `incompatible` / `error: <message>` — meant
/// for scripting, where the exit code already carries the verdict and this
/// line is just a human-readable confirmation.
fn render_minimal(result: &SubsumptionResult) {
    if let Some(error) = &result.error {
        println!("error: {error}");
    } else if result.compatible {
        println!("compatible");
    } else {
        println!("incompatible");
    }
}
