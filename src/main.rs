//! vwb CLI: drive a native learner from the command line.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use vw_bridge::repair;
use vw_bridge::{Learner, LearnerConfig, NativeEngine, ReferenceEngine};

#[derive(Parser)]
#[command(name = "vwb", version, about = "Predict and learn through a native online learner")]
struct Cli {
    /// Native shim to load. Without it the in-process reference engine is used.
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open and close a default and a quiet instance.
    Smoke,

    /// Stream samples (one per line) through a learner and print predictions.
    Run {
        /// Configuration string passed to the engine.
        #[arg(long, default_value = "--quiet", allow_hyphen_values = true, conflicts_with = "config")]
        args: String,

        /// TOML learner config to build the configuration string from.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Learn from each sample instead of only predicting.
        #[arg(long)]
        learn: bool,

        /// Read samples from a file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Print one JSON object per sample.
        #[arg(long)]
        json: bool,
    },

    /// Print a configuration string with its first --link directive removed.
    Repair {
        /// Configuration string.
        args: String,
    },
}

#[derive(Serialize)]
struct PredictionLine<'a> {
    line: usize,
    sample: &'a str,
    prediction: f32,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.library.clone() {
        Some(path) => run_native(path, cli.command),
        None => execute(ReferenceEngine, cli.command),
    }
}

#[cfg(feature = "dylib")]
fn run_native(path: PathBuf, command: Commands) -> Result<()> {
    let engine = vw_bridge::native::dylib::load(Some(&path))?;
    execute(engine, command)
}

#[cfg(not(feature = "dylib"))]
fn run_native(path: PathBuf, _command: Commands) -> Result<()> {
    miette::bail!(
        "cannot load {}: vwb was built without the `dylib` feature",
        path.display()
    )
}

fn execute<E: NativeEngine + Copy>(engine: E, command: Commands) -> Result<()> {
    match command {
        Commands::Smoke => {
            for args in ["", "--quiet"] {
                let mut learner = Learner::open(engine, args)?;
                learner.close();
                println!("ok: {args:?}");
            }
        }

        Commands::Run {
            args,
            config,
            learn,
            input,
            json,
        } => {
            let args = match config {
                Some(path) => LearnerConfig::load(&path)?.to_args(),
                None => args,
            };
            let reader: Box<dyn BufRead> = match input {
                Some(path) => Box::new(BufReader::new(std::fs::File::open(path).into_diagnostic()?)),
                None => Box::new(std::io::stdin().lock()),
            };

            let mut learner = Learner::open(engine, &args)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mut count = 0usize;

            for (index, line) in reader.lines().enumerate() {
                let line = line.into_diagnostic()?;
                if line.trim().is_empty() {
                    continue;
                }
                let prediction = if learn {
                    learner.learn(&line)?
                } else {
                    learner.predict(&line)?
                };
                if json {
                    let record = PredictionLine {
                        line: index + 1,
                        sample: &line,
                        prediction,
                    };
                    writeln!(out, "{}", serde_json::to_string(&record).into_diagnostic()?)
                        .into_diagnostic()?;
                } else {
                    writeln!(out, "{prediction}").into_diagnostic()?;
                }
                count += 1;
            }

            learner.close();
            tracing::info!(samples = count, learn, "stream finished");
        }

        Commands::Repair { args } => {
            println!("{}", repair::strip_link_directive(&args));
        }
    }

    Ok(())
}
