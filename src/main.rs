use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use walkthrough::parser::parse_duration;
use walkthrough::{DefinitionSource, Driver, Timing, parse_file};

#[derive(Parser, Debug)]
#[command(
    name = "walkthrough",
    about = "Play a guided walkthrough in the terminal",
    version
)]
struct Args {
    /// JSON file with the sequence definitions
    #[arg(short, long)]
    definitions: PathBuf,

    /// Sequence to start
    #[arg(long)]
    sequence: Option<String>,

    /// Driver script simulating the user; without one, commands are read
    /// from stdin and an empty line advances
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Delay per typed character (e.g. 50ms)
    #[arg(long, value_parser = parse_duration)]
    typing_speed: Option<Duration>,

    /// Pause after '.', '!' and '?' (e.g. 300ms)
    #[arg(long, value_parser = parse_duration)]
    punctuation_pause: Option<Duration>,

    /// Ignore advances closer together than this (e.g. 100ms)
    #[arg(long, value_parser = parse_duration)]
    advance_debounce: Option<Duration>,

    /// Run on virtual time: no sleeping, timers fire back to back
    #[arg(long)]
    instant: bool,

    /// Log state transitions to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let defaults = Timing::default();
    let timing = Timing {
        typing_speed: args.typing_speed.unwrap_or(defaults.typing_speed),
        punctuation_pause: args.punctuation_pause.unwrap_or(defaults.punctuation_pause),
        advance_debounce: args.advance_debounce.unwrap_or(defaults.advance_debounce),
    };

    let mut driver = Driver::stdout().with_timing(timing);
    if args.instant {
        driver = driver.instant();
    }

    driver
        .engine()
        .try_load_definitions(&DefinitionSource::file(&args.definitions))
        .with_context(|| format!("Failed to load definitions: {}", args.definitions.display()))?;

    if let Some(key) = &args.sequence {
        if driver.engine().definitions().get(key).is_none() {
            bail!("No sequence named '{}' in {}", key, args.definitions.display());
        }
        driver.engine().load_sequence(key);
    }

    match &args.script {
        Some(path) => {
            let commands = parse_file(path)
                .with_context(|| format!("Failed to parse script file: {}", path.display()))?;
            driver
                .execute(commands)
                .await
                .context("Failed to execute script")?;
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            driver
                .interactive(stdin)
                .await
                .context("Failed to read commands")?;
        }
    }

    println!();
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
