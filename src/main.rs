//! Headless Chroma Fuse runner (default binary).
//!
//! ```text
//! chroma-fuse simulate [--seed N] [--pieces N] [--config PATH] [--mode M] [--moves N] [--events]
//! chroma-fuse serve
//! ```
//!
//! `simulate` plays a round with the greedy autoplay and prints a summary.
//! `serve` speaks the line-delimited JSON protocol on stdin/stdout.
//! Logs go to stderr; `-v`/`-vv` raise the level, `RUST_LOG` overrides it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use chroma_fuse::adapter::config::{parse_mode, RulesFile, SessionConfig};
use chroma_fuse::adapter::protocol::create_event;
use chroma_fuse::adapter::{run_session, Session};
use chroma_fuse::core::types::{Outcome, Phase};
use chroma_fuse::core::{GameState, SimpleRng};
use chroma_fuse::engine::{play_piece, Scheduler, Weights};

#[derive(Debug, Args, Clone, Default, PartialEq, Eq)]
struct SimulateArgs {
    #[arg(long, help = "RNG seed (default: CHROMA_FUSE_SEED or 1)")]
    seed: Option<u32>,

    #[arg(long, help = "Stop after this many pieces (default: 500)")]
    pieces: Option<u32>,

    #[arg(long, help = "JSON rules file (default: CHROMA_FUSE_CONFIG)")]
    config: Option<PathBuf>,

    #[arg(long, value_parser = ["endless", "objective", "puzzle"], help = "Game mode")]
    mode: Option<String>,

    #[arg(long, help = "Move budget for puzzle mode")]
    moves: Option<u32>,

    #[arg(long, help = "Print every engine event as a JSON line")]
    events: bool,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
enum Command {
    /// Play a round with the greedy autoplay and print a summary
    Simulate(SimulateArgs),
    /// Speak the line-delimited JSON protocol on stdin/stdout
    Serve,
}

#[derive(Debug, Parser)]
#[command(name = "chroma-fuse", version, about)]
struct Cli {
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity level (-v = INFO, -vv = DEBUG, -vvv = TRACE)")]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Simulate(args) => simulate(args),
        Command::Serve => serve(),
    }
}

fn session_config(args: &SimulateArgs) -> Result<SessionConfig> {
    let mut config = SessionConfig::from_env()?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(path) = &args.config {
        config.rules = RulesFile::load(path)?.into_config()?;
    }
    if let Some(mode) = &args.mode {
        config.rules.mode = parse_mode(mode, args.moves)?;
        config.rules.validate()?;
    }
    Ok(config)
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let config = session_config(&args)?;
    let pieces = args.pieces.unwrap_or(500);
    let mut state = GameState::with_config(config.rules, SimpleRng::new(config.seed))
        .context("invalid rules")?;
    let mut scheduler = Scheduler::new(0);
    let weights = Weights::default();

    info!(seed = config.seed, pieces, "simulation started");
    state.start();

    while state.pieces_locked() < pieces && state.phase() == Phase::AwaitingInput {
        if let Err(err) = play_piece(&mut state, &weights) {
            warn!(code = err.code(), "no placement found");
            break;
        }
        scheduler.settle(&mut state);
        let events = state.take_events();
        if args.events {
            for event in &events {
                let seq = state.pieces_locked() as u64;
                println!("{}", serde_json::to_string(&create_event(seq, event))?);
            }
        }
    }

    let outcome = match state.outcome() {
        Some(Outcome::GameOver(reason)) => reason.as_str(),
        Some(Outcome::RoundWon) => "roundWon",
        None => "running",
    };
    println!(
        "seed={} mode={} pieces={} score={} level={} cleared={} max_chain={} outcome={}",
        config.seed,
        state.config().mode.as_str(),
        state.pieces_locked(),
        state.score(),
        state.level(),
        state.cleared_total(),
        state.max_chain(),
        outcome
    );
    Ok(())
}

fn serve() -> Result<()> {
    let config = SessionConfig::from_env()?;
    let session = Session::new(config)?;
    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let summary = rt.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        run_session(stdin, tokio::io::stdout(), session).await
    })?;
    info!(
        score = summary.score,
        messages = summary.messages,
        "session closed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from([
            "chroma-fuse", "-vv", "simulate", "--seed", "7", "--pieces", "20", "--events",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Simulate(sim) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(sim.seed, Some(7));
        assert_eq!(sim.pieces, Some(20));
        assert!(sim.events);
    }

    #[test]
    fn test_parse_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["chroma-fuse", "serve", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.command, Command::Serve);
    }

    #[test]
    fn test_parse_errors() {
        let parse = |args: &[&str]| Cli::try_parse_from(args.iter().copied());
        assert!(parse(&["chroma-fuse", "simulate", "--seed"]).is_err());
        assert!(parse(&["chroma-fuse", "simulate", "--seed", "x"]).is_err());
        assert!(parse(&["chroma-fuse", "simulate", "--mode", "arcade"]).is_err());
        assert!(parse(&["chroma-fuse", "serve", "--seed", "1"]).is_err());
        assert!(parse(&["chroma-fuse", "bogus"]).is_err());
        assert!(parse(&["chroma-fuse"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
