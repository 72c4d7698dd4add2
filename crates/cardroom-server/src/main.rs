//! Command-line entry point for Cardroom.
//!
//! ```text
//! cardroom-server serve --deck decks/base.json --bind 0.0.0.0:8080
//! cardroom-server watch --url ws://127.0.0.1:8080 --name Observer
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use cardroom::{CardroomServer, DEFAULT_BIND_ADDR};
use cardroom_game::{DEFAULT_HAND_SIZE, DEFAULT_WINNING_SCORE, GameSettings};
use clap::{Args, Parser, Subcommand};

mod deck;
mod error;
mod logging;
mod watch;

use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "cardroom-server")]
#[command(about = "Server-authoritative multiplayer card game over WebSockets")]
#[command(version)]
struct Cli {
    /// Log level for cardroom crates; RUST_LOG overrides it
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host a game
    Serve(ServeArgs),
    /// Join a game and log every state update
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Deck file in CAH JSON format; repeat to merge decks
    #[arg(short, long = "deck", required = true)]
    decks: Vec<PathBuf>,

    /// Cards each contestant holds
    #[arg(long, default_value_t = DEFAULT_HAND_SIZE)]
    hand_size: u32,

    /// Points needed to win
    #[arg(long, default_value_t = DEFAULT_WINNING_SCORE)]
    winning_score: u32,

    /// Seed for reproducible card draws
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Server WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Name to join with
    #[arg(short, long, default_value = "watcher")]
    name: String,

    /// Display color
    #[arg(short, long)]
    color: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Watch(args) => {
            watch::run(&args.url, &args.name, args.color.as_deref()).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            ExitCode::FAILURE
        }
    }
}

async fn serve(args: ServeArgs) -> Result<(), CliError> {
    let settings = GameSettings {
        hand_size: args.hand_size,
        winning_score: args.winning_score,
    };
    settings.validate()?;
    let deck = deck::load(&args.decks)?;

    let mut builder = CardroomServer::builder()
        .bind(&args.bind)
        .settings(settings)
        .deck(deck);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let server = builder.build().await?;
    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["cardroom-server", "serve", "--deck", "base.json"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind, DEFAULT_BIND_ADDR);
        assert_eq!(args.decks, vec![PathBuf::from("base.json")]);
        assert_eq!(args.hand_size, 5);
        assert_eq!(args.winning_score, 5);
        assert!(args.seed.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_serve_requires_a_deck() {
        assert!(Cli::try_parse_from(["cardroom-server", "serve"]).is_err());
    }

    #[test]
    fn test_serve_merges_repeated_decks() {
        let cli = Cli::parse_from([
            "cardroom-server",
            "--log-level",
            "debug",
            "serve",
            "-d",
            "a.json",
            "-d",
            "b.json",
            "--seed",
            "9",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.decks.len(), 2);
        assert_eq!(args.seed, Some(9));
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_watch_args() {
        let cli = Cli::parse_from(["cardroom-server", "watch", "--name", "Obs", "--color", "red"]);
        let Command::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.name, "Obs");
        assert_eq!(args.color.as_deref(), Some("red"));
    }
}
