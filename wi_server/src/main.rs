//! Console harness for the word impostor engine.
//!
//! Reads JSON-lines inbound events from stdin, routes them through a session
//! registry, and prints display intents as JSON lines on stdout. A leaderboard
//! refresh job runs for the lifetime of the process.

mod config;
mod harness;
mod logging;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Error};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use word_impostor::{
    InMemoryStatsStore, LeaderboardRefresher, SessionRegistry, StaticSettingsProvider,
    deck::WordBank,
};

use config::ServerConfig;
use harness::Harness;

const HELP: &str = "\
Run the word impostor engine over stdin/stdout

USAGE:
  wi_server [OPTIONS]

OPTIONS:
  --deck          PATH     Word bank JSON file          [default: env WI_DECK_PATH or built-in decks]
  --refresh-secs  N        Leaderboard refresh period   [default: env WI_REFRESH_SECS or 86400]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  WI_RECENT_PAIRS          Recently dealt pairs excluded per chat (default 5)
  WI_MIN_PLAYERS           Minimum players to start (default 3)
  WI_MAX_PLAYERS           Maximum players per game (default 10)
  WI_LANGUAGE              Deck language (default en)
  WI_DECK_ID               Deck within the language (default classic)
  RUST_LOG                 Log filter (default info)

INPUT (one JSON object per line):
  {\"chat_id\": 1, \"player_id\": 7, \"event\": {\"kind\": \"join\", \"payload\": {\"display_name\": \"ann\"}}}
  {\"command\": \"status\", \"chat_id\": 1}
  {\"command\": \"leaderboard\", \"limit\": 10}
  {\"command\": \"next_game\", \"chat_id\": 1, \"player_id\": 7}
  {\"command\": \"migrate\", \"old_chat_id\": 1, \"new_chat_id\": -1001}
";

struct Args {
    deck: Option<PathBuf>,
    refresh_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        deck: pargs.opt_value_from_str("--deck")?,
        refresh_secs: pargs.opt_value_from_str("--refresh-secs")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(args.deck, args.refresh_secs)?;
    config.validate()?;

    let deck = match &config.deck_path {
        Some(path) => WordBank::load(path)
            .with_context(|| format!("Failed to load word bank from {}", path.display()))?,
        None => WordBank::builtin(),
    };
    info!("Word bank ready with languages {:?}", deck.languages());

    let store = Arc::new(InMemoryStatsStore::new());
    let registry = SessionRegistry::new(Arc::new(deck), store.clone(), config.registry);
    let provider = StaticSettingsProvider::new(config.session_defaults.clone());

    let _refresher = LeaderboardRefresher::spawn(store.clone(), config.refresh_period());

    let harness = Harness::new(registry, provider, store);

    info!("Reading events from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        for value in harness.handle_line(&line).await {
            stdout.write_all(format!("{value}\n").as_bytes()).await?;
        }
        stdout.flush().await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}
