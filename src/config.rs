use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

use crate::apps::AppKind;
use crate::constants::{DEFAULT_POLL_INTERVAL, TERMINAL_SPAWN_ORIGIN, TERMINAL_SPAWN_STEP};
use crate::store::default_store_path;
use crate::window::{Position, SpawnCascade};

#[derive(Parser, Debug)]
#[command(
    name = "term-desk",
    version = env!("CARGO_PKG_VERSION"),
    about = "A terminal desktop of draggable app windows"
)]
pub struct Cli {
    /// Row of the first spawned window.
    #[arg(long = "spawn-top", value_name = "ROW", default_value_t = TERMINAL_SPAWN_ORIGIN.top, allow_hyphen_values = true)]
    spawn_top: i32,

    /// Column of the first spawned window.
    #[arg(long = "spawn-left", value_name = "COL", default_value_t = TERMINAL_SPAWN_ORIGIN.left, allow_hyphen_values = true)]
    spawn_left: i32,

    /// Offset added on both axes for every already open window.
    #[arg(long = "spawn-step", value_name = "CELLS", default_value_t = TERMINAL_SPAWN_STEP, allow_hyphen_values = true)]
    spawn_step: i32,

    /// JSON file holding usernames, chat history and high scores.
    #[arg(long = "store", value_name = "PATH", conflicts_with = "no_store")]
    store: Option<PathBuf>,

    /// Keep all app data in memory for this session only.
    #[arg(long = "no-store")]
    no_store: bool,

    /// Write logs to this file; logging is off otherwise.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[arg(long = "log-level", value_name = "LEVEL", default_value_t = Level::INFO)]
    log_level: Level,

    /// Input poll interval in milliseconds.
    #[arg(long = "tick-ms", value_name = "MS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    tick_ms: u64,

    /// Fetch quiz questions from this server instead of the bundled set.
    #[arg(long = "quiz-url", value_name = "URL")]
    quiz_url: Option<String>,

    /// Windows to open at startup, in order.
    #[arg(long = "open", value_name = "KIND")]
    open: Vec<AppKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct DesktopConfig {
    pub cascade: SpawnCascade,
    pub store: StoreLocation,
    pub log_file: Option<PathBuf>,
    pub log_level: Level,
    pub poll_interval: Duration,
    pub quiz_url: Option<String>,
    pub open: Vec<AppKind>,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            cascade: SpawnCascade::new(TERMINAL_SPAWN_ORIGIN, TERMINAL_SPAWN_STEP),
            store: StoreLocation::Memory,
            log_file: None,
            log_level: Level::INFO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            quiz_url: None,
            open: Vec::new(),
        }
    }
}

impl From<Cli> for DesktopConfig {
    fn from(cli: Cli) -> Self {
        let store = if cli.no_store {
            StoreLocation::Memory
        } else {
            StoreLocation::File(cli.store.unwrap_or_else(default_store_path))
        };
        Self {
            cascade: SpawnCascade::new(Position::new(cli.spawn_top, cli.spawn_left), cli.spawn_step),
            store,
            log_file: cli.log_file,
            log_level: cli.log_level,
            poll_interval: Duration::from_millis(cli.tick_ms.max(1)),
            quiz_url: cli.quiz_url,
            open: cli.open,
        }
    }
}

impl DesktopConfig {
    pub fn from_args() -> Self {
        Cli::parse().into()
    }
}
