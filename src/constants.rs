//! Shared crate-wide constants.

use std::time::Duration;

use crate::window::Position;

/// Where the first window of an empty desktop spawns when no cascade is
/// configured. Matches the classic 50px/50px origin of the web desktop.
pub const DEFAULT_SPAWN_ORIGIN: Position = Position::new(50, 50);

/// Per-window stagger of the default cascade, applied to both axes.
pub const DEFAULT_SPAWN_STEP: i32 = 30;

/// Terminal-sized cascade used by the binary unless overridden.
pub const TERMINAL_SPAWN_ORIGIN: Position = Position::new(1, 2);
pub const TERMINAL_SPAWN_STEP: i32 = 2;

/// Granularity of the stopwatch, countdown and quiz clocks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How long a mismatched memory pair stays face up.
pub const MEMORY_UNFLIP_DELAY: Duration = Duration::from_millis(1000);

pub const QUIZ_TIME_LIMIT_SECS: u32 = 10;
pub const QUIZ_TOTAL_QUESTIONS: u32 = 7;
pub const QUIZ_HIGH_SCORE_SLOTS: usize = 5;

/// Input polling interval of the event loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(16);
