use std::io;

use term_desk::config::DesktopConfig;
use term_desk::{runner, tracing_sub};

fn main() -> io::Result<()> {
    let config = DesktopConfig::from_args();
    tracing_sub::init(config.log_file.as_deref(), config.log_level)?;
    runner::run(config)
}
