use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::Level;

/// Writer handed out per event: appends to the shared log file, or
/// swallows output when logging is off. The terminal belongs to the UI, so
/// stderr is never a target.
pub enum DesktopWriter {
    File(Arc<Mutex<File>>),
    Sink(io::Sink),
}

impl Write for DesktopWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            DesktopWriter::File(file) => match file.lock() {
                Ok(mut file) => file.write(buf),
                Err(_) => Ok(buf.len()),
            },
            DesktopWriter::Sink(sink) => sink.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            DesktopWriter::File(file) => match file.lock() {
                Ok(mut file) => file.flush(),
                Err(_) => Ok(()),
            },
            DesktopWriter::Sink(sink) => sink.flush(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SubscriberMakeWriter {
    file: Option<Arc<Mutex<File>>>,
}

impl SubscriberMakeWriter {
    pub fn to_file(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    pub fn sink() -> Self {
        Self::default()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = DesktopWriter;

    fn make_writer(&'a self) -> Self::Writer {
        match &self.file {
            Some(file) => DesktopWriter::File(Arc::clone(file)),
            None => DesktopWriter::Sink(io::sink()),
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(log_file: Option<&Path>, level: Level) -> io::Result<()> {
    let writer = match log_file {
        Some(path) => SubscriberMakeWriter::to_file(path)?,
        None => SubscriberMakeWriter::sink(),
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
