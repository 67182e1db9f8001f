// Ring-buffer sink for the `log` facade.
//
// Firmware has no place to stream logs to while the shell owns the console,
// so records are kept in memory and can be dumped on request.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 64;

/// Keeps the most recent `MAX_LOG_ENTRIES` formatted records.
pub struct RingLogger {
    entries: Mutex<VecDeque<String>>,
}

impl RingLogger {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Copy of the buffered lines, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, line: String) {
        let mut entries = self.entries.lock();
        if entries.len() == MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(line);
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.push(alloc::format!(
            "[{:<5} {}] {}",
            record.level().as_str(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

/// Install `logger` as the global logger.
pub fn init(logger: &'static RingLogger, level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}
