//! Audit logger.
//!
//! Renders [`AuditRecord`]s and dispatches them to the console and to the
//! file sink for their category. The logger is shared by every client
//! session; each sink serializes its own writes.
//!
//! Write failures are reported through `log` and counted, never returned to
//! the caller, so one failing disk cannot disturb broker operation.

mod record;
mod sink;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use log::{debug, warn};

use crate::config::{AuditConfig, LogConfig};
use crate::error::StartupError;

pub use record::{format_time, json_or_empty, single_line, AuditRecord, Category, EventKind};
pub use sink::{ConsoleSink, LogSink, SinkKind};
#[cfg(test)]
pub(crate) use sink::SharedBuffer;

/// Console-only notices emitted by the probe itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// General information (`I`).
    Info,
    /// Effective configuration (`C`).
    Config,
    /// Fatal error (`X`).
    Fatal,
}

impl Notice {
    pub fn code(self) -> char {
        match self {
            Notice::Info => 'I',
            Notice::Config => 'C',
            Notice::Fatal => 'X',
        }
    }
}

/// Fans records out to the console and the category's file sink.
#[derive(Debug)]
pub struct AuditLogger {
    console: ConsoleSink,
    data: Option<LogSink>,
    status: Option<LogSink>,
    timestamps: bool,
    time_format: String,
    records: AtomicU64,
    write_failures: AtomicU64,
}

impl AuditLogger {
    /// Assemble a logger from already-opened sinks.
    pub fn new(
        console: ConsoleSink,
        data: Option<LogSink>,
        status: Option<LogSink>,
        config: &AuditConfig,
    ) -> Self {
        Self {
            console,
            data,
            status,
            timestamps: config.timestamps,
            time_format: config.time_format.clone(),
            records: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        }
    }

    /// Open every configured sink. The console always writes to stdout.
    pub fn open(config: &AuditConfig, log: &LogConfig) -> Result<Self, StartupError> {
        Self::open_with(ConsoleSink::stdout(!log.monochrome), config)
    }

    /// Open the configured file sinks around `console`.
    pub fn open_with(mut console: ConsoleSink, config: &AuditConfig) -> Result<Self, StartupError> {
        if let Some(path) = &config.console_log {
            console = console.with_mirror(open_sink(SinkKind::ConsoleMirror, path)?);
        }
        let data = config
            .data_log
            .as_deref()
            .map(|path| open_sink(SinkKind::DataFile, path))
            .transpose()?;
        let status = config
            .status_log
            .as_deref()
            .map(|path| open_sink(SinkKind::StatusFile, path))
            .transpose()?;

        Ok(Self::new(console, data, status, config))
    }

    /// The file sink records of `category` go to, if enabled.
    pub fn sink_for(&self, category: Category) -> Option<&LogSink> {
        match category {
            Category::Status => self.status.as_ref(),
            Category::Data => self.data.as_ref(),
            Category::Console => None,
        }
    }

    /// Write a record to the console and its category's file sink.
    pub fn record(&self, record: &AuditRecord) {
        self.records.fetch_add(1, Ordering::Relaxed);

        let time = format_time(&record.timestamp, &self.time_format);
        if let Err((kind, e)) = self
            .console
            .write(&time, record.kind.code(), &record.console_message())
        {
            self.write_failed(kind, &e);
        }

        if let Some(sink) = self.sink_for(record.kind.category()) {
            let time_format = self.timestamps.then_some(self.time_format.as_str());
            if let Err(e) = sink.write_line(&record.to_csv(time_format)) {
                self.write_failed(sink.kind(), &e);
            }
        }
    }

    /// Print a console-only notice.
    pub fn notice(&self, notice: Notice, message: &str) {
        let time = format_time(&Local::now(), &self.time_format);
        if let Err((kind, e)) = self.console.write(&time, notice.code(), message) {
            self.write_failed(kind, &e);
        }
    }

    /// Records dispatched so far.
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Sink writes that failed so far.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Flush and close every sink. Records written afterwards are counted as
    /// failures.
    pub fn close(&self) {
        for sink in [self.data.as_ref(), self.status.as_ref()].into_iter().flatten() {
            if let Err(e) = sink.close() {
                warn!("Failed to close {} log: {}", sink.kind(), e);
            }
        }
        if let Err(e) = self.console.close() {
            warn!("Failed to close console log: {}", e);
        }
        debug!(
            "Audit logger closed after {} records ({} failed writes)",
            self.records(),
            self.write_failures()
        );
    }

    fn write_failed(&self, kind: SinkKind, error: &std::io::Error) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
        warn!("Failed to write {} log: {}", kind, error);
    }
}

fn open_sink(kind: SinkKind, path: &Path) -> Result<LogSink, StartupError> {
    LogSink::open(kind, path).map_err(|source| StartupError::Sink {
        sink: kind.as_str(),
        path: path.to_path_buf(),
        source,
    })
}
