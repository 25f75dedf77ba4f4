//! Run progress logging.
//!
//! Every entry is printed to stderr, keeping stdout free for the JSON
//! document, and published on a broadcast channel. A caller that subscribes
//! before a run can tally what the run reported with [`LogSummary`].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Entries kept for a subscriber that has not drained its receiver yet
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Marker printed before the message
    pub fn marker(self) -> &'static str {
        match self {
            LogLevel::Info => "",
            LogLevel::Success => "✓",
            LogLevel::Warning => "⚠️",
            LogLevel::Error => "❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth below the step that produced the entry
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Line written to stderr for this entry
    pub fn render(&self) -> String {
        let pad = "   ".repeat(self.indent as usize + 1);
        match self.level.marker() {
            "" => format!("{}{}", pad, self.message),
            marker => format!("{}{} {}", pad, marker, self.message),
        }
    }
}

/// Process-wide broadcaster used by the `log_*` helpers
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn log(&self, entry: LogEntry) {
        eprintln!("{}", entry.render());
        // Sending fails only when nobody subscribed
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Warning and error counts of the entries seen by one receiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub warnings: usize,
    pub errors: usize,
    /// Entries dropped because the receiver fell behind
    pub missed: u64,
}

impl LogSummary {
    /// Drain everything currently queued on `receiver`.
    pub fn collect(receiver: &mut broadcast::Receiver<LogEntry>) -> Self {
        let mut summary = Self::default();
        loop {
            match receiver.try_recv() {
                Ok(entry) => summary.record(&entry),
                Err(TryRecvError::Lagged(skipped)) => summary.missed += skipped,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        summary
    }

    fn record(&mut self, entry: &LogEntry) {
        match entry.level {
            LogLevel::Warning => self.warnings += 1,
            LogLevel::Error => self.errors += 1,
            LogLevel::Info | LogLevel::Success => {}
        }
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markers_and_indent() {
        assert_eq!(LogEntry::new(LogLevel::Info, "Rows: 3").render(), "   Rows: 3");
        assert_eq!(
            LogEntry::new(LogLevel::Success, "done").render(),
            "   ✓ done"
        );
        assert_eq!(
            LogEntry::new(LogLevel::Info, "pagamentos: 2 instances")
                .with_indent(1)
                .render(),
            "      pagamentos: 2 instances"
        );
    }

    #[test]
    fn test_summary_counts_warnings_and_errors() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::new(LogLevel::Info, "Reading ofertas.csv"));
        broadcaster.log(LogEntry::new(LogLevel::Warning, "2 columns are not read"));
        broadcaster.log(LogEntry::new(LogLevel::Warning, "observacao").with_indent(1));
        broadcaster.log(LogEntry::new(LogLevel::Error, "Table 'offers' not found"));

        let summary = LogSummary::collect(&mut rx);
        assert_eq!(summary.warnings, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.missed, 0);
        assert_eq!(LogSummary::collect(&mut rx), LogSummary::default());
    }

    #[test]
    fn test_summary_after_lagging() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        for i in 0..CHANNEL_CAPACITY + 4 {
            broadcaster.log(LogEntry::new(LogLevel::Warning, format!("row {}", i)));
        }

        let summary = LogSummary::collect(&mut rx);
        assert_eq!(summary.missed, 4);
        assert_eq!(summary.warnings, CHANNEL_CAPACITY);
    }

    #[test]
    fn test_log_without_subscribers() {
        LogBroadcaster::default().log(LogEntry::new(LogLevel::Info, "nobody listening"));
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(LogEntry::new(LogLevel::Success, "done")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "done");
        assert_eq!(json["indent"], 0);
    }
}
