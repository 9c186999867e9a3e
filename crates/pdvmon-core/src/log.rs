//! Per-slot log entries shown in each quadrant.
//!
//! Entries carry their own timestamp so the presentation layer never has
//! to format time itself. Terminal data lines keep the raw text; the
//! [`Highlight`] classification lets renderers emphasise receipt markers.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Severity/category of a slot log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Error,
    Alert,
    /// Raw event line forwarded from the terminal.
    Data,
}

impl LogLevel {
    /// Tag used when rendering the entry.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
            Self::Alert => "ALERT",
            Self::Data => "DATA",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Receipt markers worth emphasising in terminal data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Highlight {
    Plain,
    Total,
    DrawerOpen,
    Report,
    NewSale,
    Payment,
    Discount,
}

/// Marker text searched for in data lines, in priority order.
const HIGHLIGHT_MARKERS: &[(&str, Highlight)] = &[
    ("TOTAL R$:", Highlight::Total),
    ("ABERTURA DE GAVETA", Highlight::DrawerOpen),
    ("RELATÓRIO GERENCIAL", Highlight::Report),
    ("NOVA VENDA", Highlight::NewSale),
    ("PAGAMENTO", Highlight::Payment),
    ("DESCONTO", Highlight::Discount),
];

/// One line in a slot's log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub text: String,
}

impl LogEntry {
    /// Creates an entry stamped with the current local time.
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self::at(Local::now(), level, text)
    }

    /// Creates an entry with an explicit timestamp.
    pub fn at(timestamp: DateTime<Local>, level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, text)
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Alert, text)
    }

    pub fn data(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Data, text)
    }

    /// `HH:MM:SS` of the entry's timestamp.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// Renders the entry as a single display line.
    ///
    /// Data lines render as `[HH:MM:SS] text`; everything else as
    /// `[HH:MM:SS] [LEVEL] text`.
    pub fn render(&self) -> String {
        match self.level {
            LogLevel::Data => format!("[{}] {}", self.time_label(), self.text),
            level => format!("[{}] [{}] {}", self.time_label(), level, self.text),
        }
    }

    /// Classifies the entry for emphasis. Only data lines are highlighted.
    pub fn highlight(&self) -> Highlight {
        if self.level != LogLevel::Data {
            return Highlight::Plain;
        }
        HIGHLIGHT_MARKERS
            .iter()
            .find(|(marker, _)| self.text.contains(marker))
            .map(|(_, highlight)| *highlight)
            .unwrap_or(Highlight::Plain)
    }
}
