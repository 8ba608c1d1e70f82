use chrono::{DateTime, Local};
use seed_core::LogLevel;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

pub const MASTER_LOG_CAP: usize = 500;
pub const CHAT_TRANSCRIPT_CAP: usize = 100;
pub const ENEMY_DEBUG_CAP: usize = 200;
pub const STRATEGY_DEBUG_CAP: usize = 300;

pub trait LogRecord {
    fn level(&self) -> LogLevel;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFilter {
    #[default]
    All,
    Only(LogLevel),
}

impl LogFilter {
    pub fn admits(self, level: LogLevel) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Only(wanted) => wanted == level,
        }
    }

    pub fn next(self) -> Self {
        const CYCLE: [LogLevel; 7] = [
            LogLevel::Info,
            LogLevel::Success,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Code,
            LogLevel::Command,
            LogLevel::Strategy,
        ];
        match self {
            LogFilter::All => LogFilter::Only(CYCLE[0]),
            LogFilter::Only(level) => match CYCLE.iter().position(|item| *item == level) {
                Some(idx) if idx + 1 < CYCLE.len() => LogFilter::Only(CYCLE[idx + 1]),
                _ => LogFilter::All,
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogFilter::All => "all",
            LogFilter::Only(level) => level.as_str(),
        }
    }
}

impl fmt::Display for LogFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogFilter {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        if normalized.is_empty() || normalized == "all" {
            return Ok(LogFilter::All);
        }
        normalized.parse::<LogLevel>().map(LogFilter::Only)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub text: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            text: text.into(),
        }
    }

    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

impl LogRecord for LogEntry {
    fn level(&self) -> LogLevel {
        self.level
    }
}

#[derive(Clone, Debug)]
pub struct Retained<T> {
    pub record: T,
    pub visible: bool,
}

/// Append-only ring buffer. Filtering only flips `visible`; it never drops entries.
#[derive(Clone, Debug)]
pub struct BoundedLog<T> {
    entries: VecDeque<Retained<T>>,
    cap: usize,
    filter: LogFilter,
}

impl<T: LogRecord> BoundedLog<T> {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            entries: VecDeque::with_capacity(cap.min(64)),
            cap,
            filter: LogFilter::All,
        }
    }

    pub fn append(&mut self, record: T) {
        let visible = self.filter.admits(record.level());
        self.entries.push_back(Retained { record, visible });
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    pub fn set_filter(&mut self, filter: LogFilter) {
        self.filter = filter;
        for entry in self.entries.iter_mut() {
            entry.visible = filter.admits(entry.record.level());
        }
    }

    pub fn filter(&self) -> LogFilter {
        self.filter
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Retained<T>> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn records(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.record)
    }

    pub fn visible(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries
            .iter()
            .filter(|entry| entry.visible)
            .map(|entry| &entry.record)
    }

    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.visible).count()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back().map(|entry| &entry.record)
    }
}

impl BoundedLog<LogEntry> {
    pub fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        self.append(LogEntry::new(level, text));
    }
}
