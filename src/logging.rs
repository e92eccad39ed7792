/// Structured logging for the basin risk service
///
/// Provides context-rich logging with data-source tags and an optional
/// subject (tile name, dataset path, operation), timestamps, and severity
/// levels. Supports both console output and file-based logging.

use crate::model::WeatherError;
use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl LogLevel {
    /// Parse a level name from configuration; unknown names map to Info.
    pub fn from_name(name: &str) -> LogLevel {
        match name.trim().to_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Weather,
    Terrain,
    Registry,
    Model,
    Engine,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Weather => write!(f, "WEATHER"),
            DataSource::Terrain => write!(f, "TERRAIN"),
            DataSource::Registry => write!(f, "REGISTRY"),
            DataSource::Model => write!(f, "MODEL"),
            DataSource::Engine => write!(f, "ENGINE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Routine upstream hiccup; default values cover it
    Expected,
    /// Points at an upstream API change or a bad request
    Unexpected,
    /// Cannot tell which
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    min_level: LogLevel,
    /// Every entry at or above `min_level` is appended here as well.
    log_file: Option<String>,
    /// Full timestamped entries on the console instead of the compact form.
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut guard) = LOGGER.lock() {
            *guard = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, source: &DataSource, subject: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = format_entry(level, source, subject, message);
        let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();

        // Console output goes to stderr so JSON on stdout stays clean
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, subject_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, subject_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

/// Render one log line: `<timestamp> <LEVEL> <SOURCE> [subject]: message`.
fn format_entry(level: LogLevel, source: &DataSource, subject: Option<&str>, message: &str) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("{} {} {}{}: {}", timestamp, level, source, subject_part, message)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, source: DataSource, subject: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &source, subject, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, source, subject, message);
}

/// Log a warning message
pub fn warn(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, source, subject, message);
}

/// Log an error message
pub fn error(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, source, subject, message);
}

/// Log a debug message
pub fn debug(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, source, subject, message);
}

// ---------------------------------------------------------------------------
// Weather Failures
// ---------------------------------------------------------------------------

impl FailureType {
    /// Transport drops and upstream 5xx are routine for a 2-second budget and
    /// are covered by defaults. Client errors and unreadable bodies mean the
    /// request or the upstream schema changed.
    pub fn of_weather(err: &WeatherError) -> FailureType {
        match err {
            WeatherError::Transport(_) => FailureType::Expected,
            WeatherError::HttpError(code) if *code >= 500 => FailureType::Expected,
            WeatherError::HttpError(_) | WeatherError::ParseError(_) => FailureType::Unexpected,
            WeatherError::MissingField(_) => FailureType::Unknown,
        }
    }
}

/// Log a weather fetch failure at a severity matching its classification.
pub fn log_weather_failure(operation: &str, err: &WeatherError) {
    let failure_type = FailureType::of_weather(err);
    let message = format!("{} failed [{}]: {}; using default weather values", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(DataSource::Weather, Some(operation), &message),
        FailureType::Unexpected => error(DataSource::Weather, Some(operation), &message),
        FailureType::Unknown => warn(DataSource::Weather, Some(operation), &message),
    }
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a reference dataset load
pub fn log_load_summary(source: DataSource, what: &str, loaded: usize, skipped: usize) {
    let message = format!("Loaded {} {} ({} skipped)", loaded, what, skipped);

    if loaded == 0 || skipped > 0 {
        warn(source, None, &message);
    } else {
        info(source, None, &message);
    }
}
