//! Logging construction.
//!
//! No global subscriber is installed. [`build`] produces a [`Logger`] that the
//! binary hands to each component, and [`MemoryLog`] produces one that records
//! events for inspection in tests.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor an explicit level is given.
pub const DEFAULT_FILTER: &str = "winrm_exec=info";

/// Operator-facing logging capability.
///
/// Cloning is cheap; all clones feed the same subscriber.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Wrap an existing dispatcher.
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// A logger that discards every event.
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Run `f` with this logger as the active subscriber.
    ///
    /// Events emitted with the `tracing` macros inside `f` go to this logger.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// Build the operator logger.
///
/// `level` is an `EnvFilter` directive such as `debug` or
/// `winrm_exec=trace`. When `None`, `RUST_LOG` is consulted and
/// [`DEFAULT_FILTER`] is the fallback. Output goes to stderr so that stdout
/// carries only the command output.
pub fn build(level: Option<&str>) -> Logger {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr),
    );

    Logger::new(Dispatch::new(subscriber))
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
}

/// In-memory event recorder.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A logger whose events are recorded here.
    pub fn logger(&self) -> Logger {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        Logger::new(Dispatch::new(subscriber))
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Recorded messages at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }

    /// Whether any record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages_at(level).iter().any(|m| m.contains(needle))
    }
}

impl<S: Subscriber> Layer<S> for MemoryLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level: *event.metadata().level(),
                message: visitor.message,
            });
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_records_levels() {
        let log = MemoryLog::new();
        let logger = log.logger();

        logger.in_scope(|| {
            tracing::info!("connecting");
            tracing::warn!(user = "bob", "local account");
        });

        assert_eq!(log.records().len(), 2);
        assert!(log.contains(Level::WARN, "local account"));
        assert!(!log.contains(Level::WARN, "connecting"));
        assert_eq!(log.messages_at(Level::INFO), vec!["connecting".to_string()]);
    }

    #[test]
    fn test_disabled_logger_drops_events() {
        let logger = Logger::disabled();
        logger.in_scope(|| tracing::error!("nobody hears this"));
    }

    #[test]
    fn test_build_accepts_directives() {
        let logger = build(Some("debug"));
        logger.in_scope(|| tracing::debug!("test debug message"));

        let logger = build(Some("not a [valid directive"));
        logger.in_scope(|| tracing::info!("falls back to default filter"));
    }

    #[test]
    fn test_loggers_are_independent() {
        let first = MemoryLog::new();
        let second = MemoryLog::new();

        first.logger().in_scope(|| tracing::info!("one"));
        second.logger().in_scope(|| tracing::info!("two"));

        assert!(first.contains(Level::INFO, "one"));
        assert!(!first.contains(Level::INFO, "two"));
        assert!(second.contains(Level::INFO, "two"));
    }
}
