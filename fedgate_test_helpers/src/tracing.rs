//! Utilities for testing tracing
use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{
    Event, Level, Metadata,
    field::Field,
    span::{Attributes, Id, Record},
    subscriber::{DefaultGuard, Interest, Subscriber},
};

/// Captures tracing `Event`s of the current thread as strings, so tests can verify what is
/// logged.
///
/// Upon creation it registers itself as the thread's default subscriber; the previous one is
/// restored on drop. Each event is rendered as `level = INFO; field = value; ...`, with the
/// message under the `message` field.
#[derive(Debug)]
pub struct TracingCapture {
    logs: Arc<Mutex<Vec<String>>>,
    #[allow(dead_code)]
    guard: DefaultGuard,
}

impl TracingCapture {
    /// Capture events of all levels.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_max_level(Level::TRACE)
    }

    /// Capture events up to (and including) `max_level` verbosity; more verbose events are
    /// disabled.
    pub fn with_max_level(max_level: Level) -> Self {
        let logs = Arc::new(Mutex::new(Vec::new()));

        let subscriber = TracingCaptureSubscriber {
            logs: Arc::clone(&logs),
            max_level,
        };

        // uninstalled when the guard is dropped
        let guard = tracing::subscriber::set_default(subscriber);

        Self { logs, guard }
    }

    /// Captured events, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.logs.lock().clone()
    }
}

impl fmt::Display for TracingCapture {
    /// Retrieves the contents of all captured events as a string
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let logs = self.logs.lock();
        write!(f, "{}", logs.join("\n"))
    }
}

struct TracingCaptureSubscriber {
    logs: Arc<Mutex<Vec<String>>>,
    max_level: Level,
}

impl Subscriber for TracingCaptureSubscriber {
    // callsite interest is cached process-wide, so let `enabled` decide per event
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= &self.max_level
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut v = StringVisitor {
            string: String::new(),
        };
        v.record_kv("level", &event.metadata().level().to_string());
        event.record(&mut v);
        self.logs.lock().push(v.string);
    }

    fn enter(&self, _span: &Id) {}
    fn exit(&self, _span: &Id) {}
}

struct StringVisitor {
    string: String,
}

impl StringVisitor {
    fn record_kv(&mut self, key: &str, value: &str) {
        use std::fmt::Write;
        write!(self.string, "{key} = {value}; ").expect("writing to a String cannot fail");
    }
}

impl tracing::field::Visit for StringVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_kv(field.name(), &format!("{value:?}"))
    }
}
