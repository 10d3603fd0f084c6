//! Injected logging collaborator.
//!
//! Each codec instance carries a [`Logger`]; a default logger has no sink and
//! every call is a no-op.  Hosts that want the `log` facade install
//! [`FacadeSink`].

use std::fmt;
use std::sync::Arc;

pub use log::Level;

pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Forwards every message to the `log` crate under the `isoplug` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "isoplug", level, "{message}");
    }
}

#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<Arc<dyn LogSink>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("enabled", &self.sink.is_some()).finish()
    }
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Logger that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Shorthand for a logger backed by [`FacadeSink`].
    pub fn facade() -> Self {
        Self::new(Arc::new(FacadeSink))
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if let Some(sink) = &self.sink {
            sink.log(level, &args.to_string());
        }
    }

    pub fn error(&self, args: fmt::Arguments<'_>) { self.log(Level::Error, args) }
    pub fn debug(&self, args: fmt::Arguments<'_>) { self.log(Level::Debug, args) }
    pub fn trace(&self, args: fmt::Arguments<'_>) { self.log(Level::Trace, args) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<(Level, String)>>);

    impl LogSink for Capture {
        fn log(&self, level: Level, message: &str) {
            self.0.lock().unwrap().push((level, message.to_owned()));
        }
    }

    #[test]
    fn disabled_logger_is_silent() {
        Logger::disabled().error(format_args!("nobody hears this"));
    }

    #[test]
    fn sink_receives_formatted_messages() {
        let cap = Arc::new(Capture::default());
        let logger = Logger::new(cap.clone());
        logger.debug(format_args!("opened {} bytes", 2048));
        let got = cap.0.lock().unwrap();
        assert_eq!(got.as_slice(), &[(Level::Debug, "opened 2048 bytes".to_owned())]);
    }
}
