use std::sync::{Arc, Mutex};

use crate::error::ScriptError;

/// Host-supplied error handler. Receives the reported message and the error
/// that produced it; replaces the [`Reporter`] for error output while set.
pub type ErrorHandler = Arc<dyn Fn(&str, &ScriptError) + Send + Sync>;

/// User-visible output channel for error and debug lines.
pub trait Reporter: Send + Sync {
    fn report(&self, message: &str);

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn debug(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Keeps reported lines for later inspection.
#[derive(Debug, Default)]
pub struct BufferedReporter {
    messages: Mutex<Vec<String>>,
    debug_lines: Mutex<Vec<String>>,
}

impl BufferedReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn debug_lines(&self) -> Vec<String> {
        self.debug_lines
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Reporter for BufferedReporter {
    fn report(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    fn debug(&self, message: &str) {
        if let Ok(mut lines) = self.debug_lines.lock() {
            lines.push(message.to_string());
        }
    }
}
