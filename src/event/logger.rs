//! Session logger for script runs.
//!
//! [`ScriptLogger`] is a [`DiagnosticsSink`] that filters events by level,
//! forwards them to `tracing` tagged with a per-session id, tracks the stack
//! of scripts currently running, and keeps a bounded history of entries.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, error, info, warn};

use super::diagnostics::{DiagnosticsSink, ScriptEvent};
use crate::config::LoggerConfig;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub session_id: String,
    pub script_stack: Vec<String>,
    pub event: ScriptEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggerStats {
    pub session_id: String,
    pub enabled: bool,
    pub level: LogLevel,
    pub stack_depth: usize,
    pub active_scripts: Vec<String>,
}

#[derive(Debug)]
struct ActiveScript {
    path: String,
    started: Instant,
}

#[derive(Debug)]
struct LoggerState {
    enabled: bool,
    level: LogLevel,
    capacity: usize,
    stack: Vec<ActiveScript>,
    history: VecDeque<LogEntry>,
}

#[derive(Debug)]
pub struct ScriptLogger {
    session_id: String,
    state: Mutex<LoggerState>,
}

impl Default for ScriptLogger {
    fn default() -> Self {
        Self::new(&LoggerConfig::default())
    }
}

impl ScriptLogger {
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            session_id: format!("script_{}", uuid::Uuid::new_v4().simple()),
            state: Mutex::new(LoggerState {
                enabled: config.enabled,
                level: config.level,
                capacity: config.history_capacity,
                stack: Vec::new(),
                history: VecDeque::new(),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn enable(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.enabled = true;
        }
        info!(session_id = %self.session_id, "Script logging enabled");
    }

    pub fn disable(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.enabled = false;
        }
        info!(session_id = %self.session_id, "Script logging disabled");
    }

    pub fn set_level(&self, level: LogLevel) {
        if let Ok(mut state) = self.state.lock() {
            state.level = level;
        }
        info!(session_id = %self.session_id, "Log level set to: {}", level);
    }

    pub fn stats(&self) -> LoggerStats {
        let state = self.state.lock();
        match state {
            Ok(state) => LoggerStats {
                session_id: self.session_id.clone(),
                enabled: state.enabled,
                level: state.level,
                stack_depth: state.stack.len(),
                active_scripts: state.stack.iter().map(|s| s.path.clone()).collect(),
            },
            Err(_) => LoggerStats {
                session_id: self.session_id.clone(),
                enabled: false,
                level: LogLevel::default(),
                stack_depth: 0,
                active_scripts: Vec::new(),
            },
        }
    }

    pub fn history(&self) -> Vec<LogEntry> {
        self.state
            .lock()
            .map(|state| state.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_history(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.history.clear();
        }
    }

    fn emit(&self, level: LogLevel, message: &str, stack_depth: usize) {
        let session_id = self.session_id.as_str();
        match level {
            LogLevel::Debug => debug!(session_id, stack_depth, "{}", message),
            LogLevel::Info => info!(session_id, stack_depth, "{}", message),
            LogLevel::Warn => warn!(session_id, stack_depth, "{}", message),
            LogLevel::Error => error!(session_id, stack_depth, "{}", message),
        }
    }
}

impl DiagnosticsSink for ScriptLogger {
    fn record(&self, event: &ScriptEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        // the stack tracks nesting even while output is disabled
        let mut message = event.to_string();
        match event {
            ScriptEvent::ScriptStarted { path, .. } => state.stack.push(ActiveScript {
                path: path.clone(),
                started: Instant::now(),
            }),
            ScriptEvent::ScriptFinished { .. } => {
                if let Some(script) = state.stack.pop() {
                    message = format!(
                        "{} ({:.2}ms)",
                        message,
                        script.started.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            _ => {}
        }

        let level = event.level();
        if !state.enabled || level < state.level {
            return;
        }

        let script_stack: Vec<String> = state.stack.iter().map(|s| s.path.clone()).collect();
        self.emit(level, &message, script_stack.len());

        if state.capacity == 0 {
            return;
        }
        while state.history.len() >= state.capacity {
            state.history.pop_front();
        }
        state.history.push_back(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
            session_id: self.session_id.clone(),
            script_stack,
            event: event.clone(),
        });
    }
}
