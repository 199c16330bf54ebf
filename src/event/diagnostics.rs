use core::fmt;

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use super::logger::LogLevel;
use crate::eval::value::Value;

/// Kind of a control-flow decision recorded in [`ScriptEvent::ControlFlow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ControlFlowKind {
    If,
    Elif,
    Else,
    While,
    For,
    Break,
    Continue,
    Return,
    Catch,
}

/// Structured record of one interpreter step.
#[derive(Debug, Clone, PartialEq, Serialize, IntoStaticStr)]
#[serde(tag = "event", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScriptEvent {
    ScriptStarted {
        path: String,
        line_count: usize,
        depth: usize,
    },
    ScriptFinished {
        path: String,
        success: bool,
        duration_ms: f64,
    },
    LineExecuted {
        line: usize,
        text: String,
    },
    CommandDispatched {
        command: String,
    },
    VariableSet {
        name: String,
        value: Value,
        old_value: Option<Value>,
    },
    VariableUnset {
        name: String,
    },
    FunctionDefined {
        name: String,
        params: Vec<String>,
    },
    FunctionCalled {
        name: String,
        arguments: Vec<Value>,
        depth: usize,
    },
    FunctionReturned {
        name: String,
        value: Value,
    },
    ControlFlow {
        kind: ControlFlowKind,
        condition: Option<String>,
        result: Option<bool>,
    },
    Import {
        path: String,
        success: bool,
    },
    Error {
        message: String,
        line: Option<usize>,
    },
}

impl ScriptEvent {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn level(&self) -> LogLevel {
        match self {
            ScriptEvent::ScriptStarted { .. } | ScriptEvent::Import { .. } => LogLevel::Info,
            ScriptEvent::ScriptFinished { success, .. } => {
                if *success {
                    LogLevel::Info
                } else {
                    LogLevel::Error
                }
            }
            ScriptEvent::Error { .. } => LogLevel::Error,
            _ => LogLevel::Debug,
        }
    }
}

impl fmt::Display for ScriptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptEvent::ScriptStarted { path, .. } => {
                write!(f, "Starting script execution: {}", path)
            }
            ScriptEvent::ScriptFinished { path, success, .. } => write!(
                f,
                "Script execution {}: {}",
                if *success { "completed" } else { "failed" },
                path
            ),
            ScriptEvent::LineExecuted { line, text } => {
                write!(f, "Executing line {}: {}", line, text)
            }
            ScriptEvent::CommandDispatched { command } => {
                write!(f, "Executing command: {}", command)
            }
            ScriptEvent::VariableSet { name, .. } => write!(f, "Variable set: {}", name),
            ScriptEvent::VariableUnset { name } => write!(f, "Variable unset: {}", name),
            ScriptEvent::FunctionDefined { name, .. } => write!(f, "Function define: {}", name),
            ScriptEvent::FunctionCalled { name, .. } => write!(f, "Function call: {}", name),
            ScriptEvent::FunctionReturned { name, .. } => write!(f, "Function return: {}", name),
            ScriptEvent::ControlFlow { kind, .. } => write!(f, "Control flow: {}", kind),
            ScriptEvent::Import { path, success } => write!(
                f,
                "Import {}: {}",
                if *success { "successful" } else { "failed" },
                path
            ),
            ScriptEvent::Error { message, .. } => write!(f, "Script error: {}", message),
        }
    }
}

/// Consumer of interpreter events. Recording must not fail or block.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: &ScriptEvent);
}
