//! # ETX Script
//!
//! An interpreter for ETX script, a small line-oriented scripting language
//! for terminal automation. Scripts set variables, branch, loop, define and
//! call functions, import other scripts and hand every other line to the host
//! as a shell command.
//!
//! ```text
//! set greeting "hello"
//! for i 1 3
//!   echo $greeting $i
//! endfor
//! ```
//!
//! ## Execution Pipeline
//!
//! ```text
//! Source → Lines → Statement Dispatcher → Interpreter ─┬─▶ Expression Evaluator
//!                                                      ├─▶ Variable Store
//!                                                      └─▶ Host (commands, imports)
//! ```
//!
//! - The [`tokenizer`] splits expressions into tokens
//! - The [`eval`] module classifies lines, resolves blocks, evaluates
//!   expressions and runs everything through the [`Interpreter`]
//! - The [`host`] module defines what the interpreter needs from its host:
//!   command dispatch, script sources and error output
//! - The [`event`] module carries structured diagnostics to any number of sinks
//!
//! ## Errors
//!
//! Expression failures are reported and evaluate to `null`. Statement failures
//! abort the script unless a `try` block catches them. A top-level run always
//! returns a [`ScriptOutcome`] rather than an error.

pub mod config;
pub mod error;
pub mod eval;
pub mod event;
pub mod host;
pub mod tokenizer;

// Re-exports
pub use config::{InterpreterConfig, LoggerConfig};
pub use error::{Error, InternalResult, ScriptError, ScriptResult};
pub use eval::context::ContextInfo;
pub use eval::evaluator::{CancelHandle, ExecSignal, Interpreter, ScriptOutcome};
pub use eval::value::Value;
pub use event::{DiagnosticsSink, EventBus, LogLevel, ScriptEvent, ScriptLogger};
