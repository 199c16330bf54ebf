//! # Script Diagnostics
//!
//! The interpreter describes what it does as a stream of [`ScriptEvent`]s:
//! scripts starting and finishing, lines executed, variables set, functions
//! called, control-flow decisions, imports and errors.
//!
//! Events go to every attached [`DiagnosticsSink`]. Two sinks ship with the
//! crate:
//!
//! - [`EventBus`]: broadcasts events to any number of async subscribers
//! - [`ScriptLogger`]: level-filtered `tracing` output with a session id,
//!   an active-script stack and a bounded history
//!
//! ```text
//! ┌───────────┐     ┌───────────────┐     ┌────────────┐
//! │Interpreter│────▶│DiagnosticsSink│────▶│ subscriber │
//! └───────────┘     └───────────────┘     └────────────┘
//! ```
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use etx_script::event::EventBus;
//! # async fn example() {
//! let bus = Arc::new(EventBus::new(64));
//! let mut rx = bus.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         println!("{}", event);
//!     }
//! });
//! # }
//! ```

pub mod diagnostics;
pub mod event_bus;
pub mod logger;

pub use diagnostics::{ControlFlowKind, DiagnosticsSink, ScriptEvent};
pub use event_bus::{EventBus, EventError, EventReceiver};
pub use logger::{LogEntry, LogLevel, LoggerStats, ScriptLogger};
