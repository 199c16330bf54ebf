use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("{message}")]
    Failed { command: String, message: String },
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Receives every line that is not a language statement, after variable
/// substitution. Completion of the returned future is completion of the line.
#[mockall::automock]
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn dispatch(&self, command_line: &str) -> CommandResult<()>;
}

/// Output target for commands that print.
pub trait LineWriter: Send + Sync {
    fn write_line(&self, line: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutWriter;

impl LineWriter for StdoutWriter {
    fn write_line(&self, line: &str) {
        println!("{}", line);
    }
}

/// Collects written lines in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    lines: Mutex<Vec<String>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LineWriter for MemoryWriter {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

type CommandHandler = Box<dyn Fn(Vec<String>) -> BoxFuture<'static, CommandResult<()>> + Send + Sync>;

/// Name → handler table. The first whitespace-separated word of a command line
/// selects the handler; the remaining words are its arguments.
#[derive(Default)]
pub struct CommandTable {
    handlers: DashMap<String, CommandHandler>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with `echo`, `sleep` and `fail` registered.
    ///
    /// * `echo WORDS...` writes the words joined by single spaces
    /// * `sleep MS` waits for the given number of milliseconds
    /// * `fail MESSAGE...` fails with the message
    pub fn with_builtins(writer: Arc<dyn LineWriter>) -> Self {
        let table = Self::new();

        table.register("echo", move |args| {
            let writer = writer.clone();
            async move {
                writer.write_line(&args.join(" "));
                Ok(())
            }
        });

        table.register("sleep", |args| async move {
            let millis = args
                .first()
                .and_then(|arg| arg.parse::<f64>().ok())
                .filter(|ms| ms.is_finite() && *ms >= 0.0);
            match millis {
                Some(millis) => {
                    tokio::time::sleep(Duration::from_millis(millis as u64)).await;
                    Ok(())
                }
                None => Err(CommandError::Failed {
                    command: "sleep".to_string(),
                    message: format!("sleep: invalid duration '{}'", args.join(" ")),
                }),
            }
        });

        table.register("fail", |args| async move {
            Err(CommandError::Failed {
                command: "fail".to_string(),
                message: args.join(" "),
            })
        });

        table
    }

    pub fn register<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult<()>> + Send + 'static,
    {
        self.handlers
            .insert(name.into(), Box::new(move |args| Box::pin(handler(args))));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl CommandDispatcher for CommandTable {
    async fn dispatch(&self, command_line: &str) -> CommandResult<()> {
        let mut words = command_line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(());
        };
        let args: Vec<String> = words.map(str::to_string).collect();

        // the map guard must not be held across the await
        let future = {
            let handler = self
                .handlers
                .get(name)
                .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
            (handler.value())(args)
        };
        debug!(command = name, "dispatching command");
        future.await
    }
}
