#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use etx_script::{
    host::{BufferedReporter, CommandDispatcher, CommandError, CommandResult, MemoryScriptSource},
    DiagnosticsSink, Interpreter, InterpreterConfig, ScriptOutcome, Value,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Records every dispatched command line. Lines whose first word is `boom`
/// fail with the remaining words as the message.
#[derive(Default)]
pub struct RecordingDispatcher {
    commands: Mutex<Vec<String>>,
}

impl RecordingDispatcher {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandDispatcher for RecordingDispatcher {
    async fn dispatch(&self, command_line: &str) -> CommandResult<()> {
        self.commands.lock().unwrap().push(command_line.to_string());
        match command_line.split_once(' ') {
            Some(("boom", message)) => Err(CommandError::Failed {
                command: "boom".to_string(),
                message: message.to_string(),
            }),
            _ if command_line == "boom" => Err(CommandError::Failed {
                command: "boom".to_string(),
                message: "boom".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

pub struct Harness {
    pub interpreter: Interpreter,
    pub commands: Arc<RecordingDispatcher>,
    pub reporter: Arc<BufferedReporter>,
    pub files: Arc<MemoryScriptSource>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let commands = Arc::new(RecordingDispatcher::default());
        let reporter = Arc::new(BufferedReporter::new());
        let files = Arc::new(MemoryScriptSource::new());
        let interpreter = Interpreter::new(commands.clone())
            .with_reporter(reporter.clone())
            .with_source(files.clone())
            .with_config(config);
        Self {
            interpreter,
            commands,
            reporter,
            files,
        }
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.interpreter = self.interpreter.with_diagnostics(sink);
        self
    }

    pub async fn run(&mut self, script: &str) -> ScriptOutcome {
        self.interpreter
            .execute_script(script, HashMap::new(), "main.etx")
            .await
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.commands()
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        self.interpreter.variable(name).cloned()
    }
}
