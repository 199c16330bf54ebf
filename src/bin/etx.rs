use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use etx_script::{
    host::{CommandTable, FsScriptSource, StderrReporter, StdoutWriter},
    Error, InternalResult, InterpreterConfig, Interpreter, ScriptLogger, Value,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Run an ETX script", long_about = None)]
struct Cli {
    /// Script to run
    script: PathBuf,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print each line before it runs
    #[arg(short, long)]
    debug: bool,

    /// Initial variable as NAME=VALUE; VALUE is read as JSON, falling back to a string
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_variable)]
    variables: Vec<(String, Value)>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

fn parse_variable(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", raw));
    }
    let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::from(value));
    Ok((name.to_string(), value))
}

async fn run(cli: &Cli) -> InternalResult<bool> {
    let mut config = match &cli.config {
        Some(path) => InterpreterConfig::from_file(path)?,
        None => InterpreterConfig::default(),
    };
    if cli.debug {
        config.debug_mode = true;
    }
    debug!("config: {:?}", config);

    let source = tokio::fs::read_to_string(&cli.script).await?;
    let root = cli
        .script
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let logger = Arc::new(ScriptLogger::new(&config.logger));
    info!(session_id = logger.session_id(), "running {}", cli.script.display());

    let mut interpreter = Interpreter::new(Arc::new(CommandTable::with_builtins(Arc::new(
        StdoutWriter,
    ))))
    .with_source(Arc::new(FsScriptSource::new(root)))
    .with_reporter(Arc::new(StderrReporter))
    .with_diagnostics(logger)
    .with_config(config);

    let cancel = interpreter.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let variables: HashMap<String, Value> = cli.variables.iter().cloned().collect();
    let outcome = interpreter
        .execute_script(&source, variables, &cli.script.display().to_string())
        .await;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| Error::internal(format!("Failed to serialize outcome: {}", e)))?;
        println!("{}", json);
    } else if let Some(value) = &outcome.return_value {
        println!("{}", value);
    }

    Ok(outcome.success)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
