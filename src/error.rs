use thiserror::Error;

use crate::config::ConfigError;
use crate::eval::expression::ExpressionError;
use crate::eval::store::StoreError;
use crate::host::command::CommandError;

/// Failure raised while executing script lines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Function '{0}' is not defined")]
    UndefinedFunction(String),
    #[error("Cannot import file: {0}")]
    ImportNotFound(String),
    #[error("Import of '{path}' failed: {source}")]
    ImportFailed {
        path: String,
        source: Box<ScriptError>,
    },
    #[error("Import depth limit ({limit}) exceeded at '{path}'")]
    ImportDepthExceeded { path: String, limit: usize },
    #[error("Call depth limit ({limit}) exceeded calling '{function}'")]
    CallDepthExceeded { function: String, limit: usize },
    #[error("Nesting depth limit ({limit}) exceeded")]
    NestingDepthExceeded { limit: usize },
    #[error("Invalid statement '{statement}': {message}")]
    InvalidStatement { statement: String, message: String },
    #[error("Invalid index '{index}' for '{name}'")]
    InvalidIndex { name: String, index: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
    #[error("Script execution cancelled")]
    Cancelled,
    #[error("line {line} ({text}): {source}")]
    Line {
        line: usize,
        text: String,
        source: Box<ScriptError>,
    },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

impl ScriptError {
    /// The error without its line-context wrappers.
    pub fn root(&self) -> &ScriptError {
        match self {
            ScriptError::Line { source, .. } => source.root(),
            other => other,
        }
    }

    /// Line number of the innermost line context, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::Line { line, source, .. } => source.line().or(Some(*line)),
            _ => None,
        }
    }

    /// `try` blocks catch everything except cancellation.
    pub fn is_recoverable(&self) -> bool {
        match self.root() {
            ScriptError::Cancelled => false,
            ScriptError::ImportFailed { source, .. } => source.is_recoverable(),
            _ => true,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
