//! Host seams of the interpreter.
//!
//! The interpreter owns no I/O. It reaches the outside world through three
//! traits supplied at construction:
//!
//! - [`CommandDispatcher`]: runs every line that is not a language statement
//! - [`ScriptSource`]: returns the text of an `import`ed script
//! - [`Reporter`]: shows error and debug lines to the user
//!
//! [`CommandTable`], [`MemoryScriptSource`], [`FsScriptSource`],
//! [`StderrReporter`] and [`BufferedReporter`] are the stock implementations.

pub mod command;
pub mod reporter;
pub mod source;

pub use command::{
    CommandDispatcher, CommandError, CommandResult, CommandTable, LineWriter, MemoryWriter,
    StdoutWriter,
};
pub use reporter::{BufferedReporter, ErrorHandler, Reporter, StderrReporter};
pub use source::{normalize_path, FsScriptSource, MemoryScriptSource, ScriptSource};
