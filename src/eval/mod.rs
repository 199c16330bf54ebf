//! Script evaluation.
//!
//! The evaluation system turns raw script lines into executed side effects.
//! Nothing is parsed ahead of time: each line is classified when it is reached
//! and block bodies are located by scanning for their terminators.
//!
//! # Core Components
//!
//! ## Interpreter
//! Runs line ranges, drives `if`/`while`/`for`/`try` blocks, function calls and
//! imports, and reports script-level failures ([`evaluator`]).
//!
//! ## Statement Dispatcher
//! Classifies one trimmed line by its leading keyword or shape ([`statement`]).
//!
//! ## Block Resolver
//! Finds the line that closes a block, skipping nested blocks ([`block`]).
//!
//! ## Expression Evaluator
//! Literal fast paths, `$name` substitution, shunting-yard and postfix
//! evaluation ([`expression`]).
//!
//! ## Execution Context
//! The single variable store, the function registry and the diagnostic call
//! stack of one script run ([`context`], [`store`], [`function`]).
//!
//! # Evaluation Pipeline
//!
//! 1. The source is split into lines
//! 2. Each non-blank, non-comment line is classified into a [`statement::Statement`]
//! 3. Block statements resolve their bodies and recurse into the interpreter
//! 4. `break`/`continue`/`return` unwind as [`evaluator::ExecSignal`] values
//!    until a loop or function call consumes them

pub mod block;
pub mod context;
pub mod evaluator;
pub mod expression;
pub mod function;
pub mod statement;
pub mod store;
pub mod value;
