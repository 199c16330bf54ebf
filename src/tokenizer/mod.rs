//! # Expression Tokenizer
//!
//! Splits an already `$`-substituted expression into [`token::Token`]s for the
//! shunting-yard pass in [`crate::eval::expression`].
//!
//! The tokenizer is built from small nom parsers, tried in this order:
//!
//! * [`literal`]: numbers, quoted strings, `true`/`false`/`null`
//! * [`symbol`]: operators and parentheses (longest match first)
//! * bare words, optionally prefixed with `$` when a reference was left unresolved
//!
//! Whitespace between tokens is discarded. Any other character is a
//! [`token::TokenizerError`].

pub mod literal;
pub mod symbol;
pub mod token;

pub use token::{tokenize, Token, TokenizerError};
