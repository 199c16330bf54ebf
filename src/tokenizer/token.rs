use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{map, opt, recognize},
    error::{context, VerboseError},
    sequence::pair,
    IResult,
};
use thiserror::Error;

use super::{
    literal::parse_literal,
    symbol::{parse_operator, parse_paren, Operator},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Boolean(bool),
    Null,
    /// A bare identifier, resolved against the variable store at evaluation
    /// time. Keeps a leading `$` when it came from an unresolved reference.
    Word(String),
    Operator(Operator),
    OpenParen,
    CloseParen,
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenizerError {
    #[error("unexpected input at column {column}: {found}")]
    Unexpected { column: usize, found: String },
}

pub type TokenizerResult<T> = Result<T, TokenizerError>;

#[tracing::instrument(level = "trace", skip(input))]
fn parse_word(input: &str) -> ParserResult<'_, Token> {
    context(
        "word",
        map(
            recognize(pair(
                opt(char('$')),
                take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            )),
            |word: &str| Token::Word(word.to_string()),
        ),
    )(input)
}

/// Tokenizes a whole expression. Fails on the first character no parser accepts.
#[tracing::instrument(level = "debug")]
pub fn tokenize(input: &str) -> TokenizerResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut remaining = input.trim_start();

    while !remaining.is_empty() {
        match alt((parse_literal, parse_operator, parse_paren, parse_word))(remaining) {
            Ok((rest, token)) => {
                tokens.push(token);
                remaining = rest.trim_start();
            }
            Err(_) => {
                let error = TokenizerError::Unexpected {
                    column: input.len() - remaining.len() + 1,
                    found: remaining.chars().take(20).collect(),
                };
                tracing::debug!("{}", error);
                return Err(error);
            }
        }
    }

    Ok(tokens)
}
