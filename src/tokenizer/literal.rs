use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case},
    character::complete::{char, digit0, digit1, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, value},
    error::context,
    sequence::{delimited, pair, terminated},
};

use super::token::{ParserResult, Token};

fn escape_sequence(input: &str) -> ParserResult<'_, &str> {
    alt((
        value("\\", tag("\\")),
        value("\"", tag("\"")),
        value("'", tag("'")),
        value("\n", tag("n")),
        value("\t", tag("t")),
        value("\r", tag("r")),
    ))(input)
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_double_quoted(input: &str) -> ParserResult<'_, String> {
    context(
        "double quoted string",
        delimited(
            char('"'),
            map(
                opt(escaped_transform(is_not("\\\""), '\\', escape_sequence)),
                Option::unwrap_or_default,
            ),
            char('"'),
        ),
    )(input)
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_single_quoted(input: &str) -> ParserResult<'_, String> {
    context(
        "single quoted string",
        delimited(
            char('\''),
            map(
                opt(escaped_transform(is_not("\\'"), '\\', escape_sequence)),
                Option::unwrap_or_default,
            ),
            char('\''),
        ),
    )(input)
}

/// Parses a quoted string literal, honoring `\\`, `\"`, `\'`, `\n`, `\t` and `\r`.
pub fn parse_quoted(input: &str) -> ParserResult<'_, String> {
    context("string literal", alt((parse_double_quoted, parse_single_quoted)))(input)
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_number(input: &str) -> ParserResult<'_, Token> {
    context(
        "number literal",
        map_res(
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            |s: &str| s.parse::<f64>().map(Token::Number),
        ),
    )(input)
}

fn word_boundary(input: &str) -> ParserResult<'_, ()> {
    not(peek(satisfy(|c: char| c.is_alphanumeric() || c == '_')))(input)
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_keyword_literal(input: &str) -> ParserResult<'_, Token> {
    context(
        "keyword literal",
        alt((
            value(Token::Boolean(true), terminated(tag_no_case("true"), word_boundary)),
            value(Token::Boolean(false), terminated(tag_no_case("false"), word_boundary)),
            value(Token::Null, terminated(tag_no_case("null"), word_boundary)),
        )),
    )(input)
}

pub fn parse_literal(input: &str) -> ParserResult<'_, Token> {
    context(
        "literal",
        alt((
            map(parse_quoted, Token::Str),
            parse_number,
            parse_keyword_literal,
        )),
    )(input)
}
