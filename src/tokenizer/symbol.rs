//! # Operator Symbols
//!
//! The fixed operator set of the expression language and its precedence table.
//! Operators are matched longest first so that `<=` is never read as `<` `=`.

use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::{map, value},
    error::context,
};
use strum_macros::{AsRefStr, Display, EnumString};

use super::token::{ParserResult, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
pub enum Operator {
    #[strum(serialize = "?")]
    Question,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "==")]
    EqualEqual,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "!")]
    Not,
    /// Unary minus. Never produced by the tokenizer; the evaluator rewrites a
    /// `-` found in operand position into this.
    #[strum(serialize = "neg")]
    Negate,
}

impl Operator {
    /// Binding strength, low to high.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Question | Operator::Colon => 1,
            Operator::Or => 2,
            Operator::And => 3,
            Operator::EqualEqual | Operator::NotEqual => 4,
            Operator::Less | Operator::Greater | Operator::LessEqual | Operator::GreaterEqual => 5,
            Operator::Plus | Operator::Minus => 6,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 7,
            Operator::Not | Operator::Negate => 8,
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Operator::Not | Operator::Negate)
    }
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_operator(input: &str) -> ParserResult<'_, Token> {
    context(
        "operator",
        map(
            alt((
                value(Operator::EqualEqual, tag("==")),
                value(Operator::NotEqual, tag("!=")),
                value(Operator::LessEqual, tag("<=")),
                value(Operator::GreaterEqual, tag(">=")),
                value(Operator::And, tag("&&")),
                value(Operator::Or, tag("||")),
                value(Operator::Less, tag("<")),
                value(Operator::Greater, tag(">")),
                value(Operator::Plus, tag("+")),
                value(Operator::Minus, tag("-")),
                value(Operator::Multiply, tag("*")),
                value(Operator::Divide, tag("/")),
                value(Operator::Modulo, tag("%")),
                value(Operator::Not, tag("!")),
                value(Operator::Question, tag("?")),
                value(Operator::Colon, tag(":")),
            )),
            Token::Operator,
        ),
    )(input)
}

pub fn parse_paren(input: &str) -> ParserResult<'_, Token> {
    context(
        "parenthesis",
        alt((
            value(Token::OpenParen, tag("(")),
            value(Token::CloseParen, tag(")")),
        )),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        let test_cases = [
            ("==", Operator::EqualEqual),
            ("!=", Operator::NotEqual),
            ("<=", Operator::LessEqual),
            (">=", Operator::GreaterEqual),
            ("&&", Operator::And),
            ("||", Operator::Or),
            ("%", Operator::Modulo),
            ("?", Operator::Question),
        ];

        for (input, expected) in test_cases.iter() {
            let (rest, token) = parse_operator(input).unwrap();
            assert_eq!(token, Token::Operator(*expected));
            assert_eq!(rest, "");
        }
    }

    #[test]
    fn test_longest_match() {
        let (rest, token) = parse_operator(">=1").unwrap();
        assert_eq!(token, Token::Operator(Operator::GreaterEqual));
        assert_eq!(rest, "1");
    }

    #[test]
    fn test_precedence_order() {
        assert!(Operator::Question.precedence() < Operator::Or.precedence());
        assert!(Operator::Or.precedence() < Operator::And.precedence());
        assert!(Operator::And.precedence() < Operator::EqualEqual.precedence());
        assert!(Operator::EqualEqual.precedence() < Operator::Less.precedence());
        assert!(Operator::Less.precedence() < Operator::Plus.precedence());
        assert!(Operator::Plus.precedence() < Operator::Modulo.precedence());
        assert!(Operator::Modulo.precedence() < Operator::Not.precedence());
    }

    #[test]
    fn test_display_round_trips_symbol() {
        assert_eq!(Operator::LessEqual.to_string(), "<=");
        assert_eq!("&&".parse::<Operator>().unwrap(), Operator::And);
    }
}
