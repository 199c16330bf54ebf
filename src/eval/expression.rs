//! Expression evaluation.
//!
//! An expression goes through three stages:
//!
//! 1. literal fast paths (number, quoted string, `[a, b]` list, `true`/`false`/`null`)
//! 2. `$name` / `$name[index]` substitution against the [`VariableStore`]
//! 3. tokenizing, shunting-yard conversion to postfix, and stack evaluation
//!
//! Bare words left after substitution are looked up in the store as well; a
//! word that names no variable evaluates to itself as a string.
//!
//! `&&` and `||` are not short-circuiting: both operands have been evaluated by
//! the time the operator is applied, and the operator yields whichever operand
//! decided the result.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::store::VariableStore;
use super::value::Value;
use crate::tokenizer::{
    literal::parse_quoted,
    symbol::Operator,
    token::{tokenize, Token, TokenizerError},
};

lazy_static! {
    static ref VARIABLE_REFERENCE: Regex =
        Regex::new(r"\$(\w+)(?:\[([^\]]+)\])?").expect("variable reference pattern");
    static ref WHOLE_REFERENCE: Regex =
        Regex::new(r"^\$(\w+)(?:\[([^\]]+)\])?$").expect("whole reference pattern");
    static ref NUMERIC_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("numeric literal pattern");
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("{0}")]
    Tokenizer(#[from] TokenizerError),
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("operator '{0}' is missing an operand")]
    MissingOperand(Operator),
    #[error("'?' without a matching ':'")]
    UnterminatedConditional,
    #[error("':' without a matching '?'")]
    UnexpectedColon,
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Entry on the postfix evaluation stack. `Branches` is the pair built by `:`
/// and consumed by `?`.
#[derive(Debug)]
enum Operand {
    Value(Value),
    Branches(Value, Value),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `expression` against `store`. The store is only read, so the
    /// same input and store always give the same result.
    #[tracing::instrument(level = "trace", skip(self, store))]
    pub fn evaluate(&self, expression: &str, store: &VariableStore) -> ExpressionResult<Value> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(Value::Null);
        }
        if let Some(value) = parse_number(expression) {
            return Ok(value);
        }
        if let Some(text) = parse_string(expression) {
            return Ok(Value::String(text));
        }
        if let Some(body) = array_body(expression) {
            return self.evaluate_array(body, store);
        }
        if let Some(value) = parse_keyword(expression) {
            return Ok(value);
        }
        if let Some(value) = self.whole_reference(expression, store)? {
            return Ok(value);
        }

        let mut failure = None;
        let substituted = self.substitute_with(expression, store, |_, error| {
            failure.get_or_insert_with(|| error.clone());
        });
        if let Some(error) = failure {
            return Err(error);
        }
        if let Some(value) = parse_number(&substituted).or_else(|| parse_keyword(&substituted)) {
            return Ok(value);
        }

        let tokens = tokenize(&substituted)?;
        let postfix = to_postfix(tokens)?;
        evaluate_postfix(postfix, store)
    }

    /// Replaces every bound `$name` / `$name[index]` with the value's text.
    /// Unbound references are left exactly as written.
    pub fn substitute(&self, text: &str, store: &VariableStore) -> String {
        self.substitute_with(text, store, |index, error| {
            debug!(index, %error, "index did not evaluate");
        })
    }

    /// Like [`substitute`](Self::substitute), handing each index that fails to
    /// evaluate to `on_error`. Such a reference substitutes as empty text.
    pub fn substitute_with<F>(&self, text: &str, store: &VariableStore, mut on_error: F) -> String
    where
        F: FnMut(&str, &ExpressionError),
    {
        let mut output = String::with_capacity(text.len());
        let mut last = 0;

        for captures in VARIABLE_REFERENCE.captures_iter(text) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&text[last..whole.start()]);
            let index = captures.get(2).map(|m| m.as_str());
            match self.lookup(name.as_str(), index, store) {
                Ok(Some(Value::Null)) if index.is_some() => {}
                Ok(Some(value)) => output.push_str(&value.to_string()),
                Ok(None) => output.push_str(whole.as_str()),
                Err(error) => on_error(index.unwrap_or_default(), &error),
            }
            last = whole.end();
        }
        output.push_str(&text[last..]);

        output
    }

    fn evaluate_array(&self, body: &str, store: &VariableStore) -> ExpressionResult<Value> {
        if body.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        split_top_level(body)
            .into_iter()
            .map(|item| self.evaluate(item, store))
            .collect::<ExpressionResult<Vec<_>>>()
            .map(Value::Array)
    }

    fn whole_reference(
        &self,
        expression: &str,
        store: &VariableStore,
    ) -> ExpressionResult<Option<Value>> {
        let Some(captures) = WHOLE_REFERENCE.captures(expression) else {
            return Ok(None);
        };
        let Some(name) = captures.get(1) else {
            return Ok(None);
        };
        self.lookup(name.as_str(), captures.get(2).map(|m| m.as_str()), store)
    }

    /// `None` when `name` is unbound. An index into an array yields the element
    /// (or `Null`); an index on a non-array yields the value itself.
    fn lookup(
        &self,
        name: &str,
        index: Option<&str>,
        store: &VariableStore,
    ) -> ExpressionResult<Option<Value>> {
        let Some(value) = store.get(name) else {
            return Ok(None);
        };
        match (index, value) {
            (Some(index), Value::Array(_)) => {
                let position = self.evaluate(index, store)?;
                Ok(Some(
                    position
                        .as_index()
                        .map(|i| store.get_indexed(name, i))
                        .unwrap_or(Value::Null),
                ))
            }
            _ => Ok(Some(value.clone())),
        }
    }
}

pub(crate) fn parse_number(text: &str) -> Option<Value> {
    if NUMERIC_LITERAL.is_match(text) {
        text.parse::<f64>().ok().map(Value::Number)
    } else {
        None
    }
}

fn parse_string(text: &str) -> Option<String> {
    match parse_quoted(text) {
        Ok(("", content)) => Some(content),
        _ => None,
    }
}

fn parse_keyword(text: &str) -> Option<Value> {
    match text.to_ascii_lowercase().as_str() {
        "true" => Some(Value::Boolean(true)),
        "false" => Some(Value::Boolean(false)),
        "null" => Some(Value::Null),
        _ => None,
    }
}

/// The text between the outer brackets of `[ ... ]`, provided the first `[`
/// closes at the very end.
fn array_body(text: &str) -> Option<&str> {
    if !text.starts_with('[') || !text.ends_with(']') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (i == text.len() - 1).then(|| &text[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on commas that are outside quotes, brackets and parentheses.
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Shunting-yard. Prefix operators never pop; `?` and `:` associate to the
/// right so that `c ? a : b` becomes `c a b : ?`.
fn to_postfix(tokens: Vec<Token>) -> ExpressionResult<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();
    let mut expect_operand = true;

    for token in tokens {
        match token {
            Token::OpenParen => {
                operators.push(Token::OpenParen);
                expect_operand = true;
            }
            Token::CloseParen => {
                loop {
                    match operators.pop() {
                        Some(Token::OpenParen) => break,
                        Some(operator) => output.push(operator),
                        None => return Err(ExpressionError::UnbalancedParentheses),
                    }
                }
                expect_operand = false;
            }
            Token::Operator(operator) => {
                let operator = if expect_operand && operator == Operator::Minus {
                    Operator::Negate
                } else {
                    operator
                };
                if !operator.is_unary() {
                    let right_assoc = matches!(operator, Operator::Question | Operator::Colon);
                    while let Some(&Token::Operator(top)) = operators.last() {
                        let pops = if right_assoc {
                            top.precedence() > operator.precedence()
                        } else {
                            top.precedence() >= operator.precedence()
                        };
                        if !pops {
                            break;
                        }
                        if let Some(popped) = operators.pop() {
                            output.push(popped);
                        }
                    }
                }
                operators.push(Token::Operator(operator));
                expect_operand = true;
            }
            operand => {
                output.push(operand);
                expect_operand = false;
            }
        }
    }

    while let Some(token) = operators.pop() {
        if token == Token::OpenParen {
            return Err(ExpressionError::UnbalancedParentheses);
        }
        output.push(token);
    }

    Ok(output)
}

fn evaluate_postfix(postfix: Vec<Token>, store: &VariableStore) -> ExpressionResult<Value> {
    let mut stack: Vec<Operand> = Vec::new();

    for token in postfix {
        match token {
            Token::Number(n) => stack.push(Operand::Value(Value::Number(n))),
            Token::Str(s) => stack.push(Operand::Value(Value::String(s))),
            Token::Boolean(b) => stack.push(Operand::Value(Value::Boolean(b))),
            Token::Null => stack.push(Operand::Value(Value::Null)),
            Token::Word(word) => {
                let value = store.get(&word).cloned().unwrap_or(Value::String(word));
                stack.push(Operand::Value(value));
            }
            Token::Operator(operator) => apply_operator(operator, &mut stack)?,
            Token::OpenParen | Token::CloseParen => {
                return Err(ExpressionError::UnbalancedParentheses)
            }
        }
    }

    // Leftover operands (`hello world`) resolve to the first one.
    match stack.into_iter().next() {
        None => Ok(Value::Null),
        Some(Operand::Value(value)) => Ok(value),
        Some(Operand::Branches(..)) => Err(ExpressionError::UnexpectedColon),
    }
}

fn pop_value(stack: &mut Vec<Operand>, operator: Operator) -> ExpressionResult<Value> {
    match stack.pop() {
        Some(Operand::Value(value)) => Ok(value),
        Some(Operand::Branches(..)) => Err(ExpressionError::UnexpectedColon),
        None => Err(ExpressionError::MissingOperand(operator)),
    }
}

fn apply_operator(operator: Operator, stack: &mut Vec<Operand>) -> ExpressionResult<()> {
    let result = match operator {
        Operator::Not => Value::Boolean(!pop_value(stack, operator)?.is_truthy()),
        Operator::Negate => Value::Number(-pop_value(stack, operator)?.to_number()),
        Operator::Colon => {
            let otherwise = pop_value(stack, operator)?;
            let then = pop_value(stack, operator)?;
            stack.push(Operand::Branches(then, otherwise));
            return Ok(());
        }
        Operator::Question => {
            let (then, otherwise) = match stack.pop() {
                Some(Operand::Branches(then, otherwise)) => (then, otherwise),
                _ => return Err(ExpressionError::UnterminatedConditional),
            };
            if pop_value(stack, operator)?.is_truthy() {
                then
            } else {
                otherwise
            }
        }
        binary => {
            let right = pop_value(stack, binary)?;
            let left = pop_value(stack, binary)?;
            apply_binary(binary, left, right)
        }
    };
    stack.push(Operand::Value(result));
    Ok(())
}

fn apply_binary(operator: Operator, left: Value, right: Value) -> Value {
    match operator {
        Operator::Plus => match (&left, &right) {
            (Value::String(_) | Value::Array(_), _) | (_, Value::String(_) | Value::Array(_)) => {
                Value::String(format!("{}{}", left, right))
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        },
        Operator::Minus => Value::Number(left.to_number() - right.to_number()),
        Operator::Multiply => Value::Number(left.to_number() * right.to_number()),
        Operator::Divide => Value::Number(left.to_number() / right.to_number()),
        Operator::Modulo => Value::Number(left.to_number() % right.to_number()),
        Operator::Less => Value::Boolean(compare(&left, &right).is_some_and(|o| o.is_lt())),
        Operator::Greater => Value::Boolean(compare(&left, &right).is_some_and(|o| o.is_gt())),
        Operator::LessEqual => Value::Boolean(compare(&left, &right).is_some_and(|o| o.is_le())),
        Operator::GreaterEqual => {
            Value::Boolean(compare(&left, &right).is_some_and(|o| o.is_ge()))
        }
        Operator::EqualEqual => Value::Boolean(left == right),
        Operator::NotEqual => Value::Boolean(left != right),
        Operator::And => {
            if left.is_truthy() {
                right
            } else {
                left
            }
        }
        Operator::Or => {
            if left.is_truthy() {
                left
            } else {
                right
            }
        }
        // unary and ternary operators never reach here
        Operator::Not | Operator::Negate | Operator::Question | Operator::Colon => Value::Null,
    }
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}
