use lazy_static::lazy_static;
use regex::Regex;
use strum_macros::IntoStaticStr;

use crate::error::{ScriptError, ScriptResult};

lazy_static! {
    static ref SET_PATTERN: Regex =
        Regex::new(r"^set\s+(\w+)(?:\[([^\]]+)\])?\s+(.+)$").expect("set pattern");
    static ref CALL_PATTERN: Regex = Regex::new(r"^(\w+)\s*\((.*)\)$").expect("call pattern");
    static ref FUNCTION_HEADER: Regex =
        Regex::new(r"^(\w+)\s*(?:\(([^)]*)\))?\s*$").expect("function header pattern");
}

/// One classified source line. Block statements carry only their header; the
/// interpreter resolves their bodies from the surrounding lines.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Statement {
    If { condition: String },
    While { condition: String },
    For { clause: String },
    Function { header: String },
    Return { expression: Option<String> },
    Break,
    Continue,
    Set {
        name: String,
        index: Option<String>,
        value: String,
    },
    /// A `set` line that does not fit `set NAME VALUE` / `set NAME[INDEX] VALUE`.
    MalformedSet,
    Unset { name: String },
    Import { path: String },
    Try,
    Call { name: String, arguments: String },
    Command { line: String },
}

impl Statement {
    /// Classifies a trimmed, non-blank, non-comment line. Checks run in a fixed
    /// priority order; anything unrecognized is an external command.
    pub fn classify(line: &str) -> Statement {
        if let Some(condition) = line.strip_prefix("if ") {
            Statement::If {
                condition: condition.trim().to_string(),
            }
        } else if let Some(condition) = line.strip_prefix("while ") {
            Statement::While {
                condition: condition.trim().to_string(),
            }
        } else if let Some(clause) = line.strip_prefix("for ") {
            Statement::For {
                clause: clause.trim().to_string(),
            }
        } else if let Some(header) = line.strip_prefix("function ") {
            Statement::Function {
                header: header.trim().to_string(),
            }
        } else if line == "return" {
            Statement::Return { expression: None }
        } else if let Some(expression) = line.strip_prefix("return ") {
            let expression = expression.trim();
            Statement::Return {
                expression: (!expression.is_empty()).then(|| expression.to_string()),
            }
        } else if line == "break" {
            Statement::Break
        } else if line == "continue" {
            Statement::Continue
        } else if line.starts_with("set ") {
            Self::classify_set(line)
        } else if let Some(name) = line.strip_prefix("unset ") {
            Statement::Unset {
                name: name.trim().to_string(),
            }
        } else if let Some(path) = line.strip_prefix("import ") {
            Statement::Import {
                path: path.trim().to_string(),
            }
        } else if line == "try" || line.starts_with("try ") {
            Statement::Try
        } else if let Some((name, arguments)) = parse_call(line) {
            Statement::Call { name, arguments }
        } else {
            Statement::Command {
                line: line.to_string(),
            }
        }
    }

    fn classify_set(line: &str) -> Statement {
        match SET_PATTERN.captures(line) {
            Some(captures) => match (captures.get(1), captures.get(3)) {
                (Some(name), Some(value)) => Statement::Set {
                    name: name.as_str().to_string(),
                    index: captures.get(2).map(|m| m.as_str().to_string()),
                    value: value.as_str().trim().to_string(),
                },
                _ => Statement::MalformedSet,
            },
            None => Statement::MalformedSet,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Splits `name(args)` into its name and raw argument text.
pub fn parse_call(text: &str) -> Option<(String, String)> {
    let captures = CALL_PATTERN.captures(text.trim())?;
    Some((
        captures.get(1)?.as_str().to_string(),
        captures.get(2).map_or("", |m| m.as_str()).trim().to_string(),
    ))
}

/// The two shapes of a `for` header.
#[derive(Debug, Clone, PartialEq)]
pub enum ForClause {
    Each {
        variable: String,
        list: String,
    },
    Range {
        variable: String,
        start: String,
        end: String,
        step: Option<String>,
    },
}

impl ForClause {
    pub fn parse(clause: &str) -> ScriptResult<ForClause> {
        if let Some((variable, list)) = clause.split_once(" in ") {
            return Ok(ForClause::Each {
                variable: variable.trim().to_string(),
                list: list.trim().to_string(),
            });
        }

        let mut parts = clause.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(variable), Some(start), Some(end)) => Ok(ForClause::Range {
                variable: variable.to_string(),
                start: start.to_string(),
                end: end.to_string(),
                step: parts.next().map(str::to_string),
            }),
            _ => Err(ScriptError::InvalidStatement {
                statement: format!("for {}", clause),
                message: "expected `for VAR START END [STEP]` or `for VAR in LIST`".to_string(),
            }),
        }
    }
}

/// Parses `NAME(p1, p2)` or a bare `NAME` after the `function` keyword.
pub fn parse_function_header(header: &str) -> ScriptResult<(String, Vec<String>)> {
    let invalid = || ScriptError::InvalidStatement {
        statement: format!("function {}", header),
        message: "expected `function NAME(PARAMS)`".to_string(),
    };
    let captures = FUNCTION_HEADER.captures(header).ok_or_else(invalid)?;
    let name = captures.get(1).ok_or_else(invalid)?.as_str().to_string();
    let params = captures
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok((name, params))
}
