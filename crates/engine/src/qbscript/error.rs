//! QBScript error taxonomy.
//!
//! Lex and parse errors describe malformed source. Evaluation errors are
//! runtime violations (null receivers, divide by zero, wrong attribute kind).
//! All three abort only the script that raised them.

use serde::Serialize;

use super::token::Token;

/// Malformed source found while tokenizing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Lex error at line {line}, column {column}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Token sequence that does not form a valid program.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error at line {}, column {}: {message}", .token.line, .token.column)]
pub struct ParseError {
    pub message: String,
    pub token: Token,
}

impl ParseError {
    pub fn new(message: impl Into<String>, token: Token) -> Self {
        Self {
            message: message.into(),
            token,
        }
    }
}

/// Runtime type or logic violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}{}", .line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
pub struct EvaluationError {
    pub message: String,
    /// Line of the statement that was executing, when known
    pub line: Option<usize>,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Attach a line unless a more precise one is already present.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line.get_or_insert(line);
        self
    }
}

/// Any failure of a single script run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("{0}")]
    Lex(#[from] LexError),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Evaluation(#[from] EvaluationError),
}

impl ScriptError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lex(_) => "lex",
            Self::Parse(_) => "parse",
            Self::Evaluation(_) => "evaluation",
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Lex(e) => Some(e.line),
            Self::Parse(e) => Some(e.token.line),
            Self::Evaluation(e) => e.line,
        }
    }
}

/// Author-facing form of a [`ScriptError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptErrorReport {
    pub kind: &'static str,
    pub message: String,
    pub line: Option<usize>,
}

impl From<&ScriptError> for ScriptErrorReport {
    fn from(error: &ScriptError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            line: error.line(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qbscript::token::TokenKind;

    #[test]
    fn evaluation_error_keeps_first_line() {
        let err = EvaluationError::new("Cannot divide by zero").at_line(3).at_line(9);
        assert_eq!(err.line, Some(3));
        assert_eq!(err.to_string(), "Cannot divide by zero (line 3)");
    }

    #[test]
    fn parse_error_reports_token_position() {
        let token = Token::new(TokenKind::RightParen, 2, 7, 15);
        let err = ScriptError::from(ParseError::new("Unexpected ')'", token));
        assert_eq!(err.to_string(), "Parse error at line 2, column 7: Unexpected ')'");
        assert_eq!(err.line(), Some(2));
        assert_eq!(ScriptErrorReport::from(&err).kind, "parse");
    }
}
