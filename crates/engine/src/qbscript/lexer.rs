//! QBScript lexer.
//!
//! Layout is Python-like: newlines end statements and indentation opens and
//! closes blocks, emitted as `Newline`/`Indent`/`Dedent` tokens. Newlines
//! inside brackets are ignored. Blank and comment-only lines produce nothing.

use super::error::LexError;
use super::token::{Token, TokenKind};

const TAB_WIDTH: usize = 4;

/// Tokenize a full script. Fails on the first malformed construct.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source, false);
    lexer.run()?;
    Ok(lexer.tokens)
}

/// Tokenize possibly incomplete text (editor buffers, static analysis).
///
/// Never fails: malformed constructs are reported as diagnostics and
/// lexing continues with a best-effort token stream.
pub fn tokenize_partial(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer::new(source, true);
    // Lenient mode records errors instead of returning them.
    let _ = lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
    bracket_depth: usize,
    indent_stack: Vec<usize>,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    lenient: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, lenient: bool) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            bracket_depth: 0,
            indent_stack: vec![0],
            tokens: Vec::new(),
            errors: Vec::new(),
            lenient,
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        while !self.is_at_end() {
            if self.at_line_start && self.bracket_depth == 0 {
                self.handle_indentation()?;
                continue;
            }
            self.scan_token()?;
        }
        self.finish();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize, offset: usize) {
        self.tokens.push(Token::new(kind, line, column, offset));
    }

    fn fail(&mut self, error: LexError) -> Result<(), LexError> {
        if self.lenient {
            self.errors.push(error);
            Ok(())
        } else {
            Err(error)
        }
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    fn handle_indentation(&mut self) -> Result<(), LexError> {
        let line_offset = self.offset();
        let mut width = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width += TAB_WIDTH,
                '\r' => {}
                _ => break,
            }
            self.advance();
        }

        // Blank or comment-only lines do not affect layout.
        loop {
            match (self.peek(), self.peek_next()) {
                (None, _) => return Ok(()),
                (Some('\n'), _) => {
                    self.advance();
                    return Ok(());
                }
                (Some('/'), Some('/')) => {
                    self.skip_line_comment();
                    continue;
                }
                (Some('/'), Some('*')) => {
                    self.skip_block_comment()?;
                    while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r')) {
                        self.advance();
                    }
                    if matches!(self.peek(), None | Some('\n')) {
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }

        self.at_line_start = false;
        let current = self.indent_stack.last().copied().unwrap_or(0);
        if width > current {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent, self.line, 1, line_offset);
        } else if width < current {
            while self.indent_stack.last().copied().unwrap_or(0) > width {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent, self.line, 1, line_offset);
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                let error = LexError::new(
                    "Inconsistent indentation: dedent does not match any outer block",
                    self.line,
                    1,
                );
                self.fail(error)?;
                // Recover by treating this width as a new level of the enclosing block.
                self.indent_stack.push(width);
            }
        }
        Ok(())
    }

    fn push_newline(&mut self, line: usize, column: usize, offset: usize) {
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Indent));
        if needs_newline {
            self.push(TokenKind::Newline, line, column, offset);
        }
    }

    fn finish(&mut self) {
        let offset = self.source.len();
        self.push_newline(self.line, self.column, offset);
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, self.line, self.column, offset);
        }
        self.push(TokenKind::Eof, self.line, self.column, offset);
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    fn scan_token(&mut self) -> Result<(), LexError> {
        let (line, column, offset) = (self.line, self.column, self.offset());
        let Some(c) = self.peek() else {
            return Ok(());
        };

        match c {
            ' ' | '\t' | '\r' => {
                self.advance();
            }
            '\n' => {
                self.advance();
                if self.bracket_depth == 0 {
                    self.push_newline(line, column, offset);
                    self.at_line_start = true;
                }
            }
            '/' if self.peek_next() == Some('/') => self.skip_line_comment(),
            '/' if self.peek_next() == Some('*') => self.skip_block_comment()?,
            '"' | '\'' => self.scan_string(c, line, column, offset)?,
            c if c.is_ascii_digit() => self.scan_number(line, column, offset)?,
            c if c.is_alphabetic() || c == '_' => self.scan_word(line, column, offset),
            _ => self.scan_operator(c, line, column, offset)?,
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    return self.fail(LexError::new("Unterminated block comment", line, column));
                }
                Some('*') if self.peek_next() == Some('/') => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn scan_string(
        &mut self,
        quote: char,
        line: usize,
        column: usize,
        offset: usize,
    ) -> Result<(), LexError> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.fail(LexError::new("Unterminated string literal", line, column))?;
                    break;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('\\') => value.push('\\'),
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                        None => {}
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        self.push(TokenKind::String(value), line, column, offset);
        Ok(())
    }

    fn scan_number(&mut self, line: usize, column: usize, offset: usize) -> Result<(), LexError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.source[offset..self.offset()];
        match text.parse::<f64>() {
            Ok(n) => self.push(TokenKind::Number(n), line, column, offset),
            Err(_) => {
                self.fail(LexError::new(format!("Invalid number '{}'", text), line, column))?
            }
        }
        Ok(())
    }

    fn scan_word(&mut self, line: usize, column: usize, offset: usize) {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let word = &self.source[offset..self.offset()];
        let kind = TokenKind::keyword(word).unwrap_or_else(|| TokenKind::Identifier(word.to_string()));
        self.push(kind, line, column, offset);
    }

    fn scan_operator(
        &mut self,
        c: char,
        line: usize,
        column: usize,
        offset: usize,
    ) -> Result<(), LexError> {
        self.advance();
        let kind = match c {
            '+' if self.matches('=') => TokenKind::PlusAssign,
            '+' => TokenKind::Plus,
            '-' if self.matches('=') => TokenKind::MinusAssign,
            '-' => TokenKind::Minus,
            '*' if self.matches('*') => TokenKind::StarStar,
            '*' if self.matches('=') => TokenKind::StarAssign,
            '*' => TokenKind::Star,
            '/' if self.matches('=') => TokenKind::SlashAssign,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' if self.matches('=') => TokenKind::EqualEqual,
            '=' => TokenKind::Assign,
            '!' if self.matches('=') => TokenKind::BangEqual,
            '!' => TokenKind::Bang,
            '>' if self.matches('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,
            '<' if self.matches('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '&' if self.matches('&') => TokenKind::AndAnd,
            '|' if self.matches('|') => TokenKind::OrOr,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '(' | '[' | '{' => {
                self.bracket_depth += 1;
                match c {
                    '(' => TokenKind::LeftParen,
                    '[' => TokenKind::LeftBracket,
                    _ => TokenKind::LeftBrace,
                }
            }
            ')' | ']' | '}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                match c {
                    ')' => TokenKind::RightParen,
                    ']' => TokenKind::RightBracket,
                    _ => TokenKind::RightBrace,
                }
            }
            other => {
                return self.fail(LexError::new(
                    format!("Unexpected character '{}'", other),
                    line,
                    column,
                ));
            }
        };
        self.push(kind, line, column, offset);
        Ok(())
    }
}
