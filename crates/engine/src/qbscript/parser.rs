//! Recursive descent parser for QBScript.
//!
//! Precedence, lowest first: `||`, `&&`, equality, comparison, additive,
//! multiplicative, unary, power (right associative), postfix, primary.

use std::sync::Arc;

use super::ast::{AssignOp, BinaryOp, Expr, FunctionDef, Program, Stmt, StmtKind, UnaryOp};
use super::error::{ParseError, ScriptError};
use super::lexer::tokenize;
use super::token::{Token, TokenKind};

/// Parse a token stream produced by the lexer.
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

/// Lex strictly and parse.
pub fn parse_source(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    Ok(parse(tokens)?)
}

/// Deepest nesting of blocks, parentheses, lists and unary operators.
/// Deeper input is an error rather than a stack overflow.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Longest run of binary operators or postfix accessors in one expression.
/// Each link nests the tree one level deeper on the left.
pub const MAX_CHAIN_LENGTH: usize = 1000;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

type ParseResult<T> = Result<T, ParseError>;

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let (line, offset) = tokens
                .last()
                .map(|t| (t.line, t.offset))
                .unwrap_or((1, 0));
            tokens.push(Token::new(TokenKind::Eof, line, 1, offset));
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Eof) {
            if self.eat(&TokenKind::Newline) {
                continue;
            }
            if self.check(&TokenKind::Indent) {
                return Err(self.error_here("Unexpected indent"));
            }
            if self.check(&TokenKind::Dedent) {
                self.advance();
                continue;
            }
            statements.push(self.statement()?);
        }
        Ok(Program { statements })
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn current(&self) -> &Token {
        // The stream always ends with Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "Expected {} {}, found {}",
                kind,
                context,
                self.current().kind
            )))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> ParseResult<String> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error_here(format!("Expected name {}, found {}", context, other))),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current().clone())
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_here("Expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn link(&self, links: &mut usize) -> ParseResult<()> {
        *links += 1;
        if *links > MAX_CHAIN_LENGTH {
            return Err(self.error_here("Expression chain too long"));
        }
        Ok(())
    }

    fn expect_statement_end(&mut self) -> ParseResult<()> {
        match self.current().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::Dedent => Ok(()),
            _ => Err(self.error_here(format!(
                "Expected end of line, found {}",
                self.current().kind
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> ParseResult<Stmt> {
        let line = self.current().line;
        let kind = match self.current().kind {
            TokenKind::If => self.if_statement()?,
            TokenKind::For => self.for_statement()?,
            TokenKind::Identifier(_) | TokenKind::Event(_) if self.at_function_def() => {
                self.function_def()?
            }
            _ => return self.simple_statement(),
        };
        Ok(Stmt { kind, line })
    }

    /// `name(...)` followed by `:` starts a definition rather than a call.
    fn at_function_def(&self) -> bool {
        if self.peek_kind(1) != Some(&TokenKind::LeftParen) {
            return false;
        }
        let mut depth = 0usize;
        let mut index = self.pos + 1;
        while let Some(token) = self.tokens.get(index) {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(index + 1).map(|t| &t.kind),
                            Some(TokenKind::Colon)
                        );
                    }
                }
                TokenKind::Newline | TokenKind::Eof => return false,
                _ => {}
            }
            index += 1;
        }
        false
    }

    fn simple_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.current().line;
        let kind = if self.eat(&TokenKind::Return) {
            let value = match self.current().kind {
                TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent => None,
                _ => Some(self.expression()?),
            };
            StmtKind::Return(value)
        } else {
            let expr = self.expression()?;
            match self.assign_op() {
                Some(op) => {
                    let op_token = self.advance();
                    if !matches!(
                        expr,
                        Expr::Identifier(_) | Expr::Member { .. } | Expr::Index { .. }
                    ) {
                        return Err(ParseError::new("Invalid assignment target", op_token));
                    }
                    let value = self.expression()?;
                    StmtKind::Assign {
                        target: expr,
                        op,
                        value,
                    }
                }
                None => StmtKind::Expr(expr),
            }
        };
        self.expect_statement_end()?;
        Ok(Stmt { kind, line })
    }

    fn assign_op(&self) -> Option<AssignOp> {
        match self.current().kind {
            TokenKind::Assign => Some(AssignOp::Set),
            TokenKind::PlusAssign => Some(AssignOp::Add),
            TokenKind::MinusAssign => Some(AssignOp::Subtract),
            TokenKind::StarAssign => Some(AssignOp::Multiply),
            TokenKind::SlashAssign => Some(AssignOp::Divide),
            _ => None,
        }
    }

    fn if_statement(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let mut branches = Vec::new();
        let condition = self.expression()?;
        let (body, _) = self.block("after if condition")?;
        branches.push((condition, body));

        let mut else_branch = None;
        loop {
            if self.eat(&TokenKind::Elif) {
                let condition = self.expression()?;
                let (body, _) = self.block("after elif condition")?;
                branches.push((condition, body));
            } else if self.eat(&TokenKind::Else) {
                let (body, _) = self.block("after else")?;
                else_branch = Some(body);
                break;
            } else {
                break;
            }
        }
        Ok(StmtKind::If {
            branches,
            else_branch,
        })
    }

    fn for_statement(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let variable = self.expect_identifier("after 'for'")?;
        self.expect(TokenKind::In, "after loop variable")?;
        let iterable = self.expression()?;
        let (body, _) = self.block("after for clause")?;
        Ok(StmtKind::For {
            variable,
            iterable,
            body,
        })
    }

    fn function_def(&mut self) -> ParseResult<StmtKind> {
        let name_token = self.advance();
        let name = match &name_token.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Event(event) => event.as_str().to_string(),
            _ => return Err(ParseError::new("Expected function name", name_token)),
        };
        self.expect(TokenKind::LeftParen, "after function name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier("for parameter")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "after parameters")?;
        let (body, body_span) = self.block("after function signature")?;
        Ok(StmtKind::FunctionDef(Arc::new(FunctionDef {
            name,
            params,
            body,
            body_span,
            line: name_token.line,
        })))
    }

    /// `:` followed by an indented suite or one inline simple statement.
    /// Returns the statements and the byte span of the body.
    fn block(&mut self, context: &str) -> ParseResult<(Vec<Stmt>, (usize, usize))> {
        self.expect(TokenKind::Colon, context)?;
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> ParseResult<(Vec<Stmt>, (usize, usize))> {

        if !self.eat(&TokenKind::Newline) {
            let start = self.current().offset;
            let statement = self.simple_statement()?;
            let end = self
                .tokens
                .get(self.pos.saturating_sub(1))
                .map(|t| t.offset)
                .unwrap_or(start);
            return Ok((vec![statement], (start, end.max(start))));
        }

        let indent = self.expect(TokenKind::Indent, "to start block")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.check(&TokenKind::Eof) {
            if self.eat(&TokenKind::Newline) {
                continue;
            }
            statements.push(self.statement()?);
        }
        let end = self.current().offset;
        self.eat(&TokenKind::Dedent);
        Ok((statements, (indent.offset, end)))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::or)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        let mut links = 0;
        while self.eat(&TokenKind::OrOr) {
            self.link(&mut links)?;
            let right = self.and()?;
            expr = Expr::binary(BinaryOp::Or, expr, right);
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        let mut links = 0;
        while self.eat(&TokenKind::AndAnd) {
            self.link(&mut links)?;
            let right = self.equality()?;
            expr = Expr::binary(BinaryOp::And, expr, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        let mut links = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::BangEqual => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            self.link(&mut links)?;
            let right = self.comparison()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.additive()?;
        let mut links = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                _ => break,
            };
            self.advance();
            self.link(&mut links)?;
            let right = self.additive()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut expr = self.multiplicative()?;
        let mut links = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            self.link(&mut links)?;
            let right = self.multiplicative()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        let mut links = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            self.link(&mut links)?;
            let right = self.unary()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn power(&mut self) -> ParseResult<Expr> {
        let base = self.postfix()?;
        if self.eat(&TokenKind::StarStar) {
            // Right associative: the exponent may itself be a power or a unary.
            let exponent = self.nested(Self::unary)?;
            return Ok(Expr::binary(BinaryOp::Power, base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        let mut links = 0;
        loop {
            if matches!(
                self.current().kind,
                TokenKind::Dot | TokenKind::LeftBracket | TokenKind::LeftParen
            ) {
                self.link(&mut links)?;
            }
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_identifier("after '.'")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RightBracket, "after index")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let args = self.arguments(TokenKind::RightParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Comma separated expressions up to `close`. A trailing comma is allowed.
    fn arguments(&mut self, close: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(&close) {
            args.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, "to close list")?;
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        let expr = match &token.kind {
            TokenKind::Number(n) => Expr::Number(*n),
            TokenKind::String(s) => Expr::String(s.clone()),
            TokenKind::Boolean(b) => Expr::Boolean(*b),
            TokenKind::Null => Expr::Null,
            TokenKind::Identifier(name) => Expr::Identifier(name.clone()),
            TokenKind::Subscribe => Expr::Identifier("subscribe".to_string()),
            TokenKind::Event(event) => Expr::Identifier(event.as_str().to_string()),
            TokenKind::LeftParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RightParen, "after expression")?;
                inner
            }
            TokenKind::LeftBracket => Expr::List(self.arguments(TokenKind::RightBracket)?),
            TokenKind::LeftBrace => {
                return Err(ParseError::new("Object literals are not supported", token));
            }
            other => {
                let message = format!("Unexpected {}", other);
                return Err(ParseError::new(message, token));
            }
        };
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse_source(source).unwrap()
    }

    fn single_expr(source: &str) -> Expr {
        match parse_ok(source).statements.remove(0).kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn precedence_multiplication_before_addition() {
        let expr = single_expr("1 + 2 * 3");
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                Expr::Number(1.0),
                Expr::binary(BinaryOp::Multiply, Expr::Number(2.0), Expr::Number(3.0))
            )
        );
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_unary_minus() {
        let expr = single_expr("-2 ** 3 ** 2");
        let Expr::Unary { op, operand } = expr else {
            panic!("expected unary");
        };
        assert_eq!(op, UnaryOp::Negate);
        assert_eq!(
            *operand,
            Expr::binary(
                BinaryOp::Power,
                Expr::Number(2.0),
                Expr::binary(BinaryOp::Power, Expr::Number(3.0), Expr::Number(2.0))
            )
        );
    }

    #[test]
    fn logical_operators_bind_loosest() {
        let expr = single_expr("a == 1 || b && c");
        let Expr::Binary { op, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
    }

    #[test]
    fn postfix_chain() {
        let expr = single_expr("Owner.Attribute('HP').add(5)");
        let Expr::Call { callee, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(args, vec![Expr::Number(5.0)]);
        assert!(matches!(*callee, Expr::Member { ref property, .. } if property == "add"));
    }

    #[test]
    fn compound_assignment_to_member() {
        let program = parse_ok("Self.value += 2");
        assert!(matches!(
            program.statements[0].kind,
            StmtKind::Assign { op: AssignOp::Add, target: Expr::Member { .. }, .. }
        ));
    }

    #[test]
    fn if_elif_else_chain() {
        let source = "if x > 1:\n    a = 1\nelif x > 0:\n    a = 2\nelse:\n    a = 3\n";
        let StmtKind::If {
            branches,
            else_branch,
        } = &parse_ok(source).statements[0].kind
        else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn inline_block() {
        let program = parse_ok("if ready: announce('go')\nx = 1");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn for_loop_over_list_literal() {
        let program = parse_ok("for n in [1, 2, 3,]:\n    total += n\n");
        let StmtKind::For {
            variable, iterable, ..
        } = &program.statements[0].kind
        else {
            panic!("expected for");
        };
        assert_eq!(variable, "n");
        assert!(matches!(iterable, Expr::List(items) if items.len() == 3));
    }

    #[test]
    fn event_handler_definition_records_body_span() {
        let source = "subscribe('HP')\non_equip():\n    Owner.Attribute('AC').add(2)\n    log('equipped')\n";
        let program = parse_ok(source);
        let StmtKind::FunctionDef(def) = &program.statements[1].kind else {
            panic!("expected function definition");
        };
        assert_eq!(def.name, "on_equip");
        assert_eq!(def.body.len(), 2);
        let body = &source[def.body_span.0..def.body_span.1];
        assert!(body.starts_with("    Owner.Attribute"));
        assert!(body.trim_end().ends_with("log('equipped')"));
    }

    #[test]
    fn function_with_parameters_versus_call() {
        let program = parse_ok("double(x):\n    return x * 2\ny = double(4)\n");
        let StmtKind::FunctionDef(def) = &program.statements[0].kind else {
            panic!("expected function definition");
        };
        assert_eq!(def.params, vec!["x".to_string()]);
        assert!(matches!(program.statements[1].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn statement_lines_are_recorded() {
        let program = parse_ok("a = 1\n\n// note\nb = 2\n");
        assert_eq!(program.statements[1].line, 4);
    }

    #[test]
    fn invalid_assignment_target_is_an_error() {
        let err = parse_source("1 = 2").unwrap_err();
        assert!(err.to_string().contains("Invalid assignment target"));
    }

    #[test]
    fn unexpected_token_reports_position() {
        let err = parse_source("x = (1 + \n").unwrap_err();
        let ScriptError::Parse(parse_error) = err else {
            panic!("expected parse error");
        };
        assert_eq!(parse_error.token.line, 2);
    }

    #[test]
    fn object_literals_are_rejected() {
        let err = parse_source("x = {}").unwrap_err();
        assert!(err.to_string().contains("Object literals"));
    }

    fn nesting_error(source: &str) -> String {
        match parse_source(source) {
            Err(ScriptError::Parse(error)) => error.message,
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn deep_parentheses_are_an_error_not_a_crash() {
        let source = format!("x = {}1{}\n", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(nesting_error(&source), "Expression nested too deeply");
    }

    #[test]
    fn deep_unary_lists_and_powers_are_bounded() {
        let negations = format!("x = {}1\n", "-".repeat(10_000));
        assert_eq!(nesting_error(&negations), "Expression nested too deeply");

        let lists = format!("x = {}{}\n", "[".repeat(10_000), "]".repeat(10_000));
        assert_eq!(nesting_error(&lists), "Expression nested too deeply");

        let powers = format!("x = {}2\n", "2 ** ".repeat(10_000));
        assert_eq!(nesting_error(&powers), "Expression nested too deeply");
    }

    #[test]
    fn deep_blocks_are_bounded() {
        let mut source = String::new();
        for level in 0..(MAX_NESTING_DEPTH + 10) {
            source.push_str(&"  ".repeat(level));
            source.push_str("if true:\n");
        }
        source.push_str(&"  ".repeat(MAX_NESTING_DEPTH + 10));
        source.push_str("x = 1\n");
        assert_eq!(nesting_error(&source), "Expression nested too deeply");
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        let source = format!("x = 1{}\n", " + 1".repeat(MAX_CHAIN_LENGTH + 1));
        assert_eq!(nesting_error(&source), "Expression chain too long");

        let members = format!("x = Owner{}\n", ".name".repeat(MAX_CHAIN_LENGTH + 1));
        assert_eq!(nesting_error(&members), "Expression chain too long");
    }

    #[test]
    fn nesting_below_the_limit_still_parses() {
        let depth = MAX_NESTING_DEPTH - 10;
        let source = format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
        assert!(matches!(
            parse_ok(&source).statements[0].kind,
            StmtKind::Assign { .. }
        ));
        let sum = format!("x = 1{}\n", " + 1".repeat(200));
        parse_ok(&sum);
    }
}
