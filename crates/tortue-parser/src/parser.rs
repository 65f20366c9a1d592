//! Recursive-descent parser for the Tortue language.
//!
//! Expression precedence, lowest to highest binding:
//! logical `or`/`and`/`not`, comparisons, `random`, `+ -`, `sqrt`,
//! `* /`, unary minus, `^`. Parenthesized groups always win.
//!
//! A malformed statement does not abort the parse: the diagnostic is
//! recorded and the parser skips to the next statement boundary, so one
//! pass can report several errors.

use tortue_syntax::ast::*;
use tortue_syntax::error::{Error, ErrorKind, Result};
use tortue_syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn span(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| (t.line, t.col))
            .unwrap_or((1, 1))
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn err_here(&self, msg: impl Into<String>) -> Error {
        let (line, col) = self.span();
        Error::with_span(ErrorKind::Syntax, msg, line, col)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.peek() == &kind {
            self.advance();
            Ok(())
        } else {
            Err(self.err_here(format!("Expected {}, found {}", what, describe(self.peek()))))
        }
    }

    /// Parse a whole program. On success returns the top-level block; on
    /// failure returns every diagnostic collected while recovering.
    pub fn parse_program(&mut self) -> std::result::Result<Block, Vec<Error>> {
        let mut block = Block::default();
        let mut diagnostics = Vec::new();
        loop {
            while self.peek() == &TokenKind::Semicolon {
                self.advance();
            }
            if self.peek() == &TokenKind::Eof {
                break;
            }
            match self.parse_stmt() {
                Ok(stmt) => block.stmts.push(stmt),
                Err(e) => {
                    diagnostics.push(e);
                    self.synchronize();
                }
            }
        }
        if diagnostics.is_empty() {
            Ok(block)
        } else {
            Err(diagnostics)
        }
    }

    /// Skip tokens until the next plausible statement start.
    fn synchronize(&mut self) {
        self.advance();
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                k if starts_stmt(k) => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_block(&mut self) -> Result<Block> {
        let mut block = Block::default();
        loop {
            while self.peek() == &TokenKind::Semicolon {
                self.advance();
            }
            match self.peek() {
                TokenKind::End | TokenKind::Else | TokenKind::Eof => break,
                _ => block.stmts.push(self.parse_stmt()?),
            }
        }
        Ok(block)
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek().clone() {
            TokenKind::Forward => self.one_arg_turtle(TurtleOp::Forward),
            TokenKind::Back => self.one_arg_turtle(TurtleOp::Back),
            TokenKind::Right => self.one_arg_turtle(TurtleOp::Right),
            TokenKind::Left => self.one_arg_turtle(TurtleOp::Left),
            TokenKind::Heading => self.one_arg_turtle(TurtleOp::Heading),
            TokenKind::TypeIn => self.one_arg_turtle(TurtleOp::TypeIn),
            TokenKind::SetXy => {
                self.advance();
                self.expect(TokenKind::LBrace, "'{'")?;
                let x = self.parse_expr()?;
                self.expect(TokenKind::Comma, "','")?;
                let y = self.parse_expr()?;
                self.expect(TokenKind::RBrace, "'}'")?;
                Ok(Stmt::Turtle {
                    op: TurtleOp::SetXy,
                    args: vec![x, y],
                })
            }
            TokenKind::PenUp => self.no_arg_turtle(TurtleOp::PenUp),
            TokenKind::PenDown => self.no_arg_turtle(TurtleOp::PenDown),
            TokenKind::Home => self.no_arg_turtle(TurtleOp::Home),
            TokenKind::WipeClean => self.no_arg_turtle(TurtleOp::WipeClean),
            TokenKind::Reset => self.no_arg_turtle(TurtleOp::Reset),
            TokenKind::XCor => self.no_arg_turtle(TurtleOp::XCor),
            TokenKind::YCor => self.no_arg_turtle(TurtleOp::YCor),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::To => self.parse_proc_def(),
            TokenKind::Write => {
                self.advance();
                Ok(Stmt::Write(self.parse_expr()?))
            }
            TokenKind::Ident(name) => {
                if self.peek_at(1) == &TokenKind::Assign {
                    self.advance();
                    self.advance();
                    Ok(Stmt::Assign {
                        name,
                        expr: self.parse_expr()?,
                    })
                } else {
                    self.advance();
                    let args = self.parse_call_args()?;
                    Ok(Stmt::ProcCall { name, args })
                }
            }
            // `:x = ...` is accepted alongside `x = ...`
            TokenKind::Colon => {
                if let TokenKind::Ident(name) = self.peek_at(1).clone() {
                    if self.peek_at(2) == &TokenKind::Assign {
                        self.advance();
                        self.advance();
                        self.advance();
                        return Ok(Stmt::Assign {
                            name,
                            expr: self.parse_expr()?,
                        });
                    }
                }
                Err(self.err_here("Expected statement"))
            }
            other => Err(self.err_here(format!(
                "Expected statement, found {}",
                describe(&other)
            ))),
        }
    }

    fn one_arg_turtle(&mut self, op: TurtleOp) -> Result<Stmt> {
        self.advance();
        let arg = self.parse_expr()?;
        Ok(Stmt::Turtle {
            op,
            args: vec![arg],
        })
    }

    fn no_arg_turtle(&mut self, op: TurtleOp) -> Result<Stmt> {
        self.advance();
        Ok(Stmt::Turtle {
            op,
            args: Vec::new(),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.advance();
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Then, "'then'")?;
        let then_block = self.parse_block()?;
        let else_block = if self.peek() == &TokenKind::Else {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        self.advance();
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_proc_def(&mut self) -> Result<Stmt> {
        self.advance();
        let name = match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                name
            }
            other => {
                return Err(self.err_here(format!(
                    "Expected procedure name, found {}",
                    describe(&other)
                )));
            }
        };
        let mut params = Vec::new();
        loop {
            while self.peek() == &TokenKind::Comma {
                self.advance();
            }
            // A leading `:x =` is the first body statement, not a parameter.
            let is_param = self.peek() == &TokenKind::Colon
                && matches!(self.peek_at(1), TokenKind::Ident(_))
                && self.peek_at(2) != &TokenKind::Assign;
            if !is_param {
                break;
            }
            self.advance();
            if let TokenKind::Ident(p) = self.advance() {
                if params.contains(&p) {
                    return Err(self.err_here(format!("Duplicate parameter ':{}'", p)));
                }
                params.push(p);
            }
        }
        let body = self.parse_block()?;
        self.expect(TokenKind::End, "'end'")?;
        Ok(Stmt::ProcDef { name, params, body })
    }

    /// Call arguments are greedy expressions up to the next statement
    /// boundary; commas between them are optional.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        loop {
            while self.peek() == &TokenKind::Comma {
                self.advance();
            }
            // `:x = ...` after the last argument is the next statement
            if self.peek() == &TokenKind::Colon
                && matches!(self.peek_at(1), TokenKind::Ident(_))
                && self.peek_at(2) == &TokenKind::Assign
            {
                break;
            }
            if !starts_expr(self.peek()) {
                break;
            }
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_logic()
    }

    fn parse_logic(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_logic_operand()?;
        loop {
            let op = match self.peek() {
                TokenKind::And => LogicOp::And,
                TokenKind::Or => LogicOp::Or,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_logic_operand()?;
            lhs = Expr::Logical(op, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn parse_logic_operand(&mut self) -> Result<Expr> {
        if self.peek() == &TokenKind::Not {
            self.advance();
            let operand = self.parse_logic_operand()?;
            Ok(Expr::Logical(LogicOp::Not, vec![operand]))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let lhs = self.parse_arith()?;
        let op = match self.peek() {
            TokenKind::Greater => CmpOp::Gt,
            TokenKind::Less => CmpOp::Lt,
            TokenKind::GreaterEq => CmpOp::Gte,
            TokenKind::LessEq => CmpOp::Lte,
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::Neq,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_arith()?;
        Ok(Expr::Comparison(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_arith(&mut self) -> Result<Expr> {
        // random binds loosest of the numeric operators
        if self.peek() == &TokenKind::Random {
            self.advance();
            let bound = self.parse_arith()?;
            return Ok(Expr::Builtin(ExprBuiltin::Random, vec![bound]));
        }
        self.parse_addsub()
    }

    fn parse_addsub(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_sqrt_level()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_sqrt_level()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_sqrt_level(&mut self) -> Result<Expr> {
        if self.peek() == &TokenKind::Sqrt {
            self.advance();
            let operand = self.parse_sqrt_level()?;
            Ok(Expr::Builtin(ExprBuiltin::Sqrt, vec![operand]))
        } else {
            self.parse_muldiv()
        }
    }

    fn parse_muldiv(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == &TokenKind::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(Expr::Unary(UnOp::Neg, Box::new(operand)))
        } else {
            self.parse_power()
        }
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_primary()?;
        while self.peek() == &TokenKind::Caret {
            self.advance();
            let rhs = self.parse_primary()?;
            lhs = Expr::Binary(BinOp::Pow, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Word(w) => {
                self.advance();
                Ok(Expr::Word(w))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Colon => {
                self.advance();
                match self.advance() {
                    TokenKind::Ident(name) => Ok(Expr::Variable(name)),
                    other => Err(self.err_here(format!(
                        "Expected variable name after ':', found {}",
                        describe(&other)
                    ))),
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::XCor => {
                self.advance();
                Ok(Expr::Builtin(ExprBuiltin::XCor, Vec::new()))
            }
            TokenKind::YCor => {
                self.advance();
                Ok(Expr::Builtin(ExprBuiltin::YCor, Vec::new()))
            }
            other => Err(self.err_here(format!(
                "Expected expression, found {}",
                describe(&other)
            ))),
        }
    }
}

fn starts_expr(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number(_)
            | TokenKind::Word(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Colon
            | TokenKind::LParen
            | TokenKind::Minus
            | TokenKind::Sqrt
            | TokenKind::Random
            | TokenKind::XCor
            | TokenKind::YCor
    )
}

fn starts_stmt(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Forward
            | TokenKind::Back
            | TokenKind::Right
            | TokenKind::Left
            | TokenKind::Heading
            | TokenKind::SetXy
            | TokenKind::PenUp
            | TokenKind::PenDown
            | TokenKind::Home
            | TokenKind::WipeClean
            | TokenKind::Reset
            | TokenKind::XCor
            | TokenKind::YCor
            | TokenKind::TypeIn
            | TokenKind::If
            | TokenKind::While
            | TokenKind::To
            | TokenKind::Write
            | TokenKind::Ident(_)
            | TokenKind::Semicolon
    )
}

fn describe(kind: &TokenKind) -> String {
    let lexeme = match kind {
        TokenKind::Ident(s) => return format!("'{}'", s),
        TokenKind::Number(n) => return format!("'{}'", n),
        TokenKind::Word(w) => return format!("\"{}\"", w),
        TokenKind::Eof => return "end of input".to_string(),
        TokenKind::If => "if",
        TokenKind::Then => "then",
        TokenKind::Else => "else",
        TokenKind::While => "while",
        TokenKind::To => "to",
        TokenKind::End => "end",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::And => "and",
        TokenKind::Or => "or",
        TokenKind::Not => "not",
        TokenKind::Write => "write",
        TokenKind::Sqrt => "sqrt",
        TokenKind::Random => "random",
        TokenKind::Forward => "forward",
        TokenKind::Back => "back",
        TokenKind::Right => "right",
        TokenKind::Left => "left",
        TokenKind::Heading => "heading",
        TokenKind::SetXy => "setxy",
        TokenKind::PenUp => "penup",
        TokenKind::PenDown => "pendown",
        TokenKind::Home => "home",
        TokenKind::WipeClean => "wipeclean",
        TokenKind::Reset => "clearscreen",
        TokenKind::XCor => "xcor",
        TokenKind::YCor => "ycor",
        TokenKind::TypeIn => "typein",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Colon => ":",
        TokenKind::Comma => ",",
        TokenKind::Semicolon => ";",
        TokenKind::Assign => "=",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Caret => "^",
        TokenKind::EqEq => "==",
        TokenKind::NotEq => "!=",
        TokenKind::Less => "<",
        TokenKind::LessEq => "<=",
        TokenKind::Greater => ">",
        TokenKind::GreaterEq => ">=",
    };
    format!("'{}'", lexeme)
}
