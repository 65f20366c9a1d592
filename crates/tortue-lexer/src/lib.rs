//! Tortue lexer: converts source text into tokens.
//!
//! Illegal characters are not fatal: each one is recorded as a diagnostic
//! and skipped, and scanning continues with the next character.

use tortue_syntax::error::{Error, ErrorKind};
use tortue_syntax::token::{Token, TokenKind};

/// Streaming character scanner that produces tokens with positions.
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    /// Create a new lexer over the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }
    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }
    fn advance(&mut self) -> Option<char> {
        let ch = self.src.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            s.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        // The scanned text is digits with at most one interior dot, which
        // always parses as f64.
        let val: f64 = s.parse().unwrap_or(0.0);
        Token {
            kind: TokenKind::Number(val),
            line: start_line,
            col: start_col,
        }
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = match s.as_str() {
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "to" => TokenKind::To,
            "end" => TokenKind::End,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "write" => TokenKind::Write,
            "sqrt" => TokenKind::Sqrt,
            "random" => TokenKind::Random,
            "fo" | "forward" => TokenKind::Forward,
            "bk" | "back" => TokenKind::Back,
            "rt" | "right" => TokenKind::Right,
            "lt" | "left" => TokenKind::Left,
            "heading" => TokenKind::Heading,
            "setxy" => TokenKind::SetXy,
            "pu" | "penup" => TokenKind::PenUp,
            "pd" | "pendown" => TokenKind::PenDown,
            "home" => TokenKind::Home,
            "wc" | "wipeclean" => TokenKind::WipeClean,
            "cs" | "clearscreen" => TokenKind::Reset,
            "xcor" => TokenKind::XCor,
            "ycor" => TokenKind::YCor,
            "typein" => TokenKind::TypeIn,
            _ => TokenKind::Ident(s),
        };
        Token {
            kind,
            line: start_line,
            col: start_col,
        }
    }

    fn read_word(&mut self, diagnostics: &mut Vec<Error>) -> Option<Token> {
        let start_line = self.line;
        let start_col = self.col;
        let mut s = String::new();
        while let Some(c) = self.advance() {
            match c {
                '"' => {
                    return Some(Token {
                        kind: TokenKind::Word(s),
                        line: start_line,
                        col: start_col,
                    });
                }
                '\\' => {
                    if let Some(n) = self.advance() {
                        let esc = match n {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '\\' => '\\',
                            '"' => '"',
                            other => other,
                        };
                        s.push(esc);
                    } else {
                        break;
                    }
                }
                other => s.push(other),
            }
        }
        diagnostics.push(Error::with_span(
            ErrorKind::Lexical,
            "Unterminated word",
            start_line,
            start_col,
        ));
        None
    }

    /// Tokenize the entire input into a vector of tokens ending with Eof,
    /// alongside any lexical diagnostics collected while scanning.
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Error>) {
        let mut tokens = Vec::new();
        let mut diagnostics = Vec::new();
        loop {
            self.skip_whitespace();
            let line = self.line;
            let col = self.col;
            let tk = match self.peek() {
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        line,
                        col,
                    });
                    break;
                }
                Some('(') => {
                    self.advance();
                    Token { kind: TokenKind::LParen, line, col }
                }
                Some(')') => {
                    self.advance();
                    Token { kind: TokenKind::RParen, line, col }
                }
                Some('{') => {
                    self.advance();
                    Token { kind: TokenKind::LBrace, line, col }
                }
                Some('}') => {
                    self.advance();
                    Token { kind: TokenKind::RBrace, line, col }
                }
                Some(':') => {
                    self.advance();
                    Token { kind: TokenKind::Colon, line, col }
                }
                Some(',') => {
                    self.advance();
                    Token { kind: TokenKind::Comma, line, col }
                }
                Some(';') => {
                    self.advance();
                    Token { kind: TokenKind::Semicolon, line, col }
                }
                Some('+') => {
                    self.advance();
                    Token { kind: TokenKind::Plus, line, col }
                }
                Some('-') => {
                    self.advance();
                    Token { kind: TokenKind::Minus, line, col }
                }
                Some('*') => {
                    self.advance();
                    Token { kind: TokenKind::Star, line, col }
                }
                Some('/') => {
                    self.advance();
                    Token { kind: TokenKind::Slash, line, col }
                }
                Some('^') => {
                    self.advance();
                    Token { kind: TokenKind::Caret, line, col }
                }
                Some('=') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token { kind: TokenKind::EqEq, line, col }
                    } else {
                        Token { kind: TokenKind::Assign, line, col }
                    }
                }
                Some('!') => {
                    if self.peek_next() == Some('=') {
                        self.advance();
                        self.advance();
                        Token { kind: TokenKind::NotEq, line, col }
                    } else {
                        diagnostics.push(Error::with_span(
                            ErrorKind::Lexical,
                            "Illegal character '!' (did you mean '!='?)",
                            line,
                            col,
                        ));
                        self.advance();
                        continue;
                    }
                }
                Some('<') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token { kind: TokenKind::LessEq, line, col }
                    } else {
                        Token { kind: TokenKind::Less, line, col }
                    }
                }
                Some('>') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token { kind: TokenKind::GreaterEq, line, col }
                    } else {
                        Token { kind: TokenKind::Greater, line, col }
                    }
                }
                Some('"') => {
                    self.advance();
                    match self.read_word(&mut diagnostics) {
                        Some(tk) => tk,
                        None => continue,
                    }
                }
                Some(c) if c.is_ascii_digit() => self.read_number(),
                Some('.') if self.peek_next().map_or(false, |c| c.is_ascii_digit()) => {
                    self.read_number()
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => self.read_ident_or_keyword(),
                Some(other) => {
                    diagnostics.push(Error::with_span(
                        ErrorKind::Lexical,
                        format!("Illegal character '{}'", other),
                        line,
                        col,
                    ));
                    self.advance();
                    continue;
                }
            };
            tokens.push(tk);
        }
        (tokens, diagnostics)
    }
}
