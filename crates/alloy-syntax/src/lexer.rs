use std::fmt;

use crate::ast::{Comment, CommentGroup};
use crate::diag::{Diagnostic, Diagnostics};
use crate::pos::{Pos, SourceMap, narrow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,
    /// Statement terminator, produced from a newline
    Terminator,

    // literals
    Ident,
    Number,
    Float,
    String,
    Bool,
    Null,

    // operators
    Assign, // =
    Eq,     // ==
    Neq,    // !=
    Not,    // !
    Lt,     // <
    Lte,    // <=
    Gt,     // >
    Gte,    // >=
    Add,    // +
    Sub,    // -
    Mul,    // *
    Div,    // /
    Mod,    // %
    Pow,    // ^
    And,    // &&
    Or,     // ||

    // punctuation
    Comma,
    Dot,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LCurly,
    RCurly,
}

impl TokenKind {
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::Number | Self::Float | Self::String | Self::Bool | Self::Null
        )
    }

    /// Binding power of a binary operator, or `None` for other tokens
    pub fn binary_precedence(self) -> Option<u8> {
        match self {
            Self::Or => Some(1),
            Self::And => Some(2),
            Self::Eq | Self::Neq | Self::Lt | Self::Lte | Self::Gt | Self::Gte => Some(3),
            Self::Add | Self::Sub => Some(4),
            Self::Mul | Self::Div | Self::Mod => Some(5),
            Self::Pow => Some(6),
            _ => None,
        }
    }

    /// A newline after one of these tokens ends the statement
    fn ends_statement(self) -> bool {
        self == Self::Ident
            || self.is_literal()
            || matches!(self, Self::RParen | Self::RBrack | Self::RCurly)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Illegal => "ILLEGAL",
            Self::Eof => "EOF",
            Self::Terminator => "TERMINATOR",
            Self::Ident => "IDENT",
            Self::Number => "NUMBER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::Bool => "BOOL",
            Self::Null => "NULL",
            Self::Assign => "=",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Not => "!",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
            Self::And => "&&",
            Self::Or => "||",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrack => "[",
            Self::RBrack => "]",
            Self::LCurly => "{",
            Self::RCurly => "}",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
    /// Source text of the token
    pub lit: String,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos, lit: impl Into<String>) -> Self {
        Self {
            kind,
            pos,
            lit: lit.into(),
        }
    }

    /// Position just past the token
    pub fn end(&self) -> Pos {
        self.pos.add(narrow(self.lit.len()))
    }
}

/// Output of [`Lexer::tokenize`]
#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<CommentGroup>,
    pub diags: Diagnostics,
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    map: &'a SourceMap,
    pos: usize,
    /// Kind of the last emitted token, for terminator insertion
    last: TokenKind,
    /// Newlines seen since the last comment, for comment grouping
    newlines_since_comment: u32,
    code_since_comment: bool,
    comments: Vec<CommentGroup>,
    diags: Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, map: &'a SourceMap) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            map,
            pos: 0,
            last: TokenKind::Illegal,
            newlines_since_comment: 0,
            code_since_comment: true,
            comments: Vec::new(),
            diags: Diagnostics::new(),
        }
    }

    pub fn tokenize(mut self) -> Lexed {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            if tok.kind != TokenKind::Terminator {
                self.code_since_comment = true;
            }
            self.last = tok.kind;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Lexed {
            tokens,
            comments: self.comments,
            diags: self.diags,
        }
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.skip_blanks();

            let start = self.pos;
            let Some(ch) = self.peek() else {
                return Token::new(TokenKind::Eof, self.pos_at(start), "");
            };

            match ch {
                b'\n' => {
                    self.pos += 1;
                    self.newlines_since_comment += 1;
                    if self.last.ends_statement() {
                        self.last = TokenKind::Terminator;
                        return Token::new(TokenKind::Terminator, self.pos_at(start), "\n");
                    }
                }
                b'/' if self.peek_at(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => {
                    // a block comment spanning lines acts as a newline
                    if self.block_comment() && self.last.ends_statement() {
                        self.last = TokenKind::Terminator;
                        return Token::new(TokenKind::Terminator, self.pos_at(start), "\n");
                    }
                }
                _ => return self.scan_token(),
            }
        }
    }

    fn scan_token(&mut self) -> Token {
        let start = self.pos;
        let ch = self.bytes[start];

        if is_ident_start(ch) {
            while self.peek().is_some_and(is_ident_continue) {
                self.pos += 1;
            }
            let text = &self.source[start..self.pos];
            let kind = match text {
                "true" | "false" => TokenKind::Bool,
                "null" => TokenKind::Null,
                _ => TokenKind::Ident,
            };
            return self.token(kind, start);
        }

        if ch.is_ascii_digit() {
            return self.number(start);
        }

        self.pos += 1;
        let kind = match ch {
            b'"' => return self.string(start),
            b'`' => return self.raw_string(start),
            b'=' => self.either(b'=', TokenKind::Eq, TokenKind::Assign),
            b'!' => self.either(b'=', TokenKind::Neq, TokenKind::Not),
            b'<' => self.either(b'=', TokenKind::Lte, TokenKind::Lt),
            b'>' => self.either(b'=', TokenKind::Gte, TokenKind::Gt),
            b'&' if self.peek() == Some(b'&') => {
                self.pos += 1;
                TokenKind::And
            }
            b'|' if self.peek() == Some(b'|') => {
                self.pos += 1;
                TokenKind::Or
            }
            b'+' => TokenKind::Add,
            b'-' => TokenKind::Sub,
            b'*' => TokenKind::Mul,
            b'/' => TokenKind::Div,
            b'%' => TokenKind::Mod,
            b'^' => TokenKind::Pow,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBrack,
            b']' => TokenKind::RBrack,
            b'{' => TokenKind::LCurly,
            b'}' => TokenKind::RCurly,
            _ => {
                // consume the whole character so spans stay on char boundaries
                let c = self.source[start..].chars().next().unwrap_or('\u{fffd}');
                self.pos = start + c.len_utf8();
                self.error(start, self.pos, format!("illegal character {:?}", c));
                TokenKind::Illegal
            }
        };
        self.token(kind, start)
    }

    fn number(&mut self, start: usize) -> Token {
        let mut kind = TokenKind::Number;
        self.eat_digits();

        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            kind = TokenKind::Float;
            self.pos += 1;
            self.eat_digits();
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|b| b.is_ascii_digit()) {
                kind = TokenKind::Float;
                self.pos += lookahead;
                self.eat_digits();
            } else {
                self.pos += lookahead;
                self.error(start, self.pos, "exponent has no digits");
                return self.token(TokenKind::Illegal, start);
            }
        }

        self.token(kind, start)
    }

    fn string(&mut self, start: usize) -> Token {
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.error(start, self.pos, "string literal not terminated");
                    return self.token(TokenKind::Illegal, start);
                }
                Some(b'"') => {
                    self.pos += 1;
                    return self.token(TokenKind::String, start);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.escape();
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn escape(&mut self) {
        let esc_start = self.pos - 1;
        let Some(ch) = self.peek() else {
            return;
        };
        let hex_digits = match ch {
            b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' | b'\\' | b'"' => {
                self.pos += 1;
                return;
            }
            b'x' => 2,
            b'u' => 4,
            b'U' => 8,
            b'\n' => {
                self.error(esc_start, self.pos, "unknown escape sequence");
                return;
            }
            _ => {
                let len = self.source[self.pos..].chars().next().map_or(1, char::len_utf8);
                self.pos += len;
                self.error(esc_start, self.pos, "unknown escape sequence");
                return;
            }
        };
        self.pos += 1;
        for _ in 0..hex_digits {
            if !self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.error(esc_start, self.pos, "illegal character in escape sequence");
                return;
            }
            self.pos += 1;
        }
    }

    fn raw_string(&mut self, start: usize) -> Token {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'`' {
                return self.token(TokenKind::String, start);
            }
        }
        self.error(start, self.pos, "raw string literal not terminated");
        self.token(TokenKind::Illegal, start)
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
        let text = self.source[start..self.pos].trim_end_matches('\r');
        self.push_comment(text.to_string(), start);
    }

    /// Returns true when the comment contained a newline
    fn block_comment(&mut self) -> bool {
        let start = self.pos;
        self.pos += 2;
        match self.source[self.pos..].find("*/") {
            Some(rel) => self.pos += rel + 2,
            None => {
                self.pos = self.bytes.len();
                self.error(start, self.pos, "comment not terminated");
            }
        }
        let text = &self.source[start..self.pos];
        let multiline = text.contains('\n');
        self.push_comment(text.to_string(), start);
        multiline
    }

    fn push_comment(&mut self, text: String, start: usize) {
        let comment = Comment {
            text,
            pos: self.pos_at(start),
        };
        let continues_group = !self.code_since_comment && self.newlines_since_comment <= 1;
        match self.comments.last_mut() {
            Some(group) if continues_group => group.0.push(comment),
            _ => self.comments.push(CommentGroup(vec![comment])),
        }
        self.code_since_comment = false;
        self.newlines_since_comment = 0;
    }

    fn skip_blanks(&mut self) {
        while let Some(b' ' | b'\t' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'_') {
            self.pos += 1;
        }
    }

    fn either(&mut self, next: u8, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.pos += 1;
            matched
        } else {
            otherwise
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, self.pos_at(start), &self.source[start..self.pos])
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        let diag = Diagnostic::error(
            self.map.resolve(self.pos_at(start)),
            self.map.resolve(self.pos_at(end)),
            message,
        );
        self.diags.push(diag);
    }

    fn pos_at(&self, offset: usize) -> Pos {
        Pos::at(narrow(offset))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
