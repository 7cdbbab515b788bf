use crate::ast::{
    ArrayExpr, AttributeStmt, BlockStmt, Expr, ExprKind, File, Ident, IndexExpr, ObjectExpr,
    ObjectField, Parsed, ParenExpr, Stmt,
};
use crate::diag::{Diagnostic, Diagnostics};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::pos::{MAX_SOURCE_LEN, Pos, Position, SourceMap, narrow};

type PResult<T> = Result<T, Diagnostic>;

/// Limit on nested brackets, unary operators, right-associative chains and
/// blocks. Each level costs several stack frames while parsing.
pub const MAX_NESTING: u32 = 128;

/// Limit on the height of an expression tree, including left-associative
/// operator chains and postfix chains that the parser builds iteratively.
pub const MAX_EXPR_DEPTH: u32 = 512;

/// Parse a complete config file.
///
/// `data` must be UTF-8; the first invalid byte is reported as an error.
/// Error diagnostics make the result an `Err`; warnings ride along in
/// [`Parsed::warnings`].
pub fn parse_file(filename: &str, data: &[u8]) -> Result<Parsed<File>, Diagnostics> {
    check_size(filename, data.len())?;
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(err) => {
            let valid = err.valid_up_to();
            let map = SourceMap::new(filename, &String::from_utf8_lossy(&data[..valid]));
            let at = map.resolve(Pos::at(narrow(valid)));
            return Err(Diagnostics::from(vec![Diagnostic::error(
                at.clone(),
                at,
                "illegal UTF-8 encoding",
            )]));
        }
    };

    let map = SourceMap::new(filename, text);
    let lexed = Lexer::new(text, &map).tokenize();
    let mut parser = Parser::new(lexed.tokens, &map, lexed.diags);
    let body = parser.parse_body(false);
    let diags = parser.diags;

    if diags.has_errors() {
        return Err(diags);
    }
    let file = File {
        name: filename.to_string(),
        body,
        comments: lexed.comments,
    };
    Ok(Parsed::new(file, map).with_warnings(diags))
}

/// Parse a single expression. Anything after the expression is an error.
pub fn parse_expression(text: &str) -> Result<Parsed<Expr>, Diagnostics> {
    check_size("", text.len())?;
    let map = SourceMap::new("", text);
    let lexed = Lexer::new(text, &map).tokenize();
    let mut parser = Parser::new(lexed.tokens, &map, lexed.diags);

    let expr = parser.parse_expr().and_then(|expr| {
        parser.skip_terminators();
        if parser.at_end() {
            Ok(expr)
        } else {
            let tok = parser.peek().clone();
            Err(parser.error_at(&tok, format!("expected EOF, got {}", tok.kind)))
        }
    });
    if let Err(diag) = &expr {
        parser.report(diag.clone());
    }
    let diags = parser.diags;

    match expr {
        Ok(expr) if !diags.has_errors() => Ok(Parsed::new(expr, map).with_warnings(diags)),
        _ => Err(diags),
    }
}

/// Reject sources whose offsets would not fit a [`Pos`]
fn check_size(filename: &str, len: usize) -> Result<(), Diagnostics> {
    if len <= MAX_SOURCE_LEN {
        return Ok(());
    }
    let at = Position {
        filename: filename.to_string(),
        ..Position::default()
    };
    Err(Diagnostics::from(vec![Diagnostic::error(
        at.clone(),
        at,
        format!("source is too large ({len} bytes, limit is {MAX_SOURCE_LEN})"),
    )]))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    map: &'a SourceMap,
    /// Bracket depth; newlines are insignificant while it is non-zero
    nest: u32,
    /// Recursion depth, bounded by [`MAX_NESTING`]
    depth: u32,
    /// Set once [`MAX_NESTING`] is hit; parsing stops at that point
    too_deep: bool,
    diags: Diagnostics,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, map: &'a SourceMap, diags: Diagnostics) -> Self {
        Self {
            tokens,
            pos: 0,
            map,
            nest: 0,
            depth: 0,
            too_deep: false,
            diags,
        }
    }

    /// Statements up to EOF, or up to the closing brace of a block body
    fn parse_body(&mut self, in_block: bool) -> Vec<Stmt> {
        let mut body = Vec::new();

        while !self.too_deep {
            self.skip_terminators();
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::RCurly if in_block => break,
                _ => {}
            }

            match self.parse_stmt(in_block) {
                Ok(stmt) => body.push(stmt),
                Err(diag) => {
                    self.report(diag);
                    if self.too_deep {
                        break;
                    }
                    self.recover(in_block);
                }
            }
        }

        body
    }

    fn parse_stmt(&mut self, in_block: bool) -> PResult<Stmt> {
        let first = self.expect(TokenKind::Ident).map_err(|_| {
            let tok = self.peek().clone();
            self.error_at(
                &tok,
                format!("expected attribute assignment or block body, got {}", tok.kind),
            )
        })?;

        let mut name = vec![first.lit.clone()];
        while self.check(TokenKind::Dot) {
            self.advance();
            name.push(self.expect(TokenKind::Ident)?.lit);
        }

        let next = self.peek().clone();
        let stmt = match next.kind {
            TokenKind::Assign if name.len() == 1 => {
                self.advance();
                let value = self.parse_expr()?;
                Stmt::Attribute(AttributeStmt {
                    name: Ident::new(first.lit, first.pos),
                    value,
                })
            }
            TokenKind::Assign => {
                return Err(self.error_at(
                    &next,
                    "attribute names may only consist of a single identifier",
                ));
            }
            TokenKind::String | TokenKind::LCurly => {
                let name_pos = first.pos;
                self.descend("block", |p| p.parse_block(name, name_pos))?
            }
            _ => {
                return Err(self.error_at(
                    &next,
                    format!("expected attribute assignment or block body, got {}", next.kind),
                ));
            }
        };

        // statement must end the line, the file or the enclosing block
        let end = self.peek().clone();
        match end.kind {
            TokenKind::Terminator => {
                self.advance();
            }
            TokenKind::Eof => {}
            TokenKind::RCurly if in_block => {}
            _ => {
                return Err(self.error_at(
                    &end,
                    format!("expected TERMINATOR, got {}", end.kind),
                ));
            }
        }

        Ok(stmt)
    }

    fn parse_block(&mut self, name: Vec<String>, name_pos: Pos) -> PResult<Stmt> {
        let (label, label_pos) = if self.check(TokenKind::String) {
            let tok = self.advance();
            (Some(unquote(&tok.lit).to_string()), tok.pos)
        } else {
            (None, Pos::NONE)
        };

        let lcurly = self.expect(TokenKind::LCurly)?;
        let body = self.parse_body(true);
        let rcurly = self.expect(TokenKind::RCurly)?;

        Ok(Stmt::Block(BlockStmt {
            name,
            name_pos,
            label,
            label_pos,
            body,
            lcurly_pos: lcurly.pos,
            rcurly_pos: rcurly.pos,
        }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary(1)
    }

    /// Precedence climbing over binary operators; `^` is right-associative
    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        self.descend("expression", |p| {
            let mut left = p.parse_unary()?;

            loop {
                let op = p.peek().clone();
                let Some(prec) = op.kind.binary_precedence() else {
                    break;
                };
                if prec < min_prec {
                    break;
                }
                p.advance();

                let next_min = if op.kind == TokenKind::Pow { prec } else { prec + 1 };
                let right = p.parse_binary(next_min)?;
                left = p.bounded(Expr::binary(op.kind, op.pos, left, right), &op)?;
            }

            Ok(left)
        })
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if matches!(self.peek().kind, TokenKind::Not | TokenKind::Sub) {
            let op = self.advance();
            let value = self.descend("expression", Self::parse_unary)?;
            return self.bounded(Expr::unary(op.kind, op.pos, value), &op);
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect(TokenKind::Ident)?;
                    let access = Expr::access(expr, Ident::new(name.lit.clone(), name.pos));
                    expr = self.bounded(access, &name)?;
                }
                TokenKind::LBrack => {
                    let lbrack = self.open();
                    let index = self.parse_expr()?;
                    let rbrack = self.close(TokenKind::RBrack)?;
                    let indexed = Expr::new(ExprKind::Index(IndexExpr {
                        value: Box::new(expr),
                        index: Box::new(index),
                        lbrack_pos: lbrack.pos,
                        rbrack_pos: rbrack.pos,
                    }));
                    expr = self.bounded(indexed, &lbrack)?;
                }
                TokenKind::LParen => {
                    let lparen = self.open();
                    let args =
                        self.parse_list(TokenKind::RParen, "argument list", Self::parse_expr)?;
                    let rparen = self.close(TokenKind::RParen)?;
                    let call = Expr::call(expr, args, lparen.pos, rparen.pos);
                    expr = self.bounded(call, &lparen)?;
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident => {
                self.advance();
                Ok(Expr::identifier(tok.lit, tok.pos))
            }
            kind if kind.is_literal() => {
                self.advance();
                Ok(Expr::literal(kind, tok.lit, tok.pos))
            }
            TokenKind::LBrack => {
                let lbrack = self.open();
                let elements =
                    self.parse_list(TokenKind::RBrack, "array literal", Self::parse_expr)?;
                let rbrack = self.close(TokenKind::RBrack)?;
                let array = Expr::new(ExprKind::Array(ArrayExpr {
                    elements,
                    lbrack_pos: lbrack.pos,
                    rbrack_pos: rbrack.pos,
                }));
                self.bounded(array, &lbrack)
            }
            TokenKind::LCurly => {
                let lcurly = self.open();
                let fields =
                    self.parse_list(TokenKind::RCurly, "object literal", Self::parse_field)?;
                let rcurly = self.close(TokenKind::RCurly)?;
                let object = Expr::new(ExprKind::Object(ObjectExpr {
                    fields,
                    lcurly_pos: lcurly.pos,
                    rcurly_pos: rcurly.pos,
                }));
                self.bounded(object, &lcurly)
            }
            TokenKind::LParen => {
                let lparen = self.open();
                let inner = self.parse_expr()?;
                let rparen = self.close(TokenKind::RParen)?;
                let paren = Expr::new(ExprKind::Paren(ParenExpr {
                    inner: Box::new(inner),
                    lparen_pos: lparen.pos,
                    rparen_pos: rparen.pos,
                }));
                self.bounded(paren, &lparen)
            }
            _ => Err(self.error_at(&tok, format!("expected expression, got {}", tok.kind))),
        }
    }

    fn parse_field(&mut self) -> PResult<ObjectField> {
        let tok = self.peek().clone();
        let (name, quoted) = match tok.kind {
            TokenKind::Ident => (Ident::new(tok.lit.clone(), tok.pos), false),
            TokenKind::String => (Ident::new(unquote(&tok.lit), tok.pos), true),
            _ => {
                return Err(self.error_at(
                    &tok,
                    format!("expected field name (string or identifier), got {}", tok.kind),
                ));
            }
        };
        self.advance();
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        Ok(ObjectField {
            name,
            quoted,
            value,
        })
    }

    /// Comma-separated items up to (not including) `close`. A trailing comma
    /// is allowed.
    fn parse_list<T>(
        &mut self,
        close: TokenKind,
        what: &str,
        mut item: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        let mut items = Vec::new();
        while !self.check(close) && !self.at_end() {
            items.push(item(self)?);
            if self.check(TokenKind::Comma) {
                self.advance();
            } else if !self.check(close) {
                let tok = self.peek().clone();
                return Err(self.error_at(&tok, format!("missing ',' in {what}")));
            }
        }
        Ok(items)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Index of the next significant token
    fn lookahead(&self) -> usize {
        let last = self.tokens.len() - 1;
        let mut idx = self.pos.min(last);
        if self.nest > 0 {
            while idx < last && self.tokens[idx].kind == TokenKind::Terminator {
                idx += 1;
            }
        }
        idx
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.lookahead()]
    }

    fn advance(&mut self) -> Token {
        let idx = self.lookahead();
        let tok = self.tokens[idx].clone();
        if idx < self.tokens.len() - 1 {
            self.pos = idx + 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek().clone();
            Err(self.error_at(&tok, format!("expected {}, got {}", kind, tok.kind)))
        }
    }

    /// Consume an opening bracket
    fn open(&mut self) -> Token {
        let tok = self.advance();
        self.nest += 1;
        tok
    }

    /// Consume a closing bracket
    fn close(&mut self, kind: TokenKind) -> PResult<Token> {
        let tok = self.expect(kind)?;
        self.nest -= 1;
        Ok(tok)
    }

    /// Run `f` one nesting level deeper, failing once [`MAX_NESTING`] is hit
    fn descend<T>(&mut self, what: &str, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            self.too_deep = true;
            let tok = self.peek().clone();
            return Err(self.error_at(&tok, format!("{what} nested too deeply")));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Reject expressions taller than [`MAX_EXPR_DEPTH`]
    fn bounded(&self, expr: Expr, at: &Token) -> PResult<Expr> {
        if expr.depth > MAX_EXPR_DEPTH {
            return Err(self.error_at(at, "expression nested too deeply"));
        }
        Ok(expr)
    }

    fn skip_terminators(&mut self) {
        while self.check(TokenKind::Terminator) {
            self.advance();
        }
    }

    /// Skip to the start of the next statement
    fn recover(&mut self, in_block: bool) {
        self.nest = 0;
        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::RCurly if in_block => break,
                TokenKind::Terminator => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn error_at(&self, tok: &Token, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(
            self.map.resolve(tok.pos),
            self.map.resolve(tok.end()),
            message,
        )
    }

    /// Record a diagnostic unless one was already reported for the same line
    fn report(&mut self, diag: Diagnostic) {
        let duplicate = self.diags.iter().any(|d| d.start.line == diag.start.line);
        if !duplicate {
            self.diags.push(diag);
        }
    }
}

/// Strip the delimiters from a string token
fn unquote(lit: &str) -> &str {
    let inner = lit.strip_prefix(['"', '`']).unwrap_or(lit);
    inner.strip_suffix(['"', '`']).unwrap_or(inner)
}
