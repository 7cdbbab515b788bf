use crate::diag::Diagnostics;
use crate::lexer::TokenKind;
use crate::pos::{Pos, SourceMap};

/// A parse result together with the line table its positions resolve against
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub node: T,
    pub source: SourceMap,
    /// Non-fatal diagnostics reported alongside the tree
    pub warnings: Diagnostics,
}

impl<T> Parsed<T> {
    pub fn new(node: T, source: SourceMap) -> Self {
        Self {
            node,
            source,
            warnings: Diagnostics::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Diagnostics) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Parsed<U> {
        Parsed {
            node: f(self.node),
            source: self.source,
            warnings: self.warnings,
        }
    }
}

/// Root of the AST - a complete config file
#[derive(Debug, Clone, Default)]
pub struct File {
    pub name: String,
    /// Statements in source order
    pub body: Vec<Stmt>,
    pub comments: Vec<CommentGroup>,
}

/// Adjacent comments with no blank line or code between them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentGroup(pub Vec<Comment>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Full comment text including the `//` or `/* */` markers
    pub text: String,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Stmt {
    /// `name = value`
    Attribute(AttributeStmt),
    /// `a.b "label" { ... }`
    Block(BlockStmt),
    /// Statement produced by a grammar extension
    Extension(ExtensionNode),
}

#[derive(Debug, Clone)]
pub struct AttributeStmt {
    pub name: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    /// Dotted block type, e.g. `["prometheus", "scrape"]`
    pub name: Vec<String>,
    pub name_pos: Pos,
    /// Unquoted label text
    pub label: Option<String>,
    pub label_pos: Pos,
    pub body: Vec<Stmt>,
    pub lcurly_pos: Pos,
    pub rcurly_pos: Pos,
}

/// A node kind the core grammar does not define
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionNode {
    pub name: String,
    pub pos: Pos,
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression node.
///
/// `secret` marks values that must not be displayed or logged. Constructors
/// for compound expressions set it when any child is secret.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub secret: bool,
    /// Height of the subtree rooted here; leaves are 1
    pub depth: u32,
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ExprKind {
    Identifier(Ident),
    Literal(LiteralExpr),
    Array(ArrayExpr),
    Object(ObjectExpr),
    Access(AccessExpr),
    Index(IndexExpr),
    Call(CallExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Paren(ParenExpr),
    Extension(ExtensionNode),
}

#[derive(Debug, Clone)]
pub struct LiteralExpr {
    /// One of the literal token kinds (`NUMBER`, `FLOAT`, `STRING`, `BOOL`, `NULL`)
    pub kind: TokenKind,
    /// Raw source text, quotes included for strings
    pub value: String,
    pub value_pos: Pos,
}

#[derive(Debug, Clone)]
pub struct ArrayExpr {
    pub elements: Vec<Expr>,
    pub lbrack_pos: Pos,
    pub rbrack_pos: Pos,
}

#[derive(Debug, Clone)]
pub struct ObjectExpr {
    pub fields: Vec<ObjectField>,
    pub lcurly_pos: Pos,
    pub rcurly_pos: Pos,
}

#[derive(Debug, Clone)]
pub struct ObjectField {
    pub name: Ident,
    /// Whether the key was written as a string literal
    pub quoted: bool,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct AccessExpr {
    pub value: Box<Expr>,
    pub name: Ident,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub value: Box<Expr>,
    pub index: Box<Expr>,
    pub lbrack_pos: Pos,
    pub rbrack_pos: Pos,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub value: Box<Expr>,
    pub args: Vec<Expr>,
    pub lparen_pos: Pos,
    pub rparen_pos: Pos,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: TokenKind,
    pub op_pos: Pos,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: TokenKind,
    pub op_pos: Pos,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct ParenExpr {
    pub inner: Box<Expr>,
    pub lparen_pos: Pos,
    pub rparen_pos: Pos,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        let children = kind.children();
        let secret = children.iter().any(|child| child.secret);
        let depth = children.iter().map(|child| child.depth).max().unwrap_or(0).saturating_add(1);
        Self {
            kind,
            secret,
            depth,
        }
    }

    /// Mark this node as holding a sensitive value
    pub fn into_secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn identifier(name: impl Into<String>, pos: Pos) -> Self {
        Self::new(ExprKind::Identifier(Ident::new(name, pos)))
    }

    pub fn literal(kind: TokenKind, value: impl Into<String>, value_pos: Pos) -> Self {
        Self::new(ExprKind::Literal(LiteralExpr {
            kind,
            value: value.into(),
            value_pos,
        }))
    }

    pub fn access(value: Expr, name: Ident) -> Self {
        Self::new(ExprKind::Access(AccessExpr {
            value: Box::new(value),
            name,
        }))
    }

    pub fn call(value: Expr, args: Vec<Expr>, lparen_pos: Pos, rparen_pos: Pos) -> Self {
        Self::new(ExprKind::Call(CallExpr {
            value: Box::new(value),
            args,
            lparen_pos,
            rparen_pos,
        }))
    }

    pub fn binary(op: TokenKind, op_pos: Pos, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary(BinaryExpr {
            op,
            op_pos,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    pub fn unary(op: TokenKind, op_pos: Pos, value: Expr) -> Self {
        Self::new(ExprKind::Unary(UnaryExpr {
            op,
            op_pos,
            value: Box::new(value),
        }))
    }

    /// Position of the first token of the expression
    pub fn start_pos(&self) -> Pos {
        match &self.kind {
            ExprKind::Identifier(ident) => ident.pos,
            ExprKind::Literal(lit) => lit.value_pos,
            ExprKind::Array(arr) => arr.lbrack_pos,
            ExprKind::Object(obj) => obj.lcurly_pos,
            ExprKind::Access(acc) => acc.value.start_pos(),
            ExprKind::Index(idx) => idx.value.start_pos(),
            ExprKind::Call(call) => call.value.start_pos(),
            ExprKind::Unary(un) => un.op_pos,
            ExprKind::Binary(bin) => bin.left.start_pos(),
            ExprKind::Paren(paren) => paren.lparen_pos,
            ExprKind::Extension(ext) => ext.pos,
        }
    }
}

impl ExprKind {
    /// Direct sub-expressions, in source order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            ExprKind::Identifier(_) | ExprKind::Literal(_) | ExprKind::Extension(_) => Vec::new(),
            ExprKind::Array(arr) => arr.elements.iter().collect(),
            ExprKind::Object(obj) => obj.fields.iter().map(|f| &f.value).collect(),
            ExprKind::Access(acc) => vec![&*acc.value],
            ExprKind::Index(idx) => vec![&*idx.value, &*idx.index],
            ExprKind::Call(call) => std::iter::once(call.value.as_ref())
                .chain(call.args.iter())
                .collect(),
            ExprKind::Unary(un) => vec![&*un.value],
            ExprKind::Binary(bin) => vec![&*bin.left, &*bin.right],
            ExprKind::Paren(paren) => vec![&*paren.inner],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_propagates_to_wrappers() {
        let token = Expr::literal(TokenKind::String, "\"hunter2\"", Pos::at(10)).into_secret();
        let access = Expr::access(token, Ident::new("value", Pos::at(20)));
        assert!(access.secret);

        let call = Expr::call(
            Expr::identifier("encode", Pos::at(0)),
            vec![access],
            Pos::at(6),
            Pos::at(30),
        );
        assert!(call.secret);
    }

    #[test]
    fn plain_nodes_are_not_secret() {
        let sum = Expr::binary(
            TokenKind::Add,
            Pos::at(2),
            Expr::literal(TokenKind::Number, "1", Pos::at(0)),
            Expr::literal(TokenKind::Number, "2", Pos::at(4)),
        );
        assert!(!sum.secret);
        assert_eq!(sum.start_pos(), Pos::at(0));
    }

    #[test]
    fn depth_tracks_tallest_child() {
        let leaf = Expr::identifier("a", Pos::at(0));
        assert_eq!(leaf.depth, 1);

        let access = Expr::access(leaf.clone(), Ident::new("b", Pos::at(2)));
        let sum = Expr::binary(TokenKind::Add, Pos::at(4), access, leaf);
        assert_eq!(sum.depth, 3);
    }
}
