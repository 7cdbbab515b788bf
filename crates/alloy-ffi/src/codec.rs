//! Wire records for the syntax tree.
//!
//! Records mirror the AST one to one. Statement and expression records are
//! tagged by `kind`, with the payload stored under a field of the same name,
//! so `{"kind": "literal", "literal": {...}}`. Node kinds this version of the
//! schema has no payload for encode as `{"kind": "unknown"}`.

use alloy_syntax::{
    Comment, CommentGroup, Expr, ExprKind, File, Ident, ObjectField, Pos, SourceMap, Stmt,
};
use serde::Serialize;

use crate::position::{PositionRecord, encode_pos};

#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub body: Vec<StmtRecord>,
    pub comments: Vec<CommentGroupRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentGroupRecord {
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRecord {
    pub text: String,
    pub pos: PositionRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentRecord {
    pub name: String,
    pub pos: PositionRecord,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StmtRecord {
    Attribute { attribute: AttributeRecord },
    Block { block: BlockRecord },
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeRecord {
    pub name: IdentRecord,
    pub value: ExprRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub name: Vec<String>,
    pub name_pos: PositionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub label_pos: PositionRecord,
    pub body: Vec<StmtRecord>,
    #[serde(rename = "lCurlyPos")]
    pub lcurly_pos: PositionRecord,
    #[serde(rename = "rCurlyPos")]
    pub rcurly_pos: PositionRecord,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ExprRecord {
    #[serde(flatten)]
    pub node: ExprNode,
    pub secret: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExprNode {
    Identifier { identifier: IdentifierRecord },
    Literal { literal: LiteralRecord },
    Array { array: ArrayRecord },
    Object { object: ObjectRecord },
    Access { access: AccessRecord },
    Index { index: IndexRecord },
    Call { call: CallRecord },
    Unary { unary: UnaryRecord },
    Binary { binary: BinaryRecord },
    Paren { paren: ParenRecord },
    Unknown,
}

impl ExprNode {
    /// The `kind` tag this node serializes with
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Identifier { .. } => "identifier",
            Self::Literal { .. } => "literal",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
            Self::Access { .. } => "access",
            Self::Index { .. } => "index",
            Self::Call { .. } => "call",
            Self::Unary { .. } => "unary",
            Self::Binary { .. } => "binary",
            Self::Paren { .. } => "paren",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentifierRecord {
    pub ident: IdentRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralRecord {
    /// Token kind, e.g. `STRING` or `NUMBER`
    pub token: String,
    pub value: String,
    pub value_pos: PositionRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrayRecord {
    pub elements: Vec<ExprRecord>,
    #[serde(rename = "lBrackPos")]
    pub lbrack_pos: PositionRecord,
    #[serde(rename = "rBrackPos")]
    pub rbrack_pos: PositionRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectRecord {
    pub fields: Vec<ObjectFieldRecord>,
    #[serde(rename = "lCurlyPos")]
    pub lcurly_pos: PositionRecord,
    #[serde(rename = "rCurlyPos")]
    pub rcurly_pos: PositionRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectFieldRecord {
    pub name: IdentRecord,
    pub quoted: bool,
    pub value: ExprRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessRecord {
    pub value: Box<ExprRecord>,
    pub name: IdentRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexRecord {
    pub value: Box<ExprRecord>,
    pub index: Box<ExprRecord>,
    #[serde(rename = "lBrackPos")]
    pub lbrack_pos: PositionRecord,
    #[serde(rename = "rBrackPos")]
    pub rbrack_pos: PositionRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub value: Box<ExprRecord>,
    pub args: Vec<ExprRecord>,
    #[serde(rename = "lParenPos")]
    pub lparen_pos: PositionRecord,
    #[serde(rename = "rParenPos")]
    pub rparen_pos: PositionRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnaryRecord {
    pub operator: String,
    pub operator_pos: PositionRecord,
    pub value: Box<ExprRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryRecord {
    pub operator: String,
    pub operator_pos: PositionRecord,
    pub left: Box<ExprRecord>,
    pub right: Box<ExprRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParenRecord {
    pub inner: Box<ExprRecord>,
    #[serde(rename = "lParenPos")]
    pub lparen_pos: PositionRecord,
    #[serde(rename = "rParenPos")]
    pub rparen_pos: PositionRecord,
}

// ============================================================================
// Encoder
// ============================================================================

/// Converts AST nodes into records, resolving positions against `map`
pub struct AstEncoder<'a> {
    map: &'a SourceMap,
}

impl<'a> AstEncoder<'a> {
    pub fn new(map: &'a SourceMap) -> Self {
        Self { map }
    }

    pub fn file(&self, file: &File) -> FileRecord {
        FileRecord {
            name: file.name.clone(),
            body: self.body(&file.body),
            comments: file.comments.iter().map(|g| self.comment_group(g)).collect(),
        }
    }

    fn body(&self, body: &[Stmt]) -> Vec<StmtRecord> {
        body.iter().map(|stmt| self.stmt(stmt)).collect()
    }

    pub fn stmt(&self, stmt: &Stmt) -> StmtRecord {
        match stmt {
            Stmt::Attribute(attr) => StmtRecord::Attribute {
                attribute: AttributeRecord {
                    name: self.ident(&attr.name),
                    value: self.expr(&attr.value),
                },
            },
            Stmt::Block(block) => StmtRecord::Block {
                block: BlockRecord {
                    name: block.name.clone(),
                    name_pos: self.pos(block.name_pos),
                    label: block.label.clone(),
                    label_pos: self.pos(block.label_pos),
                    body: self.body(&block.body),
                    lcurly_pos: self.pos(block.lcurly_pos),
                    rcurly_pos: self.pos(block.rcurly_pos),
                },
            },
            _ => StmtRecord::Unknown,
        }
    }

    pub fn expr(&self, expr: &Expr) -> ExprRecord {
        let node = match &expr.kind {
            ExprKind::Identifier(ident) => ExprNode::Identifier {
                identifier: IdentifierRecord {
                    ident: self.ident(ident),
                },
            },
            ExprKind::Literal(lit) => ExprNode::Literal {
                literal: LiteralRecord {
                    token: lit.kind.to_string(),
                    value: lit.value.clone(),
                    value_pos: self.pos(lit.value_pos),
                },
            },
            ExprKind::Array(arr) => ExprNode::Array {
                array: ArrayRecord {
                    elements: self.exprs(&arr.elements),
                    lbrack_pos: self.pos(arr.lbrack_pos),
                    rbrack_pos: self.pos(arr.rbrack_pos),
                },
            },
            ExprKind::Object(obj) => ExprNode::Object {
                object: ObjectRecord {
                    fields: obj.fields.iter().map(|f| self.field(f)).collect(),
                    lcurly_pos: self.pos(obj.lcurly_pos),
                    rcurly_pos: self.pos(obj.rcurly_pos),
                },
            },
            ExprKind::Access(acc) => ExprNode::Access {
                access: AccessRecord {
                    value: self.boxed(&acc.value),
                    name: self.ident(&acc.name),
                },
            },
            ExprKind::Index(idx) => ExprNode::Index {
                index: IndexRecord {
                    value: self.boxed(&idx.value),
                    index: self.boxed(&idx.index),
                    lbrack_pos: self.pos(idx.lbrack_pos),
                    rbrack_pos: self.pos(idx.rbrack_pos),
                },
            },
            ExprKind::Call(call) => ExprNode::Call {
                call: CallRecord {
                    value: self.boxed(&call.value),
                    args: self.exprs(&call.args),
                    lparen_pos: self.pos(call.lparen_pos),
                    rparen_pos: self.pos(call.rparen_pos),
                },
            },
            ExprKind::Unary(un) => ExprNode::Unary {
                unary: UnaryRecord {
                    operator: un.op.to_string(),
                    operator_pos: self.pos(un.op_pos),
                    value: self.boxed(&un.value),
                },
            },
            ExprKind::Binary(bin) => ExprNode::Binary {
                binary: BinaryRecord {
                    operator: bin.op.to_string(),
                    operator_pos: self.pos(bin.op_pos),
                    left: self.boxed(&bin.left),
                    right: self.boxed(&bin.right),
                },
            },
            ExprKind::Paren(paren) => ExprNode::Paren {
                paren: ParenRecord {
                    inner: self.boxed(&paren.inner),
                    lparen_pos: self.pos(paren.lparen_pos),
                    rparen_pos: self.pos(paren.rparen_pos),
                },
            },
            _ => ExprNode::Unknown,
        };

        ExprRecord {
            node,
            secret: expr.secret,
        }
    }

    fn exprs(&self, exprs: &[Expr]) -> Vec<ExprRecord> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn boxed(&self, expr: &Expr) -> Box<ExprRecord> {
        Box::new(self.expr(expr))
    }

    fn field(&self, field: &ObjectField) -> ObjectFieldRecord {
        ObjectFieldRecord {
            name: self.ident(&field.name),
            quoted: field.quoted,
            value: self.expr(&field.value),
        }
    }

    fn ident(&self, ident: &Ident) -> IdentRecord {
        IdentRecord {
            name: ident.name.clone(),
            pos: self.pos(ident.pos),
        }
    }

    fn comment_group(&self, group: &CommentGroup) -> CommentGroupRecord {
        CommentGroupRecord {
            comments: group.0.iter().map(|c| self.comment(c)).collect(),
        }
    }

    fn comment(&self, comment: &Comment) -> CommentRecord {
        CommentRecord {
            text: comment.text.clone(),
            pos: self.pos(comment.pos),
        }
    }

    fn pos(&self, pos: Pos) -> PositionRecord {
        encode_pos(self.map, pos)
    }
}
