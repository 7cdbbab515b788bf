//! Lexer, AST and parser for Alloy configuration files.
//!
//! Positions in the tree are opaque [`Pos`] handles; every successful parse
//! comes back as a [`Parsed`] value that carries the [`SourceMap`] needed to
//! resolve them into filename, line and column.
//!
//! # Example
//!
//! ```
//! use alloy_syntax::{Stmt, parse_file};
//!
//! let source = r#"
//! // collect local metrics
//! prometheus.scrape "default" {
//!     targets = [{"__address__" = "localhost:9090"}]
//! }
//! "#;
//!
//! let parsed = parse_file("config.alloy", source.as_bytes()).unwrap();
//! for stmt in &parsed.node.body {
//!     if let Stmt::Block(block) = stmt {
//!         println!("block: {}", block.name.join("."));
//!     }
//! }
//! ```

pub mod ast;
pub mod diag;
pub mod lexer;
pub mod parser;
pub mod pos;

pub use ast::*;
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use lexer::{Token, TokenKind};
pub use parser::{MAX_EXPR_DEPTH, MAX_NESTING, parse_expression, parse_file};
pub use pos::{MAX_SOURCE_LEN, Pos, Position, SourceMap};
