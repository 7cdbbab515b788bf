//! C ABI for the Alloy syntax parser.
//!
//! Each parse call returns a versioned JSON envelope:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "resultKind": "file",
//!   "file": { "name": "...", "body": [...], "comments": [...] },
//!   "diagnostics": [],
//!   "status": 0
//! }
//! ```
//!
//! `resultKind` names the call (`file` or `expression`). The matching tree
//! is present when the parse produced no errors; warnings keep it. `status`
//! is 0 (ok), 1 (warnings), 2 (error) or 3 (internal error) and is repeated
//! in [`AlloyJSONResult`].
//!
//! The same pipeline is available from Rust through [`EnvelopeBuilder`]:
//!
//! ```
//! use alloy_ffi::{AlloyFrontend, EnvelopeBuilder, Status};
//!
//! let envelope = EnvelopeBuilder::new(AlloyFrontend).parse_expression(b"1 + 2");
//! assert_eq!(envelope.status, Status::Ok);
//! let encoded = envelope.encode();
//! assert!(encoded.json.contains("\"kind\":\"binary\""));
//! ```

pub mod codec;
pub mod diagnostics;
pub mod envelope;
pub mod ffi;
pub mod position;

pub use codec::{AstEncoder, ExprRecord, FileRecord, StmtRecord};
pub use diagnostics::{DiagnosticRecord, Status};
pub use envelope::{
    AlloyFrontend, EncodeError, Encoded, Envelope, EnvelopeBuilder, Frontend, ResultKind,
    SCHEMA_VERSION,
};
pub use ffi::{
    AlloyFree, AlloyJSONResult, AlloyParseExpressionJSON, AlloyParseFileJSON, AlloySchemaVersion,
};
pub use position::PositionRecord;
