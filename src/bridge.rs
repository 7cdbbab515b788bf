//! Safe wrapper around the C entry points of `alloy-ffi`.
//!
//! The CLI goes through the same ABI a foreign caller would, so what it
//! prints is exactly what crosses the boundary.

use std::ffi::{CString, NulError};
use std::slice;

use alloy_ffi::{
    AlloyFree, AlloyJSONResult, AlloyParseExpressionJSON, AlloyParseFileJSON, Status,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("filename contains a NUL byte")]
    Filename(#[from] NulError),
    #[error("parser returned no payload")]
    NullPayload,
    #[error("payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("unknown status code {0}")]
    UnknownStatus(i32),
}

/// Decoded result of one parse call
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub status: Status,
    pub payload: Value,
}

impl ParseResult {
    pub fn diagnostics(&self) -> &[Value] {
        self.payload["diagnostics"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

pub fn parse_file(filename: &str, data: &[u8]) -> Result<ParseResult, BridgeError> {
    let filename = CString::new(filename)?;
    let result =
        unsafe { AlloyParseFileJSON(filename.as_ptr(), data.as_ptr().cast(), data.len()) };
    consume(result)
}

pub fn parse_expression(text: &str) -> Result<ParseResult, BridgeError> {
    let result = unsafe { AlloyParseExpressionJSON(text.as_ptr().cast(), text.len()) };
    consume(result)
}

/// Frees the payload when dropped
struct Payload(AlloyJSONResult);

impl Drop for Payload {
    fn drop(&mut self) {
        unsafe { AlloyFree(self.0.data) };
    }
}

fn consume(result: AlloyJSONResult) -> Result<ParseResult, BridgeError> {
    let payload = Payload(result);
    if payload.0.data.is_null() {
        return Err(BridgeError::NullPayload);
    }

    let bytes = unsafe { slice::from_raw_parts(payload.0.data.cast::<u8>(), payload.0.length) };
    let value: Value = serde_json::from_slice(bytes)?;
    let status = Status::from_code(payload.0.status)
        .ok_or(BridgeError::UnknownStatus(payload.0.status))?;

    Ok(ParseResult {
        status,
        payload: value,
    })
}
