//! `extern "C"` entry points.
//!
//! Every call is synchronous and independent. Returned buffers are
//! NUL-terminated UTF-8 JSON owned by the caller until passed to
//! [`AlloyFree`].

#![allow(non_snake_case)]

use std::ffi::{CStr, CString, c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use tracing::warn;

use crate::diagnostics::Status;
use crate::envelope::{
    AlloyFrontend, EncodeError, Encoded, Envelope, EnvelopeBuilder, ResultKind, SCHEMA_VERSION,
    fallback, panic_message,
};

/// Result of a parse call.
///
/// `data` points to `length` bytes of JSON followed by a NUL byte. `status`
/// repeats the envelope's `status` field.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AlloyJSONResult {
    pub data: *mut c_char,
    pub length: usize,
    pub status: c_int,
}

/// Parse a config file and return its envelope as JSON.
///
/// # Safety
/// `filename` must be null or a valid NUL-terminated string. `data` must be
/// null or valid for reads of `len` bytes. The returned `data` must be
/// released exactly once with [`AlloyFree`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn AlloyParseFileJSON(
    filename: *const c_char,
    data: *const c_char,
    len: usize,
) -> AlloyJSONResult {
    transfer(ResultKind::File, || {
        let filename = unsafe { decode_str(filename) };
        let data = unsafe { decode_bytes(data, len) };
        EnvelopeBuilder::new(AlloyFrontend)
            .parse_file(&filename, data)
            .encode()
    })
}

/// Parse a single expression and return its envelope as JSON.
///
/// # Safety
/// `data` must be null or valid for reads of `len` bytes. The returned
/// `data` must be released exactly once with [`AlloyFree`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn AlloyParseExpressionJSON(
    data: *const c_char,
    len: usize,
) -> AlloyJSONResult {
    transfer(ResultKind::Expression, || {
        let data = unsafe { decode_bytes(data, len) };
        EnvelopeBuilder::new(AlloyFrontend)
            .parse_expression(data)
            .encode()
    })
}

/// Release a buffer returned by a parse call. Null is a no-op.
///
/// # Safety
/// `ptr` must be null or a `data` pointer returned by this library that has
/// not been freed yet. Any other pointer is undefined behavior.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn AlloyFree(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Schema version of the JSON produced by the parse calls
#[unsafe(no_mangle)]
pub extern "C" fn AlloySchemaVersion() -> c_int {
    SCHEMA_VERSION as c_int
}

/// Borrow a C string, treating null as empty
unsafe fn decode_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Borrow a length-delimited buffer, treating null or zero length as empty
unsafe fn decode_bytes<'a>(ptr: *const c_char, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        return &[];
    }
    unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len) }
}

/// Run `build` and hand the resulting JSON to the caller
fn transfer(kind: ResultKind, build: impl FnOnce() -> Encoded) -> AlloyJSONResult {
    let encoded = match panic::catch_unwind(AssertUnwindSafe(build)) {
        Ok(encoded) => encoded,
        Err(payload) => {
            let message = panic_message(&*payload).to_string();
            warn!(panic = %message, "boundary call panicked");
            Envelope::internal_error(kind, message).encode()
        }
    };

    match into_raw(encoded) {
        Ok(result) => result,
        Err(err) => into_raw(fallback(kind, &err)).unwrap_or(AlloyJSONResult {
            data: ptr::null_mut(),
            length: 0,
            status: Status::InternalError.code(),
        }),
    }
}

fn into_raw(encoded: Encoded) -> Result<AlloyJSONResult, EncodeError> {
    let length = encoded.json.len();
    let c_string =
        CString::new(encoded.json).map_err(|err| EncodeError::InteriorNul(err.nul_position()))?;
    Ok(AlloyJSONResult {
        data: c_string.into_raw(),
        length,
        status: encoded.status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_nul_is_an_encoding_fault() {
        let err = into_raw(Encoded {
            json: "{\"a\":\"\0\"}".to_string(),
            kind: ResultKind::File,
            status: Status::Ok,
        })
        .unwrap_err();
        assert!(matches!(err, EncodeError::InteriorNul(6)));
    }

    #[test]
    fn transfer_replaces_unsendable_payload() {
        let result = transfer(ResultKind::Expression, || Encoded {
            json: "bad\0json".to_string(),
            kind: ResultKind::Expression,
            status: Status::Ok,
        });
        assert_eq!(result.status, Status::InternalError.code());
        assert!(!result.data.is_null());

        let json = unsafe { CStr::from_ptr(result.data) }.to_str().unwrap().to_string();
        assert_eq!(json.len(), result.length);
        assert!(json.contains("NUL byte at offset 3"));
        assert!(json.contains(r#""resultKind":"expression""#));
        unsafe { AlloyFree(result.data) };
    }

    #[test]
    fn transfer_contains_panics() {
        let result = transfer(ResultKind::File, || panic!("encoder exploded"));
        assert_eq!(result.status, Status::InternalError.code());

        let json = unsafe { CStr::from_ptr(result.data) }.to_str().unwrap().to_string();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], 3);
        assert_eq!(value["resultKind"], "file");
        assert_eq!(
            value["diagnostics"][0]["message"],
            "internal error: encoder exploded"
        );
        unsafe { AlloyFree(result.data) };
    }

    #[test]
    fn null_inputs_decode_as_empty() {
        assert_eq!(unsafe { decode_str(ptr::null()) }, "");
        assert!(unsafe { decode_bytes(ptr::null(), 42) }.is_empty());
        let text = b"abc";
        assert!(unsafe { decode_bytes(text.as_ptr().cast(), 0) }.is_empty());
        assert_eq!(unsafe { decode_bytes(text.as_ptr().cast(), 2) }, b"ab");
    }
}
