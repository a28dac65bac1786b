use std::os::raw::{c_int, c_char};
use std::ffi::{CStr, CString};
use crate::ffi::error::{FFIError, ErrorCode};
use serde::{Deserialize, Serialize};

pub mod error;
pub mod compression;

/// Error handling helper for FFI boundaries (returns error code)
pub fn handle_status_result<F>(func: F) -> c_int
where
    F: FnOnce() -> FFIResult<()>,
{
    match func() {
        Ok(_) => ErrorCode::Success as c_int,
        Err(e) => {
            log::error!("FFI call failed: {:?} {} ({})",
                e.code, e.message, e.details.as_deref().unwrap_or("no details"));
            e.code as c_int
        }
    }
}

/// Serialize `Ok(T)` or the `FFIError` to JSON and hand ownership of the
/// C string to the caller, who must release it with `smart_compressor_free`.
pub fn handle_json_result<F, T>(func: F) -> *mut c_char
where
    F: FnOnce() -> FFIResult<T>,
    T: Serialize,
{
    let json_string = match func() {
        Ok(value) => serde_json::to_string(&value),
        Err(ffi_error) => {
            log::warn!("FFI call returned error: {}", ffi_error);
            serde_json::to_string(&ffi_error)
        }
    };

    let final_json = match json_string {
        Ok(s) => s,
        Err(e) => {
            // The caller must always get parseable JSON back
            log::error!("Failed to serialize FFI result: {}", e);
            format!("{{\"code\":\"{:?}\",\"message\":\"Failed to serialize result\",\"details\":null}}",
                ErrorCode::InternalError)
        }
    };

    match CString::new(final_json) {
        Ok(c_string) => c_string.into_raw(),
        Err(e) => {
            log::error!("Failed to create CString: {}", e);
            let error_json = format!("{{\"code\":\"{:?}\",\"message\":\"Failed to create CString\",\"details\":null}}",
                ErrorCode::InternalError);
            CString::new(error_json).map_or(std::ptr::null_mut(), |cs| cs.into_raw())
        }
    }
}

/// Parse a caller-owned, NUL-terminated JSON string
pub(crate) fn parse_json_input<T: for<'de> Deserialize<'de>>(input: *const c_char) -> FFIResult<T> {
    if input.is_null() {
        return Err(FFIError::new(ErrorCode::NullPointer, "Input JSON is null"));
    }

    let c_str = unsafe { CStr::from_ptr(input) };
    let json_str = c_str.to_str()
        .map_err(|_| FFIError::new(ErrorCode::InvalidUtf8, "Invalid UTF-8 in input JSON"))?;

    serde_json::from_str(json_str)
        .map_err(|e| FFIError::with_details(
            ErrorCode::InvalidArgument,
            "JSON parsing failed",
            &format!("Failed to parse JSON: {}", e)
        ))
}

pub use error::FFIResult;
