//! `jsreflect_ffi` — C-ABI surface for jsreflect.
//!
//! This crate exposes a stable C API (`extern "C"`, `#[no_mangle]`) so that
//! C and C++ embedders can turn JavaScript source into a JSON AST without
//! depending on Rust tooling.
//!
//! # Design
//! Results are opaque [`JsReflectResult`] handles owned by the library.
//! Callers obtain one from [`jsreflect_parse`], inspect it with the
//! `jsreflect_result_*` accessors and release it with
//! [`jsreflect_result_destroy`].  Strings returned by the accessors are
//! borrowed from the handle and stay valid until it is destroyed.

use std::ffi::{CStr, CString, c_char};

use jsreflect_core::{ReflectConfig, ReflectError, ReflectOptions, reflect_parse};
use tracing::debug;

/// Error-kind code of a successful result.
pub const JSREFLECT_OK: u32 = 0;
/// Error-kind code of a failure caused by the input or the options.
pub const JSREFLECT_USER_ERROR: u32 = 1;
/// Error-kind code of an internal-consistency failure.
pub const JSREFLECT_INTERNAL_ERROR: u32 = 2;
/// Error-kind code of a recursion or allocation limit failure.
pub const JSREFLECT_RESOURCE_ERROR: u32 = 3;

/// An opaque parse result: the AST as JSON, or an error message.
pub struct JsReflectResult {
    /// One of the `JSREFLECT_*` codes.
    kind: u32,
    /// JSON text on success, the error message otherwise.
    text: CString,
}

impl JsReflectResult {
    fn ok(json: String) -> Self {
        Self {
            kind: JSREFLECT_OK,
            text: c_string(json),
        }
    }

    fn user_error(message: impl Into<String>) -> Self {
        Self {
            kind: JSREFLECT_USER_ERROR,
            text: c_string(message.into()),
        }
    }

    fn from_error(err: &ReflectError) -> Self {
        Self {
            kind: err.kind().code() as u32,
            text: c_string(err.to_string()),
        }
    }
}

/// `s` as a C string.  Interior NULs cannot occur in JSON output; in error
/// messages they are replaced.
fn c_string(s: String) -> CString {
    CString::new(s).unwrap_or_else(|e| {
        let lossy = String::from_utf8_lossy(&e.into_vec()).replace('\0', "\u{FFFD}");
        CString::new(lossy).unwrap_or_default()
    })
}

fn parse_to_result(src: &str, options_json: Option<&str>) -> JsReflectResult {
    let config = match options_json {
        Some(text) => match serde_json::from_str::<ReflectConfig>(text) {
            Ok(config) => config,
            Err(err) => return JsReflectResult::user_error(format!("invalid options: {err}")),
        },
        None => ReflectConfig::default(),
    };
    let opts = ReflectOptions::from(config);
    match reflect_parse(src, &opts) {
        Ok(ast) => match serde_json::to_string(&ast) {
            Ok(json) => JsReflectResult::ok(json),
            Err(err) => JsReflectResult::from_error(&ReflectError::Internal(err.to_string())),
        },
        Err(err) => {
            debug!(%err, "jsreflect_parse failed");
            JsReflectResult::from_error(&err)
        }
    }
}

// ── Parse ────────────────────────────────────────────────────────────────────

/// Parse `src` and return its AST as a result handle.
///
/// `options_json` is a JSON object with any of `loc`, `source`, `line`,
/// `maxDepth` and `maxAllocations`; null selects the defaults.  The returned
/// pointer is never null and must eventually be passed to
/// [`jsreflect_result_destroy`].
///
/// # Safety
/// - `src` must be null or a valid, NUL-terminated C string.
/// - `options_json` must be null or a valid, NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jsreflect_parse(
    src: *const c_char,
    options_json: *const c_char,
) -> *mut JsReflectResult {
    let result = if src.is_null() {
        JsReflectResult::user_error("source is null")
    } else {
        // SAFETY: caller guarantees `src` is a valid C string.
        match unsafe { CStr::from_ptr(src) }.to_str() {
            Err(_) => JsReflectResult::user_error("source is not valid UTF-8"),
            Ok(src) if options_json.is_null() => parse_to_result(src, None),
            // SAFETY: caller guarantees `options_json` is a valid C string.
            Ok(src) => match unsafe { CStr::from_ptr(options_json) }.to_str() {
                Ok(options) => parse_to_result(src, Some(options)),
                Err(_) => JsReflectResult::user_error("options are not valid UTF-8"),
            },
        }
    };
    Box::into_raw(Box::new(result))
}

// ── Result ───────────────────────────────────────────────────────────────────

/// Whether the parse succeeded.  Returns `false` for a null handle.
///
/// # Safety
/// `result` must be null or a live pointer returned by [`jsreflect_parse`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jsreflect_result_is_ok(result: *const JsReflectResult) -> bool {
    if result.is_null() {
        return false;
    }
    // SAFETY: caller guarantees `result` is valid.
    unsafe { (*result).kind == JSREFLECT_OK }
}

/// The JSON AST on success, the error message otherwise.  The string is
/// owned by `result`.  Returns null for a null handle.
///
/// # Safety
/// `result` must be null or a live pointer returned by [`jsreflect_parse`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jsreflect_result_json(result: *const JsReflectResult) -> *const c_char {
    if result.is_null() {
        return std::ptr::null();
    }
    // SAFETY: caller guarantees `result` is valid.
    unsafe { (*result).text.as_ptr() }
}

/// `0` on success; `1`, `2` or `3` for user, internal and resource errors.
/// A null handle reports an internal error.
///
/// # Safety
/// `result` must be null or a live pointer returned by [`jsreflect_parse`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jsreflect_result_error_kind(result: *const JsReflectResult) -> u32 {
    if result.is_null() {
        return JSREFLECT_INTERNAL_ERROR;
    }
    // SAFETY: caller guarantees `result` is valid.
    unsafe { (*result).kind }
}

/// Destroy a result previously returned by [`jsreflect_parse`].
///
/// # Safety
/// - `result` must be null or a pointer returned by `jsreflect_parse`.
/// - `result` must not be used again after this call.
/// - This function must not be called more than once for the same pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jsreflect_result_destroy(result: *mut JsReflectResult) {
    if !result.is_null() {
        // SAFETY: pointer was created by `Box::into_raw` in `jsreflect_parse`.
        drop(unsafe { Box::from_raw(result) });
    }
}
