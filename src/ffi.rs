//! FFI bindings for wearable-metrics
//!
//! C-compatible functions so mobile hosts can run the calculators and the mock
//! pipeline natively. All strings are null-terminated UTF-8 JSON. Returned
//! strings must be freed by the caller using `wm_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::metrics::{calculate_hrv_metrics, calculate_resting_hr_metrics};
use crate::overview::OverviewLoader;
use crate::provider::WearableProvider;
use crate::types::HrvSummary;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize a result or record its error; NULL on failure
fn respond<T: serde::Serialize>(result: Result<T, String>) -> *mut c_char {
    match result.and_then(|value| serde_json::to_string(&value).map_err(|e| e.to_string())) {
        Ok(json) => string_to_cstr(&json),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

unsafe fn parse_hrv_records(records_json: *const c_char) -> Result<Vec<HrvSummary>, String> {
    let json = cstr_to_string(records_json).ok_or("Invalid records string pointer")?;
    serde_json::from_str(&json).map_err(|e| format!("Invalid HRV records: {}", e))
}

/// Compute HRV metrics from a JSON array of HRV summaries.
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `wm_free_string`.
/// - Returns NULL on error; call `wm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wm_hrv_metrics(records_json: *const c_char) -> *mut c_char {
    clear_last_error();
    respond(parse_hrv_records(records_json).map(|records| calculate_hrv_metrics(&records)))
}

/// Compute resting heart rate metrics from a JSON array of HRV summaries.
///
/// # Safety
/// Same contract as `wm_hrv_metrics`.
#[no_mangle]
pub unsafe extern "C" fn wm_resting_hr_metrics(records_json: *const c_char) -> *mut c_char {
    clear_last_error();
    respond(
        parse_hrv_records(records_json).map(|records| calculate_resting_hr_metrics(&records)),
    )
}

/// Run the mock pipeline for the window ending on `last_day` (YYYY-MM-DD)
/// and return the overview report as JSON.
///
/// # Safety
/// - `last_day` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `wm_free_string`.
/// - Returns NULL on error; call `wm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wm_mock_overview(last_day: *const c_char, window_days: u32) -> *mut c_char {
    clear_last_error();

    let day = match cstr_to_string(last_day) {
        Some(s) => s,
        None => {
            set_last_error("Invalid date string pointer");
            return ptr::null_mut();
        }
    };

    let last_day = match NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
        Ok(d) => d,
        Err(e) => {
            set_last_error(&format!("Invalid date {:?}: {}", day, e));
            return ptr::null_mut();
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(e) => {
            set_last_error(&format!("Failed to start runtime: {}", e));
            return ptr::null_mut();
        }
    };

    let result = runtime.block_on(async {
        let provider = WearableProvider::with_mock().await;
        OverviewLoader::with_window(provider, window_days)
            .fetch(last_day, &CancellationToken::new())
            .await
    });

    respond(result.map_err(|e| e.to_string()))
}

/// Free a string allocated by this library.
///
/// # Safety
/// - `ptr` must be a pointer returned by a `wm_*` function, or NULL.
/// - Must not be called twice on the same pointer.
#[no_mangle]
pub unsafe extern "C" fn wm_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Last error message on this thread, or NULL.
///
/// # Safety
/// The returned pointer is owned by the library and valid until the next
/// `wm_*` call on the same thread. Do not free it.
#[no_mangle]
pub unsafe extern "C" fn wm_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Library version as a static string. Do not free.
#[no_mangle]
pub extern "C" fn wm_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}
