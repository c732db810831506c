//! The C ABI layer: exported functions, handle types, and callback plumbing.

use std::ffi::{c_char, CStr};

pub mod abi;
pub mod callback;
pub mod classes;
pub mod envelope;
pub mod handles;

/// Read a C string pointer into a Rust String, returning None on null or
/// invalid UTF-8.
pub(crate) unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(String::from)
}
