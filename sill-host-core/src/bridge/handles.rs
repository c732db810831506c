//! Fixed-size value handles for strings and URLs.
//!
//! The host allocates `sill_host_string_size` / `sill_host_url_size` bytes of
//! storage wherever it likes (stack, pinned GC memory, foreign heap) and
//! treats the contents as opaque. Each handle is a single nullable pointer
//! slot; all-zero bytes are the valid empty value, so `init` is a plain
//! zeroing write and a fresh handle unmarshal yields nothing.
//!
//! Text crosses the boundary as UTF-16 code units (`uint16_t`), the native
//! unit of managed hosts. `unmarshal_maxlen` reports exactly how many units
//! `unmarshal` will write; there is no terminator.
//!
//! Handles are not thread-safe; the host must not touch one handle from two
//! threads at once. Passing a pointer that is not a live handle of the right
//! kind is undefined behavior, as in any C API.

use sill_scene::{SceneText, SceneUrl};

use crate::error::HostResult;

/// Storage layout behind a string handle: one nullable owning pointer.
#[repr(C)]
pub struct SillStringHandle {
    value: *mut SceneText,
}

/// Storage layout behind a URL handle: one nullable owning pointer.
#[repr(C)]
pub struct SillUrlHandle {
    value: *mut SceneUrl,
}

/// Bytes of storage a string handle occupies.
#[allow(non_upper_case_globals)]
#[unsafe(no_mangle)]
pub static sill_host_string_size: i32 = std::mem::size_of::<SillStringHandle>() as i32;

/// Bytes of storage a URL handle occupies.
#[allow(non_upper_case_globals)]
#[unsafe(no_mangle)]
pub static sill_host_url_size: i32 = std::mem::size_of::<SillUrlHandle>() as i32;

// ─── String handles ──────────────────────────────────────────────────

/// Initialize a string handle to the empty value.
///
/// # Safety
///
/// `hndl` must point to `sill_host_string_size` bytes of writable storage.
/// Initializing a handle that already holds a value leaks it; `deinit` first.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_string_init(hndl: *mut SillStringHandle) {
    if hndl.is_null() {
        return;
    }
    unsafe { (*hndl).value = std::ptr::null_mut() };
}

/// Release the value held by a string handle, returning it to the empty
/// state. Safe to call on an empty handle; calling it again is a no-op.
///
/// # Safety
///
/// `hndl` must be an initialized string handle (or null, ignored).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_string_deinit(hndl: *mut SillStringHandle) {
    if hndl.is_null() {
        return;
    }
    let value = unsafe { std::mem::replace(&mut (*hndl).value, std::ptr::null_mut()) };
    if !value.is_null() {
        drop(unsafe { Box::from_raw(value) });
    }
}

/// Store text in a string handle, replacing any previous value.
///
/// `buf` holds `len` UTF-16 code units; unpaired surrogates are replaced
/// with U+FFFD. A negative `len` or a null `buf` with `len > 0` is rejected.
///
/// # Safety
///
/// `hndl` must be an initialized string handle. `buf` must point to at
/// least `len` readable `uint16_t` values when `len > 0`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_string_marshal(
    buf: *const u16,
    len: i32,
    hndl: *mut SillStringHandle,
) {
    if hndl.is_null() {
        return;
    }
    if len < 0 || (buf.is_null() && len > 0) {
        tracing::error!("sill_host_string_marshal: bad buffer (len {len})");
        return;
    }
    let units = if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(buf, len as usize) }
    };
    let text = SceneText::from_utf16_units(units);
    unsafe { replace_string(hndl, text) };
}

/// Number of UTF-16 code units `sill_host_string_unmarshal` will write for
/// the handle's current value. Zero for the empty value.
///
/// # Safety
///
/// `hndl` must be an initialized string handle (or null, reported as empty).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_string_unmarshal_maxlen(hndl: *const SillStringHandle) -> i32 {
    let Some(text) = (unsafe { string_value(hndl) }) else {
        return 0;
    };
    text.utf16_len() as i32
}

/// Copy the handle's value into `buf` as UTF-16 code units, no terminator.
/// Returns the number of units written.
///
/// # Safety
///
/// `hndl` must be an initialized string handle. `buf` must have room for
/// `sill_host_string_unmarshal_maxlen(hndl)` units.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_string_unmarshal(
    hndl: *const SillStringHandle,
    buf: *mut u16,
) -> i32 {
    let Some(text) = (unsafe { string_value(hndl) }) else {
        return 0;
    };
    let needed = text.utf16_len();
    if needed == 0 {
        return 0;
    }
    if buf.is_null() {
        tracing::error!("sill_host_string_unmarshal: null buffer for non-empty value");
        return 0;
    }
    let dest = unsafe { std::slice::from_raw_parts_mut(buf, needed) };
    text.copy_to_utf16(dest) as i32
}

// ─── URL handles ─────────────────────────────────────────────────────

/// Initialize a URL handle to the empty value.
///
/// # Safety
///
/// `hndl` must point to `sill_host_url_size` bytes of writable storage.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_url_init(hndl: *mut SillUrlHandle) {
    if hndl.is_null() {
        return;
    }
    unsafe { (*hndl).value = std::ptr::null_mut() };
}

/// Release the value held by a URL handle. Safe on an empty handle.
///
/// # Safety
///
/// `hndl` must be an initialized URL handle (or null, ignored).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_url_deinit(hndl: *mut SillUrlHandle) {
    if hndl.is_null() {
        return;
    }
    let value = unsafe { std::mem::replace(&mut (*hndl).value, std::ptr::null_mut()) };
    if !value.is_null() {
        drop(unsafe { Box::from_raw(value) });
    }
}

/// Parse the text in `src` as an absolute URL into `dest`, replacing any
/// previous value. On parse failure `dest` is left untouched and
/// `InvalidArgument` is returned; the empty text value does not parse.
///
/// # Safety
///
/// `src` must be an initialized string handle and `dest` an initialized URL
/// handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_string_to_url(
    src: *const SillStringHandle,
    dest: *mut SillUrlHandle,
) -> i32 {
    if dest.is_null() {
        return HostResult::InvalidArgument as i32;
    }
    let input = match unsafe { string_value(src) } {
        Some(text) => text.as_str(),
        None => "",
    };
    match SceneUrl::parse(input) {
        Ok(url) => {
            unsafe { replace_url(dest, url) };
            HostResult::Ok as i32
        }
        Err(e) => {
            tracing::debug!("sill_host_string_to_url: {e}");
            HostResult::InvalidArgument as i32
        }
    }
}

/// Serialize the URL in `src` into the string handle `dest`, replacing any
/// previous value. The empty URL value serializes to the empty text value.
///
/// # Safety
///
/// `src` must be an initialized URL handle and `dest` an initialized string
/// handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_url_to_string(
    src: *const SillUrlHandle,
    dest: *mut SillStringHandle,
) -> i32 {
    if dest.is_null() {
        return HostResult::InvalidArgument as i32;
    }
    let text = match unsafe { url_value(src) } {
        Some(url) => url.to_text(),
        None => SceneText::new(),
    };
    unsafe { replace_string(dest, text) };
    HostResult::Ok as i32
}

// ─── Slot plumbing ───────────────────────────────────────────────────

unsafe fn string_value<'a>(hndl: *const SillStringHandle) -> Option<&'a SceneText> {
    if hndl.is_null() {
        return None;
    }
    let value = unsafe { (*hndl).value };
    if value.is_null() {
        None
    } else {
        Some(unsafe { &*value })
    }
}

unsafe fn url_value<'a>(hndl: *const SillUrlHandle) -> Option<&'a SceneUrl> {
    if hndl.is_null() {
        return None;
    }
    let value = unsafe { (*hndl).value };
    if value.is_null() {
        None
    } else {
        Some(unsafe { &*value })
    }
}

unsafe fn replace_string(hndl: *mut SillStringHandle, text: SceneText) {
    let old = unsafe {
        std::mem::replace(&mut (*hndl).value, Box::into_raw(Box::new(text)))
    };
    if !old.is_null() {
        drop(unsafe { Box::from_raw(old) });
    }
}

unsafe fn replace_url(hndl: *mut SillUrlHandle, url: SceneUrl) {
    let old = unsafe { std::mem::replace(&mut (*hndl).value, Box::into_raw(Box::new(url))) };
    if !old.is_null() {
        drop(unsafe { Box::from_raw(old) });
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
