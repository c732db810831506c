//! C ABI exports for the bridge lifecycle — the surface a host runtime
//! drives the manager through.
//!
//! All functions are `extern "C"` and `#[no_mangle]`. Bridge handles are
//! opaque `u64` IDs into a global `DashMap`; each ID fronts one explicit
//! manager instance, so embedders can run several bridges side by side.

use std::ffi::{c_char, c_void, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sill_scene::{LoopState, Manager, ManagerConfig, SceneError, SceneUrl};

use crate::bridge::callback::{CallbackSink, EventCallback};
use crate::bridge::classes::{clone_instance, SillObjectHandle};
use crate::bridge::read_c_str;
use crate::core::BridgeCore;
use crate::error::HostResult;

/// Live bridges, keyed by the IDs handed to the host. The table is the only
/// process-wide state in the crate.
static HANDLES: Lazy<DashMap<u64, Arc<BridgeCore>>> = Lazy::new(DashMap::new);

/// Next bridge ID; never reused, so a stale handle can only miss the table.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

// ─── Create / Destroy ────────────────────────────────────────────────

/// Create a bridge instance and return its handle, or 0 if the
/// configuration is unusable.
///
/// The configuration is a JSON object; `{"quit_when_idle": bool}` is the
/// only recognized key and unknown keys are ignored. A null `config_json`
/// selects the defaults.
///
/// # Safety
///
/// `config_json` must be null or a valid, NUL-terminated UTF-8 C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_bridge_create(config_json: *const c_char) -> u64 {
    let config = if config_json.is_null() {
        ManagerConfig::default()
    } else {
        let Some(json_str) = (unsafe { read_c_str(config_json) }) else {
            tracing::error!("sill_host_bridge_create: invalid config_json");
            return 0;
        };
        let parsed: serde_json::Value = match serde_json::from_str(&json_str) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!("sill_host_bridge_create: invalid JSON: {e}");
                return 0;
            }
        };
        ManagerConfig {
            quit_when_idle: parsed["quit_when_idle"].as_bool().unwrap_or(true),
        }
    };

    let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    let core = Arc::new(BridgeCore {
        id,
        manager: Manager::new(config),
        callback: Mutex::new(None),
        seq: AtomicU64::new(0),
    });

    // Weak from the hook back to the core, so destroying the bridge drops
    // it even though the manager outlives the hook installation site.
    let weak = Arc::downgrade(&core);
    core.manager.set_event_hook(move |event| {
        if let Some(core) = weak.upgrade() {
            core.forward_event(event);
        }
    });

    HANDLES.insert(id, core);
    tracing::debug!("sill_host_bridge_create: created handle {id}");
    id
}

/// Remove a bridge from the handle table. If its loop is still running a
/// stop is queued first, and the `run` caller unblocks once the loop
/// drains; repeating the call (or passing an unknown handle) does nothing.
///
/// # Safety
///
/// No preconditions beyond the C calling convention; any `u64` is accepted.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_bridge_destroy(handle: u64) {
    if let Some((_, core)) = HANDLES.remove(&handle) {
        tracing::debug!("sill_host_bridge_destroy: destroying handle {handle}");
        if core.manager.state() == LoopState::Running {
            let _ = core.manager.request_stop();
        }
    }
}

// ─── Subscribe ───────────────────────────────────────────────────────

/// Subscribe to the bridge's lifecycle events.
///
/// Envelopes arrive on the loop thread, one callback invocation per event;
/// see `bridge::envelope` for the schema. A bridge holds at most one
/// subscription, so calling again swaps the callback out.
///
/// # Safety
///
/// `cb` must be callable and `user_data` must stay valid until the
/// subscription is replaced or the bridge destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_subscribe_events(
    handle: u64,
    cb: EventCallback,
    user_data: *mut c_void,
) -> i32 {
    let Some(core) = HANDLES.get(&handle) else {
        return HostResult::InvalidHandle as i32;
    };
    *core.callback.lock() = Some(CallbackSink::new(cb, user_data));
    tracing::debug!("sill_host_subscribe_events: callback registered for handle {handle}");
    HostResult::Ok as i32
}

// ─── Loop ────────────────────────────────────────────────────────────

/// Run the manager loop on the calling thread.
///
/// Blocks until the loop stops — via `sill_host_request_stop`, or when the
/// last window closes under `quit_when_idle`. Commands queued before this
/// call are processed first, in order. The loop runs at most once per
/// bridge; concurrent or repeated calls report `AlreadyRunning` / `Stopped`.
///
/// # Safety
///
/// `handle` must be a valid handle from `sill_host_bridge_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_run(handle: u64) -> i32 {
    // Clone out of the table entry before blocking; holding the table
    // reference for the whole loop would stall destroy on the same shard.
    let core = {
        let Some(entry) = HANDLES.get(&handle) else {
            return HostResult::InvalidHandle as i32;
        };
        Arc::clone(&entry)
    };

    match core.manager.run() {
        Ok(()) => HostResult::Ok as i32,
        Err(SceneError::AlreadyRunning) => HostResult::AlreadyRunning as i32,
        Err(SceneError::Stopped) => HostResult::Stopped as i32,
        Err(e) => {
            tracing::error!("sill_host_run: {e}");
            HostResult::Internal as i32
        }
    }
}

/// Ask the loop to exit after the commands already queued. Returns once the
/// stop is queued, not once the loop has exited.
///
/// # Safety
///
/// `handle` must be a valid handle from `sill_host_bridge_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_request_stop(handle: u64) -> i32 {
    let Some(core) = HANDLES.get(&handle) else {
        return HostResult::InvalidHandle as i32;
    };
    match core.manager.request_stop() {
        Ok(()) => HostResult::Ok as i32,
        Err(SceneError::Stopped) => HostResult::Stopped as i32,
        Err(e) => {
            tracing::error!("sill_host_request_stop: {e}");
            HostResult::Internal as i32
        }
    }
}

// ─── Engines ─────────────────────────────────────────────────────────

/// Queue a new engine serving the scene at `url`, optionally bound to a
/// context object.
///
/// Callable from any thread, before or while the loop runs. Returns once
/// the command is queued; the window exists when the loop thread processes
/// it, and every later command observes it. Watch `engine_created`
/// envelopes or the snapshot for the assigned window id.
///
/// # Safety
///
/// `handle` must be a valid bridge handle. `url` must be a valid,
/// NUL-terminated UTF-8 C string. `context` must be null or a live object
/// handle; the window takes its own hold on the object, so the host may
/// release its handle independently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_create_engine(
    handle: u64,
    context: *const SillObjectHandle,
    url: *const c_char,
) -> i32 {
    let Some(core) = HANDLES.get(&handle) else {
        return HostResult::InvalidHandle as i32;
    };
    let Some(url_str) = (unsafe { read_c_str(url) }) else {
        return HostResult::InvalidArgument as i32;
    };
    let scene_url = match SceneUrl::parse(&url_str) {
        Ok(u) => u,
        Err(e) => {
            tracing::error!("sill_host_create_engine: {e}");
            return HostResult::InvalidArgument as i32;
        }
    };
    let context = unsafe { clone_instance(context) };

    match core.manager.create_engine(context, scene_url) {
        Ok(()) => HostResult::Ok as i32,
        Err(SceneError::Stopped) => HostResult::Stopped as i32,
        Err(e) => {
            tracing::error!("sill_host_create_engine: {e}");
            HostResult::Internal as i32
        }
    }
}

/// Queue teardown of window `window_id`. The window's context hold is
/// dropped with it; unknown ids are logged and ignored by the loop.
///
/// # Safety
///
/// `handle` must be a valid bridge handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_close_engine(handle: u64, window_id: u64) -> i32 {
    let Some(core) = HANDLES.get(&handle) else {
        return HostResult::InvalidHandle as i32;
    };
    match core.manager.close_window(window_id) {
        Ok(()) => HostResult::Ok as i32,
        Err(SceneError::Stopped) => HostResult::Stopped as i32,
        Err(e) => {
            tracing::error!("sill_host_close_engine: {e}");
            HostResult::Internal as i32
        }
    }
}

// ─── State Query ─────────────────────────────────────────────────────

/// Describe the bridge's current state as JSON:
///
/// ```json
/// {
///   "state": "running",
///   "window_count": 1,
///   "windows": [{ "id": 1, "url": "app://scenes/main.sill" }]
/// }
/// ```
///
/// `windows` lists live windows in creation order. The string is heap
/// allocated; hand it back to `sill_host_free_string`. Null for an unknown
/// handle.
///
/// # Safety
///
/// No preconditions beyond the C calling convention.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_snapshot_json(handle: u64) -> *mut c_char {
    let Some(core) = HANDLES.get(&handle) else {
        return std::ptr::null_mut();
    };

    let windows: Vec<serde_json::Value> = core
        .manager
        .windows_snapshot()
        .into_iter()
        .map(|(id, url)| serde_json::json!({ "id": id, "url": url }))
        .collect();
    let snapshot = serde_json::json!({
        "state": core.manager.state().as_str(),
        "window_count": windows.len(),
        "windows": windows,
    });

    match CString::new(snapshot.to_string()) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Return a string obtained from `sill_host_snapshot_json` to the
/// allocator.
///
/// # Safety
///
/// `ptr` must be null or a string this library returned that has not been
/// freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
