//! Per-bridge state behind each entry of the global handle table.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sill_scene::{Manager, SceneEvent};

use crate::bridge::callback::CallbackSink;
use crate::bridge::envelope::EventEnvelope;
use crate::event::convert_event;

/// Everything one `sill_host_bridge_create` call stands up, shared between
/// the handle table and the manager's event hook as an `Arc`.
pub struct BridgeCore {
    /// Key of this bridge in the handle table.
    pub id: u64,
    /// The scene manager this bridge fronts. Its loop runs on whichever
    /// thread calls `sill_host_run`.
    pub manager: Manager,
    /// Registered event callback (set via subscribe_events).
    pub callback: Mutex<Option<CallbackSink>>,
    /// Envelope sequence counter, bumped only when a callback is installed.
    pub seq: AtomicU64,
}

impl BridgeCore {
    /// Wrap a manager event in an envelope and hand it to the host callback.
    /// Called from the loop thread via the manager's event hook.
    pub fn forward_event(&self, event: &SceneEvent) {
        if let Some(ref cb) = *self.callback.lock() {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            cb.dispatch(&EventEnvelope::new(seq, convert_event(event)));
        }
    }
}
