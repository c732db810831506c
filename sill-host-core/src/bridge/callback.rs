//! Event delivery to the host's registered callback.

use std::ffi::{c_char, c_void, CString};

use crate::bridge::envelope::EventEnvelope;

/// Signature of the host's event callback. The JSON envelope arrives as a
/// pointer plus byte length; the buffer is also NUL-terminated and only
/// valid for the duration of the call.
pub type EventCallback =
    unsafe extern "C" fn(json_ptr: *const c_char, json_len: usize, user_data: *mut c_void);

/// One event subscription: the host's function pointer and the user_data it
/// asked to be called back with.
///
/// The host keeps both valid until the subscription is replaced or the
/// bridge is destroyed.
pub struct CallbackSink {
    cb: EventCallback,
    user_data: *mut c_void,
}

// Safety: user_data is carried, never dereferenced here, and the callback
// fires only on the loop thread; the host guarantees the rest.
unsafe impl Send for CallbackSink {}
unsafe impl Sync for CallbackSink {}

impl CallbackSink {
    pub fn new(cb: EventCallback, user_data: *mut c_void) -> Self {
        Self { cb, user_data }
    }

    /// Serialize an envelope and hand it to the host.
    ///
    /// An envelope that fails to serialize is logged and dropped rather
    /// than surfaced; the host sees a gap in `seq` and nothing else.
    pub fn dispatch(&self, envelope: &EventEnvelope) {
        let json = match serde_json::to_string(envelope) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("dropping event envelope {}: {e}", envelope.seq);
                return;
            }
        };
        let len = json.len();
        let Ok(cstr) = CString::new(json) else {
            // Unreachable for serde_json output, which never embeds NUL.
            tracing::error!("dropping event envelope {}: interior NUL", envelope.seq);
            return;
        };
        unsafe { (self.cb)(cstr.as_ptr(), len, self.user_data) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HostEvent;
    use std::ffi::CStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_delivers_json_and_user_data() {
        static SEEN_USER_DATA: AtomicUsize = AtomicUsize::new(0);
        static SEEN_LEN: AtomicUsize = AtomicUsize::new(0);
        static SEEN_SEQ: AtomicUsize = AtomicUsize::new(0);
        unsafe extern "C" fn observe(ptr: *const c_char, len: usize, user_data: *mut c_void) {
            SEEN_USER_DATA.store(user_data as usize, Ordering::SeqCst);
            SEEN_LEN.store(len, Ordering::SeqCst);
            let json = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
            assert_eq!(json.len(), len, "length matches the terminated buffer");
            let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
            SEEN_SEQ.store(parsed["seq"].as_u64().unwrap() as usize, Ordering::SeqCst);
            assert_eq!(parsed["event"]["type"], "engine_closed");
            assert_eq!(parsed["event"]["data"]["window"], 4);
        }

        let token = 0xC0DEusize;
        let sink = CallbackSink::new(observe, token as *mut c_void);
        sink.dispatch(&EventEnvelope::new(7, HostEvent::EngineClosed { window: 4 }));

        assert_eq!(SEEN_USER_DATA.load(Ordering::SeqCst), token);
        assert_eq!(SEEN_SEQ.load(Ordering::SeqCst), 7);
        assert!(SEEN_LEN.load(Ordering::SeqCst) > 0);
    }
}
