//! Scene realization boundary.
//!
//! The manager drives window creation and teardown through [`SceneBackend`];
//! everything on the other side of the trait (renderer, compositor, real
//! windowing) is out of the manager's sight. [`HeadlessBackend`] is the
//! default: it records loads without realizing anything, which is what
//! embedding tests and host-only builds want.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::SceneError;
use crate::value::SceneUrl;

/// Toolkit-side half of window management. Only ever called from the loop
/// thread, in command order.
pub trait SceneBackend: Send {
    /// Realize the scene at `url` behind a new window `window_id`.
    fn create_window(&mut self, window_id: u64, url: &SceneUrl) -> Result<(), SceneError>;

    /// Tear down whatever `create_window` realized for `window_id`.
    fn destroy_window(&mut self, window_id: u64);
}

/// Shared view into a [`HeadlessBackend`]'s load log, for callers that want
/// to observe what the loop did after handing the backend away.
pub type BackendLog = Arc<Mutex<Vec<(u64, String)>>>;

/// Backend that records loads instead of rendering them.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    log: BackendLog,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto the load log; stays valid after the backend moves into a
    /// manager.
    pub fn log_handle(&self) -> BackendLog {
        Arc::clone(&self.log)
    }
}

impl SceneBackend for HeadlessBackend {
    fn create_window(&mut self, window_id: u64, url: &SceneUrl) -> Result<(), SceneError> {
        debug!("headless: window {window_id} loads {url}");
        self.log.lock().push((window_id, url.as_str().to_owned()));
        Ok(())
    }

    fn destroy_window(&mut self, window_id: u64) {
        debug!("headless: window {window_id} destroyed");
        self.log.lock().retain(|(id, _)| *id != window_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_log_tracks_live_windows() {
        let mut backend = HeadlessBackend::new();
        let log = backend.log_handle();

        let url = SceneUrl::parse("file:///demo/main.sill").unwrap();
        backend.create_window(1, &url).unwrap();
        backend.create_window(2, &url).unwrap();
        assert_eq!(log.lock().len(), 2);

        backend.destroy_window(1);
        let live = log.lock();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, 2);
    }
}
