//! The scene manager: one event loop, one window registry, one lock.
//!
//! A [`Manager`] is an explicit instance; embedders create as many as they
//! want and nothing here is process-global. The thread that calls [`run`]
//! becomes the loop thread and is the only place windows are created or torn
//! down. Every other thread talks to the loop through the command channel,
//! so cross-thread callers never touch toolkit state directly; they enqueue
//! and return immediately.
//!
//! [`run`]: Manager::run

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{HeadlessBackend, SceneBackend};
use crate::error::SceneError;
use crate::object::Instance;
use crate::value::SceneUrl;

/// Manager construction knobs.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Leave the loop when the last window closes instead of waiting for an
    /// explicit stop.
    pub quit_when_idle: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            quit_when_idle: true,
        }
    }
}

/// Where the loop is in its life. The progression is one-way; a stopped
/// manager never runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

impl LoopState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
            LoopState::Stopped => "stopped",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LoopState::Idle,
            1 => LoopState::Running,
            _ => LoopState::Stopped,
        }
    }
}

/// Work posted to the loop thread.
enum Command {
    CreateEngine {
        context: Option<Arc<Instance>>,
        url: SceneUrl,
    },
    CloseWindow {
        id: u64,
    },
    Stop,
}

/// One live top-level window in the registry.
pub struct SceneWindow {
    pub id: u64,
    pub url: SceneUrl,
    /// Context object the window's scene runs against. Held for the
    /// window's lifetime so the host side stays pinned.
    pub context: Option<Arc<Instance>>,
}

/// Lifecycle notifications, observed through [`Manager::set_event_hook`].
#[derive(Debug, Clone)]
pub enum SceneEvent {
    /// A window came up and its scene is being served.
    EngineCreated { window: u64, url: String },

    /// The backend refused the window; no registry entry was made.
    EngineFailed { url: String, reason: String },

    /// A window was torn down, by request or at shutdown.
    EngineClosed { window: u64 },

    /// The loop has exited. Always the final event.
    Stopped,
}

type EventHook = Arc<dyn Fn(&SceneEvent) + Send + Sync>;

pub struct Manager {
    config: ManagerConfig,
    state: AtomicU8,
    next_window_id: AtomicU64,
    tx: Sender<Command>,
    // Claimed exactly once by the thread that enters `run`.
    rx: Mutex<Option<Receiver<Command>>>,
    // The window registry, and the only lock shared across threads.
    windows: Mutex<Vec<SceneWindow>>,
    backend: Mutex<Box<dyn SceneBackend>>,
    hook: Mutex<Option<EventHook>>,
}

impl Manager {
    /// Manager with the headless backend.
    pub fn new(config: ManagerConfig) -> Self {
        Self::with_backend(config, Box::new(HeadlessBackend::new()))
    }

    pub fn with_backend(config: ManagerConfig, backend: Box<dyn SceneBackend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            state: AtomicU8::new(LoopState::Idle as u8),
            next_window_id: AtomicU64::new(0),
            tx,
            rx: Mutex::new(Some(rx)),
            windows: Mutex::new(Vec::new()),
            backend: Mutex::new(backend),
            hook: Mutex::new(None),
        }
    }

    /// Install the lifecycle observer, replacing any previous one.
    pub fn set_event_hook(&self, hook: impl Fn(&SceneEvent) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Arc::new(hook));
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn window_count(&self) -> usize {
        self.windows.lock().len()
    }

    /// `(id, url)` of every live window, in creation order.
    pub fn windows_snapshot(&self) -> Vec<(u64, String)> {
        self.windows
            .lock()
            .iter()
            .map(|w| (w.id, w.url.as_str().to_owned()))
            .collect()
    }

    /// Queue a new engine serving `url`, optionally bound to a context
    /// object. Callable from any thread, before or while the loop runs;
    /// the window exists once the loop thread has taken the command.
    pub fn create_engine(
        &self,
        context: Option<Arc<Instance>>,
        url: SceneUrl,
    ) -> Result<(), SceneError> {
        if self.state() == LoopState::Stopped {
            return Err(SceneError::Stopped);
        }
        debug!("queueing engine for {url}");
        self.tx
            .send(Command::CreateEngine { context, url })
            .map_err(|_| SceneError::LoopClosed)
    }

    /// Queue teardown of window `id`. Unknown ids are logged and dropped by
    /// the loop.
    pub fn close_window(&self, id: u64) -> Result<(), SceneError> {
        if self.state() == LoopState::Stopped {
            return Err(SceneError::Stopped);
        }
        self.tx
            .send(Command::CloseWindow { id })
            .map_err(|_| SceneError::LoopClosed)
    }

    /// Ask the loop to exit after the commands already queued.
    pub fn request_stop(&self) -> Result<(), SceneError> {
        if self.state() == LoopState::Stopped {
            return Err(SceneError::Stopped);
        }
        self.tx.send(Command::Stop).map_err(|_| SceneError::LoopClosed)
    }

    /// Pump the loop on the calling thread until it stops.
    ///
    /// Blocks until [`request_stop`], or until the last window closes when
    /// [`ManagerConfig::quit_when_idle`] is set. Commands queued before the
    /// call are processed first, in order. Returns an error instead of
    /// running twice.
    ///
    /// [`request_stop`]: Manager::request_stop
    pub fn run(&self) -> Result<(), SceneError> {
        match self.state.compare_exchange(
            LoopState::Idle as u8,
            LoopState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {}
            Err(raw) if LoopState::from_u8(raw) == LoopState::Running => {
                return Err(SceneError::AlreadyRunning);
            }
            Err(_) => return Err(SceneError::Stopped),
        }
        let Some(rx) = self.rx.lock().take() else {
            return Err(SceneError::AlreadyRunning);
        };

        info!("scene loop entered");
        loop {
            // The manager owns a sender, so recv only fails if it is torn
            // down mid-run; treat that as a stop.
            let Ok(command) = rx.recv() else { break };
            match command {
                Command::CreateEngine { context, url } => self.handle_create(context, url),
                Command::CloseWindow { id } => {
                    self.handle_close(id);
                    if self.config.quit_when_idle && self.windows.lock().is_empty() {
                        debug!("last window closed, leaving loop");
                        break;
                    }
                }
                Command::Stop => break,
            }
        }
        self.shutdown();
        info!("scene loop exited");
        Ok(())
    }

    fn handle_create(&self, context: Option<Arc<Instance>>, url: SceneUrl) {
        let id = self.next_window_id.fetch_add(1, Ordering::Relaxed) + 1;
        if let Err(err) = self.backend.lock().create_window(id, &url) {
            warn!("backend refused window {id} for {url}: {err}");
            self.emit(SceneEvent::EngineFailed {
                url: url.as_str().to_owned(),
                reason: err.to_string(),
            });
            return;
        }
        let url_text = url.as_str().to_owned();
        debug!("window {id} serves {url}");
        self.windows.lock().push(SceneWindow { id, url, context });
        self.emit(SceneEvent::EngineCreated {
            window: id,
            url: url_text,
        });
    }

    fn handle_close(&self, id: u64) {
        let window = {
            let mut windows = self.windows.lock();
            windows
                .iter()
                .position(|w| w.id == id)
                .map(|index| windows.remove(index))
        };
        let Some(window) = window else {
            warn!("close requested for unknown window {id}");
            return;
        };
        self.backend.lock().destroy_window(id);
        debug!("window {id} closed ({})", window.url);
        self.emit(SceneEvent::EngineClosed { window: id });
        // The context hold drops outside the registry lock; its release
        // trampoline may re-enter the bridge.
        drop(window);
    }

    fn shutdown(&self) {
        let drained: Vec<SceneWindow> = std::mem::take(&mut *self.windows.lock());
        for window in &drained {
            self.backend.lock().destroy_window(window.id);
            self.emit(SceneEvent::EngineClosed { window: window.id });
        }
        drop(drained);
        self.state.store(LoopState::Stopped as u8, Ordering::SeqCst);
        self.emit(SceneEvent::Stopped);
    }

    fn emit(&self, event: SceneEvent) {
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook(&event);
        }
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("state", &self.state())
            .field("windows", &self.window_count())
            .finish()
    }
}
