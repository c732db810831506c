//! Headless embedding example — drives a manager the way a host binding
//! does, without a real renderer.
//!
//! Usage:
//!   cargo run --example headless_demo
//!
//! Demonstrates:
//!   - the loop thread blocking in `run`
//!   - cross-thread `create_engine` calls landing in the registry
//!   - lifecycle events observed through the event hook
//!   - `quit_when_idle` ending the loop once the windows close

use std::sync::Arc;
use std::thread;

use sill_scene::{Manager, ManagerConfig, SceneUrl};

fn main() {
    tracing_subscriber::fmt::init();

    let manager = Arc::new(Manager::new(ManagerConfig::default()));
    manager.set_event_hook(|event| println!("event: {event:?}"));

    let runner = Arc::clone(&manager);
    let loop_thread = thread::Builder::new()
        .name("scene-loop".into())
        .spawn(move || runner.run())
        .expect("spawn scene loop");

    for name in ["main", "settings"] {
        let url = SceneUrl::parse(&format!("app://scenes/{name}.sill")).expect("static url");
        manager.create_engine(None, url).expect("loop accepts work");
    }

    // Give the loop a moment to serve both windows, then close them; with
    // quit_when_idle the second close ends the loop.
    while manager.window_count() < 2 {
        thread::yield_now();
    }
    println!("live windows: {:?}", manager.windows_snapshot());
    for (id, _) in manager.windows_snapshot() {
        manager.close_window(id).expect("loop accepts work");
    }

    loop_thread
        .join()
        .expect("loop thread exits")
        .expect("loop stops cleanly");
    println!("loop stopped");
}
