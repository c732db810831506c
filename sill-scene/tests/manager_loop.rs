//! Manager loop tests across threads: cross-thread engine creation,
//! single-consumer enforcement, and stop semantics.
//!
//! Tests cover:
//! - create_engine from many threads while the loop pumps on its own thread
//! - every request materializes exactly one window with a unique id
//! - a second run() call is rejected while the loop is live
//! - request_stop unblocks run() and closes surviving windows

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sill_scene::{LoopState, Manager, ManagerConfig, SceneError, SceneEvent, SceneUrl};

/// Spin until `predicate` holds or five seconds pass.
fn wait_for(mut predicate: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        thread::sleep(Duration::from_millis(5));
    }
}

fn spawn_loop(manager: &Arc<Manager>) -> thread::JoinHandle<Result<(), SceneError>> {
    let runner = Arc::clone(manager);
    thread::Builder::new()
        .name("scene-loop".into())
        .spawn(move || runner.run())
        .unwrap()
}

#[test]
fn engines_created_from_many_threads() {
    const THREADS: usize = 8;

    let manager = Arc::new(Manager::new(ManagerConfig {
        quit_when_idle: false,
    }));
    let loop_thread = spawn_loop(&manager);

    let mut callers = Vec::new();
    for n in 0..THREADS {
        let caller = Arc::clone(&manager);
        callers.push(thread::spawn(move || {
            let url = SceneUrl::parse(&format!("app://scenes/panel-{n}.sill")).unwrap();
            caller.create_engine(None, url).unwrap();
        }));
    }
    for caller in callers {
        caller.join().unwrap();
    }

    wait_for(|| manager.window_count() == THREADS);

    let snapshot = manager.windows_snapshot();
    let mut ids: Vec<u64> = snapshot.iter().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), THREADS, "window ids must be unique");
    assert_eq!(ids, (1..=THREADS as u64).collect::<Vec<u64>>());

    let mut urls: Vec<String> = snapshot.into_iter().map(|(_, url)| url).collect();
    urls.sort();
    let mut expected: Vec<String> = (0..THREADS)
        .map(|n| format!("app://scenes/panel-{n}.sill"))
        .collect();
    expected.sort();
    assert_eq!(urls, expected, "every requested url got its window");

    manager.request_stop().unwrap();
    loop_thread.join().unwrap().unwrap();
    assert_eq!(manager.state(), LoopState::Stopped);
    assert_eq!(manager.window_count(), 0);
}

#[test]
fn second_run_is_rejected_while_loop_is_live() {
    let manager = Arc::new(Manager::new(ManagerConfig {
        quit_when_idle: false,
    }));
    let loop_thread = spawn_loop(&manager);

    wait_for(|| manager.state() == LoopState::Running);
    assert!(matches!(manager.run(), Err(SceneError::AlreadyRunning)));

    manager.request_stop().unwrap();
    loop_thread.join().unwrap().unwrap();
    assert!(matches!(manager.run(), Err(SceneError::Stopped)));
}

#[test]
fn stop_closes_surviving_windows_in_order() {
    let manager = Arc::new(Manager::new(ManagerConfig {
        quit_when_idle: false,
    }));
    let events: Arc<Mutex<Vec<SceneEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    manager.set_event_hook(move |event| sink.lock().push(event.clone()));

    let loop_thread = spawn_loop(&manager);
    for name in ["one", "two"] {
        let url = SceneUrl::parse(&format!("app://scenes/{name}.sill")).unwrap();
        manager.create_engine(None, url).unwrap();
    }
    wait_for(|| manager.window_count() == 2);

    manager.request_stop().unwrap();
    loop_thread.join().unwrap().unwrap();

    let events = events.lock();
    let closed: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            SceneEvent::EngineClosed { window } => Some(*window),
            _ => None,
        })
        .collect();
    assert_eq!(closed, vec![1, 2], "shutdown closes in creation order");
    assert!(matches!(events.last(), Some(SceneEvent::Stopped)));
}
