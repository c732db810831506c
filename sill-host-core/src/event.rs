//! Host-facing shape of the scene's lifecycle events.

use serde::Serialize;
use sill_scene::SceneEvent;

/// Lifecycle events as the host callback sees them.
///
/// The adjacently tagged serde layout means a host binding can branch on
/// `type` alone and leave `data` untouched until it cares.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HostEvent {
    EngineCreated { window: u64, url: String },
    EngineFailed { url: String, reason: String },
    EngineClosed { window: u64 },
    Stopped,
}

/// Convert a manager event into a HostEvent suitable for JSON serialization.
pub fn convert_event(event: &SceneEvent) -> HostEvent {
    match event {
        SceneEvent::EngineCreated { window, url } => HostEvent::EngineCreated {
            window: *window,
            url: url.clone(),
        },
        SceneEvent::EngineFailed { url, reason } => HostEvent::EngineFailed {
            url: url.clone(),
            reason: reason.clone(),
        },
        SceneEvent::EngineClosed { window } => HostEvent::EngineClosed { window: *window },
        SceneEvent::Stopped => HostEvent::Stopped,
    }
}
