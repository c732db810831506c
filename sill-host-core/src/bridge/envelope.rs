//! Wire format of events crossing to the host.

use serde::Serialize;

use crate::event::HostEvent;

/// Schema version stamped into every envelope. Bump on any breaking change
/// to the envelope or event payload shapes.
pub const ENVELOPE_VERSION: u32 = 1;

/// What the host callback actually receives: the event, a per-bridge
/// sequence number (starting at 1, no gaps unless serialization fails), and
/// a UTC millisecond timestamp taken at emission.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub version: u32,
    pub seq: u64,
    pub timestamp_ms: i64,
    pub event: HostEvent,
}

impl EventEnvelope {
    pub fn new(seq: u64, event: HostEvent) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            seq,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape_on_the_wire() {
        let envelope = EventEnvelope::new(
            3,
            HostEvent::EngineCreated {
                window: 2,
                url: "app://scenes/main.sill".to_string(),
            },
        );
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();

        assert_eq!(parsed["version"], ENVELOPE_VERSION);
        assert_eq!(parsed["seq"], 3);
        assert_eq!(parsed["event"]["type"], "engine_created");
        assert_eq!(parsed["event"]["data"]["window"], 2);
        assert_eq!(parsed["event"]["data"]["url"], "app://scenes/main.sill");
    }

    #[test]
    fn test_timestamp_is_current_utc_millis() {
        let before = chrono::Utc::now().timestamp_millis();
        let envelope = EventEnvelope::new(1, HostEvent::Stopped);
        let after = chrono::Utc::now().timestamp_millis();
        assert!((before..=after).contains(&envelope.timestamp_ms));
    }
}
