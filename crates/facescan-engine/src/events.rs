//! Progress events emitted while a scan runs.

use facescan_core::MatchType;
use serde::Serialize;

/// Lifecycle events for one scan, in emission order:
/// `initializing → {batch_starting → processing | match_found | error}* →
/// completed | cancelled`.
///
/// `current` strictly increases across `processing` events, and no event is
/// ever delivered after the terminal `completed`/`cancelled`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Initializing {
        total: usize,
    },
    BatchStarting {
        batch_index: usize,
        total_batches: usize,
    },
    Processing {
        current: usize,
        total: usize,
        estimated_remaining_ms: Option<u64>,
    },
    MatchFound {
        photo_id: String,
        confidence: f32,
        match_type: MatchType,
        consensus: usize,
    },
    Error {
        photo_id: String,
        reason: String,
    },
    Completed {
        total_matches: usize,
        strong_matches: usize,
        weak_matches: usize,
        average_confidence: f32,
        elapsed_ms: u64,
    },
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_as_tagged_union() {
        let event = ScanEvent::MatchFound {
            photo_id: "p1".into(),
            confidence: 0.5,
            match_type: MatchType::Strong,
            consensus: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"match_found","photo_id":"p1","confidence":0.5,"match_type":"strong","consensus":2}"#
        );

        let json = serde_json::to_string(&ScanEvent::Cancelled).unwrap();
        assert_eq!(json, r#"{"type":"cancelled"}"#);
    }
}
