//! Translation of store changes and driver events into view events

use focus_api::{EventPayload, TimerState};
use focus_core::CoreEvent;
use focus_store::{StoreChange, StoreKey};
use tracing::warn;

/// The event views see for a stored value being replaced
pub fn store_change_event(change: &StoreChange) -> Option<EventPayload> {
    let value = change.value.clone();
    let payload = match change.key {
        StoreKey::TimerState => {
            serde_json::from_value::<TimerState>(value).map(EventPayload::TimerStateChanged)
        }
        StoreKey::BlockingEnabled => {
            serde_json::from_value(value).map(|enabled| EventPayload::BlockingChanged { enabled })
        }
        StoreKey::BlockedSites => {
            serde_json::from_value(value).map(|sites| EventPayload::BlockedSitesChanged { sites })
        }
    };

    match payload {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(key = %change.key, error = %e, "Unreadable store change");
            None
        }
    }
}

pub fn core_event(event: CoreEvent) -> EventPayload {
    match event {
        CoreEvent::IntervalCompleted { interval, goal } => {
            EventPayload::IntervalCompleted { interval, goal }
        }
        CoreEvent::AudioStatusChanged { playing } => EventPayload::AudioStatusChanged { playing },
    }
}
