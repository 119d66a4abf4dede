use axum::response::sse::Event;
use norad_common::Position;
use std::time::Duration;
use uuid::Uuid;

/// Opaque, unique token for an event id
pub fn new_event_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// One server-sent position update.
///
/// `data` is the upstream position as JSON; it never carries the water
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEvent {
    pub id: String,
    pub retry: Duration,
    pub data: String,
}

impl PositionEvent {
    pub fn from_position(position: &Position, retry: Duration) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: new_event_id(),
            retry,
            data: serde_json::to_string(position)?,
        })
    }

    pub fn into_sse(self) -> Event {
        Event::default().id(self.id).retry(self.retry).data(self.data)
    }
}
