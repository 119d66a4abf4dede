//! Server-sent position stream

mod event;
pub use event::{PositionEvent, new_event_id};

mod publisher;
pub use publisher::{EventReceiver, PositionPublisher, StreamError, StreamExit};
