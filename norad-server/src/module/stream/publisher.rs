//! Per-connection position publisher
//!
//! A spawned producer polls the position source and pushes events into a
//! bounded channel whose receiver backs the response body. When the client
//! goes away the body, and with it the receiver, is dropped; the producer
//! sees the closed channel and stops.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::event::{PositionEvent, new_event_id};
use crate::module::position::{PositionSource, ResolverError};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error("failed to encode position: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a publisher stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamExit {
    Disconnected,
    Failed,
}

pub type EventReceiver = mpsc::Receiver<Result<PositionEvent, StreamError>>;

pub struct PositionPublisher {
    source: Arc<dyn PositionSource>,
    interval: Duration,
    retry: Duration,
}

impl PositionPublisher {
    pub fn new(source: Arc<dyn PositionSource>, interval: Duration, retry: Duration) -> Self {
        Self {
            source,
            interval,
            retry,
        }
    }

    /// Start the producer task and hand back the receiving end.
    pub fn spawn(self) -> (EventReceiver, JoinHandle<StreamExit>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    async fn next_event(&self) -> Result<PositionEvent, StreamError> {
        let position = self.source.fetch_position().await?;
        Ok(PositionEvent::from_position(&position, self.retry)?)
    }

    async fn run(self, tx: mpsc::Sender<Result<PositionEvent, StreamError>>) -> StreamExit {
        let stream_id = new_event_id();
        tracing::info!(%stream_id, interval = ?self.interval, "Position stream opened");
        let mut sent: u64 = 0;

        let exit = loop {
            if tx.is_closed() {
                break StreamExit::Disconnected;
            }

            // A disconnect during the fetch or the wait ends the loop at once
            let next = tokio::select! {
                _ = tx.closed() => break StreamExit::Disconnected,
                next = self.next_event() => next,
            };

            match next {
                Ok(event) => {
                    if tx.send(Ok(event)).await.is_err() {
                        break StreamExit::Disconnected;
                    }
                    sent += 1;
                }
                Err(e) => {
                    tracing::error!(%stream_id, "Position stream failed: {}", e);
                    let _ = tx.send(Err(e)).await;
                    break StreamExit::Failed;
                }
            }

            tokio::select! {
                _ = tx.closed() => break StreamExit::Disconnected,
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        tracing::info!(%stream_id, sent, ?exit, "Position stream terminated");
        exit
    }
}
