//! Significant-location-change events.
//!
//! The platform pushes coordinates into a `LocationSender`; the location
//! update handler drains the matching `LocationStream` one event at a time.
//! Nothing is coalesced here.

use cityclock_core::Coordinate;
use tokio::sync::mpsc;

/// One OS-delivered significant location change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationEvent {
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone)]
pub struct LocationSender {
    tx: mpsc::Sender<LocationEvent>,
}

impl LocationSender {
    /// Queue a location. Returns false when the consumer has gone away.
    pub async fn send(&self, coordinate: Coordinate) -> bool {
        self.tx.send(LocationEvent { coordinate }).await.is_ok()
    }
}

#[derive(Debug)]
pub struct LocationStream {
    rx: mpsc::Receiver<LocationEvent>,
}

impl LocationStream {
    /// Next event, or `None` once every sender is dropped.
    pub async fn next(&mut self) -> Option<LocationEvent> {
        self.rx.recv().await
    }
}

/// Create a connected sender/stream pair holding up to `capacity` events.
pub fn location_channel(capacity: usize) -> (LocationSender, LocationStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LocationSender { tx }, LocationStream { rx })
}
