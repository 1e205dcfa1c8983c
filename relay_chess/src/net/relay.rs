//! Relay abstraction.
//!
//! A relay delivers named events between the clients of one room. It
//! preserves order per sender and promises nothing across senders.
//! Implementations may use WebSockets or stay in-process.

use async_trait::async_trait;

use super::{
    errors::RelayError,
    messages::{ClientEvent, RelayEvent},
};
use crate::game::entities::RoomId;

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// A subscription to one room.
///
/// Dropping a channel releases the subscription. [`RelayChannel::close`]
/// does the same but lets the caller wait for it and see errors.
#[async_trait]
pub trait RelayChannel: Send {
    /// Send an event to the relay.
    async fn publish(&mut self, event: &ClientEvent) -> Result<()>;

    /// Wait for the next event from the relay.
    ///
    /// Returns `None` once the relay ends the subscription.
    async fn next_event(&mut self) -> Result<Option<RelayEvent>>;

    /// Release the subscription. Events still queued are dropped.
    async fn close(&mut self) -> Result<()>;
}

/// Opens room-scoped channels.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    type Channel: RelayChannel;

    /// Subscribe to `room_id`.
    async fn subscribe(&self, room_id: &RoomId) -> Result<Self::Channel>;
}
