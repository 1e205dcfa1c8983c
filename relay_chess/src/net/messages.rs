use serde::{Deserialize, Serialize};
use std::fmt;

use super::super::game::entities::{Color, MoveDescriptor, Position, RoomId};

/// Color and starting position handed out by the relay once two clients
/// share a room.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Settings {
    pub position: Position,
    pub color: Color,
}

/// Sent after a game ends to ask the relay for another one.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RematchRequest {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    pub color: Color,
}

/// A message from the relay to a client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RelayEvent {
    /// The relay paired two clients and assigned this one a color.
    Settings(Settings),
    /// The peer made a move.
    Move(MoveDescriptor),
    /// Both players asked for a rematch.
    Reset,
}

impl fmt::Display for RelayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settings(settings) => {
                write!(f, "settings: {} from {}", settings.color, settings.position)
            }
            Self::Move(mv) => write!(f, "move {mv}"),
            Self::Reset => write!(f, "reset"),
        }
    }
}

impl RelayEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Settings(_) => "settings",
            Self::Move(_) => "move",
            Self::Reset => "reset",
        }
    }
}

/// A message from a client to the relay.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// A legal local move, forwarded by the relay to the peer.
    Move(MoveDescriptor),
    /// The local player wants to play again.
    RematchRequest(RematchRequest),
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(mv) => write!(f, "move {mv}"),
            Self::RematchRequest(request) => {
                write!(f, "rematch request as {} in {}", request.color, request.room_id)
            }
        }
    }
}
