//! # Relay Chess
//!
//! Two-peer chess over a room-scoped relay. Each client runs the same
//! session protocol: it agrees on colors with the relay, enforces turn
//! order locally, detects the end of the game from the position alone and
//! renegotiates a rematch with colors swapped. There's no arbiter; both
//! peers apply each other's moves to their own rules engine.
//!
//! The session is a finite state machine with five phases, each its own
//! type, wrapped by `enum_dispatch`:
//!
//! - **Connecting**: created, not subscribed to the room yet
//! - **AwaitingColor**: subscribed, waiting for the relay's settings
//! - **Active**: a game is in progress
//! - **GameOver**: the position is terminal
//! - **RematchPending**: asked for another game, waiting for the reset
//!
//! ## Core Modules
//!
//! - [`game`]: Entities, rules engine adapter and the session FSM
//! - [`net`]: Wire protocol, relay abstraction and the protocol driver
//!
//! ## Example
//!
//! ```
//! use relay_chess::{Phase, SessionInput, SessionInspection, SessionState, StandardRules};
//!
//! let session = SessionState::new("room".into(), Box::new(StandardRules::new()));
//! let (session, _) = session.handle(SessionInput::Subscribed);
//! assert_eq!(session.phase(), Phase::AwaitingColor);
//! ```

/// Networking components for relay communication.
pub mod net;
pub use net::{client::Client, errors, loopback, messages, relay, utils};

/// Core game model, rules adapter and session state machine.
pub mod game;
pub use game::{
    Outcome, Phase, Rejection, RulesEngine, RulesError, SessionInput, SessionInspection,
    SessionState, SessionView, StandardRules,
    entities::{self, Color, MoveDescriptor, Position, RoomId, Square, Termination, Verdict},
};
