//! Relay networking for the session protocol.
//!
//! Frames are JSON text (`{"event": ..., "data": ...}`). The transport is
//! abstracted behind [`relay::RelayConnector`] and [`relay::RelayChannel`];
//! an in-process implementation lives in [`loopback`].

/// Protocol driver binding a session to a relay channel.
pub mod client;

/// Codec and relay error types.
pub mod errors;

/// In-process relay for local play and tests.
pub mod loopback;

/// Events exchanged with the relay.
pub mod messages;

/// Relay connector and channel traits.
pub mod relay;

/// JSON frame encoding and decoding.
pub mod utils;
