//! Internal modules for the relay chess client.
//!
//! This library provides configuration, logging, command parsing, board
//! rendering and the WebSocket relay channel used by the rc_client binary.

pub mod commands;
pub mod config;
pub mod display;
pub mod logging;
pub mod websocket_client;
