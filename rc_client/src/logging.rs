//! Structured logging configuration.
//!
//! Logs go to stderr so the board printed on stdout stays readable.
//! Records emitted through the `log` facade by `relay_chess` are picked up
//! by the same subscriber.

use relay_chess::{Rejection, messages::RelayEvent};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` isn't set.
pub const DEFAULT_FILTER: &str = "info,tungstenite=warn,tokio_tungstenite=warn";

/// Initialize logging
///
/// Configurable log levels via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use rc_client::logging;
///
/// logging::init();
/// tracing::info!("Client starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Log an event received from the relay with structured data
///
/// # Example
///
/// ```
/// use rc_client::logging::log_relay_event;
/// use relay_chess::{RoomId, messages::RelayEvent};
///
/// log_relay_event(&RoomId::new("abc"), &RelayEvent::Reset);
/// ```
pub fn log_relay_event(room_id: &relay_chess::RoomId, event: &RelayEvent) {
    tracing::debug!(
        room_id = room_id.as_str(),
        event = event.name(),
        "Relay event: {}",
        event
    );
}

/// Log an input the session ignored
///
/// Rejections are expected during normal play (clicking out of turn,
/// illegal drags), so they stay at debug level.
pub fn log_rejection(room_id: &relay_chess::RoomId, rejection: &Rejection) {
    tracing::debug!(
        room_id = room_id.as_str(),
        "Input ignored: {}",
        rejection
    );
}
