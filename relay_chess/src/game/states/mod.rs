//! Phase markers for the session FSM.
//!
//! Each marker is the `state` half of a `Session<T>`.

use super::state_machine::Phase;

/// Ties a marker type to its [`Phase`] tag.
pub trait PhaseMarker {
    const PHASE: Phase;
}

/// Created, relay subscription not established yet.
#[derive(Debug, Default)]
pub struct Connecting;

/// Subscribed to the room, waiting for the relay's settings.
#[derive(Debug)]
pub struct AwaitingColor;

/// A game is in progress.
#[derive(Debug)]
pub struct Active;

/// The position is terminal.
#[derive(Debug)]
pub struct GameOver;

/// This client asked for a rematch and waits for the relay's reset.
#[derive(Debug)]
pub struct RematchPending;

impl PhaseMarker for Connecting {
    const PHASE: Phase = Phase::Connecting;
}

impl PhaseMarker for AwaitingColor {
    const PHASE: Phase = Phase::AwaitingColor;
}

impl PhaseMarker for Active {
    const PHASE: Phase = Phase::Active;
}

impl PhaseMarker for GameOver {
    const PHASE: Phase = Phase::GameOver;
}

impl PhaseMarker for RematchPending {
    const PHASE: Phase = Phase::RematchPending;
}
