//! Chess session model - entities, rules adapter and the session FSM.
//!
//! This module provides:
//! - Wire-neutral entities (colors, squares, moves, positions, verdicts)
//! - The [`RulesEngine`] contract and its `chess`-backed implementation
//! - The five-phase session state machine

pub mod entities;
pub mod rules;
pub mod state_machine;
pub mod states;

pub use rules::{RulesEngine, RulesError, StandardRules};
pub use state_machine::{
    Outcome, Phase, Rejection, Session, SessionData, SessionInput, SessionInspection,
    SessionState, SessionView,
};
