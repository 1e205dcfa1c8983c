//! Session state machine.
//!
//! A session is always in exactly one of five phases. Each phase is its own
//! type, `Session<T>`, and the only ways to move between phases are the
//! `From` conversions below. [`SessionState`] wraps the phases so a client
//! can hold any of them, and [`SessionState::handle`] is the transition
//! table: inputs that aren't listed for a phase come back as a
//! [`Rejection`] and leave the session untouched.

use enum_dispatch::enum_dispatch;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{
    entities::{Color, MoveDescriptor, Position, RoomId, Square, Verdict},
    rules::{RulesEngine, RulesError, StandardRules},
    states::{Active, AwaitingColor, Connecting, GameOver, PhaseMarker, RematchPending},
};
use crate::net::messages::{ClientEvent, RelayEvent, RematchRequest, Settings};

/// Why an input was ignored. Rejections never change session state and
/// are never shown to the user as errors.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Rejection {
    #[error("not subscribed to the relay yet")]
    NotSubscribed,
    #[error("already subscribed")]
    AlreadySubscribed,
    #[error("no color assigned")]
    ColorUnassigned,
    #[error("not your turn ({to_move} to move)")]
    OutOfTurn { to_move: Color },
    #[error("moves can't be made while {phase}")]
    NotActive { phase: Phase },
    #[error("game isn't over ({phase})")]
    GameNotOver { phase: Phase },
    #[error("rematch already requested")]
    RematchAlreadyRequested,
    #[error("unexpected {event} while {phase}")]
    UnexpectedEvent { event: &'static str, phase: Phase },
    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Everything that can drive a session forward.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionInput {
    /// The relay subscription for the room is established.
    Subscribed,
    /// Color and position from the relay.
    Settings(Settings),
    /// A move made by the peer.
    RemoteMove(MoveDescriptor),
    /// The relay matched both rematch requests.
    Reset,
    /// The local player dropped a piece from `origin` to `destination`.
    LocalMove { origin: Square, destination: Square },
    /// The local player wants another game.
    PlayAgain,
}

impl From<RelayEvent> for SessionInput {
    fn from(value: RelayEvent) -> Self {
        match value {
            RelayEvent::Settings(settings) => Self::Settings(settings),
            RelayEvent::Move(mv) => Self::RemoteMove(mv),
            RelayEvent::Reset => Self::Reset,
        }
    }
}

/// Result of handling one input.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// State changed; nothing to send.
    Applied,
    /// State changed and the event must be published to the relay.
    Publish(ClientEvent),
    /// Input ignored; state unchanged.
    Ignored(Rejection),
}

impl Outcome {
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Connecting,
    AwaitingColor,
    Active,
    GameOver,
    RematchPending,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Connecting => "connecting",
            Self::AwaitingColor => "awaiting color",
            Self::Active => "active",
            Self::GameOver => "game over",
            Self::RematchPending => "rematch pending",
        };
        write!(f, "{repr}")
    }
}

/// Data carried across every phase of a session.
#[derive(Debug)]
pub struct SessionData {
    room_id: RoomId,
    rules: Box<dyn RulesEngine>,
    color: Option<Color>,
    rematch_requested: bool,
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new(RoomId::default(), Box::new(StandardRules::new()))
    }
}

impl SessionData {
    #[must_use]
    pub fn new(room_id: RoomId, rules: Box<dyn RulesEngine>) -> Self {
        Self {
            room_id,
            rules,
            color: None,
            rematch_requested: false,
        }
    }

    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    #[must_use]
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    #[must_use]
    pub fn rematch_requested(&self) -> bool {
        self.rematch_requested
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.rules.position()
    }

    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.rules.side_to_move()
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.rules.verdict()
    }

    #[must_use]
    pub fn legal_moves(&self) -> Vec<MoveDescriptor> {
        self.rules.legal_moves()
    }

    /// Board orientation. Sessions without a color see white at the bottom.
    #[must_use]
    pub fn orientation(&self) -> Color {
        self.color.unwrap_or(Color::White)
    }

    /// Settings fully replace the engine state and start a fresh game.
    fn load_settings(&mut self, settings: &Settings) -> Result<Verdict, RulesError> {
        self.rules.load(&settings.position)?;
        self.color = Some(settings.color);
        self.rematch_requested = false;
        Ok(self.rules.verdict())
    }

    fn apply_move(&mut self, mv: &MoveDescriptor) -> Result<Verdict, RulesError> {
        self.rules.apply(mv)?;
        Ok(self.rules.verdict())
    }

    fn reset_for_rematch(&mut self) {
        self.rules.reset();
        self.rematch_requested = false;
        self.color = self.color.map(Color::opposite);
    }
}

/// Serializable snapshot of a session for rendering.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SessionView {
    pub room_id: RoomId,
    pub phase: Phase,
    pub position: Position,
    pub color: Option<Color>,
    pub orientation: Color,
    pub side_to_move: Color,
    pub verdict: Verdict,
    pub rematch_requested: bool,
    /// "Play Again" is only offered to a session holding a color once
    /// the game is over.
    pub can_play_again: bool,
}

/// Read access shared by every phase.
#[enum_dispatch]
pub trait SessionInspection {
    fn phase(&self) -> Phase;

    fn data(&self) -> &SessionData;

    #[must_use]
    fn view(&self) -> SessionView {
        let data = self.data();
        let phase = self.phase();
        SessionView {
            room_id: data.room_id.clone(),
            phase,
            position: data.position(),
            color: data.color,
            orientation: data.orientation(),
            side_to_move: data.side_to_move(),
            verdict: data.verdict(),
            rematch_requested: data.rematch_requested,
            can_play_again: phase == Phase::GameOver && data.color.is_some(),
        }
    }
}

/// A session in phase `T`.
#[derive(Debug)]
pub struct Session<T> {
    pub data: SessionData,
    pub state: T,
}

impl<T: PhaseMarker> SessionInspection for Session<T> {
    fn phase(&self) -> Phase {
        T::PHASE
    }

    fn data(&self) -> &SessionData {
        &self.data
    }
}

impl Session<Connecting> {
    #[must_use]
    pub fn new(room_id: RoomId, rules: Box<dyn RulesEngine>) -> Self {
        Self {
            data: SessionData::new(room_id, rules),
            state: Connecting,
        }
    }
}

impl Default for Session<Connecting> {
    fn default() -> Self {
        Self {
            data: SessionData::default(),
            state: Connecting,
        }
    }
}

macro_rules! impl_transition {
    ($from:ident => $to:ident) => {
        impl From<Session<$from>> for Session<$to> {
            fn from(value: Session<$from>) -> Self {
                Self {
                    data: value.data,
                    state: $to,
                }
            }
        }
    };
}

impl_transition!(Connecting => AwaitingColor);
impl_transition!(AwaitingColor => Active);
impl_transition!(AwaitingColor => GameOver);
impl_transition!(Active => GameOver);
impl_transition!(GameOver => RematchPending);
impl_transition!(RematchPending => GameOver);

// Leaving a finished game always starts from a clean rematch flag.

impl From<Session<GameOver>> for Session<Active> {
    fn from(mut value: Session<GameOver>) -> Self {
        value.data.rematch_requested = false;
        Self {
            data: value.data,
            state: Active,
        }
    }
}

impl From<Session<RematchPending>> for Session<Active> {
    fn from(mut value: Session<RematchPending>) -> Self {
        value.data.rematch_requested = false;
        Self {
            data: value.data,
            state: Active,
        }
    }
}

/// A session in any phase.
#[enum_dispatch(SessionInspection)]
#[derive(Debug)]
pub enum SessionState {
    Connecting(Session<Connecting>),
    AwaitingColor(Session<AwaitingColor>),
    Active(Session<Active>),
    GameOver(Session<GameOver>),
    RematchPending(Session<RematchPending>),
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Connecting(Session::default())
    }
}

/// Moves a session whose position just changed to `Active` or `GameOver`
/// depending on the verdict.
fn settle<T>(session: Session<T>, verdict: Verdict) -> SessionState
where
    Session<T>: Into<Session<Active>> + Into<Session<GameOver>>,
{
    if verdict.is_terminal() {
        info!("room {}: game over ({verdict:?})", session.data.room_id);
        SessionState::GameOver(session.into())
    } else {
        SessionState::Active(session.into())
    }
}

/// Applies settings to a session in any attached phase. The later
/// settings always win.
fn on_settings<T>(mut session: Session<T>, settings: &Settings) -> (SessionState, Outcome)
where
    Session<T>: Into<Session<Active>> + Into<Session<GameOver>> + Into<SessionState>,
{
    match session.data.load_settings(settings) {
        Ok(verdict) => {
            info!(
                "room {}: playing {} from {}",
                session.data.room_id, settings.color, settings.position
            );
            (settle(session, verdict), Outcome::Applied)
        }
        Err(error) => {
            warn!("room {}: rejected settings: {error}", session.data.room_id);
            (session.into(), Outcome::Ignored(error.into()))
        }
    }
}

/// Applies a peer's move. The engine refuses moves it can't apply; the
/// session is left as it was in that case.
fn on_remote_move<T>(mut session: Session<T>, mv: &MoveDescriptor) -> (SessionState, Outcome)
where
    Session<T>: Into<Session<Active>> + Into<Session<GameOver>> + Into<SessionState>,
{
    match session.data.apply_move(mv) {
        Ok(verdict) => (settle(session, verdict), Outcome::Applied),
        Err(error) => {
            warn!(
                "room {}: peer move {mv} not applied: {error}",
                session.data.room_id
            );
            (session.into(), Outcome::Ignored(error.into()))
        }
    }
}

fn on_reset<T>(mut session: Session<T>) -> (SessionState, Outcome)
where
    Session<T>: Into<Session<Active>>,
{
    session.data.reset_for_rematch();
    info!(
        "room {}: new game, now playing {}",
        session.data.room_id,
        session
            .data
            .color
            .map_or_else(|| "no color".to_string(), |color| color.to_string())
    );
    (SessionState::Active(session.into()), Outcome::Applied)
}

fn on_local_move(
    mut session: Session<Active>,
    origin: Square,
    destination: Square,
) -> (SessionState, Outcome) {
    let Some(color) = session.data.color else {
        return (session.into(), Outcome::Ignored(Rejection::ColorUnassigned));
    };
    let to_move = session.data.side_to_move();
    if to_move != color {
        return (session.into(), Outcome::Ignored(Rejection::OutOfTurn { to_move }));
    }
    let mv = MoveDescriptor::auto_queen(origin, destination);
    match session.data.apply_move(&mv) {
        Ok(verdict) => (
            settle(session, verdict),
            Outcome::Publish(ClientEvent::Move(mv)),
        ),
        Err(error) => (session.into(), Outcome::Ignored(error.into())),
    }
}

fn on_play_again(mut session: Session<GameOver>) -> (SessionState, Outcome) {
    let Some(color) = session.data.color else {
        return (session.into(), Outcome::Ignored(Rejection::ColorUnassigned));
    };
    session.data.rematch_requested = true;
    let request = RematchRequest {
        room_id: session.data.room_id.clone(),
        color,
    };
    info!("room {}: requested a rematch", session.data.room_id);
    let session: Session<RematchPending> = session.into();
    (
        session.into(),
        Outcome::Publish(ClientEvent::RematchRequest(request)),
    )
}

impl SessionState {
    /// A fresh session that hasn't subscribed to its room yet.
    #[must_use]
    pub fn new(room_id: RoomId, rules: Box<dyn RulesEngine>) -> Self {
        Self::Connecting(Session::new(room_id, rules))
    }

    /// Handles one input and returns the next state.
    ///
    /// This is the whole transition table. Anything not matched explicitly
    /// is rejected without touching the session.
    #[must_use]
    pub fn handle(self, input: SessionInput) -> (Self, Outcome) {
        let (state, outcome) = match (self, input) {
            (Self::Connecting(session), SessionInput::Subscribed) => {
                let session: Session<AwaitingColor> = session.into();
                (session.into(), Outcome::Applied)
            }
            (state @ Self::Connecting(_), _) => (state, Outcome::Ignored(Rejection::NotSubscribed)),
            (state, SessionInput::Subscribed) => {
                (state, Outcome::Ignored(Rejection::AlreadySubscribed))
            }

            (Self::AwaitingColor(session), SessionInput::Settings(settings)) => {
                on_settings(session, &settings)
            }
            (Self::Active(session), SessionInput::Settings(settings)) => {
                on_settings(session, &settings)
            }
            (Self::GameOver(session), SessionInput::Settings(settings)) => {
                on_settings(session, &settings)
            }
            (Self::RematchPending(session), SessionInput::Settings(settings)) => {
                on_settings(session, &settings)
            }

            // Without a color there's nothing to settle into but waiting
            // or, if the peer's move ended the game, game over.
            (Self::AwaitingColor(mut session), SessionInput::RemoteMove(mv)) => {
                match session.data.apply_move(&mv) {
                    Ok(verdict) if verdict.is_terminal() => {
                        let session: Session<GameOver> = session.into();
                        (session.into(), Outcome::Applied)
                    }
                    Ok(_) => (session.into(), Outcome::Applied),
                    Err(error) => {
                        warn!(
                            "room {}: peer move {mv} not applied: {error}",
                            session.data.room_id
                        );
                        (session.into(), Outcome::Ignored(error.into()))
                    }
                }
            }
            (Self::Active(session), SessionInput::RemoteMove(mv)) => on_remote_move(session, &mv),
            (Self::GameOver(session), SessionInput::RemoteMove(mv)) => {
                on_remote_move(session, &mv)
            }
            (Self::RematchPending(session), SessionInput::RemoteMove(mv)) => {
                on_remote_move(session, &mv)
            }

            (Self::GameOver(session), SessionInput::Reset) => on_reset(session),
            (Self::RematchPending(session), SessionInput::Reset) => on_reset(session),
            (state, SessionInput::Reset) => {
                let phase = state.phase();
                warn!("room {}: ignoring reset while {phase}", state.data().room_id());
                (
                    state,
                    Outcome::Ignored(Rejection::UnexpectedEvent {
                        event: "reset",
                        phase,
                    }),
                )
            }

            (Self::Active(session), SessionInput::LocalMove { origin, destination }) => {
                on_local_move(session, origin, destination)
            }
            (state, SessionInput::LocalMove { .. }) => {
                let phase = state.phase();
                (state, Outcome::Ignored(Rejection::NotActive { phase }))
            }

            (Self::GameOver(session), SessionInput::PlayAgain) => on_play_again(session),
            (state @ Self::RematchPending(_), SessionInput::PlayAgain) => {
                (state, Outcome::Ignored(Rejection::RematchAlreadyRequested))
            }
            (state, SessionInput::PlayAgain) => {
                let phase = state.phase();
                (state, Outcome::Ignored(Rejection::GameNotOver { phase }))
            }
        };
        if let Outcome::Ignored(rejection) = &outcome {
            debug!("room {}: ignored input: {rejection}", state.data().room_id());
        }
        (state, outcome)
    }
}
