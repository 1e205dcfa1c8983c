//! Protocol driver.
//!
//! A [`Client`] owns one session and one relay channel and is the only
//! thing that touches either. Every input, local or from the relay, goes
//! through the session FSM; whatever the FSM asks to publish is sent
//! before the call returns.

use log::{debug, info, warn};
use std::mem;

use super::{
    messages::RelayEvent,
    relay::{RelayChannel, RelayConnector, Result},
};
use crate::game::{
    Outcome, SessionInput, SessionInspection, SessionState, SessionView,
    entities::{MoveDescriptor, RoomId, Square},
    rules::RulesEngine,
};

/// A session bound to a relay subscription.
///
/// The subscription is released by [`Client::detach`], or by dropping
/// the client if the channel releases on drop.
#[derive(Debug)]
pub struct Client<C: RelayChannel> {
    state: SessionState,
    channel: C,
}

impl<C: RelayChannel> Client<C> {
    /// Subscribe to `room_id` and start a session in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay refuses the subscription.
    pub async fn attach<R>(
        connector: &R,
        room_id: RoomId,
        rules: Box<dyn RulesEngine>,
    ) -> Result<Self>
    where
        R: RelayConnector<Channel = C>,
    {
        let channel = connector.subscribe(&room_id).await?;
        info!("attached to room {room_id}");
        let mut client = Self {
            state: SessionState::new(room_id, rules),
            channel,
        };
        client.step(SessionInput::Subscribed).await?;
        Ok(client)
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.state.view()
    }

    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        self.state.data().room_id()
    }

    #[must_use]
    pub fn legal_moves(&self) -> Vec<MoveDescriptor> {
        self.state.data().legal_moves()
    }

    /// Try to move a piece from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the move was accepted but couldn't be
    /// published. Rejected moves come back as [`Outcome::Ignored`].
    ///
    /// A failed publish means the channel is gone, so the move stays
    /// applied locally and the session is out of sync with its peer.
    /// Callers should detach rather than keep playing.
    pub async fn make_move(&mut self, origin: Square, destination: Square) -> Result<Outcome> {
        self.step(SessionInput::LocalMove {
            origin,
            destination,
        })
        .await
    }

    /// Ask for a rematch.
    ///
    /// # Errors
    ///
    /// Returns an error if the request couldn't be published. The session
    /// is left in `RematchPending` in that case, as with [`Client::make_move`].
    pub async fn play_again(&mut self) -> Result<Outcome> {
        self.step(SessionInput::PlayAgain).await
    }

    /// Wait for the next relay event and apply it.
    ///
    /// Returns `None` once the relay ends the subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails.
    pub async fn recv(&mut self) -> Result<Option<(RelayEvent, Outcome)>> {
        match self.channel.next_event().await? {
            Some(event) => {
                let outcome = self.apply(event.clone()).await?;
                Ok(Some((event, outcome)))
            }
            None => {
                info!("relay closed room {}", self.room_id());
                Ok(None)
            }
        }
    }

    /// Apply a relay event that was received out of band.
    ///
    /// # Errors
    ///
    /// Returns an error if a resulting event couldn't be published.
    pub async fn apply(&mut self, event: RelayEvent) -> Result<Outcome> {
        debug!("room {}: received {event}", self.room_id());
        self.step(event.into()).await
    }

    /// Release the relay subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails to close cleanly. The
    /// subscription is gone either way.
    pub async fn detach(mut self) -> Result<()> {
        info!("detaching from room {}", self.room_id());
        self.channel.close().await
    }

    // The new state is committed before publishing; see `make_move`.
    async fn step(&mut self, input: SessionInput) -> Result<Outcome> {
        let state = mem::take(&mut self.state);
        let before = state.phase();
        let (state, outcome) = state.handle(input);
        self.state = state;
        let after = self.state.phase();
        if before != after {
            info!("room {}: {before} -> {after}", self.room_id());
        }
        if let Outcome::Publish(event) = &outcome {
            debug!("room {}: publishing {event}", self.room_id());
            if let Err(error) = self.channel.publish(event).await {
                warn!("room {}: failed to publish {event}: {error}", self.room_id());
                return Err(error);
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::RelayError,
        game::{
            Phase, StandardRules,
            entities::{Color, Position},
        },
        net::{
            loopback::{LoopbackChannel, LoopbackRelay},
            messages::{ClientEvent, Settings},
        },
    };
    use async_trait::async_trait;

    /// A channel whose connection dropped: every publish fails.
    #[derive(Debug)]
    struct BrokenChannel;

    #[async_trait]
    impl RelayChannel for BrokenChannel {
        async fn publish(&mut self, _event: &ClientEvent) -> Result<()> {
            Err(RelayError::Transport("connection reset".to_string()))
        }

        async fn next_event(&mut self) -> Result<Option<RelayEvent>> {
            Ok(None)
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn broken_client(color: Color) -> Client<BrokenChannel> {
        let state = SessionState::new(RoomId::new("room"), Box::new(StandardRules::new()));
        let (state, _) = state.handle(SessionInput::Subscribed);
        let (state, _) = state.handle(SessionInput::Settings(Settings {
            position: Position::initial(),
            color,
        }));
        Client {
            state,
            channel: BrokenChannel,
        }
    }

    async fn attach(relay: &LoopbackRelay, room: &str) -> Client<LoopbackChannel> {
        Client::attach(relay, RoomId::new(room), Box::new(StandardRules::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_attach_awaits_color() {
        let relay = LoopbackRelay::new();
        let client = attach(&relay, "room").await;
        assert_eq!(client.state().phase(), Phase::AwaitingColor);
        assert_eq!(relay.subscriber_count(&RoomId::new("room")), 1);
    }

    #[tokio::test]
    async fn test_recv_applies_settings() {
        let relay = LoopbackRelay::new();
        let mut white = attach(&relay, "room").await;
        let _black = attach(&relay, "room").await;
        let (event, outcome) = white.recv().await.unwrap().unwrap();
        assert!(matches!(event, RelayEvent::Settings(Settings { color: Color::White, .. })));
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(white.view().phase, Phase::Active);
    }

    #[tokio::test]
    async fn test_rejected_move_publishes_nothing() {
        let relay = LoopbackRelay::new();
        let mut white = attach(&relay, "room").await;
        let mut black = attach(&relay, "room").await;
        white.recv().await.unwrap();
        black.recv().await.unwrap();

        let outcome = black.make_move("e7".into(), "e5".into()).await.unwrap();
        assert!(outcome.is_ignored());
        let outcome = white.make_move("e2".into(), "e4".into()).await.unwrap();
        assert!(matches!(outcome, Outcome::Publish(ClientEvent::Move(_))));
        let (event, _) = black.recv().await.unwrap().unwrap();
        assert_eq!(
            event,
            RelayEvent::Move(MoveDescriptor::auto_queen("e2".into(), "e4".into()))
        );
    }

    #[tokio::test]
    async fn test_detach_releases_subscription() {
        let relay = LoopbackRelay::new();
        let client = attach(&relay, "room").await;
        client.detach().await.unwrap();
        assert_eq!(relay.subscriber_count(&RoomId::new("room")), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let relay = LoopbackRelay::new();
        {
            let _client = attach(&relay, "room").await;
            assert_eq!(relay.subscriber_count(&RoomId::new("room")), 1);
        }
        assert_eq!(relay.subscriber_count(&RoomId::new("room")), 0);
    }

    #[tokio::test]
    async fn test_failed_publish_keeps_local_move() {
        let mut client = broken_client(Color::White);
        let result = client.make_move("e2".into(), "e4".into()).await;
        assert!(matches!(result, Err(RelayError::Transport(_))));
        assert_eq!(client.view().side_to_move, Color::Black);
        assert_eq!(client.view().phase, Phase::Active);
    }

    #[tokio::test]
    async fn test_rejected_move_never_reaches_channel() {
        let mut client = broken_client(Color::Black);
        let outcome = client.make_move("e7".into(), "e5".into()).await.unwrap();
        assert!(outcome.is_ignored());
    }
}
