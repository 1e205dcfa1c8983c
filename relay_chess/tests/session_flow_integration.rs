/// Integration tests for two-peer session flows
///
/// These tests pair clients over the loopback relay and verify color
/// assignment, move exchange, terminal detection and rematches end to end.
use relay_chess::{
    Client, Color, MoveDescriptor, Outcome, Phase, RoomId, RulesEngine, StandardRules,
    loopback::{LoopbackChannel, LoopbackRelay},
    messages::{ClientEvent, RelayEvent},
};

type TestClient = Client<LoopbackChannel>;

async fn attach(relay: &LoopbackRelay, room: &str) -> TestClient {
    Client::attach(relay, RoomId::new(room), Box::new(StandardRules::new()))
        .await
        .unwrap()
}

/// Two clients that have both received their settings.
async fn paired(relay: &LoopbackRelay, room: &str) -> (TestClient, TestClient) {
    let mut white = attach(relay, room).await;
    let mut black = attach(relay, room).await;
    white.recv().await.unwrap().unwrap();
    black.recv().await.unwrap().unwrap();
    (white, black)
}

/// Plays `origin`-`destination` on `mover` and delivers it to `peer`.
async fn exchange(
    mover: &mut TestClient,
    peer: &mut TestClient,
    origin: &str,
    destination: &str,
) {
    let outcome = mover
        .make_move(origin.into(), destination.into())
        .await
        .unwrap();
    assert!(
        matches!(outcome, Outcome::Publish(ClientEvent::Move(_))),
        "{origin}{destination} should have been accepted"
    );
    let (event, outcome) = peer.recv().await.unwrap().unwrap();
    assert!(matches!(event, RelayEvent::Move(_)));
    assert_eq!(outcome, Outcome::Applied);
}

async fn fools_mate(white: &mut TestClient, black: &mut TestClient) {
    exchange(white, black, "f2", "f3").await;
    exchange(black, white, "e7", "e5").await;
    exchange(white, black, "g2", "g4").await;
    exchange(black, white, "d8", "h4").await;
}

#[tokio::test]
async fn test_colors_are_exclusive() {
    let relay = LoopbackRelay::new();
    let (white, black) = paired(&relay, "exclusive").await;

    let white_view = white.view();
    let black_view = black.view();
    assert_eq!(white_view.color, Some(Color::White));
    assert_eq!(black_view.color, Some(Color::Black));
    assert_eq!(white_view.phase, Phase::Active);
    assert_eq!(black_view.phase, Phase::Active);
    assert_eq!(white_view.position, black_view.position);
}

#[tokio::test]
async fn test_orientation_follows_color() {
    let relay = LoopbackRelay::new();
    let mut white = attach(&relay, "orientation").await;
    assert_eq!(white.view().orientation, Color::White);

    let mut black = attach(&relay, "orientation").await;
    white.recv().await.unwrap();
    black.recv().await.unwrap();
    assert_eq!(black.view().orientation, Color::Black);
}

#[tokio::test]
async fn test_e2e4_reaches_peer() {
    let relay = LoopbackRelay::new();
    let (mut white, mut black) = paired(&relay, "e2e4").await;

    let outcome = white.make_move("e2".into(), "e4".into()).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Publish(ClientEvent::Move(MoveDescriptor::auto_queen(
            "e2".into(),
            "e4".into()
        )))
    );

    let (event, _) = black.recv().await.unwrap().unwrap();
    let RelayEvent::Move(mv) = event else {
        panic!("expected a move");
    };
    assert_eq!(mv.origin.as_str(), "e2");
    assert_eq!(mv.destination.as_str(), "e4");
    assert_eq!(mv.promotion, Some(relay_chess::entities::Promotion::Queen));

    assert_eq!(white.view().position, black.view().position);
    assert_eq!(black.view().side_to_move, Color::Black);
}

#[tokio::test]
async fn test_out_of_turn_attempt_is_silent() {
    let relay = LoopbackRelay::new();
    let (mut white, mut black) = paired(&relay, "turns").await;
    let before = black.view().position;

    let outcome = black.make_move("e7".into(), "e5".into()).await.unwrap();
    assert!(outcome.is_ignored());
    assert_eq!(black.view().position, before);

    // Nothing reached white: its next event is black's legal reply.
    exchange(&mut white, &mut black, "d2", "d4").await;
    exchange(&mut black, &mut white, "d7", "d5").await;
    assert_eq!(white.view().position, black.view().position);
}

#[tokio::test]
async fn test_checkmate_ends_game_for_both() {
    let relay = LoopbackRelay::new();
    let (mut white, mut black) = paired(&relay, "mate").await;
    fools_mate(&mut white, &mut black).await;

    assert_eq!(white.view().phase, Phase::GameOver);
    assert_eq!(black.view().phase, Phase::GameOver);
    assert!(white.view().verdict.is_terminal());
    assert!(white.view().can_play_again);
    assert!(black.view().can_play_again);

    // The game is over; further moves go nowhere.
    let outcome = white.make_move("e2".into(), "e4".into()).await.unwrap();
    assert!(outcome.is_ignored());
}

#[tokio::test]
async fn test_rematch_swaps_colors() {
    let relay = LoopbackRelay::new();
    let (mut white, mut black) = paired(&relay, "rematch").await;
    fools_mate(&mut white, &mut black).await;

    let outcome = white.play_again().await.unwrap();
    assert!(matches!(outcome, Outcome::Publish(ClientEvent::RematchRequest(_))));
    assert_eq!(white.view().phase, Phase::RematchPending);
    assert!(white.play_again().await.unwrap().is_ignored());

    black.play_again().await.unwrap();
    let (event, _) = white.recv().await.unwrap().unwrap();
    assert_eq!(event, RelayEvent::Reset);
    let (event, _) = black.recv().await.unwrap().unwrap();
    assert_eq!(event, RelayEvent::Reset);

    let initial = StandardRules::new().position();
    for (client, color) in [(&white, Color::Black), (&black, Color::White)] {
        let view = client.view();
        assert_eq!(view.phase, Phase::Active);
        assert_eq!(view.color, Some(color));
        assert!(!view.rematch_requested);
        assert_eq!(view.position, initial);
    }

    // The former black player now opens.
    exchange(&mut black, &mut white, "e2", "e4").await;
}

#[tokio::test]
async fn test_spectator_follows_without_rematch() {
    let relay = LoopbackRelay::new();
    let (mut white, mut black) = paired(&relay, "spectate").await;
    let mut spectator = attach(&relay, "spectate").await;
    assert_eq!(spectator.view().phase, Phase::AwaitingColor);

    fools_mate(&mut white, &mut black).await;
    for _ in 0..4 {
        spectator.recv().await.unwrap().unwrap();
    }

    let view = spectator.view();
    assert_eq!(view.phase, Phase::GameOver);
    assert_eq!(view.color, None);
    assert_eq!(view.orientation, Color::White);
    assert!(!view.can_play_again);
    assert_eq!(view.position, white.view().position);
    assert!(spectator.play_again().await.unwrap().is_ignored());
}

#[tokio::test]
async fn test_detach_releases_room() {
    let relay = LoopbackRelay::new();
    let (white, black) = paired(&relay, "detach").await;
    let room = RoomId::new("detach");
    assert_eq!(relay.subscriber_count(&room), 2);

    white.detach().await.unwrap();
    assert_eq!(relay.subscriber_count(&room), 1);
    drop(black);
    assert_eq!(relay.subscriber_count(&room), 0);
}

#[tokio::test]
async fn test_settings_overwrite_midgame() {
    let relay = LoopbackRelay::new();
    let (mut white, mut black) = paired(&relay, "overwrite").await;
    exchange(&mut white, &mut black, "e2", "e4").await;

    // A fresh pairing after a seat changes hands starts over.
    drop(white);
    let mut newcomer = attach(&relay, "overwrite").await;
    newcomer.recv().await.unwrap().unwrap();
    black.recv().await.unwrap().unwrap();

    assert_eq!(newcomer.view().color, Some(Color::White));
    assert_eq!(black.view().color, Some(Color::Black));
    assert_eq!(black.view().position, newcomer.view().position);
    assert_eq!(black.view().side_to_move, Color::White);
}
