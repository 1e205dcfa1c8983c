/// Property-based tests for the rules adapter and session FSM using proptest
///
/// These tests drive random legal playouts and random move attempts to check
/// that verdicts depend only on the position, that rejected moves never
/// change anything and that turn order is enforced for both colors.
use proptest::prelude::*;
use relay_chess::{
    Color, MoveDescriptor, Outcome, Phase, Position, Rejection, RulesEngine, SessionInput,
    SessionInspection, SessionState, StandardRules, Verdict, messages::Settings,
};

const FILES: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

// Strategy to generate any square name, legal or not
fn square_strategy() -> impl Strategy<Value = String> {
    (0usize..8, 1u8..=8).prop_map(|(file, rank)| format!("{}{rank}", FILES[file]))
}

// Strategy to generate a sequence of move picks; each pick indexes into
// whatever legal moves exist at that point.
fn playout_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 0..60)
}

// Plays picks until the game ends or picks run out
fn play_out(picks: &[usize]) -> StandardRules {
    let mut rules = StandardRules::new();
    for pick in picks {
        if rules.verdict().is_terminal() {
            break;
        }
        let moves = rules.legal_moves();
        let mv = &moves[pick % moves.len()];
        rules.apply(mv).unwrap();
    }
    rules
}

fn playing(color: Color) -> SessionState {
    let state = SessionState::new("prop".into(), Box::new(StandardRules::new()));
    let (state, _) = state.handle(SessionInput::Subscribed);
    let (state, _) = state.handle(SessionInput::Settings(Settings {
        position: Position::initial(),
        color,
    }));
    state
}

proptest! {
    #[test]
    fn test_verdict_depends_only_on_position(picks in playout_strategy()) {
        let played = play_out(&picks);
        let replayed = play_out(&picks);
        prop_assert_eq!(played.position(), replayed.position());
        prop_assert_eq!(played.verdict(), replayed.verdict());

        // Loading the same position elsewhere reaches the same verdict,
        // except for history-based draws which a bare position can't see.
        let loaded = StandardRules::from_position(&played.position()).unwrap();
        match played.verdict() {
            Verdict::Terminal {
                termination: relay_chess::Termination::Draw,
            } => {}
            verdict => prop_assert_eq!(loaded.verdict(), verdict),
        }
    }

    #[test]
    fn test_legal_moves_always_apply(picks in playout_strategy()) {
        let rules = play_out(&picks);
        for mv in rules.legal_moves() {
            let mut copy = rules.clone();
            prop_assert!(copy.apply(&mv).is_ok(), "legal move {} refused", mv);
        }
    }

    #[test]
    fn test_illegal_move_is_a_no_op(
        picks in playout_strategy(),
        origin in square_strategy(),
        destination in square_strategy(),
    ) {
        let mut rules = play_out(&picks);
        let mv = MoveDescriptor::auto_queen(origin.as_str().into(), destination.as_str().into());
        let legal = rules
            .legal_moves()
            .iter()
            .any(|m| m.origin == mv.origin && m.destination == mv.destination);
        prop_assume!(!legal);

        let before = rules.position();
        let side = rules.side_to_move();
        prop_assert!(rules.apply(&mv).is_err());
        prop_assert_eq!(rules.position(), before);
        prop_assert_eq!(rules.side_to_move(), side);
    }

    #[test]
    fn test_out_of_turn_moves_rejected(
        origin in square_strategy(),
        destination in square_strategy(),
    ) {
        // Black never moves first, whatever it tries.
        let state = playing(Color::Black);
        let before = state.data().position();
        let (state, outcome) = state.handle(SessionInput::LocalMove {
            origin: origin.as_str().into(),
            destination: destination.as_str().into(),
        });
        prop_assert_eq!(
            outcome,
            Outcome::Ignored(Rejection::OutOfTurn { to_move: Color::White })
        );
        prop_assert_eq!(state.data().position(), before);
        prop_assert_eq!(state.phase(), Phase::Active);
    }

    #[test]
    fn test_local_moves_publish_only_when_legal(
        origin in square_strategy(),
        destination in square_strategy(),
    ) {
        let state = playing(Color::White);
        let legal = state
            .data()
            .legal_moves()
            .iter()
            .any(|m| m.origin.as_str() == origin && m.destination.as_str() == destination);
        let before = state.data().position();
        let (state, outcome) = state.handle(SessionInput::LocalMove {
            origin: origin.as_str().into(),
            destination: destination.as_str().into(),
        });
        if legal {
            let published = matches!(outcome, Outcome::Publish(_));
            prop_assert!(published);
            prop_assert_eq!(state.data().side_to_move(), Color::Black);
        } else {
            prop_assert!(outcome.is_ignored());
            prop_assert_eq!(state.data().position(), before);
        }
    }
}
