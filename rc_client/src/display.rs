//! Text rendering of a session.

use relay_chess::{Color, Phase, SessionView, Verdict};
use std::fmt::Write;

/// Status line under the board.
///
/// Once the game is over, sessions with a color also see whether they can
/// ask for a rematch or are waiting on the other player.
#[must_use]
pub fn turn_message(view: &SessionView) -> String {
    match view.phase {
        Phase::GameOver | Phase::RematchPending => {
            let mut msg = "Game Over!".to_string();
            if let Verdict::Terminal { termination } = view.verdict {
                let _ = write!(msg, " ({termination})");
            }
            if view.color.is_some() {
                if view.rematch_requested {
                    msg.push_str(" Waiting...");
                } else {
                    msg.push_str(" Type 'again' to play again.");
                }
            }
            msg
        }
        Phase::Connecting => "Connecting...".to_string(),
        _ => match view.side_to_move {
            Color::White => "White's Turn".to_string(),
            Color::Black => "Black's Turn".to_string(),
        },
    }
}

/// Expands the placement field of a FEN into 8 ranks, rank 8 first.
fn ranks(placement: &str) -> Vec<Vec<char>> {
    placement
        .split('/')
        .map(|rank| {
            let mut squares = Vec::with_capacity(8);
            for c in rank.chars() {
                match c.to_digit(10) {
                    Some(n) => squares.extend(std::iter::repeat_n('.', n as usize)),
                    None => squares.push(c),
                }
            }
            squares.resize(8, '.');
            squares
        })
        .chain(std::iter::repeat(vec!['.'; 8]))
        .take(8)
        .collect()
}

/// Draws the board from `view.orientation`'s side, followed by the room
/// header and the turn message.
#[must_use]
pub fn render(view: &SessionView) -> String {
    let board = ranks(view.position.placement());
    let white_bottom = view.orientation == Color::White;
    let rows: Vec<usize> = if white_bottom {
        (0..8).collect()
    } else {
        (0..8).rev().collect()
    };
    let files: Vec<usize> = if white_bottom {
        (0..8).collect()
    } else {
        (0..8).rev().collect()
    };

    let mut out = String::new();
    let _ = writeln!(out, "Room ID: {}", view.room_id);
    match view.color {
        Some(color) => {
            let _ = writeln!(out, "Playing {color}");
        }
        None => {
            let _ = writeln!(out, "Watching");
        }
    }
    out.push('\n');
    for row in &rows {
        let _ = write!(out, "{} ", 8 - row);
        for file in &files {
            let _ = write!(out, " {}", board[*row][*file]);
        }
        out.push('\n');
    }
    out.push_str("  ");
    for file in &files {
        let _ = write!(out, " {}", (b'a' + *file as u8) as char);
    }
    out.push('\n');
    out.push('\n');
    out.push_str(&turn_message(view));
    out.push('\n');
    out
}
