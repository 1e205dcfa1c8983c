use relay_chess::Square;
use std::fmt;

/// A command typed at the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move a piece. Promotions are always to a queen.
    Move { origin: Square, destination: Square },
    /// Ask for a rematch after the game ended.
    PlayAgain,
    /// Redraw the board.
    Board,
    /// List legal moves in the current position.
    Moves,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A square that isn't in a1..h8.
    InvalidSquare(String),
    /// Move command with fewer than two squares.
    MoveMissingSquares,
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSquare(value) => write!(
                f,
                "Invalid square '{}'. Squares go from a1 to h8 (e.g., 'e2 e4')",
                value
            ),
            Self::MoveMissingSquares => {
                write!(f, "Move requires an origin and a destination (e.g., 'move e2 e4')")
            }
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
Commands:
  e2e4 | e2 e4 | move e2 e4   Move a piece (pawns promote to a queen)
  again                       Ask for a rematch once the game is over
  board                       Redraw the board
  moves                       List legal moves
  help                        Show this message
  quit                        Leave the room";

/// Parse a command string into a [`Command`].
///
/// # Examples
///
/// ```
/// use rc_client::commands::{Command, parse_command};
///
/// assert!(matches!(parse_command("again"), Ok(Command::PlayAgain)));
/// assert!(matches!(parse_command("e2e4"), Ok(Command::Move { .. })));
/// assert!(matches!(parse_command("move g7 g8"), Ok(Command::Move { .. })));
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();
    let lowered = trimmed.to_ascii_lowercase();

    // Try single-word commands first
    match lowered.as_str() {
        "again" | "play again" | "rematch" => return Ok(Command::PlayAgain),
        "board" => return Ok(Command::Board),
        "moves" => return Ok(Command::Moves),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        _ => {}
    }

    let parts: Vec<&str> = lowered.split_ascii_whitespace().collect();
    match parts.as_slice() {
        ["move", rest @ ..] => parse_move_command(rest),
        [word] if word.len() == 4 && word.is_char_boundary(2) => {
            let (origin, destination) = word.split_at(2);
            if looks_like_square(origin) {
                parse_move_command(&[origin, destination])
            } else {
                Err(ParseError::UnrecognizedCommand(trimmed.to_string()))
            }
        }
        [first, _] if looks_like_square(first) => parse_move_command(&parts),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse the squares of a move: "ORIGIN DESTINATION"
fn parse_move_command(parts: &[&str]) -> Result<Command, ParseError> {
    match parts {
        [origin, destination] => Ok(Command::Move {
            origin: parse_square(origin)?,
            destination: parse_square(destination)?,
        }),
        _ => Err(ParseError::MoveMissingSquares),
    }
}

fn parse_square(value: &str) -> Result<Square, ParseError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('a'..='h'), Some('1'..='8'), None) => Ok(Square::new(value)),
        _ => Err(ParseError::InvalidSquare(value.to_string())),
    }
}

fn looks_like_square(value: &str) -> bool {
    value.is_char_boundary(1)
        && value.len() == 2
        && value.starts_with(|c: char| c.is_ascii_lowercase())
        && value.ends_with(|c: char| c.is_ascii_digit())
}
