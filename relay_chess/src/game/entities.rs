use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// FEN of the canonical starting position.
pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Upper bound on user-provided identifiers (room ids, squares) so a
/// misbehaving peer can't make us hold arbitrarily large strings.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Cuts `s` to at most `MAX_IDENTIFIER_LENGTH` bytes on a char boundary.
fn clamp_identifier(s: &mut String) {
    if s.len() > MAX_IDENTIFIER_LENGTH {
        let mut end = MAX_IDENTIFIER_LENGTH;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::White => "white",
            Self::Black => "black",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(Self::White),
            "black" | "b" => Ok(Self::Black),
            other => Err(format!("unknown color '{other}'")),
        }
    }
}

/// Opaque room identifier. Immutable for the lifetime of a session.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(s: &str) -> Self {
        let mut id = s.trim().to_string();
        clamp_identifier(&mut id);
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// A square name in algebraic notation (e.g., "e4"). Kept as text so the
/// wire format stays engine-neutral; the rules engine parses it.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Square(String);

impl Square {
    pub fn new(s: &str) -> Self {
        let mut square = s.trim().to_ascii_lowercase();
        clamp_identifier(&mut square);
        Self(square)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for Square {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Promotion {
    #[default]
    #[serde(rename = "q")]
    Queen,
    #[serde(rename = "r")]
    Rook,
    #[serde(rename = "b")]
    Bishop,
    #[serde(rename = "n")]
    Knight,
}

impl fmt::Display for Promotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Queen => "q",
            Self::Rook => "r",
            Self::Bishop => "b",
            Self::Knight => "n",
        };
        write!(f, "{repr}")
    }
}

/// A move in transport-neutral form.
///
/// `promotion` is only consulted when the move actually promotes a pawn.
/// A missing promotion on a promoting move means a queen.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct MoveDescriptor {
    pub origin: Square,
    pub destination: Square,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
}

impl MoveDescriptor {
    /// Local moves always carry a queen promotion, whether or not the
    /// move turns out to be a promotion. Peers don't negotiate
    /// under-promotion.
    pub fn auto_queen(origin: Square, destination: Square) -> Self {
        Self {
            origin,
            destination,
            promotion: Some(Promotion::Queen),
        }
    }
}

impl fmt::Display for MoveDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.destination)?;
        if let Some(promotion) = self.promotion {
            write!(f, "={promotion}")?;
        }
        Ok(())
    }
}

/// A serialized board position (FEN).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    pub fn new(fen: &str) -> Self {
        Self(fen.trim().to_string())
    }

    #[must_use]
    pub fn initial() -> Self {
        Self(STARTING_POSITION.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The piece placement field of the FEN, i.e., everything before
    /// the first space.
    #[must_use]
    pub fn placement(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or_default()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a game ended. The protocol itself only distinguishes terminal
/// from ongoing; the reason is for display.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    /// Threefold repetition or the fifty-move rule.
    Draw,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            Self::Stalemate => write!(f, "stalemate"),
            Self::InsufficientMaterial => write!(f, "draw by insufficient material"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Terminal verdict for a position. A pure function of the position,
/// so both peers reach the same verdict from the same data.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Ongoing,
    Terminal { termination: Termination },
}

impl Verdict {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}
