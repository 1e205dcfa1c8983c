//! Rules engine adapter.
//!
//! The session protocol never evaluates chess rules itself. It talks to a
//! [`RulesEngine`], and [`StandardRules`] implements that contract on top of
//! the `chess` crate.

use chess::{
    ALL_SQUARES, BitBoard, Board, BoardBuilder, BoardStatus, ChessMove, Game, MoveGen, Piece,
    Rank,
};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::entities::{Color, MoveDescriptor, Position, Promotion, Square, Termination, Verdict};

/// Light squares (b1, a2, ...) with a1 as bit 0.
const LIGHT_SQUARES: BitBoard = BitBoard(0x55AA_55AA_55AA_55AA);

/// Halfmoves without a capture or pawn move after which the game is drawn.
const FIFTY_MOVE_LIMIT: u32 = 100;

/// Errors produced by a rules engine. None of these mutate engine state.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RulesError {
    #[error("invalid square '{0}'")]
    InvalidSquare(String),
    #[error("illegal move {0}")]
    IllegalMove(MoveDescriptor),
    #[error("invalid position '{0}'")]
    InvalidPosition(String),
}

/// Capabilities the synchronization protocol needs from a chess engine.
pub trait RulesEngine: fmt::Debug + Send {
    /// Side to move in the current position.
    fn side_to_move(&self) -> Color;

    /// Validate and, if legal, apply a move.
    ///
    /// # Errors
    ///
    /// Returns an error without touching the position if the move is
    /// malformed or illegal.
    fn apply(&mut self, mv: &MoveDescriptor) -> Result<Position, RulesError>;

    /// Terminal verdict for the current position.
    fn verdict(&self) -> Verdict;

    /// Current position, serialized.
    fn position(&self) -> Position;

    /// Reset to the canonical starting position.
    fn reset(&mut self);

    /// All legal moves in the current position, promotions included.
    fn legal_moves(&self) -> Vec<MoveDescriptor>;

    /// Replace the whole engine state with `position`.
    ///
    /// # Errors
    ///
    /// Returns an error and keeps the previous state if `position` can't
    /// be parsed.
    fn load(&mut self, position: &Position) -> Result<(), RulesError>;
}

/// Standard chess rules backed by [`chess::Game`].
///
/// `Game` keeps the move history, which is what makes repetition draws
/// detectable. The FEN move counters live alongside it since `chess::Board`
/// drops them, and the halfmove clock carries fifty-move draws across a
/// loaded position.
#[derive(Clone)]
pub struct StandardRules {
    game: Game,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl StandardRules {
    #[must_use]
    pub fn new() -> Self {
        Self {
            game: Game::new(),
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// # Errors
    ///
    /// Returns an error if `position` isn't a valid FEN.
    pub fn from_position(position: &Position) -> Result<Self, RulesError> {
        let mut rules = Self::new();
        rules.load(position)?;
        Ok(rules)
    }

    fn to_chess_move(board: &Board, mv: &MoveDescriptor) -> Result<ChessMove, RulesError> {
        let source = parse_square(&mv.origin)?;
        let dest = parse_square(&mv.destination)?;
        let promotes = board.piece_on(source) == Some(Piece::Pawn)
            && matches!(dest.get_rank(), Rank::First | Rank::Eighth);
        let promotion = promotes.then(|| piece_from_promotion(mv.promotion.unwrap_or_default()));
        Ok(ChessMove::new(source, dest, promotion))
    }
}

impl Default for StandardRules {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StandardRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardRules")
            .field("position", &self.position())
            .finish()
    }
}

impl RulesEngine for StandardRules {
    fn side_to_move(&self) -> Color {
        color_from_chess(self.game.side_to_move())
    }

    fn apply(&mut self, mv: &MoveDescriptor) -> Result<Position, RulesError> {
        let board = self.game.current_position();
        let chess_move = Self::to_chess_move(&board, mv)?;
        if !board.legal(chess_move) || !self.game.make_move(chess_move) {
            return Err(RulesError::IllegalMove(mv.clone()));
        }
        let resets_clock = board.piece_on(chess_move.get_source()) == Some(Piece::Pawn)
            || board.piece_on(chess_move.get_dest()).is_some();
        if resets_clock {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if board.side_to_move() == chess::Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        Ok(self.position())
    }

    fn verdict(&self) -> Verdict {
        let board = self.game.current_position();
        let termination = match board.status() {
            BoardStatus::Checkmate => Some(Termination::Checkmate {
                winner: color_from_chess(board.side_to_move()).opposite(),
            }),
            BoardStatus::Stalemate => Some(Termination::Stalemate),
            BoardStatus::Ongoing if insufficient_material(&board) => {
                Some(Termination::InsufficientMaterial)
            }
            BoardStatus::Ongoing
                if self.halfmove_clock >= FIFTY_MOVE_LIMIT || self.game.can_declare_draw() =>
            {
                Some(Termination::Draw)
            }
            BoardStatus::Ongoing => None,
        };
        match termination {
            Some(termination) => Verdict::Terminal { termination },
            None => Verdict::Ongoing,
        }
    }

    fn position(&self) -> Position {
        let board = self.game.current_position().to_string();
        let fields: Vec<&str> = board.split_whitespace().take(4).collect();
        Position::new(&format!(
            "{} {} {}",
            fields.join(" "),
            self.halfmove_clock,
            self.fullmove_number
        ))
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn legal_moves(&self) -> Vec<MoveDescriptor> {
        MoveGen::new_legal(&self.game.current_position())
            .map(|mv| MoveDescriptor {
                origin: Square::new(&mv.get_source().to_string()),
                destination: Square::new(&mv.get_dest().to_string()),
                promotion: mv.get_promotion().and_then(promotion_from_piece),
            })
            .collect()
    }

    fn load(&mut self, position: &Position) -> Result<(), RulesError> {
        let invalid = || RulesError::InvalidPosition(position.to_string());
        let builder = BoardBuilder::from_str(position.as_str()).map_err(|_| invalid())?;
        // `Board` validation indexes attack tables by king square and can't
        // cope with a side that has no king.
        if !has_one_king_each(&builder) {
            return Err(invalid());
        }
        let board = Board::try_from(&builder).map_err(|_| invalid())?;
        let (halfmove_clock, fullmove_number) =
            move_counters(position.as_str()).ok_or_else(invalid)?;

        self.game = Game::new_with_board(board);
        self.halfmove_clock = halfmove_clock;
        self.fullmove_number = fullmove_number;
        Ok(())
    }
}

fn has_one_king_each(builder: &BoardBuilder) -> bool {
    let kings = |color: chess::Color| {
        ALL_SQUARES
            .iter()
            .filter(|&&square| builder[square] == Some((Piece::King, color)))
            .count()
    };
    kings(chess::Color::White) == 1 && kings(chess::Color::Black) == 1
}

/// Halfmove clock and fullmove number from the last two FEN fields. Both
/// are optional; a missing field gets its starting value.
fn move_counters(fen: &str) -> Option<(u32, u32)> {
    let mut fields = fen.split_whitespace().skip(4);
    let halfmove_clock = fields.next().map_or(Some(0), |field| field.parse().ok())?;
    let fullmove_number = fields.next().map_or(Some(1), |field| field.parse().ok())?;
    Some((halfmove_clock, fullmove_number.max(1)))
}

fn parse_square(square: &Square) -> Result<chess::Square, RulesError> {
    chess::Square::from_str(square.as_str())
        .map_err(|_| RulesError::InvalidSquare(square.to_string()))
}

fn color_from_chess(color: chess::Color) -> Color {
    match color {
        chess::Color::White => Color::White,
        chess::Color::Black => Color::Black,
    }
}

fn piece_from_promotion(promotion: Promotion) -> Piece {
    match promotion {
        Promotion::Queen => Piece::Queen,
        Promotion::Rook => Piece::Rook,
        Promotion::Bishop => Piece::Bishop,
        Promotion::Knight => Piece::Knight,
    }
}

fn promotion_from_piece(piece: Piece) -> Option<Promotion> {
    match piece {
        Piece::Queen => Some(Promotion::Queen),
        Piece::Rook => Some(Promotion::Rook),
        Piece::Bishop => Some(Promotion::Bishop),
        Piece::Knight => Some(Promotion::Knight),
        _ => None,
    }
}

/// Neither side can possibly deliver mate: bare kings, a single minor
/// piece, or only bishops that all sit on one square color.
fn insufficient_material(board: &Board) -> bool {
    let heavy =
        *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }
    let knights = board.pieces(Piece::Knight).popcnt();
    let bishops = *board.pieces(Piece::Bishop);
    match (knights, bishops.popcnt()) {
        (0, 0) | (1, 0) | (0, 1) => true,
        (0, _) => {
            let light = bishops & LIGHT_SQUARES;
            light.popcnt() == 0 || light == bishops
        }
        _ => false,
    }
}
