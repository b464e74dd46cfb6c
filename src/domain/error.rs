//! Error taxonomy for reconciliation and wire decoding.

use shakmaty::Square;
use thiserror::Error;

use super::chess::{PieceColor, PieceId};

/// An entity mutation contradicted an immutable field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("piece {id} is {existing} and cannot become {requested}")]
    ColorChanged {
        id: PieceId,
        existing: PieceColor,
        requested: PieceColor,
    },
}

/// The incoming snapshot contradicts itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotInconsistency {
    #[error("legal moves listed for unknown piece {0}")]
    UnknownMovingPiece(PieceId),
    #[error("piece {0} appears more than once in the snapshot")]
    DuplicatePiece(PieceId),
    #[error("board piece {0} has no square")]
    BoardPieceWithoutSquare(PieceId),
    #[error("captured piece {0} still has a square")]
    CapturedPieceOnSquare(PieceId),
    #[error("piece {0} is listed with no legal moves")]
    EmptyMoveList(PieceId),
    #[error("captured piece {0} has legal moves")]
    CapturedPieceHasMoves(PieceId),
    #[error("piece {id} ({color}) is in the wrong capture pool")]
    WrongCapturePool { id: PieceId, color: PieceColor },
    #[error("square {0} is occupied by more than one piece")]
    SquareOccupiedTwice(Square),
}

/// Anything that aborts a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Snapshot(#[from] SnapshotInconsistency),
}

/// Failure to normalize a wire payload into a `GameState`.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("coordinate [{0}, {1}] is off the board")]
    OffBoard(u8, u8),
    #[error("unknown piece code {0:?}")]
    UnknownPieceCode(String),
    #[error("move entry for {0} has neither `to` nor `move`")]
    MissingDestination(PieceId),
}
