//! Authoritative game snapshots as sent by the rules engine.

use std::collections::BTreeMap;

use shakmaty::Square;

use super::chess::{PieceColor, PieceId, PieceKind};

/// One legal move available to a piece in the current position
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MoveOption {
    pub target: Square,
    /// Present only for pawn promotions
    pub promotion: Option<PieceKind>,
}

impl MoveOption {
    pub fn to(target: Square) -> Self {
        Self {
            target,
            promotion: None,
        }
    }

    pub fn promote(target: Square, kind: PieceKind) -> Self {
        Self {
            target,
            promotion: Some(kind),
        }
    }
}

/// A piece as reported by a snapshot
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PieceSnapshot {
    pub id: PieceId,
    pub kind: PieceKind,
    pub color: PieceColor,
    /// None for pieces in a capture pool
    pub position: Option<Square>,
    pub move_count: u32,
}

impl PieceSnapshot {
    pub fn on_board(
        id: impl Into<PieceId>,
        kind: PieceKind,
        color: PieceColor,
        square: Square,
        move_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            color,
            position: Some(square),
            move_count,
        }
    }

    pub fn captured(
        id: impl Into<PieceId>,
        kind: PieceKind,
        color: PieceColor,
        move_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            color,
            position: None,
            move_count,
        }
    }
}

/// Captured pieces, grouped by the side that captured them
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CapturePools {
    /// Black pieces taken by white
    pub by_white: Vec<PieceSnapshot>,
    /// White pieces taken by black
    pub by_black: Vec<PieceSnapshot>,
}

impl CapturePools {
    /// The pool that holds pieces of `color` once they are captured
    pub fn pool_for(&mut self, color: PieceColor) -> &mut Vec<PieceSnapshot> {
        match color {
            PieceColor::White => &mut self.by_black,
            PieceColor::Black => &mut self.by_white,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PieceSnapshot> {
        self.by_white.iter().chain(self.by_black.iter())
    }
}

/// The full game state returned after every engine request
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameState {
    /// Side to move next
    pub active_color: PieceColor,
    pub is_check: bool,
    /// True when the side to move has no legal move (checkmate or stalemate)
    pub is_checkmate: bool,
    pub board: Vec<PieceSnapshot>,
    pub captured: CapturePools,
    /// Legal moves keyed by piece id, valid only for this snapshot
    pub legal_moves: BTreeMap<PieceId, Vec<MoveOption>>,
}

impl GameState {
    pub fn new(active_color: PieceColor) -> Self {
        Self {
            active_color,
            is_check: false,
            is_checkmate: false,
            board: Vec::new(),
            captured: CapturePools::default(),
            legal_moves: BTreeMap::new(),
        }
    }

    /// Every piece in the snapshot: board first, then both capture pools
    pub fn pieces(&self) -> impl Iterator<Item = &PieceSnapshot> {
        self.board.iter().chain(self.captured.iter())
    }

    /// No further moves are possible for the active color
    pub fn is_terminal(&self) -> bool {
        self.is_checkmate
    }

    pub fn moves_for(&self, id: &str) -> &[MoveOption] {
        self.legal_moves.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A concrete move sent to the rules engine
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MoveSubmission {
    pub piece_id: PieceId,
    pub target: Square,
    pub promotion: Option<PieceKind>,
}

impl MoveSubmission {
    pub fn new(piece_id: impl Into<PieceId>, option: MoveOption) -> Self {
        Self {
            piece_id: piece_id.into(),
            target: option.target,
            promotion: option.promotion,
        }
    }
}
