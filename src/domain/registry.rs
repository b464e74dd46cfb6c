//! Piece registry: the long-lived set of piece entities for one game.
//!
//! This is a pure domain module - it never performs I/O. Entities are keyed by
//! their engine-assigned id and survive across snapshots so the presentation
//! layer can animate them instead of rebuilding the board.

use std::collections::BTreeMap;

use shakmaty::Square;

use super::chess::{PieceColor, PieceId, PieceKind};
use super::error::InvariantViolation;
use super::snapshot::MoveOption;

/// One chess piece instance
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Piece {
    id: PieceId,
    color: PieceColor,
    /// Changes only on promotion
    pub kind: PieceKind,
    /// None while the piece sits in a capture pool
    pub position: Option<Square>,
    pub move_count: u32,
    /// Legal moves for the current snapshot only
    pub legal_moves: Vec<MoveOption>,
}

impl Piece {
    fn new(id: PieceId, kind: PieceKind, color: PieceColor) -> Self {
        Self {
            id,
            color,
            kind,
            position: None,
            move_count: 0,
            legal_moves: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn color(&self) -> PieceColor {
        self.color
    }

    pub fn is_captured(&self) -> bool {
        self.position.is_none()
    }

    /// Image path for the piece, e.g. `{prefix}/QueenB.png` for a black queen
    pub fn image_path(&self, prefix: &str) -> String {
        let suffix = if self.color.is_black() { "B" } else { "" };
        format!("{}/{}{}.png", prefix, self.kind.image_name(), suffix)
    }
}

/// Mapping from piece id to piece entity
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct PieceRegistry {
    pieces: BTreeMap<PieceId, Piece>,
}

impl PieceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a piece by id
    pub fn get(&self, id: &str) -> Option<&Piece> {
        self.pieces.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Piece> {
        self.pieces.get_mut(id)
    }

    /// Create the piece if it is absent, otherwise return the existing entity.
    ///
    /// `kind` is only used on creation; kind changes go through reconciliation.
    /// Fails without touching the registry if `color` differs from the stored one.
    pub fn upsert(
        &mut self,
        id: &str,
        kind: PieceKind,
        color: PieceColor,
    ) -> Result<&mut Piece, InvariantViolation> {
        if let Some(existing) = self.pieces.get(id) {
            if existing.color != color {
                return Err(InvariantViolation::ColorChanged {
                    id: id.to_string(),
                    existing: existing.color,
                    requested: color,
                });
            }
        }

        Ok(self
            .pieces
            .entry(id.to_string())
            .or_insert_with(|| Piece::new(id.to_string(), kind, color)))
    }

    /// Clear every piece's legal moves
    pub fn reset_legal_moves(&mut self) {
        for piece in self.pieces.values_mut() {
            piece.legal_moves.clear();
        }
    }

    /// Remove all pieces (new game)
    pub fn clear(&mut self) {
        self.pieces.clear();
    }

    /// All pieces, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces_of(&self, color: PieceColor) -> impl Iterator<Item = &Piece> {
        self.iter().filter(move |p| p.color == color)
    }

    pub fn on_board(&self) -> impl Iterator<Item = &Piece> {
        self.iter().filter(|p| p.position.is_some())
    }

    /// Captured pieces of `color`
    pub fn captured(&self, color: PieceColor) -> impl Iterator<Item = &Piece> {
        self.pieces_of(color).filter(|p| p.is_captured())
    }

    /// The piece standing on `square`, if any
    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.iter().find(|p| p.position == Some(square))
    }
}
