//! Reconciliation of the piece registry against a new authoritative snapshot.
//!
//! A pass either applies the whole snapshot or nothing: the snapshot is
//! validated against itself and against the registry before the first
//! mutation, so an error always leaves the registry in its pre-call state.

use std::collections::HashSet;

use shakmaty::Square;

use super::chess::{PieceColor, PieceId, PieceKind};
use super::error::{InvariantViolation, SnapshotInconsistency, SyncError};
use super::registry::PieceRegistry;
use super::snapshot::{GameState, PieceSnapshot};

/// State-transition events for the presentation layer, tagged with the color they apply to
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    Update(PieceColor),
    Check(PieceColor),
    Checkmate(PieceColor),
    Stalemate(PieceColor),
}

impl GameEvent {
    pub fn color(self) -> PieceColor {
        match self {
            GameEvent::Update(c)
            | GameEvent::Check(c)
            | GameEvent::Checkmate(c)
            | GameEvent::Stalemate(c) => c,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GameEvent::Checkmate(_) | GameEvent::Stalemate(_))
    }
}

/// Per-entity changes made by a pass, in the order they were applied
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PieceChange {
    /// First appearance of an id
    Created {
        id: PieceId,
        position: Option<Square>,
    },
    Moved {
        id: PieceId,
        from: Square,
        to: Square,
    },
    Captured {
        id: PieceId,
        from: Square,
    },
    /// A captured piece returned to the board
    Restored {
        id: PieceId,
        to: Square,
    },
    /// Same entity, new kind: the view must re-resolve its image, not rebuild the piece
    Promoted {
        id: PieceId,
        from: PieceKind,
        to: PieceKind,
    },
}

/// Result of a successful reconciliation pass
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Reconciliation {
    pub events: Vec<GameEvent>,
    pub changes: Vec<PieceChange>,
}

impl Reconciliation {
    pub fn promotions(&self) -> impl Iterator<Item = &PieceChange> {
        self.changes
            .iter()
            .filter(|c| matches!(c, PieceChange::Promoted { .. }))
    }

    pub fn is_terminal(&self) -> bool {
        self.events.iter().any(|e| e.is_terminal())
    }
}

/// Apply `snapshot` to `registry`.
pub fn apply(
    registry: &mut PieceRegistry,
    snapshot: &GameState,
) -> Result<Reconciliation, SyncError> {
    validate(registry, snapshot)?;

    let mut changes = Vec::new();

    for data in snapshot.pieces() {
        let existed = registry.get(&data.id).is_some();
        let piece = registry.upsert(&data.id, data.kind, data.color)?;

        if existed {
            match (piece.position, data.position) {
                (Some(from), Some(to)) if from != to => changes.push(PieceChange::Moved {
                    id: data.id.clone(),
                    from,
                    to,
                }),
                (Some(from), None) => changes.push(PieceChange::Captured {
                    id: data.id.clone(),
                    from,
                }),
                (None, Some(to)) => changes.push(PieceChange::Restored {
                    id: data.id.clone(),
                    to,
                }),
                _ => {}
            }

            if piece.kind != data.kind {
                changes.push(PieceChange::Promoted {
                    id: data.id.clone(),
                    from: piece.kind,
                    to: data.kind,
                });
                piece.kind = data.kind;
            }
        } else {
            changes.push(PieceChange::Created {
                id: data.id.clone(),
                position: data.position,
            });
        }

        piece.position = data.position;
        piece.move_count = data.move_count;
    }

    registry.reset_legal_moves();
    for (id, moves) in &snapshot.legal_moves {
        if let Some(piece) = registry.get_mut(id) {
            piece.legal_moves = moves.clone();
        }
    }

    Ok(Reconciliation {
        events: classify(snapshot.active_color, snapshot.is_check, snapshot.is_checkmate),
        changes,
    })
}

/// Events for the (is_check, is_checkmate) truth table
pub fn classify(active: PieceColor, is_check: bool, is_checkmate: bool) -> Vec<GameEvent> {
    let update = GameEvent::Update(active);
    match (is_check, is_checkmate) {
        (false, false) => vec![update],
        (true, false) => vec![update, GameEvent::Check(active)],
        (true, true) => vec![update, GameEvent::Checkmate(active)],
        (false, true) => vec![update, GameEvent::Stalemate(active)],
    }
}

/// Check the snapshot for contradictions, and against the registry's immutable fields
fn validate(registry: &PieceRegistry, snapshot: &GameState) -> Result<(), SyncError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut occupied: HashSet<Square> = HashSet::new();

    for data in &snapshot.board {
        let Some(square) = data.position else {
            return Err(SnapshotInconsistency::BoardPieceWithoutSquare(data.id.clone()).into());
        };
        if !occupied.insert(square) {
            return Err(SnapshotInconsistency::SquareOccupiedTwice(square).into());
        }
        check_piece(registry, &mut seen, data)?;
    }

    let pools = [
        (&snapshot.captured.by_white, PieceColor::Black),
        (&snapshot.captured.by_black, PieceColor::White),
    ];
    for (pool, expected) in pools {
        for data in pool {
            // a piece on the board and in a pool at once is reported as a duplicate
            check_piece(registry, &mut seen, data)?;
            if data.position.is_some() {
                return Err(SnapshotInconsistency::CapturedPieceOnSquare(data.id.clone()).into());
            }
            if data.color != expected {
                return Err(SnapshotInconsistency::WrongCapturePool {
                    id: data.id.clone(),
                    color: data.color,
                }
                .into());
            }
        }
    }

    for (id, moves) in &snapshot.legal_moves {
        if !seen.contains(id.as_str()) {
            return Err(SnapshotInconsistency::UnknownMovingPiece(id.clone()).into());
        }
        // pieces without moves are left out of the mapping
        if moves.is_empty() {
            return Err(SnapshotInconsistency::EmptyMoveList(id.clone()).into());
        }
        if snapshot.captured.iter().any(|data| &data.id == id) {
            return Err(SnapshotInconsistency::CapturedPieceHasMoves(id.clone()).into());
        }
    }

    Ok(())
}

fn check_piece<'a>(
    registry: &PieceRegistry,
    seen: &mut HashSet<&'a str>,
    data: &'a PieceSnapshot,
) -> Result<(), SyncError> {
    if !seen.insert(data.id.as_str()) {
        return Err(SnapshotInconsistency::DuplicatePiece(data.id.clone()).into());
    }
    if let Some(existing) = registry.get(&data.id) {
        if existing.color() != data.color {
            return Err(InvariantViolation::ColorChanged {
                id: data.id.clone(),
                existing: existing.color(),
                requested: data.color,
            }
            .into());
        }
    }
    Ok(())
}
