//! Move selection: turn a drop on a square into a concrete move, or a pending choice.
//!
//! Stateless queries over the registry's legal-move index.

use shakmaty::Square;

use super::chess::PieceKind;
use super::registry::PieceRegistry;
use super::snapshot::MoveOption;

/// Outcome of dropping a piece on a square
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Resolution {
    /// Illegal drop: nothing is submitted
    Rejected,
    /// Exactly one legal move, submit it
    Determined(MoveOption),
    /// Same square, different promotions: the user has to pick one
    Ambiguous(Vec<MoveOption>),
}

impl Resolution {
    /// Pick the candidate promoting to `kind`.
    ///
    /// For a determined move this only succeeds if it already promotes to `kind`.
    pub fn choose(&self, kind: PieceKind) -> Option<MoveOption> {
        match self {
            Resolution::Rejected => None,
            Resolution::Determined(option) => {
                (option.promotion == Some(kind)).then_some(*option)
            }
            Resolution::Ambiguous(candidates) => candidates
                .iter()
                .find(|option| option.promotion == Some(kind))
                .copied(),
        }
    }
}

/// Resolve a drop of piece `id` on `target`
pub fn resolve(registry: &PieceRegistry, id: &str, target: Square) -> Resolution {
    let Some(piece) = registry.get(id) else {
        return Resolution::Rejected;
    };

    let mut matching: Vec<MoveOption> = piece
        .legal_moves
        .iter()
        .filter(|option| option.target == target)
        .copied()
        .collect();

    match matching.len() {
        0 => Resolution::Rejected,
        1 => Resolution::Determined(matching.remove(0)),
        _ => Resolution::Ambiguous(matching),
    }
}

/// Whether a drop of piece `id` on `target` would be accepted
pub fn can_move_to(registry: &PieceRegistry, id: &str, target: Square) -> bool {
    registry
        .get(id)
        .is_some_and(|piece| piece.legal_moves.iter().any(|o| o.target == target))
}

/// Destination squares for move-hint highlighting, deduplicated, in move order
pub fn move_hints(registry: &PieceRegistry, id: &str) -> Vec<Square> {
    let mut hints = Vec::new();
    if let Some(piece) = registry.get(id) {
        for option in &piece.legal_moves {
            if !hints.contains(&option.target) {
                hints.push(option.target);
            }
        }
    }
    hints
}
