//! In-process rules engine backed by shakmaty.
//!
//! Stands in for the remote server: legality, check and mate come from
//! shakmaty, while this module keeps piece ids stable across moves, castling,
//! en passant and promotion.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, anyhow, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shakmaty::{Chess, File, Move, Position, Rank, Role, Square};

use super::RulesEngine;
use crate::domain::{
    GameState, MoveOption, MoveSubmission, PieceColor, PieceId, PieceKind, PieceSnapshot,
    kind_to_role, role_to_kind, shakmaty_to_color,
};
use crate::models::GameConfig;

/// Ids of the starting position, by file, white back rank
const WHITE_BACK_RANK: [&str; 8] = ["Wr1", "Wk1", "Wb1", "WQ", "WK", "Wb2", "Wk2", "Wr2"];
/// Black pieces are numbered from the h-file
const BLACK_BACK_RANK: [&str; 8] = ["Br2", "Bk2", "Bb2", "BQ", "BK", "Bb1", "Bk1", "Br1"];

/// A captured piece, kept for the capture pools
#[derive(Clone, Debug)]
struct CapturedPiece {
    id: PieceId,
    kind: PieceKind,
    color: PieceColor,
}

pub struct LocalEngine {
    position: Chess,
    /// Piece id for every occupied square
    ids: BTreeMap<Square, PieceId>,
    move_counts: HashMap<PieceId, u32>,
    /// In capture order
    captured: Vec<CapturedPiece>,
    rng: StdRng,
}

impl LocalEngine {
    pub fn new() -> Self {
        let mut engine = Self {
            position: Chess::default(),
            ids: BTreeMap::new(),
            move_counts: HashMap::new(),
            captured: Vec::new(),
            rng: StdRng::from_entropy(),
        };
        engine.reset(None);
        engine
    }

    /// Back to the starting position with fresh ids
    fn reset(&mut self, seed: Option<u64>) {
        self.position = Chess::default();
        self.ids.clear();
        self.move_counts.clear();
        self.captured.clear();
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }

        for file in 0..8u32 {
            let f = File::new(file);
            let i = file as usize;
            self.place(Square::from_coords(f, Rank::First), WHITE_BACK_RANK[i]);
            self.place(Square::from_coords(f, Rank::Second), &format!("Wp{}", i + 1));
            self.place(Square::from_coords(f, Rank::Seventh), &format!("Bp{}", 8 - i));
            self.place(Square::from_coords(f, Rank::Eighth), BLACK_BACK_RANK[i]);
        }
    }

    fn place(&mut self, square: Square, id: &str) {
        self.ids.insert(square, id.to_string());
        self.move_counts.insert(id.to_string(), 0);
    }

    /// Destination square as the user sees it (castling: where the king lands)
    fn destination(m: &Move) -> Option<(Square, Square)> {
        match m {
            Move::Normal { from, to, .. } => Some((*from, *to)),
            Move::EnPassant { from, to } => Some((*from, *to)),
            Move::Castle { king, rook } => Some((*king, Self::castle_squares(*king, *rook).0)),
            Move::Put { .. } => None,
        }
    }

    /// (king destination, rook destination) for a castling move
    fn castle_squares(king: Square, rook: Square) -> (Square, Square) {
        if rook.file() > king.file() {
            (
                Square::from_coords(File::G, king.rank()),
                Square::from_coords(File::F, king.rank()),
            )
        } else {
            (
                Square::from_coords(File::C, king.rank()),
                Square::from_coords(File::D, king.rank()),
            )
        }
    }

    fn promotion_of(m: &Move) -> Option<Role> {
        match m {
            Move::Normal { promotion, .. } => *promotion,
            _ => None,
        }
    }

    fn square_of(&self, id: &str) -> Option<Square> {
        self.ids
            .iter()
            .find(|(_, piece_id)| piece_id.as_str() == id)
            .map(|(square, _)| *square)
    }

    /// Find the legal move matching a client submission
    fn find_move(&self, submission: &MoveSubmission) -> anyhow::Result<Move> {
        let from = self
            .square_of(&submission.piece_id)
            .with_context(|| format!("piece {} is not on the board", submission.piece_id))?;
        let promotion = submission.promotion.map(kind_to_role);

        self.position
            .legal_moves()
            .into_iter()
            .find(|m| {
                Self::destination(m) == Some((from, submission.target))
                    && Self::promotion_of(m) == promotion
            })
            .ok_or_else(|| {
                anyhow!(
                    "illegal move {} to {}",
                    submission.piece_id,
                    submission.target
                )
            })
    }

    fn random_move(&mut self) -> anyhow::Result<Move> {
        let moves = self.position.legal_moves();
        if moves.is_empty() {
            bail!("no legal move available");
        }
        let index = self.rng.gen_range(0..moves.len());
        Ok(moves[index].clone())
    }

    fn capture_at(&mut self, square: Square) {
        if let Some(id) = self.ids.remove(&square) {
            if let Some(piece) = self.position.board().piece_at(square) {
                self.captured.push(CapturedPiece {
                    id,
                    kind: role_to_kind(piece.role),
                    color: shakmaty_to_color(piece.color),
                });
            }
        }
    }

    fn relocate(&mut self, from: Square, to: Square) {
        if let Some(id) = self.ids.remove(&from) {
            *self.move_counts.entry(id.clone()).or_insert(0) += 1;
            self.ids.insert(to, id);
        }
    }

    /// Update id bookkeeping for `m`, then play it
    fn play(&mut self, m: Move) -> anyhow::Result<()> {
        match &m {
            Move::Normal { from, to, capture, .. } => {
                if capture.is_some() {
                    self.capture_at(*to);
                }
                self.relocate(*from, *to);
            }
            Move::EnPassant { from, to } => {
                self.capture_at(Square::from_coords(to.file(), from.rank()));
                self.relocate(*from, *to);
            }
            Move::Castle { king, rook } => {
                let (king_to, rook_to) = Self::castle_squares(*king, *rook);
                self.relocate(*rook, rook_to);
                self.relocate(*king, king_to);
            }
            Move::Put { .. } => bail!("drops are not part of standard chess"),
        }

        self.position = self
            .position
            .clone()
            .play(m)
            .map_err(|_| anyhow!("rules engine rejected its own legal move"))?;
        Ok(())
    }

    /// Full snapshot of the current position
    pub fn snapshot(&self) -> GameState {
        let legal = self.position.legal_moves();
        let mut state = GameState::new(shakmaty_to_color(self.position.turn()));
        state.is_check = self.position.is_check();
        state.is_checkmate = legal.is_empty();

        for (square, id) in &self.ids {
            if let Some(piece) = self.position.board().piece_at(*square) {
                state.board.push(PieceSnapshot::on_board(
                    id.clone(),
                    role_to_kind(piece.role),
                    shakmaty_to_color(piece.color),
                    *square,
                    self.move_count(id),
                ));
            }
        }

        for piece in &self.captured {
            let data = PieceSnapshot::captured(
                piece.id.clone(),
                piece.kind,
                piece.color,
                self.move_count(&piece.id),
            );
            state.captured.pool_for(piece.color).push(data);
        }

        for m in &legal {
            let Some((from, to)) = Self::destination(m) else {
                continue;
            };
            if let Some(id) = self.ids.get(&from) {
                state.legal_moves.entry(id.clone()).or_default().push(MoveOption {
                    target: to,
                    promotion: Self::promotion_of(m).map(role_to_kind),
                });
            }
        }

        state
    }

    fn move_count(&self, id: &str) -> u32 {
        self.move_counts.get(id).copied().unwrap_or(0)
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEngine for LocalEngine {
    fn init_game(&mut self, config: &GameConfig) -> anyhow::Result<GameState> {
        self.reset(config.seed);
        tracing::debug!(seed = ?config.seed, "local engine: new game");
        Ok(self.snapshot())
    }

    fn submit_move(
        &mut self,
        state: &GameState,
        mv: Option<&MoveSubmission>,
    ) -> anyhow::Result<GameState> {
        let turn = shakmaty_to_color(self.position.turn());
        if state.active_color != turn {
            bail!(
                "client snapshot has {} to move, engine has {}",
                state.active_color,
                turn
            );
        }

        let m = match mv {
            Some(submission) => self.find_move(submission)?,
            None => self.random_move()?,
        };
        tracing::debug!(?m, "local engine: playing");
        self.play(m)?;
        Ok(self.snapshot())
    }
}
