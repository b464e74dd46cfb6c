//! Boundary to the authoritative rules engine.
//!
//! The client never computes legality itself. Every request returns a complete
//! `GameState`; there are no deltas.

mod local;

pub use local::LocalEngine;

use crate::domain::{GameState, MoveSubmission};
use crate::models::GameConfig;

/// The two operations the rules engine offers
pub trait RulesEngine {
    /// Start a new game and return its first snapshot
    fn init_game(&mut self, config: &GameConfig) -> anyhow::Result<GameState>;

    /// Play `mv` on top of `state`, or let the engine pick a move when `mv` is None
    fn submit_move(
        &mut self,
        state: &GameState,
        mv: Option<&MoveSubmission>,
    ) -> anyhow::Result<GameState>;
}

impl<E: RulesEngine + ?Sized> RulesEngine for Box<E> {
    fn init_game(&mut self, config: &GameConfig) -> anyhow::Result<GameState> {
        (**self).init_game(config)
    }

    fn submit_move(
        &mut self,
        state: &GameState,
        mv: Option<&MoveSubmission>,
    ) -> anyhow::Result<GameState> {
        (**self).submit_move(state, mv)
    }
}
