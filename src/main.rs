//! Terminal demo: plays one game against the in-process engine and prints
//! what the presentation layer would receive.
//!
//! Human sides are simulated by dropping the first piece that can move onto
//! its first hinted square, always promoting to a queen.

use std::thread;

use anyhow::{Context, bail};
use chess_sync::domain::{GameEvent, PieceChange, PieceKind};
use chess_sync::engine::LocalEngine;
use chess_sync::models::{Delivery, DropOutcome, EngineLink, GameConfig, GameSession};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

/// Safety stop for random games that shuffle forever
const MAX_PLIES: usize = 300;

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Pick a move the way a human at the board might: first movable piece, first hint
fn simulate_human(session: &mut GameSession) -> DropOutcome {
    let choice = session
        .registry()
        .iter()
        .find_map(|piece| {
            session
                .hints(piece.id())
                .first()
                .map(|square| (piece.id().to_string(), *square))
        });
    let Some((piece_id, target)) = choice else {
        return DropOutcome::Rejected;
    };

    match session.drop_piece(&piece_id, target) {
        DropOutcome::NeedsChoice(candidates) => {
            info!(piece_id = %piece_id, candidates = candidates.len(), "promotion choice");
            session.choose_promotion(PieceKind::Queen)
        }
        outcome => outcome,
    }
}

fn print_changes(changes: &[PieceChange]) {
    for change in changes {
        match change {
            PieceChange::Created { .. } => {}
            PieceChange::Moved { id, from, to } => println!("  {} {} -> {}", id, from, to),
            PieceChange::Captured { id, from } => println!("  {} captured on {}", id, from),
            PieceChange::Restored { id, to } => println!("  {} back on {}", id, to),
            PieceChange::Promoted { id, from, to } => {
                println!("  {} promoted {:?} -> {:?}", id, from, to)
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = GameConfig::from_env().context("loading configuration")?;
    info!(white = ?config.white, black = ?config.black, "starting game");

    let mut session = GameSession::new(config.clone());
    let mut link = EngineLink::spawn(LocalEngine::new());
    link.send(session.new_game())?;

    for ply in 0..MAX_PLIES {
        match link.wait(&mut session) {
            Delivery::Applied(result) => {
                print_changes(&result.changes);
                for event in &result.events {
                    match event {
                        GameEvent::Update(_) => {}
                        GameEvent::Check(color) => println!("{} is in check", color),
                        GameEvent::Checkmate(color) => println!("{} is checkmated", color),
                        GameEvent::Stalemate(color) => println!("stalemate, {} cannot move", color),
                    }
                }
                if result.is_terminal() {
                    info!(plies = ply, "game over");
                    return Ok(());
                }
            }
            Delivery::Discarded => continue,
            Delivery::Rejected(e) => return Err(e).context("engine sent an inconsistent snapshot"),
            Delivery::EngineFailed(e) => bail!("engine failed: {}", e),
            Delivery::Exited => bail!("engine exited"),
        }

        let outcome = if session.should_auto_move() {
            thread::sleep(config.auto_move_delay);
            session.request_engine_move()
        } else {
            simulate_human(&mut session)
        };

        match outcome {
            DropOutcome::Submit(request) => link.send(request)?,
            other => {
                warn!(?other, "no move could be submitted");
                return Ok(());
            }
        }
    }

    info!(plies = MAX_PLIES, "stopping, ply limit reached");
    Ok(())
}
