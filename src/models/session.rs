//! Game session model - the application layer around the piece registry.
//!
//! The session owns the registry for one game at a time and enforces the
//! request discipline with the rules engine:
//! - at most one request is outstanding; further drops are ignored, not queued
//! - every request carries a ticket; a response whose ticket is not the
//!   outstanding one (e.g. from a game that was reset meanwhile) is dropped
//!
//! It never talks to the engine itself: requests are handed back to the caller,
//! who transports them and feeds the answer to [`GameSession::complete`].

use shakmaty::Square;

use crate::domain::{
    GameState, MoveOption, MoveSubmission, PieceColor, PieceKind, PieceRegistry, Reconciliation,
    Resolution, SyncError, apply, move_hints, resolve,
};
use crate::models::{GameConfig, PlayerKind};

/// Bumped on every new game
pub type Generation = u64;

/// Identifies one request to the rules engine
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ticket {
    pub generation: Generation,
    seq: u64,
}

/// A request for the rules engine, ready to be transported
#[derive(Clone, Debug)]
pub enum EngineRequest {
    Init {
        ticket: Ticket,
        config: GameConfig,
    },
    Move {
        ticket: Ticket,
        state: GameState,
        /// None asks the engine to choose
        mv: Option<MoveSubmission>,
    },
}

impl EngineRequest {
    pub fn ticket(&self) -> Ticket {
        match self {
            EngineRequest::Init { ticket, .. } | EngineRequest::Move { ticket, .. } => *ticket,
        }
    }
}

/// What happened to a user gesture or move request
#[derive(Clone, Debug)]
pub enum DropOutcome {
    /// A request is already outstanding; nothing changed
    Busy,
    /// Illegal, or no game to move in
    Rejected,
    /// Several promotions share the square; call `choose_promotion`
    NeedsChoice(Vec<MoveOption>),
    /// Send this to the engine
    Submit(EngineRequest),
}

/// Promotion choice waiting for the user
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PendingChoice {
    pub piece_id: String,
    pub candidates: Vec<MoveOption>,
}

/// Answer for an automated-player driver
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TurnStatus {
    pub active_color: PieceColor,
    /// Checkmate or stalemate
    pub terminal: bool,
    /// The side to move is played by the engine
    pub computer_to_move: bool,
}

pub struct GameSession {
    config: GameConfig,
    registry: PieceRegistry,
    /// Last applied snapshot
    state: Option<GameState>,
    generation: Generation,
    next_seq: u64,
    in_flight: Option<Ticket>,
    pending_choice: Option<PendingChoice>,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            registry: PieceRegistry::new(),
            state: None,
            generation: 0,
            next_seq: 0,
            in_flight: None,
            pending_choice: None,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Hand a side to a human or the computer, mid-game included.
    ///
    /// Takes effect at once: if the side to move becomes a computer,
    /// `should_auto_move` turns true without waiting for another snapshot.
    pub fn set_player(&mut self, color: PieceColor, kind: PlayerKind) {
        if self.config.player(color) != kind {
            tracing::debug!(%color, ?kind, "player changed");
            self.config.set_player(color, kind);
        }
    }

    pub fn registry(&self) -> &PieceRegistry {
        &self.registry
    }

    /// The last snapshot applied, if a game is running
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether a request is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pending_choice(&self) -> Option<&PendingChoice> {
        self.pending_choice.as_ref()
    }

    /// Destination squares of a piece, for move-hint highlighting
    pub fn hints(&self, piece_id: &str) -> Vec<Square> {
        move_hints(&self.registry, piece_id)
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.in_flight = Some(ticket);
        ticket
    }

    /// Start a new game.
    ///
    /// Clears the registry and supersedes any outstanding request, so its
    /// response will be discarded when it arrives.
    pub fn new_game(&mut self) -> EngineRequest {
        self.registry.clear();
        self.state = None;
        self.pending_choice = None;
        self.generation += 1;
        tracing::debug!(generation = self.generation, "new game");

        EngineRequest::Init {
            ticket: self.issue_ticket(),
            config: self.config.clone(),
        }
    }

    /// Whether moves can be submitted at all (a game is loaded and not over)
    fn playable_state(&self) -> Option<&GameState> {
        self.state.as_ref().filter(|state| !state.is_terminal())
    }

    fn submit(&mut self, mv: Option<MoveSubmission>) -> DropOutcome {
        let Some(state) = self.playable_state().cloned() else {
            return DropOutcome::Rejected;
        };
        self.pending_choice = None;
        DropOutcome::Submit(EngineRequest::Move {
            ticket: self.issue_ticket(),
            state,
            mv,
        })
    }

    /// The user dropped `piece_id` on `target`
    pub fn drop_piece(&mut self, piece_id: &str, target: Square) -> DropOutcome {
        if self.is_busy() {
            tracing::debug!(piece_id, %target, "drop ignored, request outstanding");
            return DropOutcome::Busy;
        }
        if self.playable_state().is_none() {
            return DropOutcome::Rejected;
        }

        match resolve(&self.registry, piece_id, target) {
            Resolution::Rejected => DropOutcome::Rejected,
            Resolution::Determined(option) => {
                self.submit(Some(MoveSubmission::new(piece_id, option)))
            }
            Resolution::Ambiguous(candidates) => {
                self.pending_choice = Some(PendingChoice {
                    piece_id: piece_id.to_string(),
                    candidates: candidates.clone(),
                });
                DropOutcome::NeedsChoice(candidates)
            }
        }
    }

    /// Resolve the pending promotion choice.
    ///
    /// An unknown kind leaves the choice pending.
    pub fn choose_promotion(&mut self, kind: PieceKind) -> DropOutcome {
        if self.is_busy() {
            return DropOutcome::Busy;
        }
        let Some(pending) = &self.pending_choice else {
            return DropOutcome::Rejected;
        };
        let Some(option) = pending
            .candidates
            .iter()
            .find(|o| o.promotion == Some(kind))
            .copied()
        else {
            return DropOutcome::Rejected;
        };

        let submission = MoveSubmission::new(pending.piece_id.clone(), option);
        self.submit(Some(submission))
    }

    pub fn cancel_choice(&mut self) {
        self.pending_choice = None;
    }

    /// Ask the engine to move for the side to move
    pub fn request_engine_move(&mut self) -> DropOutcome {
        if self.is_busy() {
            return DropOutcome::Busy;
        }
        self.submit(None)
    }

    /// Feed an engine response back.
    ///
    /// Returns `Ok(None)` when the response is stale and was discarded. On error
    /// the registry and the current snapshot are left as they were.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        state: GameState,
    ) -> Result<Option<Reconciliation>, SyncError> {
        if self.in_flight != Some(ticket) {
            tracing::debug!(
                ?ticket,
                generation = self.generation,
                "discarding stale engine response"
            );
            return Ok(None);
        }
        self.in_flight = None;

        let reconciliation = apply(&mut self.registry, &state)?;
        self.state = Some(state);
        Ok(Some(reconciliation))
    }

    /// The request behind `ticket` failed in transport; release the slot.
    /// Returns false for stale tickets.
    pub fn fail(&mut self, ticket: Ticket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    pub fn turn_status(&self) -> Option<TurnStatus> {
        self.state.as_ref().map(|state| TurnStatus {
            active_color: state.active_color,
            terminal: state.is_terminal(),
            computer_to_move: self.config.is_computer(state.active_color),
        })
    }

    /// Whether a driver should now ask the engine to move
    pub fn should_auto_move(&self) -> bool {
        !self.is_busy()
            && self
                .turn_status()
                .is_some_and(|status| status.computer_to_move && !status.terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameEvent, PieceSnapshot};

    fn promotion_state() -> GameState {
        let mut state = GameState::new(PieceColor::White);
        state.board = vec![
            PieceSnapshot::on_board("WK", PieceKind::King, PieceColor::White, Square::E1, 0),
            PieceSnapshot::on_board("Wp2", PieceKind::Pawn, PieceColor::White, Square::B7, 5),
            PieceSnapshot::on_board("BK", PieceKind::King, PieceColor::Black, Square::H8, 0),
        ];
        state.legal_moves.insert(
            "Wp2".to_string(),
            vec![
                MoveOption::promote(Square::B8, PieceKind::Queen),
                MoveOption::promote(Square::B8, PieceKind::Rook),
            ],
        );
        state
            .legal_moves
            .insert("WK".to_string(), vec![MoveOption::to(Square::E2)]);
        state
    }

    fn started_session() -> GameSession {
        let mut session = GameSession::new(GameConfig::default());
        let ticket = session.new_game().ticket();
        session.complete(ticket, promotion_state()).unwrap();
        session
    }

    fn submitted(outcome: DropOutcome) -> EngineRequest {
        match outcome {
            DropOutcome::Submit(request) => request,
            other => panic!("expected a submission, got {:?}", other),
        }
    }

    #[test]
    fn test_new_game_applies_first_snapshot() {
        let mut session = GameSession::new(GameConfig::default());
        let request = session.new_game();
        assert!(session.is_busy());
        assert_eq!(session.generation(), 1);

        let result = session
            .complete(request.ticket(), promotion_state())
            .unwrap()
            .unwrap();
        assert_eq!(result.events, vec![GameEvent::Update(PieceColor::White)]);
        assert!(!session.is_busy());
        assert_eq!(session.registry().len(), 3);
    }

    #[test]
    fn test_determined_drop_submits() {
        let mut session = started_session();
        let request = submitted(session.drop_piece("WK", Square::E2));
        match request {
            EngineRequest::Move { mv: Some(mv), .. } => {
                assert_eq!(mv.piece_id, "WK");
                assert_eq!(mv.target, Square::E2);
                assert_eq!(mv.promotion, None);
            }
            other => panic!("unexpected request {:?}", other),
        }
        assert!(session.is_busy());
    }

    #[test]
    fn test_illegal_drop_is_rejected() {
        let mut session = started_session();
        assert!(matches!(
            session.drop_piece("WK", Square::E4),
            DropOutcome::Rejected
        ));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_promotion_needs_choice() {
        let mut session = started_session();
        match session.drop_piece("Wp2", Square::B8) {
            DropOutcome::NeedsChoice(candidates) => assert_eq!(candidates.len(), 2),
            other => panic!("expected a choice, got {:?}", other),
        }
        assert!(!session.is_busy());

        // bishop is not among the candidates, the choice stays open
        assert!(matches!(
            session.choose_promotion(PieceKind::Bishop),
            DropOutcome::Rejected
        ));
        assert!(session.pending_choice().is_some());

        let request = submitted(session.choose_promotion(PieceKind::Rook));
        match request {
            EngineRequest::Move { mv: Some(mv), .. } => {
                assert_eq!(mv.promotion, Some(PieceKind::Rook))
            }
            other => panic!("unexpected request {:?}", other),
        }
        assert!(session.pending_choice().is_none());
    }

    #[test]
    fn test_second_request_while_outstanding_is_busy() {
        let mut session = started_session();
        submitted(session.drop_piece("WK", Square::E2));
        let before = session.registry().clone();

        assert!(matches!(
            session.drop_piece("WK", Square::E2),
            DropOutcome::Busy
        ));
        assert!(matches!(session.request_engine_move(), DropOutcome::Busy));
        assert_eq!(session.registry(), &before);
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let mut session = started_session();
        let old = submitted(session.drop_piece("WK", Square::E2)).ticket();

        let fresh = session.new_game().ticket();
        assert!(session.registry().is_empty());

        let mut late = promotion_state();
        late.active_color = PieceColor::Black;
        assert_eq!(session.complete(old, late).unwrap(), None);
        assert!(session.registry().is_empty());
        assert!(session.is_busy());

        assert!(session.complete(fresh, promotion_state()).unwrap().is_some());
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_failed_request_releases_slot() {
        let mut session = started_session();
        let ticket = submitted(session.request_engine_move()).ticket();
        assert!(session.fail(ticket));
        assert!(!session.is_busy());
        // the same ticket cannot complete afterwards
        assert_eq!(session.complete(ticket, promotion_state()).unwrap(), None);
    }

    #[test]
    fn test_inconsistent_snapshot_keeps_previous_state() {
        let mut session = started_session();
        let ticket = submitted(session.drop_piece("WK", Square::E2)).ticket();
        let before = session.registry().clone();

        let mut bad = promotion_state();
        bad.legal_moves
            .insert("ghost".to_string(), vec![MoveOption::to(Square::A1)]);
        assert!(session.complete(ticket, bad).is_err());
        assert_eq!(session.registry(), &before);
        assert_eq!(session.state(), Some(&promotion_state()));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_auto_move_predicate() {
        let mut session = started_session();
        // white is human by default
        assert!(!session.should_auto_move());

        let ticket = submitted(session.drop_piece("WK", Square::E2)).ticket();
        let mut reply = promotion_state();
        reply.active_color = PieceColor::Black;
        reply.legal_moves.clear();
        reply
            .legal_moves
            .insert("BK".to_string(), vec![MoveOption::to(Square::G8)]);
        session.complete(ticket, reply).unwrap();
        assert!(session.should_auto_move());

        let ticket = submitted(session.request_engine_move()).ticket();
        assert!(!session.should_auto_move());

        // stalemate: terminal, nobody moves any more
        let mut over = promotion_state();
        over.legal_moves.clear();
        over.is_checkmate = true;
        over.active_color = PieceColor::Black;
        let result = session.complete(ticket, over).unwrap().unwrap();
        assert_eq!(
            result.events,
            vec![
                GameEvent::Update(PieceColor::Black),
                GameEvent::Stalemate(PieceColor::Black)
            ]
        );
        let status = session.turn_status().unwrap();
        assert!(status.terminal);
        assert!(status.computer_to_move);
        assert!(!session.should_auto_move());
        assert!(matches!(session.request_engine_move(), DropOutcome::Rejected));
    }

    #[test]
    fn test_switching_side_to_computer_mid_game() {
        let mut session = started_session();
        assert_eq!(session.config().white, PlayerKind::Human);
        assert!(!session.should_auto_move());

        session.set_player(PieceColor::White, PlayerKind::Computer);
        assert!(session.turn_status().unwrap().computer_to_move);
        assert!(session.should_auto_move());

        // never while a request is outstanding
        let ticket = submitted(session.request_engine_move()).ticket();
        assert!(!session.should_auto_move());
        session.set_player(PieceColor::White, PlayerKind::Computer);
        assert!(!session.should_auto_move());
        assert!(session.fail(ticket));

        session.set_player(PieceColor::White, PlayerKind::Human);
        assert!(!session.should_auto_move());
    }
}
