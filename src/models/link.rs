//! Engine link - runs a rules engine off the caller's thread.
//!
//! Architecture:
//! - The engine lives on a worker thread and serves requests in order
//! - Responses come back over a channel, tagged with the request's ticket
//! - The caller drains the channel (`poll` or `wait`) and each response is
//!   reconciled into the session in one go, so a half-applied snapshot is
//!   never observable

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::anyhow;

use crate::domain::{GameState, Reconciliation, SyncError};
use crate::engine::RulesEngine;
use crate::models::session::{EngineRequest, GameSession, Ticket};

/// Messages sent from the worker thread to the link
#[derive(Debug)]
pub enum EngineEvent {
    /// A snapshot answering the request behind `ticket`
    Snapshot { ticket: Ticket, state: GameState },
    /// The engine refused or failed the request
    Failed { ticket: Ticket, error: String },
    /// Worker thread stopped
    Exited,
}

/// What a delivered engine event did to the session
#[derive(Debug)]
pub enum Delivery {
    Applied(Reconciliation),
    /// Response to a superseded request, dropped
    Discarded,
    /// The snapshot contradicted itself or the registry; nothing was applied
    Rejected(SyncError),
    EngineFailed(String),
    Exited,
}

pub struct EngineLink {
    /// Channel sender for requests to the worker thread
    command_sender: Option<Sender<EngineRequest>>,
    event_receiver: Receiver<EngineEvent>,
    worker: Option<JoinHandle<()>>,
    running: bool,
}

impl EngineLink {
    /// Move `engine` onto a worker thread
    pub fn spawn<E>(engine: E) -> Self
    where
        E: RulesEngine + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>();
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineRequest>();

        let worker = thread::spawn(move || {
            let mut engine = engine;
            while let Ok(request) = cmd_rx.recv() {
                let ticket = request.ticket();
                let result = match &request {
                    EngineRequest::Init { config, .. } => engine.init_game(config),
                    EngineRequest::Move { state, mv, .. } => {
                        engine.submit_move(state, mv.as_ref())
                    }
                };
                let event = match result {
                    Ok(state) => EngineEvent::Snapshot { ticket, state },
                    Err(e) => EngineEvent::Failed {
                        ticket,
                        error: format!("{:#}", e),
                    },
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            let _ = event_tx.send(EngineEvent::Exited);
        });

        Self {
            command_sender: Some(cmd_tx),
            event_receiver: event_rx,
            worker: Some(worker),
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Hand a request to the worker
    pub fn send(&self, request: EngineRequest) -> anyhow::Result<()> {
        let sender = self
            .command_sender
            .as_ref()
            .ok_or_else(|| anyhow!("engine link is stopped"))?;
        sender
            .send(request)
            .map_err(|_| anyhow!("engine worker has exited"))
    }

    /// Deliver every event that has already arrived, without blocking
    pub fn poll(&mut self, session: &mut GameSession) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => deliveries.push(self.deliver(session, event)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.running {
                        deliveries.push(self.deliver(session, EngineEvent::Exited));
                    }
                    break;
                }
            }
        }
        deliveries
    }

    /// Block until the next event arrives and deliver it
    pub fn wait(&mut self, session: &mut GameSession) -> Delivery {
        match self.event_receiver.recv() {
            Ok(event) => self.deliver(session, event),
            Err(_) => self.deliver(session, EngineEvent::Exited),
        }
    }

    /// Like `wait`, giving up after `timeout`
    pub fn wait_timeout(
        &mut self,
        session: &mut GameSession,
        timeout: Duration,
    ) -> Option<Delivery> {
        match self.event_receiver.recv_timeout(timeout) {
            Ok(event) => Some(self.deliver(session, event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(self.deliver(session, EngineEvent::Exited))
            }
        }
    }

    fn deliver(&mut self, session: &mut GameSession, event: EngineEvent) -> Delivery {
        match event {
            EngineEvent::Snapshot { ticket, state } => match session.complete(ticket, state) {
                Ok(Some(reconciliation)) => Delivery::Applied(reconciliation),
                Ok(None) => Delivery::Discarded,
                Err(e) => {
                    tracing::warn!(error = %e, "engine snapshot rejected");
                    Delivery::Rejected(e)
                }
            },
            EngineEvent::Failed { ticket, error } => {
                if session.fail(ticket) {
                    tracing::warn!(%error, "engine request failed");
                    Delivery::EngineFailed(error)
                } else {
                    Delivery::Discarded
                }
            }
            EngineEvent::Exited => {
                self.running = false;
                Delivery::Exited
            }
        }
    }

    /// Stop the worker thread
    pub fn stop(&mut self) {
        // closing the request channel ends the worker loop
        self.command_sender = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.running = false;
    }
}

impl Drop for EngineLink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MoveSubmission, PieceColor};
    use crate::engine::LocalEngine;
    use crate::models::GameConfig;
    use crate::models::session::DropOutcome;
    use shakmaty::Square;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Engine that fails every move request
    struct BrokenEngine;

    impl RulesEngine for BrokenEngine {
        fn init_game(&mut self, _config: &GameConfig) -> anyhow::Result<GameState> {
            Ok(GameState::new(PieceColor::White))
        }

        fn submit_move(
            &mut self,
            _state: &GameState,
            _mv: Option<&MoveSubmission>,
        ) -> anyhow::Result<GameState> {
            Err(anyhow!("connection reset"))
        }
    }

    fn seeded_session() -> GameSession {
        GameSession::new(GameConfig {
            seed: Some(1),
            ..GameConfig::default()
        })
    }

    #[test]
    fn test_round_trip_through_worker() {
        let mut session = seeded_session();
        let mut link = EngineLink::spawn(LocalEngine::new());

        link.send(session.new_game()).unwrap();
        let delivery = link.wait_timeout(&mut session, TIMEOUT).unwrap();
        assert!(matches!(delivery, Delivery::Applied(_)));
        assert_eq!(session.registry().len(), 32);

        let DropOutcome::Submit(request) = session.drop_piece("Wp5", Square::E4) else {
            panic!("e2-e4 should be legal");
        };
        link.send(request).unwrap();
        let delivery = link.wait_timeout(&mut session, TIMEOUT).unwrap();
        assert!(matches!(delivery, Delivery::Applied(_)));
        assert_eq!(
            session.registry().get("Wp5").unwrap().position,
            Some(Square::E4)
        );
        assert!(session.should_auto_move());
    }

    #[test]
    fn test_reset_discards_late_response() {
        let mut session = seeded_session();
        let mut link = EngineLink::spawn(LocalEngine::new());

        link.send(session.new_game()).unwrap();
        // reset before the first answer is read
        link.send(session.new_game()).unwrap();

        let first = link.wait_timeout(&mut session, TIMEOUT).unwrap();
        assert!(matches!(first, Delivery::Discarded));
        let second = link.wait_timeout(&mut session, TIMEOUT).unwrap();
        assert!(matches!(second, Delivery::Applied(_)));
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_engine_failure_frees_session() {
        let mut session = seeded_session();
        let mut link = EngineLink::spawn(BrokenEngine);

        link.send(session.new_game()).unwrap();
        link.wait_timeout(&mut session, TIMEOUT).unwrap();

        let DropOutcome::Submit(request) = session.request_engine_move() else {
            panic!("engine move should be requested");
        };
        link.send(request).unwrap();
        let delivery = link.wait_timeout(&mut session, TIMEOUT).unwrap();
        assert!(matches!(delivery, Delivery::EngineFailed(ref e) if e == "connection reset"));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_stop_closes_link() {
        let mut session = seeded_session();
        let mut link = EngineLink::spawn(LocalEngine::new());
        link.stop();
        assert!(!link.is_running());
        assert!(link.send(session.new_game()).is_err());
        assert!(
            link.poll(&mut session)
                .iter()
                .all(|d| matches!(d, Delivery::Exited))
        );
    }
}
