pub mod config;
pub mod link;
pub mod session;

pub use config::{GameConfig, PlayerKind};
pub use link::{Delivery, EngineLink};
pub use session::{DropOutcome, EngineRequest, GameSession, Ticket, TurnStatus};
