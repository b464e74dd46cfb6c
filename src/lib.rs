//! Client-side state reconciliation and move selection for a chess game whose
//! rules are computed by an authoritative engine.

pub mod domain;
pub mod engine;
pub mod models;
