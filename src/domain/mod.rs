pub mod chess;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod selector;
pub mod snapshot;
pub mod wire;

pub use chess::{
    PieceColor, PieceId, PieceKind, coords, kind_to_role, role_to_kind,
    shakmaty_to_color, square_at,
};
pub use error::{InvariantViolation, SnapshotInconsistency, SyncError, WireError};
pub use reconcile::{GameEvent, PieceChange, Reconciliation, apply};
pub use registry::{Piece, PieceRegistry};
pub use selector::{Resolution, can_move_to, move_hints, resolve};
pub use snapshot::{CapturePools, GameState, MoveOption, MoveSubmission, PieceSnapshot};
