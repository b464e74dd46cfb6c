//! Pure chess domain types and utilities.
//! No I/O and no engine logic - this is the domain layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shakmaty::{Color as SColor, File, Rank, Role, Square};

/// Stable piece identifier assigned by the rules engine
pub type PieceId = String;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Rook,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Asset base name used by the presentation layer (e.g. "Queen")
    pub fn image_name(self) -> &'static str {
        match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Rook => "Rook",
            PieceKind::Knight => "Knight",
            PieceKind::Bishop => "Bishop",
            PieceKind::Queen => "Queen",
            PieceKind::King => "King",
        }
    }

    /// Single-letter code used by the legacy wire format.
    ///
    /// Note the legacy table is case-sensitive: `K` is the king, `k` the knight.
    pub fn legacy_code(self) -> &'static str {
        match self {
            PieceKind::Pawn => "p",
            PieceKind::Rook => "r",
            PieceKind::Knight => "k",
            PieceKind::Bishop => "b",
            PieceKind::Queen => "Q",
            PieceKind::King => "K",
        }
    }

    pub fn from_legacy_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.legacy_code() == code)
    }
}

impl PieceColor {
    pub fn is_black(self) -> bool {
        self == PieceColor::Black
    }

    pub fn from_is_black(is_black: bool) -> Self {
        if is_black {
            PieceColor::Black
        } else {
            PieceColor::White
        }
    }
}

impl std::fmt::Display for PieceColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PieceColor::White => write!(f, "white"),
            PieceColor::Black => write!(f, "black"),
        }
    }
}

/// Build a square from 0-indexed file/rank coordinates (file 0 = a, rank 0 = 1).
/// Returns None when either coordinate is off the board.
pub fn square_at(file: u8, rank: u8) -> Option<Square> {
    if file < 8 && rank < 8 {
        Some(Square::from_coords(
            File::new(u32::from(file)),
            Rank::new(u32::from(rank)),
        ))
    } else {
        None
    }
}

/// 0-indexed (file, rank) coordinates of a square
pub fn coords(square: Square) -> (u8, u8) {
    (square.file() as u8, square.rank() as u8)
}

/// Convert shakmaty role to our domain kind
pub fn role_to_kind(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

pub fn kind_to_role(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

/// Convert shakmaty color to our domain color
pub fn shakmaty_to_color(color: SColor) -> PieceColor {
    match color {
        SColor::White => PieceColor::White,
        SColor::Black => PieceColor::Black,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_at_bounds() {
        assert_eq!(square_at(0, 0), Some(Square::A1));
        assert_eq!(square_at(1, 7), Some(Square::B8));
        assert_eq!(square_at(8, 0), None);
        assert_eq!(square_at(0, 8), None);
    }

    #[test]
    fn test_coords_inverse() {
        assert_eq!(coords(Square::E4), (4, 3));
        assert_eq!(square_at(4, 3), Some(Square::E4));
    }

    #[test]
    fn test_legacy_codes_are_case_sensitive() {
        assert_eq!(PieceKind::from_legacy_code("K"), Some(PieceKind::King));
        assert_eq!(PieceKind::from_legacy_code("k"), Some(PieceKind::Knight));
        assert_eq!(PieceKind::from_legacy_code("q"), None);
    }

    #[test]
    fn test_role_round_trip() {
        for kind in PieceKind::ALL {
            assert_eq!(role_to_kind(kind_to_role(kind)), kind);
        }
    }
}
