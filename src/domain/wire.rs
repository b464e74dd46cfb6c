//! JSON wire formats exchanged with the rules engine.
//!
//! This module only converts payloads; it does not talk to the engine (that's
//! done in the engine and models layers). Two shapes are understood:
//!
//! - the canonical format, [`WireGameState`], with explicit move options;
//! - the legacy server format, [`LegacyGameData`], whose move entries carry
//!   either a flat `to` square or a `move: [from, to]` pair and never a promotion.
//!
//! Coordinates on the wire are `[file, rank]`, both 0-indexed.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shakmaty::Square;

use super::chess::{PieceColor, PieceId, PieceKind, coords, square_at};
use super::error::WireError;
use super::snapshot::{GameState, MoveOption, MoveSubmission, PieceSnapshot};

pub type WireSquare = [u8; 2];

fn to_square(coord: WireSquare) -> Result<Square, WireError> {
    square_at(coord[0], coord[1]).ok_or(WireError::OffBoard(coord[0], coord[1]))
}

fn to_wire(square: Square) -> WireSquare {
    let (file, rank) = coords(square);
    [file, rank]
}

/// Canonical snapshot payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireGameState {
    pub active_color: PieceColor,
    pub is_check: bool,
    pub is_checkmate: bool,
    /// Board pieces and captured pieces (`position: null`)
    pub pieces: Vec<WirePiece>,
    #[serde(default)]
    pub legal_moves_by_piece_id: BTreeMap<PieceId, Vec<WireMove>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WirePiece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub color: PieceColor,
    pub position: Option<WireSquare>,
    #[serde(default)]
    pub move_count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireMove {
    pub target_square: WireSquare,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_kind: Option<PieceKind>,
}

/// Body of a move request: the current state plus an optional move
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireSubmission {
    pub game_state: WireGameState,
    #[serde(rename = "move")]
    pub mv: Option<WireMoveRequest>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireMoveRequest {
    pub piece_id: PieceId,
    pub target_square: WireSquare,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_kind: Option<PieceKind>,
}

impl TryFrom<WireGameState> for GameState {
    type Error = WireError;

    fn try_from(wire: WireGameState) -> Result<Self, Self::Error> {
        let mut state = GameState::new(wire.active_color);
        state.is_check = wire.is_check;
        state.is_checkmate = wire.is_checkmate;

        for piece in wire.pieces {
            let position = piece.position.map(to_square).transpose()?;
            let data = PieceSnapshot {
                id: piece.id,
                kind: piece.kind,
                color: piece.color,
                position,
                move_count: piece.move_count,
            };
            if position.is_some() {
                state.board.push(data);
            } else {
                state.captured.pool_for(data.color).push(data);
            }
        }

        for (id, moves) in wire.legal_moves_by_piece_id {
            let options = moves
                .into_iter()
                .map(|m| {
                    Ok(MoveOption {
                        target: to_square(m.target_square)?,
                        promotion: m.promotion_kind,
                    })
                })
                .collect::<Result<Vec<_>, WireError>>()?;
            state.legal_moves.insert(id, options);
        }

        Ok(state)
    }
}

impl From<&PieceSnapshot> for WirePiece {
    fn from(data: &PieceSnapshot) -> Self {
        Self {
            id: data.id.clone(),
            kind: data.kind,
            color: data.color,
            position: data.position.map(to_wire),
            move_count: data.move_count,
        }
    }
}

impl From<&GameState> for WireGameState {
    fn from(state: &GameState) -> Self {
        Self {
            active_color: state.active_color,
            is_check: state.is_check,
            is_checkmate: state.is_checkmate,
            pieces: state.pieces().map(WirePiece::from).collect(),
            legal_moves_by_piece_id: state
                .legal_moves
                .iter()
                .map(|(id, moves)| {
                    let moves = moves
                        .iter()
                        .map(|o| WireMove {
                            target_square: to_wire(o.target),
                            promotion_kind: o.promotion,
                        })
                        .collect();
                    (id.clone(), moves)
                })
                .collect(),
        }
    }
}

impl WireSubmission {
    pub fn new(state: &GameState, mv: Option<&MoveSubmission>) -> Self {
        Self {
            game_state: WireGameState::from(state),
            mv: mv.map(|m| WireMoveRequest {
                piece_id: m.piece_id.clone(),
                target_square: to_wire(m.target),
                promotion_kind: m.promotion,
            }),
        }
    }
}

/// Legacy server payload: `{ "game": {...}, "moves": [...] }`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegacyGameData {
    pub game: LegacyGame,
    #[serde(default)]
    pub moves: Vec<LegacyMove>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegacyGame {
    pub board: Vec<LegacyPiece>,
    pub black_moves: bool,
    /// Pieces captured by white
    #[serde(default)]
    pub white_captures: Vec<LegacyPiece>,
    /// Pieces captured by black
    #[serde(default)]
    pub black_captures: Vec<LegacyPiece>,
    #[serde(default)]
    pub is_check: bool,
    #[serde(default)]
    pub is_checkmate: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegacyPiece {
    pub id: PieceId,
    /// Kind code, see [`PieceKind::legacy_code`]
    pub t: String,
    /// is black
    pub b: bool,
    pub p: Option<WireSquare>,
    #[serde(default)]
    pub m: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegacyMove {
    pub pid: PieceId,
    #[serde(default)]
    pub to: Option<WireSquare>,
    /// `[from, to]`
    #[serde(default, rename = "move")]
    pub mv: Option<[WireSquare; 2]>,
}

impl LegacyPiece {
    fn into_snapshot(self) -> Result<PieceSnapshot, WireError> {
        let kind = PieceKind::from_legacy_code(&self.t)
            .ok_or_else(|| WireError::UnknownPieceCode(self.t.clone()))?;
        Ok(PieceSnapshot {
            id: self.id,
            kind,
            color: PieceColor::from_is_black(self.b),
            position: self.p.map(to_square).transpose()?,
            move_count: self.m,
        })
    }
}

impl TryFrom<LegacyGameData> for GameState {
    type Error = WireError;

    fn try_from(data: LegacyGameData) -> Result<Self, Self::Error> {
        let game = data.game;
        let mut state = GameState::new(PieceColor::from_is_black(game.black_moves));
        state.is_check = game.is_check;
        state.is_checkmate = game.is_checkmate;

        state.board = game
            .board
            .into_iter()
            .map(LegacyPiece::into_snapshot)
            .collect::<Result<_, _>>()?;
        state.captured.by_white = game
            .white_captures
            .into_iter()
            .map(LegacyPiece::into_snapshot)
            .collect::<Result<_, _>>()?;
        state.captured.by_black = game
            .black_captures
            .into_iter()
            .map(LegacyPiece::into_snapshot)
            .collect::<Result<_, _>>()?;

        for entry in data.moves {
            let target = match (entry.to, entry.mv) {
                (Some(to), _) => to,
                (None, Some([_, to])) => to,
                (None, None) => return Err(WireError::MissingDestination(entry.pid)),
            };
            state
                .legal_moves
                .entry(entry.pid)
                .or_default()
                .push(MoveOption::to(to_square(target)?));
        }

        Ok(state)
    }
}

/// Decode a snapshot in either wire format.
///
/// Payloads with a top-level `game` object are legacy; anything else is read
/// as canonical, so its decoding error is the one reported.
pub fn decode_snapshot(json: &str) -> Result<GameState, WireError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.get("game").is_some() {
        serde_json::from_value::<LegacyGameData>(value)?.try_into()
    } else {
        serde_json::from_value::<WireGameState>(value)?.try_into()
    }
}

/// Encode a snapshot in the canonical format
pub fn encode_snapshot(state: &GameState) -> Result<String, WireError> {
    Ok(serde_json::to_string(&WireGameState::from(state))?)
}

/// JSON schema of the canonical snapshot payload
pub fn json_schema() -> schemars::Schema {
    schemars::schema_for!(WireGameState)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = r#"{
        "activeColor": "white",
        "isCheck": false,
        "isCheckmate": false,
        "pieces": [
            {"id": "Wp2", "kind": "pawn", "color": "white", "position": [1, 6], "moveCount": 5},
            {"id": "BK", "kind": "king", "color": "black", "position": [7, 7], "moveCount": 0},
            {"id": "Bk1", "kind": "knight", "color": "black", "position": null, "moveCount": 2}
        ],
        "legalMovesByPieceId": {
            "Wp2": [
                {"targetSquare": [1, 7], "promotionKind": "queen"},
                {"targetSquare": [1, 7], "promotionKind": "rook"}
            ]
        }
    }"#;

    const LEGACY: &str = r#"{
        "game": {
            "board": [
                {"id": "WK", "t": "K", "b": false, "p": [4, 0], "m": 0},
                {"id": "Wk1", "t": "k", "b": false, "p": [6, 0], "m": 0},
                {"id": "BK", "t": "K", "b": true, "p": [4, 7], "m": 0}
            ],
            "black_moves": false,
            "white_captures": [{"id": "Bp1", "t": "p", "b": true, "p": null, "m": 1}],
            "black_captures": [],
            "is_check": false,
            "is_checkmate": false
        },
        "moves": [
            {"pid": "Wk1", "to": [5, 2]},
            {"pid": "Wk1", "move": [[6, 0], [7, 2]]}
        ]
    }"#;

    #[test]
    fn test_decode_canonical() {
        let state = decode_snapshot(CANONICAL).unwrap();
        assert_eq!(state.active_color, PieceColor::White);
        assert_eq!(state.board.len(), 2);
        assert_eq!(state.board[0].position, Some(Square::B7));
        // captured black knight lands in white's pool
        assert_eq!(state.captured.by_white.len(), 1);
        assert_eq!(
            state.moves_for("Wp2"),
            &[
                MoveOption::promote(Square::B8, PieceKind::Queen),
                MoveOption::promote(Square::B8, PieceKind::Rook),
            ]
        );
    }

    #[test]
    fn test_decode_legacy() {
        let state = decode_snapshot(LEGACY).unwrap();
        assert_eq!(state.active_color, PieceColor::White);
        assert_eq!(state.board[1].kind, PieceKind::Knight);
        assert_eq!(state.board[0].kind, PieceKind::King);
        assert_eq!(state.captured.by_white[0].color, PieceColor::Black);
        assert_eq!(
            state.moves_for("Wk1"),
            &[MoveOption::to(Square::F3), MoveOption::to(Square::H3)]
        );
    }

    #[test]
    fn test_canonical_survives_encoding() {
        let state = decode_snapshot(CANONICAL).unwrap();
        let encoded = encode_snapshot(&state).unwrap();
        assert_eq!(decode_snapshot(&encoded).unwrap(), state);
    }

    #[test]
    fn test_off_board_coordinate() {
        let json = CANONICAL.replace("[7, 7]", "[8, 7]");
        assert!(matches!(
            decode_snapshot(&json),
            Err(WireError::OffBoard(8, 7))
        ));
    }

    #[test]
    fn test_canonical_error_names_bad_field() {
        let json = CANONICAL.replace(r#""kind": "king""#, r#""kind": "emperor""#);
        let err = decode_snapshot(&json).unwrap_err();
        assert!(matches!(err, WireError::Json(_)));
        assert!(err.to_string().contains("emperor"), "{}", err);
    }

    #[test]
    fn test_unknown_legacy_code() {
        let json = LEGACY.replace(r#""t": "k""#, r#""t": "x""#);
        assert!(matches!(
            decode_snapshot(&json),
            Err(WireError::UnknownPieceCode(code)) if code == "x"
        ));
    }

    #[test]
    fn test_submission_body() {
        let state = decode_snapshot(CANONICAL).unwrap();
        let mv = MoveSubmission::new("Wp2", MoveOption::promote(Square::B8, PieceKind::Rook));
        let body = serde_json::to_value(WireSubmission::new(&state, Some(&mv))).unwrap();
        assert_eq!(body["move"]["pieceId"], "Wp2");
        assert_eq!(body["move"]["targetSquare"], serde_json::json!([1, 7]));
        assert_eq!(body["move"]["promotionKind"], "rook");
        assert_eq!(body["gameState"]["activeColor"], "white");
    }

    #[test]
    fn test_schema_names_fields() {
        let schema = serde_json::to_string(&json_schema()).unwrap();
        assert!(schema.contains("legalMovesByPieceId"));
        assert!(schema.contains("promotionKind"));
    }
}
