//! Wire format for network messages
//!
//! Every frame is a JSON text message with a `type` tag. Unknown tags and
//! missing fields fail decoding centrally here, so callers only ever see
//! well-formed variants.

use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};

use crate::components::{Body, Goal, Score, TeamSide};
use crate::config::{FieldConfig, GameMode};
use crate::error::WireError;

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Kick { player_id: String, dx: f32, dy: f32 },
    #[serde(rename_all = "camelCase")]
    SelectPlayer { player_id: String },
    Ping { timestamp: u64 },
}

impl ClientMessage {
    pub fn from_text(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(WireError::Decode)
    }
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    PlayerAssignment { player: TeamSide },
    GameState(GameSnapshot),
    Message { message: String },
    Pong { timestamp: u64 },
}

impl ServerMessage {
    pub fn observer_notice() -> Self {
        ServerMessage::Message {
            message: "Observer mode.".to_string(),
        }
    }

    /// Encode once; the resulting frame is cheap to clone per client.
    pub fn to_frame(&self) -> Result<Utf8Bytes, WireError> {
        serde_json::to_string(self)
            .map(Utf8Bytes::from)
            .map_err(WireError::Encode)
    }
}

/// Full authoritative state as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub tick: u64,
    #[serde(rename = "b")]
    pub ball: BodySnapshot,
    #[serde(rename = "p1")]
    pub team1: Vec<BodySnapshot>,
    #[serde(rename = "p2")]
    pub team2: Vec<BodySnapshot>,
    #[serde(rename = "s")]
    pub score: Score,
    #[serde(rename = "p")]
    pub paused: bool,
    #[serde(rename = "gs")]
    pub settings: FieldSettings,
    #[serde(rename = "sel")]
    pub selected: Selection,
    pub turn: Option<TeamSide>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub r: f32,
}

impl From<&Body> for BodySnapshot {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id.to_string(),
            x: round1(body.position.x),
            y: round1(body.position.y),
            vx: round1(body.velocity.x),
            vy: round1(body.velocity.y),
            r: body.radius,
        }
    }
}

/// Selected player id per team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub player1: Option<String>,
    pub player2: Option<String>,
}

/// Field settings the client needs to draw the pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSettings {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub goal1: Goal,
    pub goal2: Goal,
    pub friction: f32,
    pub kick_force_multiplier: f32,
    pub max_speed: f32,
    pub goal_cooldown_ms: u64,
    pub mode: GameMode,
}

impl FieldSettings {
    pub fn new(field: &FieldConfig, mode: GameMode) -> Self {
        Self {
            canvas_width: field.canvas_width,
            canvas_height: field.canvas_height,
            goal1: field.goal1,
            goal2: field.goal2,
            friction: field.friction,
            kick_force_multiplier: field.kick_force_multiplier,
            max_speed: field.max_speed,
            goal_cooldown_ms: field.goal_cooldown_ms,
            mode,
        }
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn decodes_kick() {
        let msg = ClientMessage::from_text(r#"{"type":"kick","playerId":"p1_2","dx":3.5,"dy":-1}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Kick {
                player_id: "p1_2".to_string(),
                dx: 3.5,
                dy: -1.0,
            }
        );
    }

    #[test]
    fn decodes_select_player() {
        let msg = ClientMessage::from_text(r#"{"type":"selectPlayer","playerId":"p2_5"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SelectPlayer {
                player_id: "p2_5".to_string()
            }
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_messages() {
        assert!(ClientMessage::from_text(r#"{"type":"teleport","x":1}"#).is_err());
        assert!(ClientMessage::from_text(r#"{"type":"kick","playerId":"p1_1"}"#).is_err());
        assert!(ClientMessage::from_text(r#"{"playerId":"p1_1","dx":1,"dy":1}"#).is_err());
        assert!(ClientMessage::from_text("not json at all").is_err());
    }

    #[test]
    fn assignment_uses_team_names() {
        let frame = ServerMessage::PlayerAssignment {
            player: TeamSide::Player2,
        }
        .to_frame()
        .unwrap();
        assert_eq!(frame.as_str(), r#"{"type":"playerAssignment","player":"player2"}"#);
    }

    #[test]
    fn observer_notice_shape() {
        let frame = ServerMessage::observer_notice().to_frame().unwrap();
        let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["message"], "Observer mode.");
    }

    #[test]
    fn body_snapshot_rounds_to_one_decimal() {
        let mut body = Body::ball(Vec2::new(123.456, 78.94), 10.0);
        body.velocity = Vec2::new(-2.349, 0.051);
        let snap = BodySnapshot::from(&body);

        assert_eq!(snap.id, "ball");
        assert_eq!(snap.x, 123.5);
        assert_eq!(snap.y, 78.9);
        assert_eq!(snap.vx, -2.3);
        assert_eq!(snap.vy, 0.1);
        assert_eq!(snap.r, 10.0);
    }

    #[test]
    fn field_settings_are_camel_case() {
        let settings = FieldSettings::new(&FieldConfig::default(), GameMode::Continuous);
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["canvasWidth"], 700.0);
        assert_eq!(value["goal1"]["height"], 180.0);
        let multiplier = value["kickForceMultiplier"].as_f64().map(|v| (v * 100.0).round());
        assert_eq!(multiplier, Some(15.0));
        assert_eq!(value["mode"], "continuous");
    }
}
