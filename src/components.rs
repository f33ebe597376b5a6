//! Entity model for the pitch
//!
//! Movable bodies (the ball and every player puck) and the static pieces of
//! geometry they interact with. Bodies live in a single `Roster` whose slot
//! order never changes during a match, so a `BodyId` stays valid across resets.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::FieldConfig;

/// One of the two sides of the match. Serialized as `player1` / `player2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    #[serde(rename = "player1")]
    Player1,
    #[serde(rename = "player2")]
    Player2,
}

impl TeamSide {
    pub const ALL: [TeamSide; 2] = [TeamSide::Player1, TeamSide::Player2];

    pub fn index(self) -> usize {
        match self {
            TeamSide::Player1 => 0,
            TeamSide::Player2 => 1,
        }
    }

    pub fn opponent(self) -> TeamSide {
        match self {
            TeamSide::Player1 => TeamSide::Player2,
            TeamSide::Player2 => TeamSide::Player1,
        }
    }

    /// Prefix used in wire player ids (`p1_3`).
    fn id_prefix(self) -> &'static str {
        match self {
            TeamSide::Player1 => "p1",
            TeamSide::Player2 => "p2",
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSide::Player1 => f.write_str("player1"),
            TeamSide::Player2 => f.write_str("player2"),
        }
    }
}

/// Stable identity of a body for the whole match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyId {
    Ball,
    /// Zero-based slot within the team roster
    Player { side: TeamSide, slot: usize },
}

impl BodyId {
    /// Parse a wire id such as `ball` or `p2_4` (slots are one-based on the wire).
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "ball" {
            return Some(BodyId::Ball);
        }
        let (prefix, number) = raw.split_once('_')?;
        let side = match prefix {
            "p1" => TeamSide::Player1,
            "p2" => TeamSide::Player2,
            _ => return None,
        };
        let number: usize = number.parse().ok()?;
        let slot = number.checked_sub(1)?;
        let id = BodyId::Player { side, slot };
        // Only the canonical spelling maps to a slot: no `p1_01` or `p1_+1`.
        (id.to_string() == raw).then_some(id)
    }

    pub fn team(&self) -> Option<TeamSide> {
        match self {
            BodyId::Ball => None,
            BodyId::Player { side, .. } => Some(*side),
        }
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyId::Ball => f.write_str("ball"),
            BodyId::Player { side, slot } => write!(f, "{}_{}", side.id_prefix(), slot + 1),
        }
    }
}

/// Ball vs. player; only the ball may enter a goal aperture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Ball,
    Player,
}

/// A circular movable body. Velocity is in units per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

impl Body {
    pub fn ball(position: Vec2, radius: f32) -> Self {
        Self {
            id: BodyId::Ball,
            kind: BodyKind::Ball,
            position,
            velocity: Vec2::ZERO,
            radius,
        }
    }

    pub fn player(side: TeamSide, slot: usize, position: Vec2, radius: f32) -> Self {
        Self {
            id: BodyId::Player { side, slot },
            kind: BodyKind::Player,
            position,
            velocity: Vec2::ZERO,
            radius,
        }
    }

    /// Effective mass used for impulse response.
    pub fn mass(&self) -> f32 {
        self.radius * self.radius
    }

    pub fn is_ball(&self) -> bool {
        self.kind == BodyKind::Ball
    }

    pub fn is_at_rest(&self) -> bool {
        self.velocity == Vec2::ZERO
    }

    /// Scale velocity down so its magnitude does not exceed `max_speed`.
    pub fn clamp_speed(&mut self, max_speed: f32) {
        let speed = self.velocity.length();
        if speed > max_speed {
            self.velocity *= max_speed / speed;
        }
    }
}

/// Axis-aligned goal aperture embedded in a side wall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Goal {
    /// Strict vertical span test used for both passage and scoring.
    pub fn spans_y(&self, y: f32) -> bool {
        y > self.y && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub player1: u32,
    pub player2: u32,
}

impl Score {
    pub fn credit(&mut self, side: TeamSide) {
        match side {
            TeamSide::Player1 => self.player1 += 1,
            TeamSide::Player2 => self.player2 += 1,
        }
    }

    pub fn get(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::Player1 => self.player1,
            TeamSide::Player2 => self.player2,
        }
    }
}

/// Every movable body of the match in simulation order:
/// team 1 players, team 2 players, then the ball.
#[derive(Debug, Clone)]
pub struct Roster {
    bodies: Vec<Body>,
    roster_size: usize,
}

impl Roster {
    /// Canonical kickoff formation.
    pub fn kickoff(field: &FieldConfig) -> Self {
        let roster_size = field.roster_size;
        let mut bodies = Vec::with_capacity(roster_size * 2 + 1);
        for side in TeamSide::ALL {
            bodies.extend(formation(field, side));
        }
        bodies.push(Body::ball(field.center(), field.ball_radius));
        Self {
            bodies,
            roster_size,
        }
    }

    /// Replace every body with its kickoff value. Slots keep their identity.
    pub fn reset(&mut self, field: &FieldConfig) {
        *self = Self::kickoff(field);
    }

    pub fn roster_size(&self) -> usize {
        self.roster_size
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn ball(&self) -> &Body {
        &self.bodies[self.roster_size * 2]
    }

    pub fn ball_mut(&mut self) -> &mut Body {
        &mut self.bodies[self.roster_size * 2]
    }

    pub fn team(&self, side: TeamSide) -> &[Body] {
        let start = side.index() * self.roster_size;
        &self.bodies[start..start + self.roster_size]
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        let index = self.slot_of(id)?;
        self.bodies.get(index)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let index = self.slot_of(id)?;
        self.bodies.get_mut(index)
    }

    pub fn all_at_rest(&self) -> bool {
        self.bodies.iter().all(Body::is_at_rest)
    }

    fn slot_of(&self, id: BodyId) -> Option<usize> {
        match id {
            BodyId::Ball => Some(self.roster_size * 2),
            BodyId::Player { side, slot } if slot < self.roster_size => {
                Some(side.index() * self.roster_size + slot)
            }
            BodyId::Player { .. } => None,
        }
    }
}

fn formation(field: &FieldConfig, side: TeamSide) -> impl Iterator<Item = Body> + '_ {
    let spacing = field.canvas_height / (field.roster_size as f32 + 1.0);
    let x = match side {
        TeamSide::Player1 => field.canvas_width * 0.2,
        TeamSide::Player2 => field.canvas_width * 0.8,
    };
    (0..field.roster_size).map(move |slot| {
        let y = spacing * (slot as f32 + 1.0);
        Body::player(side, slot, Vec2::new(x, y), field.player_radius)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_ids_round_trip_through_wire_form() {
        let id = BodyId::Player {
            side: TeamSide::Player2,
            slot: 3,
        };
        assert_eq!(id.to_string(), "p2_4");
        assert_eq!(BodyId::parse("p2_4"), Some(id));
        assert_eq!(BodyId::parse("ball"), Some(BodyId::Ball));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert_eq!(BodyId::parse("p3_1"), None);
        assert_eq!(BodyId::parse("p1_0"), None);
        assert_eq!(BodyId::parse("p1_x"), None);
        assert_eq!(BodyId::parse(""), None);
        assert_eq!(BodyId::parse("p1_01"), None);
        assert_eq!(BodyId::parse("p1_+1"), None);
        assert_eq!(BodyId::parse("p2_ 3"), None);
    }

    #[test]
    fn kickoff_formation_matches_field() {
        let field = FieldConfig::default();
        let roster = Roster::kickoff(&field);

        assert_eq!(roster.bodies().len(), field.roster_size * 2 + 1);
        assert_eq!(roster.ball().position, Vec2::new(350.0, 225.0));

        let home = roster.team(TeamSide::Player1);
        assert!(home.iter().all(|p| p.position.x == 140.0));
        assert_eq!(home[0].position.y, 75.0);
        assert_eq!(home[4].position.y, 375.0);
        assert!(roster.team(TeamSide::Player2).iter().all(|p| p.position.x == 560.0));
        assert!(roster.all_at_rest());
    }

    #[test]
    fn out_of_range_slot_has_no_body() {
        let roster = Roster::kickoff(&FieldConfig::default());
        let id = BodyId::Player {
            side: TeamSide::Player1,
            slot: 5,
        };
        assert!(roster.get(id).is_none());
    }

    #[test]
    fn clamp_speed_preserves_direction() {
        let mut body = Body::ball(Vec2::ZERO, 10.0);
        body.velocity = Vec2::new(30.0, 40.0);
        body.clamp_speed(15.0);
        assert!((body.velocity.length() - 15.0).abs() < 1e-4);
        assert!((body.velocity.x / body.velocity.y - 0.75).abs() < 1e-4);
    }
}
