//! Command processor
//!
//! Validates client commands against the current `MatchState` and applies the
//! ones that pass. Runs on the scheduler task at the start of a tick, before
//! physics.

use glam::Vec2;

use crate::components::{BodyId, TeamSide};
use crate::config::GameMode;
use crate::error::CommandError;
use crate::simulation::MatchState;

/// Direction vectors shorter than this are treated as accidental taps.
pub const MIN_KICK_MAGNITUDE: f32 = 0.1;

/// A validated-on-the-wire player command, not yet authorized.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Kick { player_id: String, dx: f32, dy: f32 },
    SelectPlayer { player_id: String },
}

/// What an accepted command did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandEffect {
    Kicked { player: BodyId, impulse: Vec2 },
    /// Direction too short; nothing changed
    IgnoredTap,
    Selected { player: BodyId },
}

impl MatchState {
    pub fn apply_command(
        &mut self,
        sender: Option<TeamSide>,
        command: &PlayerCommand,
    ) -> Result<CommandEffect, CommandError> {
        if self.is_paused() {
            return Err(CommandError::Paused);
        }
        let team = sender.ok_or(CommandError::Unassigned)?;

        match command {
            PlayerCommand::Kick { player_id, dx, dy } => self.kick(team, player_id, *dx, *dy),
            PlayerCommand::SelectPlayer { player_id } => self.select_player(team, player_id),
        }
    }

    fn kick(
        &mut self,
        team: TeamSide,
        player_id: &str,
        dx: f32,
        dy: f32,
    ) -> Result<CommandEffect, CommandError> {
        let player = self.own_player(team, player_id)?;

        if let Some(turn) = self.turn {
            if turn.active != team {
                return Err(CommandError::NotActiveTeam(team));
            }
            if turn.in_motion {
                return Err(CommandError::TurnInProgress);
            }
            if self.selected[team.index()] != Some(player) {
                return Err(CommandError::NotSelected);
            }
        }

        let direction = Vec2::new(dx, dy);
        if !direction.is_finite() {
            return Err(CommandError::InvalidDirection);
        }
        let magnitude = direction.length();
        if magnitude < MIN_KICK_MAGNITUDE {
            return Ok(CommandEffect::IgnoredTap);
        }

        let field = self.field();
        let impulse = match self.mode() {
            GameMode::Continuous => direction / magnitude * field.kick_strength,
            GameMode::TurnBased => direction * field.kick_force_multiplier,
        };
        let max_speed = field.max_speed;

        let body = self
            .roster
            .get_mut(player)
            .ok_or_else(|| CommandError::UnknownPlayer(player_id.to_string()))?;
        body.velocity += impulse;
        body.clamp_speed(max_speed);

        if let Some(turn) = self.turn.as_mut() {
            turn.in_motion = true;
        }
        Ok(CommandEffect::Kicked { player, impulse })
    }

    fn select_player(
        &mut self,
        team: TeamSide,
        player_id: &str,
    ) -> Result<CommandEffect, CommandError> {
        if let Some(turn) = self.turn
            && turn.active != team
        {
            return Err(CommandError::NotActiveTeam(team));
        }
        let player = self.own_player(team, player_id)?;
        self.selected[team.index()] = Some(player);
        Ok(CommandEffect::Selected { player })
    }

    /// Resolve a wire id to one of `team`'s roster slots.
    fn own_player(&self, team: TeamSide, player_id: &str) -> Result<BodyId, CommandError> {
        let id = BodyId::parse(player_id)
            .filter(|id| self.roster.get(*id).is_some())
            .ok_or_else(|| CommandError::UnknownPlayer(player_id.to_string()))?;
        if id.team() != Some(team) {
            return Err(CommandError::NotOwnPlayer {
                player: player_id.to_string(),
                team,
            });
        }
        Ok(id)
    }
}
