//! Authoritative match simulation
//!
//! `MatchState` is the single source of truth for bodies, score and the
//! goal/pause state machine. Only the scheduler task owns one, and every
//! mutation happens through `step`, `resume_if_due`, `reset` or the command
//! processor.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::components::{BodyId, Roster, Score, TeamSide};
use crate::config::{FieldConfig, GameMode};
use crate::physics;
use crate::wire_format::{BodySnapshot, FieldSettings, GameSnapshot, Selection};

/// Goal/pause state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    /// Held after a goal until the deadline has passed
    Paused { until: Instant },
}

/// Whose move it is in turn-based play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub active: TeamSide,
    /// Set by a kick; cleared once every body has come to rest
    pub in_motion: bool,
}

/// What a single physics step produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Team credited with a goal this tick
    pub goal: Option<TeamSide>,
    pub contacts: usize,
    /// Turn handed over after motion settled
    pub turn_passed_to: Option<TeamSide>,
}

pub struct MatchState {
    field: FieldConfig,
    mode: GameMode,
    pub(crate) roster: Roster,
    score: Score,
    phase: Phase,
    tick: u64,
    pub(crate) selected: [Option<BodyId>; 2],
    pub(crate) turn: Option<Turn>,
}

impl MatchState {
    pub fn new(field: FieldConfig, mode: GameMode) -> Self {
        let roster = Roster::kickoff(&field);
        Self {
            roster,
            mode,
            score: Score::default(),
            phase: Phase::Playing,
            tick: 0,
            selected: [None, None],
            turn: initial_turn(mode, TeamSide::Player1),
            field,
        }
    }

    pub fn field(&self) -> &FieldConfig {
        &self.field
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, Phase::Paused { .. })
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn turn(&self) -> Option<Turn> {
        self.turn
    }

    pub fn selected(&self, side: TeamSide) -> Option<BodyId> {
        self.selected[side.index()]
    }

    /// Full reset for a fresh match: score, formation, pause and turn state.
    pub fn reset(&mut self) {
        self.score = Score::default();
        self.phase = Phase::Playing;
        self.tick = 0;
        self.reset_positions();
        self.turn = initial_turn(self.mode, TeamSide::Player1);
        info!("Match reset");
    }

    /// Leave any goal pause without touching bodies. Used when the loop halts.
    pub fn clear_pause(&mut self) {
        self.phase = Phase::Playing;
    }

    /// `PAUSED -> PLAYING` once `now` is strictly past the deadline.
    pub fn resume_if_due(&mut self, now: Instant) -> bool {
        match self.phase {
            Phase::Paused { until } if now > until => {
                self.phase = Phase::Playing;
                info!(tick = self.tick, "Game unpaused");
                true
            }
            _ => false,
        }
    }

    /// Run one physics tick. Does nothing while paused.
    pub fn step(&mut self, now: Instant) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if self.is_paused() {
            return outcome;
        }

        self.tick += 1;
        let bodies = self.roster.bodies_mut();
        physics::integrate(bodies, self.field.friction);
        outcome.contacts = physics::resolve_collisions(bodies, self.field.max_speed);
        physics::apply_boundaries(bodies, &self.field);

        if outcome.contacts > 0 {
            trace!(tick = self.tick, contacts = outcome.contacts, "Resolved contacts");
        }

        if let Some(scorer) = self.check_goal() {
            self.score_goal(scorer, now);
            outcome.goal = Some(scorer);
            return outcome;
        }

        outcome.turn_passed_to = self.pass_turn_if_settled();
        outcome
    }

    /// Left goal is checked first; at most one goal per tick.
    fn check_goal(&self) -> Option<TeamSide> {
        let ball = self.roster.ball();
        let (goal1, goal2) = (&self.field.goal1, &self.field.goal2);

        if ball.position.x < goal1.x + goal1.width && goal1.spans_y(ball.position.y) {
            Some(TeamSide::Player2)
        } else if ball.position.x > goal2.x && goal2.spans_y(ball.position.y) {
            Some(TeamSide::Player1)
        } else {
            None
        }
    }

    fn score_goal(&mut self, scorer: TeamSide, now: Instant) {
        self.score.credit(scorer);
        let cooldown = Duration::from_millis(self.field.goal_cooldown_ms);
        self.phase = Phase::Paused {
            until: now + cooldown,
        };
        self.reset_positions();
        if self.turn.is_some() {
            self.turn = initial_turn(self.mode, scorer.opponent());
        }
        info!(
            tick = self.tick,
            scorer = %scorer,
            player1 = self.score.player1,
            player2 = self.score.player2,
            cooldown_ms = self.field.goal_cooldown_ms,
            "Goal scored, game paused"
        );
    }

    fn reset_positions(&mut self) {
        self.roster.reset(&self.field);
        self.selected = [None, None];
    }

    fn pass_turn_if_settled(&mut self) -> Option<TeamSide> {
        let turn = self.turn.as_mut()?;
        if !turn.in_motion || !self.roster.all_at_rest() {
            return None;
        }
        turn.in_motion = false;
        turn.active = turn.active.opponent();
        debug!(tick = self.tick, active = %turn.active, "Motion settled, turn passes");
        Some(turn.active)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let team = |side| {
            self.roster
                .team(side)
                .iter()
                .map(BodySnapshot::from)
                .collect()
        };
        GameSnapshot {
            tick: self.tick,
            ball: BodySnapshot::from(self.roster.ball()),
            team1: team(TeamSide::Player1),
            team2: team(TeamSide::Player2),
            score: self.score,
            paused: self.is_paused(),
            settings: FieldSettings::new(&self.field, self.mode),
            selected: Selection {
                player1: self.selected[0].map(|id| id.to_string()),
                player2: self.selected[1].map(|id| id.to_string()),
            },
            turn: self.turn.map(|t| t.active),
        }
    }

    #[cfg(test)]
    pub(crate) fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }
}

fn initial_turn(mode: GameMode, active: TeamSide) -> Option<Turn> {
    match mode {
        GameMode::Continuous => None,
        GameMode::TurnBased => Some(Turn {
            active,
            in_motion: false,
        }),
    }
}
