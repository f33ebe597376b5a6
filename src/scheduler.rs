//! Tick scheduler and broadcaster
//!
//! One spawned task owns the `MatchState` and every client session. Socket
//! tasks talk to it only through `SchedulerEvent`s; commands are queued and
//! drained at the start of the next tick, so physics never observes a
//! half-applied command.

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::commands::{CommandEffect, PlayerCommand};
use crate::components::{Score, TeamSide};
use crate::config::{GameMode, ServerConfig};
use crate::simulation::MatchState;
use crate::wire_format::ServerMessage;

pub type SessionId = Uuid;

/// Outbound frames for one client. Bounded; a full queue drops the client.
pub type Outbound = mpsc::Sender<Utf8Bytes>;

/// Everything the network side may ask of the scheduler.
#[derive(Debug)]
pub enum SchedulerEvent {
    Connected {
        session_id: SessionId,
        outbound: Outbound,
    },
    Disconnected {
        session_id: SessionId,
    },
    Command {
        session_id: SessionId,
        command: PlayerCommand,
    },
    Ping {
        session_id: SessionId,
        timestamp: u64,
    },
    Status {
        reply: oneshot::Sender<MatchStatus>,
    },
}

/// Summary served by `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatus {
    pub running: bool,
    pub paused: bool,
    pub tick: u64,
    pub score: Score,
    pub clients: usize,
    pub teams_assigned: usize,
    pub mode: GameMode,
}

/// Cheap cloneable handle used by socket tasks.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    events: mpsc::UnboundedSender<SchedulerEvent>,
}

impl MatchHandle {
    /// Returns false once the scheduler task has gone away.
    pub fn send(&self, event: SchedulerEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub async fn status(&self) -> Option<MatchStatus> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SchedulerEvent::Status { reply }) {
            return None;
        }
        rx.await.ok()
    }
}

/// A connected client. Not part of the match state.
#[derive(Debug)]
struct ClientSession {
    team: Option<TeamSide>,
    outbound: Outbound,
}

pub struct MatchScheduler {
    state: MatchState,
    sessions: HashMap<SessionId, ClientSession>,
    inbox: VecDeque<(SessionId, PlayerCommand)>,
    running: bool,
}

impl MatchScheduler {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            state: MatchState::new(config.field.clone(), config.mode),
            sessions: HashMap::new(),
            inbox: VecDeque::new(),
            running: false,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn team_of(&self, session_id: SessionId) -> Option<TeamSide> {
        self.sessions.get(&session_id).and_then(|s| s.team)
    }

    fn teams_assigned(&self) -> usize {
        self.sessions.values().filter(|s| s.team.is_some()).count()
    }

    fn team_taken(&self, side: TeamSide) -> bool {
        self.sessions.values().any(|s| s.team == Some(side))
    }

    pub fn status(&self) -> MatchStatus {
        MatchStatus {
            running: self.running,
            paused: self.state.is_paused(),
            tick: self.state.tick(),
            score: self.state.score(),
            clients: self.sessions.len(),
            teams_assigned: self.teams_assigned(),
            mode: self.state.mode(),
        }
    }

    pub fn handle_event(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Connected {
                session_id,
                outbound,
            } => self.connect(session_id, outbound),
            SchedulerEvent::Disconnected { session_id } => self.disconnect(session_id),
            SchedulerEvent::Command {
                session_id,
                command,
            } => self.enqueue(session_id, command),
            SchedulerEvent::Ping {
                session_id,
                timestamp,
            } => self.unicast(session_id, &ServerMessage::Pong { timestamp }),
            SchedulerEvent::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Assign the first free team slot, greet the client, start the match if
    /// this completes the pair, then send the current state.
    pub fn connect(&mut self, session_id: SessionId, outbound: Outbound) {
        let team = TeamSide::ALL.into_iter().find(|side| !self.team_taken(*side));
        self.sessions.insert(session_id, ClientSession { team, outbound });

        match team {
            Some(side) => {
                info!(session = %session_id, team = %side, "Client connected and assigned");
                self.unicast(session_id, &ServerMessage::PlayerAssignment { player: side });
            }
            None => {
                info!(session = %session_id, "Client connected as observer");
                self.unicast(session_id, &ServerMessage::observer_notice());
            }
        }

        if !self.running && self.teams_assigned() == 2 {
            self.start();
        }

        let snapshot = ServerMessage::GameState(self.state.snapshot());
        self.unicast(session_id, &snapshot);
    }

    pub fn disconnect(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };
        info!(
            session = %session_id,
            team = ?session.team,
            "Client disconnected"
        );
        if session.team.is_some() {
            self.halt_if_short_handed();
        }
    }

    /// Queue a command for the next tick. Commands that arrive while the match
    /// is halted or paused are accepted and dropped.
    pub fn enqueue(&mut self, session_id: SessionId, command: PlayerCommand) {
        if !self.running || self.state.is_paused() {
            debug!(session = %session_id, ?command, "Command ignored, match not in play");
            return;
        }
        self.inbox.push_back((session_id, command));
    }

    /// One scheduler tick.
    pub fn tick(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        if self.teams_assigned() < 2 {
            self.halt();
            return;
        }

        if self.state.resume_if_due(now) {
            self.broadcast_state();
        }
        if self.state.is_paused() {
            return;
        }

        self.drain_commands();
        let outcome = self.state.step(now);
        if outcome.goal.is_some() {
            self.broadcast_state();
        }
        self.broadcast_state();
    }

    fn drain_commands(&mut self) {
        while let Some((session_id, command)) = self.inbox.pop_front() {
            let team = self.team_of(session_id);
            match self.state.apply_command(team, &command) {
                Ok(CommandEffect::Kicked { player, impulse }) => {
                    debug!(session = %session_id, %player, ?impulse, "Kick applied");
                }
                Ok(CommandEffect::IgnoredTap) => {
                    debug!(session = %session_id, ?command, "Kick below minimum magnitude");
                }
                Ok(CommandEffect::Selected { player }) => {
                    debug!(session = %session_id, %player, "Player selected");
                }
                Err(e) if e.is_authorization() => {
                    warn!(session = %session_id, error = %e, "Command rejected");
                }
                Err(e) => {
                    debug!(session = %session_id, error = %e, "Command ignored");
                }
            }
        }
    }

    fn start(&mut self) {
        self.state.reset();
        self.inbox.clear();
        self.running = true;
        info!("Two teams connected, starting game loop");
    }

    fn halt(&mut self) {
        self.running = false;
        self.state.clear_pause();
        self.inbox.clear();
        info!("Fewer than two teams connected, game loop stopped");
    }

    fn halt_if_short_handed(&mut self) {
        if self.running && self.teams_assigned() < 2 {
            self.halt();
        }
    }

    fn unicast(&mut self, session_id: SessionId, message: &ServerMessage) {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to encode message");
                return;
            }
        };
        let Some(session) = self.sessions.get(&session_id) else {
            return;
        };
        if let Err(e) = session.outbound.try_send(frame) {
            warn!(session = %session_id, error = %e, "Send failed, dropping client");
            self.prune(&[session_id]);
        }
    }

    /// Send the current snapshot to every session while the loop is running.
    fn broadcast_state(&mut self) {
        if !self.running {
            return;
        }
        let frame = match ServerMessage::GameState(self.state.snapshot()).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(tick = self.state.tick(), error = %e, "Failed to encode game state");
                return;
            }
        };

        let failed: Vec<SessionId> = self
            .sessions
            .iter()
            .filter_map(|(id, session)| match session.outbound.try_send(frame.clone()) {
                Ok(()) => None,
                Err(e) => {
                    warn!(session = %id, error = %e, "Broadcast failed, dropping client");
                    Some(*id)
                }
            })
            .collect();

        if !failed.is_empty() {
            self.prune(&failed);
        }
    }

    /// Drop sessions whose outbound queue failed. Dropping the sender closes
    /// their socket.
    fn prune(&mut self, session_ids: &[SessionId]) {
        let mut lost_team = false;
        for session_id in session_ids {
            if let Some(session) = self.sessions.remove(session_id) {
                lost_team |= session.team.is_some();
            }
        }
        if lost_team {
            self.halt_if_short_handed();
        }
    }

    /// Drive the scheduler until every `MatchHandle` is dropped.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<SchedulerEvent>,
        tick_rate_hz: f32,
    ) {
        let period = tick_period(tick_rate_hz);
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_rate_hz, "Match scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick(), if self.running => {
                    self.tick(Instant::now());
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let was_running = self.running;
                    self.handle_event(event);
                    if !was_running && self.running {
                        interval.reset();
                    }
                }
            }
        }

        info!("Match scheduler stopped: all handles dropped");
    }
}

/// Tick period for a rate. `interval` panics on a zero period, so rates that
/// do not yield a usable period fall back to the default rate.
fn tick_period(tick_rate_hz: f32) -> Duration {
    match Duration::try_from_secs_f32(1.0 / tick_rate_hz) {
        Ok(period) if !period.is_zero() => period,
        _ => {
            let fallback = ServerConfig::default().tick_rate_hz;
            error!(tick_rate_hz, fallback, "Unusable tick rate, using default");
            Duration::from_secs_f32(1.0 / fallback)
        }
    }
}

/// Spawn the scheduler task.
pub fn spawn_match(config: &ServerConfig) -> (MatchHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = MatchScheduler::new(config);
    let tick_rate_hz = config.tick_rate_hz;
    let handle = tokio::spawn(scheduler.run(rx, tick_rate_hz));
    (MatchHandle { events: tx }, handle)
}
