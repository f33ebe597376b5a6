//! Server and field configuration
//!
//! Defaults first, then an optional `soccer.toml`, then environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::components::Goal;
use crate::error::ConfigError;
use glam::Vec2;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "soccer.toml";

/// Upper bound for `tick_rate_hz`; faster loops would need sub-millisecond periods.
pub const MAX_TICK_RATE_HZ: f32 = 1000.0;

/// How kicks are gated and scaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Tap-to-shoot: any own player, any time, fixed impulse.
    #[default]
    Continuous,
    /// Teams alternate; only the selected player of the active team may be flicked.
    TurnBased,
}

impl std::str::FromStr for GameMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" => Ok(GameMode::Continuous),
            "turn_based" | "turn-based" | "turns" => Ok(GameMode::TurnBased),
            other => Err(ConfigError::Invalid(format!("unknown game mode '{other}'"))),
        }
    }
}

/// Pitch geometry and physics tuning. Immutable once a match starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub ball_radius: f32,
    pub player_radius: f32,
    /// Players per team
    pub roster_size: usize,
    /// Per-tick velocity decay factor, strictly between 0 and 1
    pub friction: f32,
    pub max_speed: f32,
    /// Fixed impulse for continuous-mode kicks
    pub kick_strength: f32,
    /// Flick scale for turn-based kicks
    pub kick_force_multiplier: f32,
    pub goal_cooldown_ms: u64,
    /// Left aperture; conceding here credits `player2`
    pub goal1: Goal,
    /// Right aperture; conceding here credits `player1`
    pub goal2: Goal,
}

impl Default for FieldConfig {
    fn default() -> Self {
        // Apertures span 30%..70% of the height on each side wall.
        Self {
            canvas_width: 700.0,
            canvas_height: 450.0,
            ball_radius: 10.0,
            player_radius: 15.0,
            roster_size: 5,
            friction: 0.98,
            max_speed: 15.0,
            kick_strength: 5.0,
            kick_force_multiplier: 0.15,
            goal_cooldown_ms: 3000,
            goal1: Goal {
                x: 0.0,
                y: 135.0,
                width: 20.0,
                height: 180.0,
            },
            goal2: Goal {
                x: 680.0,
                y: 135.0,
                width: 20.0,
                height: 180.0,
            },
        }
    }
}

impl FieldConfig {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.canvas_width / 2.0, self.canvas_height / 2.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(positive(self.canvas_width) && positive(self.canvas_height)) {
            return Err(invalid("field dimensions must be positive"));
        }
        if !(positive(self.ball_radius) && positive(self.player_radius)) {
            return Err(invalid("body radii must be positive"));
        }
        if self.roster_size == 0 {
            return Err(invalid("roster_size must be > 0"));
        }
        if !(positive(self.friction) && self.friction < 1.0) {
            return Err(invalid("friction must be strictly between 0 and 1"));
        }
        if !positive(self.max_speed) {
            return Err(invalid("max_speed must be > 0"));
        }
        if !(positive(self.kick_strength) && positive(self.kick_force_multiplier)) {
            return Err(invalid("kick strength and multiplier must be > 0"));
        }
        for (name, goal) in [("goal1", &self.goal1), ("goal2", &self.goal2)] {
            if !(positive(goal.width) && positive(goal.height)) {
                return Err(invalid(&format!("{name} must have a positive size")));
            }
            if goal.y < 0.0 || goal.y + goal.height > self.canvas_height {
                return Err(invalid(&format!("{name} must lie within the canvas height")));
            }
        }
        if self.goal1.x != 0.0 {
            return Err(invalid("goal1 must sit on the left wall"));
        }
        if self.goal2.x + self.goal2.width != self.canvas_width {
            return Err(invalid("goal2 must sit on the right wall"));
        }
        Ok(())
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser client origin allowed by CORS
    pub client_origin: String,
    pub tick_rate_hz: f32,
    /// Frames buffered per client before it is considered too slow and dropped
    pub outbound_buffer: usize,
    pub mode: GameMode,
    pub field: FieldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            client_origin: "http://localhost:5173".to_string(),
            tick_rate_hz: 60.0,
            outbound_buffer: 256,
            mode: GameMode::default(),
            field: FieldConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load `soccer.toml` when present, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml(&content)?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Environment overrides. `lookup` is injectable so tests need not touch
    /// the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = var("SOCCER_SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = var("SOCCER_SERVER_PORT") {
            self.port = port.parse().map_err(|_| {
                ConfigError::Invalid(format!("SOCCER_SERVER_PORT '{port}' is not a valid port"))
            })?;
        }
        let client_host = var("CLIENT_HOST");
        let client_port = var("CLIENT_PORT");
        if client_host.is_some() || client_port.is_some() {
            self.client_origin = format!(
                "http://{}:{}",
                client_host.as_deref().unwrap_or("localhost"),
                client_port.as_deref().unwrap_or("5173")
            );
        }
        if let Some(rate) = var("SOCCER_TICK_RATE") {
            self.tick_rate_hz = rate.parse().map_err(|_| {
                ConfigError::Invalid(format!("SOCCER_TICK_RATE '{rate}' is not a number"))
            })?;
        }
        if let Some(mode) = var("SOCCER_GAME_MODE") {
            self.mode = mode.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.tick_rate_hz) || self.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(invalid(&format!("tick_rate_hz must be > 0 and <= {MAX_TICK_RATE_HZ}")));
        }
        if self.outbound_buffer == 0 {
            return Err(invalid("outbound_buffer must be > 0"));
        }
        self.field.validate()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// False for NaN as well as zero and negatives.
fn positive(value: f32) -> bool {
    value > 0.0
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.field.goal1.y, 135.0);
        assert_eq!(config.field.goal1.height, 180.0);
        assert_eq!(config.field.goal2.x, 680.0);
    }

    #[test]
    fn toml_overrides_only_named_fields() {
        let config = ServerConfig::from_toml(
            r#"
            port = 9000
            mode = "turn_based"

            [field]
            friction = 0.95
            goal_cooldown_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.mode, GameMode::TurnBased);
        assert_eq!(config.field.friction, 0.95);
        assert_eq!(config.field.goal_cooldown_ms, 1500);
        assert_eq!(config.field.max_speed, 15.0);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = ServerConfig::from_toml("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServerConfig::from_file(Path::new("definitely/not/here.toml")).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SOCCER_SERVER_HOST", "0.0.0.0"),
            ("SOCCER_SERVER_PORT", "7000"),
            ("CLIENT_PORT", "3000"),
            ("SOCCER_GAME_MODE", "turn-based"),
            ("SOCCER_TICK_RATE", ""),
        ]);
        let mut config = ServerConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:7000");
        assert_eq!(config.client_origin, "http://localhost:3000");
        assert_eq!(config.mode, GameMode::TurnBased);
        assert_eq!(config.tick_rate_hz, 60.0);
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(|key| (key == "SOCCER_SERVER_PORT").then(|| "99999".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn invalid_friction_fails_validation() {
        let mut config = ServerConfig::default();
        config.field.friction = 1.0;
        assert!(config.validate().is_err());
        config.field.friction = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tick_rate_must_be_finite_and_bounded() {
        for rate in [0.0, -60.0, f32::NAN, f32::INFINITY, 1e12, 1000.5] {
            let config = ServerConfig {
                tick_rate_hz: rate,
                ..ServerConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "rate {rate} accepted"
            );
        }

        let config = ServerConfig {
            tick_rate_hz: MAX_TICK_RATE_HZ,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_tick_rate_of_inf_fails_validation() {
        let mut config = ServerConfig::default();
        config
            .apply_env(|key| (key == "SOCCER_TICK_RATE").then(|| "inf".to_string()))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_field_values_fail_validation() {
        let mut field = FieldConfig::default();
        field.max_speed = f32::NAN;
        assert!(field.validate().is_err());
    }

    #[test]
    fn goal_off_the_wall_fails_validation() {
        let mut field = FieldConfig::default();
        field.goal2.x = 600.0;
        assert!(field.validate().is_err());
    }
}
