use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ACTOR_SIZE, ACTOR_SPEED, DEFAULT_FEED_PORT, MAX_ACTOR_SPEED, MAX_SIMULATION_TICKS, TILE_SIZE,
};
use crate::error::ConfigError;
use crate::feed::FeedMode;
use crate::render::Color;
use crate::types::{Direction, Point, Size};

const DEFAULT_SIMULATION_TICKS: u64 = 600;

/// Everything needed to place an actor at game setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActorOptions {
    pub size: Size,
    pub center: Point,
    pub speed: f32,
    pub color: Color,
    pub inner_color: Color,
}

impl Default for ActorOptions {
    fn default() -> Self {
        Self {
            size: Size::new(ACTOR_SIZE, ACTOR_SIZE),
            // Open corridor tile (9, 7) of the default maze.
            center: Point::new(9.5 * TILE_SIZE, 7.5 * TILE_SIZE),
            speed: ACTOR_SPEED,
            color: Color::rgb(0xff, 0xff, 0x00),
            inner_color: Color::rgb(0x00, 0x00, 0x00),
        }
    }
}

impl ActorOptions {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if normalize_speed(self.speed).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "speed",
                value: self.speed.to_string(),
            });
        }
        if !(self.size.width > 0.0 && self.size.height > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "size",
                value: format!("{}x{}", self.size.width, self.size.height),
            });
        }
        if !(self.center.x.is_finite() && self.center.y.is_finite()) {
            return Err(ConfigError::InvalidValue {
                key: "center",
                value: format!("{},{}", self.center.x, self.center.y),
            });
        }
        Ok(self)
    }
}

pub fn load_actor_options(path: &Path) -> Result<ActorOptions, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let options: ActorOptions = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    options.validate()
}

pub fn load_maze_layout(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedServerConfig {
    pub port: u16,
    pub mode: FeedMode,
}

impl FeedServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `PORT` falls back to the default when unparsable; an unknown
    /// `FEED_MODE` is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT")
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_FEED_PORT);
        let mode = match lookup("FEED_MODE") {
            None => FeedMode::Relay,
            Some(raw) => FeedMode::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: "FEED_MODE",
                value: raw,
            })?,
        };
        Ok(Self { port, mode })
    }
}

pub fn normalize_speed(value: f32) -> Option<f32> {
    if value.is_finite() && value > 0.0 && value <= MAX_ACTOR_SPEED {
        Some(value)
    } else {
        None
    }
}

pub fn normalize_tick_count(value: Option<u64>) -> u64 {
    value
        .unwrap_or(DEFAULT_SIMULATION_TICKS)
        .clamp(1, MAX_SIMULATION_TICKS)
}

/// One step of a scripted keyboard: hold `key` for `ticks` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyHold {
    pub key: Option<Direction>,
    pub ticks: u64,
}

/// Parses `right:30,up:12,none:5` into key holds; `none` releases all keys.
pub fn parse_key_script(raw: &str) -> Result<Vec<KeyHold>, ConfigError> {
    let invalid = |part: &str| ConfigError::InvalidValue {
        key: "keys",
        value: part.to_string(),
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| -> Result<KeyHold, ConfigError> {
            let (name, ticks) = part.split_once(':').ok_or_else(|| invalid(part))?;
            let key = match name.trim() {
                "none" => None,
                other => Some(Direction::parse(other).ok_or_else(|| invalid(part))?),
            };
            let ticks = ticks.trim().parse::<u64>().map_err(|_| invalid(part))?;
            Ok(KeyHold { key, ticks })
        })
        .collect()
}
