use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Keyboard polling order; the first pressed key wins.
    pub const PRIORITY: [Direction; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Per-tick offset for an actor moving `speed` units in this direction.
    pub fn displacement(self, speed: f32) -> (f32, f32) {
        match self {
            Self::Left => (-speed, 0.0),
            Self::Right => (speed, 0.0),
            Self::Up => (0.0, -speed),
            Self::Down => (0.0, speed),
        }
    }
}

/// The direction slot an actor will try next tick.
///
/// Local and single-remote input only ever produce `Cardinal`. The multi-remote
/// feed is trusted and its token is stored without validation, so an unknown
/// token is kept as `Unchecked` and moves nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueuedDirection {
    Cardinal(Direction),
    Unchecked(String),
}

impl QueuedDirection {
    pub fn from_token(token: &str) -> Self {
        match Direction::parse(token) {
            Some(direction) => Self::Cardinal(direction),
            None => Self::Unchecked(token.to_string()),
        }
    }

    pub fn as_cardinal(&self) -> Option<Direction> {
        match self {
            Self::Cardinal(direction) => Some(*direction),
            Self::Unchecked(_) => None,
        }
    }
}

impl From<Direction> for QueuedDirection {
    fn from(direction: Direction) -> Self {
        Self::Cardinal(direction)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveDirection {
    pub committed: Direction,
    pub queued: QueuedDirection,
}

impl Default for MoveDirection {
    fn default() -> Self {
        Self {
            committed: Direction::Left,
            queued: QueuedDirection::Cardinal(Direction::Left),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    Local,
    SingleRemote,
    MultiRemote,
}

impl GameMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "single-remote" | "single" => Some(Self::SingleRemote),
            "multi-remote" | "multi" => Some(Self::MultiRemote),
            _ => None,
        }
    }

    pub fn is_remote(self) -> bool {
        !matches!(self, Self::Local)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box described by its center, as handed to collision queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ActorBox {
    pub center: Point,
    pub size: Size,
}

impl ActorBox {
    pub fn top_left(&self) -> Point {
        Point {
            x: self.center.x - self.size.width / 2.0,
            y: self.center.y - self.size.height / 2.0,
        }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            center: Point {
                x: self.center.x + dx,
                y: self.center.y + dy,
            },
            size: self.size,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ActorSnapshot {
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    #[serde(rename = "queuedDirection")]
    pub queued_direction: QueuedDirection,
}

/// One record of a multi-remote frame. Servers may attach extra fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerState {
    pub id: String,
    pub direction: Direction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_tokens_round_trip_through_parse() {
        for direction in Direction::PRIORITY {
            assert_eq!(Direction::parse(direction.as_str()), Some(direction));
        }
        assert_eq!(Direction::parse("diagonal"), None);
        assert_eq!(Direction::parse("Left"), None);
    }

    #[test]
    fn displacement_moves_one_axis_only() {
        assert_eq!(Direction::Left.displacement(2.0), (-2.0, 0.0));
        assert_eq!(Direction::Right.displacement(2.0), (2.0, 0.0));
        assert_eq!(Direction::Up.displacement(2.0), (0.0, -2.0));
        assert_eq!(Direction::Down.displacement(2.0), (0.0, 2.0));
    }

    #[test]
    fn queued_direction_keeps_unknown_tokens() {
        assert_eq!(
            QueuedDirection::from_token("up"),
            QueuedDirection::Cardinal(Direction::Up)
        );
        assert_eq!(
            QueuedDirection::from_token("sideways"),
            QueuedDirection::Unchecked("sideways".to_string())
        );
    }

    #[test]
    fn game_mode_parse_accepts_short_aliases() {
        assert_eq!(GameMode::parse("local"), Some(GameMode::Local));
        assert_eq!(GameMode::parse(" Single "), Some(GameMode::SingleRemote));
        assert_eq!(GameMode::parse("multi-remote"), Some(GameMode::MultiRemote));
        assert_eq!(GameMode::parse("coop"), None);
    }

    #[test]
    fn default_move_direction_is_left() {
        let direction = MoveDirection::default();
        assert_eq!(direction.committed, Direction::Left);
        assert_eq!(direction.queued, QueuedDirection::Cardinal(Direction::Left));
    }
}
