use std::collections::BTreeSet;

use crate::error::MazeError;
use crate::host::GameHost;
use crate::types::{ActorBox, GameMode, Point, TunnelSide};

const EDGE_EPSILON: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Floor,
    TunnelLeft,
    TunnelRight,
}

impl Tile {
    fn parse(raw: char) -> Option<Self> {
        match raw {
            '#' => Some(Self::Wall),
            '.' | ' ' => Some(Self::Floor),
            '<' => Some(Self::TunnelLeft),
            '>' => Some(Self::TunnelRight),
            _ => None,
        }
    }

    fn glyph(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Floor => '.',
            Self::TunnelLeft => '<',
            Self::TunnelRight => '>',
        }
    }

    pub fn is_walkable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TunnelRows {
    left: usize,
    right: usize,
}

/// Tile maze in pixel space. Tile `(col, row)` covers
/// `[col * tile_size, (col + 1) * tile_size)` horizontally.
#[derive(Clone, Debug)]
pub struct Maze {
    tiles: Vec<Vec<Tile>>,
    cols: usize,
    rows: usize,
    tile_size: f32,
    tunnels: Option<TunnelRows>,
    walked: BTreeSet<(usize, usize)>,
}

impl Maze {
    pub fn parse<S: AsRef<str>>(layout: &[S], tile_size: f32) -> Result<Self, MazeError> {
        let expected = layout.first().map(|row| row.as_ref().chars().count()).unwrap_or(0);
        if expected == 0 {
            return Err(MazeError::Empty);
        }

        let mut tiles = Vec::with_capacity(layout.len());
        let mut left_exits = Vec::new();
        let mut right_exits = Vec::new();
        for (row, raw_row) in layout.iter().enumerate() {
            let raw_row = raw_row.as_ref();
            let width = raw_row.chars().count();
            if width != expected {
                return Err(MazeError::RaggedRow {
                    row,
                    width,
                    expected,
                });
            }
            let mut parsed = Vec::with_capacity(width);
            for (col, raw) in raw_row.chars().enumerate() {
                let tile = Tile::parse(raw).ok_or(MazeError::UnknownTile {
                    tile: raw,
                    row,
                    col,
                })?;
                match tile {
                    Tile::TunnelLeft if col == 0 => left_exits.push(row),
                    Tile::TunnelRight if col + 1 == expected => right_exits.push(row),
                    Tile::TunnelLeft | Tile::TunnelRight => return Err(MazeError::UnpairedTunnel),
                    _ => {}
                }
                parsed.push(tile);
            }
            tiles.push(parsed);
        }

        let tunnels = match (left_exits.as_slice(), right_exits.as_slice()) {
            ([], []) => None,
            ([left], [right]) => Some(TunnelRows {
                left: *left,
                right: *right,
            }),
            _ => return Err(MazeError::UnpairedTunnel),
        };

        Ok(Self {
            rows: tiles.len(),
            tiles,
            cols: expected,
            tile_size,
            tunnels,
            walked: BTreeSet::new(),
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn pixel_width(&self) -> f32 {
        self.cols as f32 * self.tile_size
    }

    pub fn pixel_height(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    pub fn tile_center(&self, col: usize, row: usize) -> Point {
        Point::new(
            (col as f32 + 0.5) * self.tile_size,
            (row as f32 + 0.5) * self.tile_size,
        )
    }

    pub fn tile_at(&self, col: usize, row: usize) -> Option<Tile> {
        self.tiles.get(row).and_then(|tiles| tiles.get(col)).copied()
    }

    /// Columns past the left/right edge resolve to the edge column when the
    /// maze has a tunnel, so the exit tiles stay passable while wrapping.
    pub fn is_walkable(&self, col: i64, row: i64) -> bool {
        let Ok(row) = usize::try_from(row) else {
            return false;
        };
        let col = if self.tunnels.is_some() {
            col.clamp(0, self.cols as i64 - 1)
        } else {
            col
        };
        let Ok(col) = usize::try_from(col) else {
            return false;
        };
        self.tile_at(col, row).is_some_and(Tile::is_walkable)
    }

    pub fn is_walked(&self, col: usize, row: usize) -> bool {
        self.walked.contains(&(col, row))
    }

    pub fn walked_count(&self) -> usize {
        self.walked.len()
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.tiles
            .iter()
            .map(|row| row.iter().map(|tile| tile.glyph()).collect())
            .collect()
    }

    fn tile_coord(&self, value: f32) -> i64 {
        (value / self.tile_size).floor() as i64
    }

    fn box_fits(&self, actor_box: &ActorBox) -> bool {
        let top_left = actor_box.top_left();
        let left = self.tile_coord(top_left.x);
        let right = self.tile_coord(top_left.x + actor_box.size.width - EDGE_EPSILON);
        let top = self.tile_coord(top_left.y);
        let bottom = self.tile_coord(top_left.y + actor_box.size.height - EDGE_EPSILON);

        (top..=bottom).all(|row| (left..=right).all(|col| self.is_walkable(col, row)))
    }
}

/// A maze plus the input mode the host selected for this session.
#[derive(Clone, Debug)]
pub struct GameSession {
    pub maze: Maze,
    mode: GameMode,
}

impl GameSession {
    pub fn new(maze: Maze, mode: GameMode) -> Self {
        Self { maze, mode }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
    }
}

impl GameHost for GameSession {
    fn is_valid_location(&self, actor_box: &ActorBox, dx: f32, dy: f32) -> bool {
        self.maze.box_fits(&actor_box.offset(dx, dy))
    }

    fn mark_tile_as_walked(&mut self, x: f32, y: f32) {
        let col = self.maze.tile_coord(x);
        let row = self.maze.tile_coord(y);
        let (Ok(col), Ok(row)) = (usize::try_from(col), usize::try_from(row)) else {
            return;
        };
        if col < self.maze.cols && row < self.maze.rows {
            self.maze.walked.insert((col, row));
        }
    }

    fn out_of_boundaries(&self, x: f32, y: f32) -> bool {
        x < 0.0 || y < 0.0 || x > self.maze.pixel_width() || y > self.maze.pixel_height()
    }

    fn tunnel_position(&self, side: TunnelSide) -> Point {
        match (self.maze.tunnels, side) {
            (Some(tunnels), TunnelSide::Left) => self.maze.tile_center(0, tunnels.left),
            (Some(tunnels), TunnelSide::Right) => {
                self.maze.tile_center(self.maze.cols - 1, tunnels.right)
            }
            (None, TunnelSide::Left) => Point::new(0.0, self.maze.pixel_height() / 2.0),
            (None, TunnelSide::Right) => {
                Point::new(self.maze.pixel_width(), self.maze.pixel_height() / 2.0)
            }
        }
    }

    fn current_game_mode(&self) -> GameMode {
        self.mode
    }
}
