pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const TILE_SIZE: f32 = 20.0;
pub const ACTOR_SIZE: f32 = 18.0;
pub const ACTOR_SPEED: f32 = 2.0;
pub const MAX_ACTOR_SPEED: f32 = TILE_SIZE / 2.0;

/// WebSocket status code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub const DEFAULT_FEED_PORT: u16 = 8080;
pub const MAX_SIMULATION_TICKS: u64 = 36_000;

pub const DEFAULT_MAZE: [&str; 11] = [
    "###################",
    "#........#........#",
    "#.##.###.#.###.##.#",
    "#.................#",
    "#.##.#.#####.#.##.#",
    "<....#...#...#....>",
    "#.##.###.#.###.##.#",
    "#.................#",
    "#.##.#.#####.#.##.#",
    "#....#...#...#....#",
    "###################",
];
