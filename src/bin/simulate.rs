use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase_core::actor::ActorController;
use maze_chase_core::channel::{ChannelOptions, ChannelState, RemoteChannel};
use maze_chase_core::config::{
    load_actor_options, load_maze_layout, normalize_tick_count, parse_key_script, ActorOptions,
    KeyHold,
};
use maze_chase_core::constants::{DEFAULT_MAZE, TICK_MS, TILE_SIZE};
use maze_chase_core::input::KeyboardState;
use maze_chase_core::logging::init_logging;
use maze_chase_core::maze::{GameSession, Maze};
use maze_chase_core::render::GridSurface;
use maze_chase_core::rng::Rng;
use maze_chase_core::types::{ActorSnapshot, Direction, GameMode};
use serde::Serialize;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
const AUTOPILOT_HOLD_TICKS: u64 = 30;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive a maze actor headlessly")]
struct Cli {
    /// local, single-remote or multi-remote
    #[arg(long, default_value = "local")]
    mode: String,
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    address: String,
    #[arg(long)]
    ticks: Option<u64>,
    /// Scripted key holds, e.g. `right:30,up:12,none:5`
    #[arg(long)]
    keys: Option<String>,
    /// Press a random key every half second
    #[arg(long)]
    autopilot: bool,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    actor_config: Option<PathBuf>,
    #[arg(long)]
    maze: Option<PathBuf>,
    /// Print the final frame as ASCII
    #[arg(long)]
    render: bool,
    /// Pace ticks at the frame rate even in local mode
    #[arg(long)]
    realtime: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct RunResultLine {
    #[serde(rename = "startedAt")]
    started_at: String,
    mode: GameMode,
    ticks: u64,
    seed: Option<u32>,
    #[serde(rename = "finalState")]
    final_state: ActorSnapshot,
    #[serde(rename = "walkedTiles")]
    walked_tiles: usize,
    #[serde(rename = "channelState")]
    channel_state: Option<ChannelState>,
}

/// Where the keyboard gets its presses from on each tick.
enum KeySource {
    Idle,
    Script { holds: Vec<KeyHold>, index: usize, left: u64 },
    Autopilot { rng: Rng, left: u64 },
}

impl KeySource {
    fn next_key(&mut self) -> Option<Option<Direction>> {
        match self {
            Self::Idle => None,
            Self::Script { holds, index, left } => {
                while *left == 0 {
                    // A finished script leaves every key released.
                    let Some(hold) = holds.get(*index) else {
                        return Some(None);
                    };
                    *index += 1;
                    *left = hold.ticks;
                }
                *left -= 1;
                holds.get(*index - 1).map(|hold| hold.key)
            }
            Self::Autopilot { rng, left } => {
                if *left == 0 {
                    *left = AUTOPILOT_HOLD_TICKS - 1;
                    return Some(Some(rng.direction()));
                }
                *left -= 1;
                None
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(mode) = GameMode::parse(&cli.mode) else {
        bail!("unknown mode `{}`", cli.mode);
    };
    let ticks = normalize_tick_count(cli.ticks);
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let maze = match &cli.maze {
        Some(path) => Maze::parse(&load_maze_layout(path)?, TILE_SIZE),
        None => Maze::parse(&DEFAULT_MAZE, TILE_SIZE),
    }
    .context("failed to build maze")?;
    let options = match &cli.actor_config {
        Some(path) => load_actor_options(path)?,
        None => ActorOptions::default(),
    };

    let mut seed = None;
    let mut keys = match (&cli.keys, cli.autopilot) {
        (Some(_), true) => bail!("--keys and --autopilot are mutually exclusive"),
        (Some(raw), false) => KeySource::Script {
            holds: parse_key_script(raw)?,
            index: 0,
            left: 0,
        },
        (None, true) => {
            let value = cli.seed.unwrap_or_else(rand::random::<u32>);
            seed = Some(value);
            KeySource::Autopilot {
                rng: Rng::new(value),
                left: 0,
            }
        }
        (None, false) => KeySource::Idle,
    };

    let channel = if mode.is_remote() {
        let options = ChannelOptions::with_diagnostics(|diagnostic| {
            debug!(?diagnostic, "remote channel diagnostic");
        });
        let channel = RemoteChannel::connect(&cli.address, options)
            .with_context(|| format!("failed to start remote channel to {}", cli.address))?;
        let mut state = channel.subscribe_state();
        if timeout(CONNECT_TIMEOUT, state.wait_for(|s| *s != ChannelState::Connecting))
            .await
            .is_err()
        {
            warn!(address = %cli.address, "remote channel still connecting; running anyway");
        }
        Some(channel)
    } else {
        None
    };

    let keyboard = Arc::new(KeyboardState::new());
    let mut actor = ActorController::new(options, keyboard.clone(), channel.clone());
    let mut session = GameSession::new(maze, mode);
    info!(?mode, ticks, "simulation started");

    let mut pacer = (mode.is_remote() || cli.realtime).then(|| {
        let mut pacer = interval(Duration::from_millis(TICK_MS));
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        pacer
    });

    for _ in 0..ticks {
        if let Some(pacer) = pacer.as_mut() {
            pacer.tick().await;
        }
        if let Some(key) = keys.next_key() {
            keyboard.release_all();
            if let Some(key) = key {
                keyboard.press(key);
            }
        }

        actor.tick(&mut session);

        if let Some(channel) = channel.as_ref().filter(|channel| channel.is_open()) {
            channel.send_json(&actor.snapshot());
        }
    }

    let channel_state = match &channel {
        Some(channel) => Some(close_channel(channel).await),
        None => None,
    };

    if cli.render {
        for line in render_frame(&actor, &session.maze) {
            eprintln!("{line}");
        }
    }

    let line = RunResultLine {
        started_at,
        mode,
        ticks,
        seed,
        final_state: actor.snapshot(),
        walked_tiles: session.maze.walked_count(),
        channel_state,
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

async fn close_channel(channel: &RemoteChannel) -> ChannelState {
    channel.close();
    let mut state = channel.subscribe_state();
    if timeout(CLOSE_TIMEOUT, state.wait_for(|s| *s == ChannelState::Closed))
        .await
        .is_err()
    {
        warn!("remote channel did not acknowledge close");
    }
    channel.state()
}

/// Maze glyphs with `@` wherever the actor's sprite covers a tile center.
fn render_frame(actor: &ActorController, maze: &Maze) -> Vec<String> {
    let mut surface = GridSurface::new(maze.cols(), maze.rows(), maze.tile_size());
    actor.render(&mut surface);

    let background: Vec<Vec<char>> = maze
        .to_lines()
        .iter()
        .map(|line| line.chars().collect())
        .collect();
    surface.to_lines(|col, row, painted| match painted {
        Some(_) => '@',
        None => background
            .get(row)
            .and_then(|line| line.get(col))
            .copied()
            .unwrap_or(' '),
    })
}
