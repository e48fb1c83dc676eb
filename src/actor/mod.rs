//! The player-controlled actor: physical state, direction arbitration and
//! per-tick movement.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::channel::RemoteChannel;
use crate::config::ActorOptions;
use crate::host::GameHost;
use crate::input::{poll_priority_key, Keyboard};
use crate::protocol::{multi_remote_direction, single_remote_direction};
use crate::render::{draw_rect, Color, Surface};
use crate::types::{ActorBox, ActorSnapshot, GameMode, MoveDirection, Point, QueuedDirection, Size};

mod movement;

pub struct ActorController {
    position: Point,
    size: Size,
    speed: f32,
    color: Color,
    inner_color: Color,
    direction: MoveDirection,
    keyboard: Arc<dyn Keyboard>,
    channel: Option<RemoteChannel>,
}

impl ActorController {
    /// `channel` is only consulted in the remote modes; without one those
    /// modes leave the queued direction as it is.
    pub fn new(
        options: ActorOptions,
        keyboard: Arc<dyn Keyboard>,
        channel: Option<RemoteChannel>,
    ) -> Self {
        Self {
            position: options.center,
            size: options.size,
            speed: options.speed,
            color: options.color,
            inner_color: options.inner_color,
            direction: MoveDirection::default(),
            keyboard,
            channel,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn direction(&self) -> &MoveDirection {
        &self.direction
    }

    pub fn channel(&self) -> Option<&RemoteChannel> {
        self.channel.as_ref()
    }

    pub fn actor_box(&self) -> ActorBox {
        ActorBox {
            center: self.position,
            size: self.size,
        }
    }

    pub fn set_queued(&mut self, queued: impl Into<QueuedDirection>) {
        self.direction.queued = queued.into();
    }

    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            x: self.position.x,
            y: self.position.y,
            direction: self.direction.committed,
            queued_direction: self.direction.queued.clone(),
        }
    }

    /// One simulation frame: execute the queued direction, then pick the
    /// next one from whichever input source the host has selected.
    pub fn tick<H: GameHost + ?Sized>(&mut self, host: &mut H) {
        let mode = host.current_game_mode();

        match self.direction.queued.as_cardinal() {
            Some(direction) => {
                self.attempt_move(host, direction);
            }
            None => trace!(queued = ?self.direction.queued, "unrecognised queued direction; holding position"),
        }

        if let Some(next) = self.next_queued(mode) {
            self.direction.queued = next;
        }
    }

    fn next_queued(&self, mode: GameMode) -> Option<QueuedDirection> {
        match mode {
            GameMode::Local => poll_priority_key(self.keyboard.as_ref()).map(QueuedDirection::Cardinal),
            GameMode::SingleRemote => self
                .channel
                .as_ref()?
                .read_last_decoded(single_remote_direction)
                .map(QueuedDirection::Cardinal),
            // Unlike single-remote, the token is not checked against the
            // cardinal set.
            GameMode::MultiRemote => self
                .channel
                .as_ref()?
                .read_last_decoded(multi_remote_direction),
        }
    }

    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        draw_rect(surface, &self.actor_box(), self.color, self.inner_color);
    }
}

impl fmt::Debug for ActorController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorController")
            .field("position", &self.position)
            .field("size", &self.size)
            .field("speed", &self.speed)
            .field("direction", &self.direction)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
