use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::Direction;

pub trait Keyboard: Send + Sync {
    fn is_down(&self, key: Direction) -> bool;
}

/// Cardinal key state shared between an input source and the actor.
///
/// Each key is an independent flag, so a window/event thread can press and
/// release keys while the simulation polls them.
#[derive(Debug, Default)]
pub struct KeyboardState {
    keys: [AtomicBool; 4],
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: Direction) {
        self.slot(key).store(true, Ordering::Relaxed);
    }

    pub fn release(&self, key: Direction) {
        self.slot(key).store(false, Ordering::Relaxed);
    }

    pub fn release_all(&self) {
        for key in &self.keys {
            key.store(false, Ordering::Relaxed);
        }
    }

    fn slot(&self, key: Direction) -> &AtomicBool {
        let index = match key {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Up => 2,
            Direction::Down => 3,
        };
        &self.keys[index]
    }
}

impl Keyboard for KeyboardState {
    fn is_down(&self, key: Direction) -> bool {
        self.slot(key).load(Ordering::Relaxed)
    }
}

/// First pressed key in `Direction::PRIORITY` order.
pub fn poll_priority_key<K: Keyboard + ?Sized>(keyboard: &K) -> Option<Direction> {
    Direction::PRIORITY
        .into_iter()
        .find(|key| keyboard.is_down(*key))
}
