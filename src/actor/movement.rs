use crate::host::GameHost;
use crate::types::{Direction, Point, TunnelSide};

use super::ActorController;

impl ActorController {
    /// Moves one step in `direction`, or, when that is blocked, one step in
    /// the committed direction. Returns whether the actor moved.
    ///
    /// The fallback is what lets an early turn request wait at a junction
    /// while the actor keeps coasting along its corridor.
    pub fn attempt_move<H: GameHost + ?Sized>(&mut self, host: &mut H, direction: Direction) -> bool {
        if self.try_step(host, direction) {
            return true;
        }
        let committed = self.direction.committed;
        self.try_step(host, committed)
    }

    fn try_step<H: GameHost + ?Sized>(&mut self, host: &mut H, direction: Direction) -> bool {
        let (dx, dy) = direction.displacement(self.speed);
        let actor_box = self.actor_box();
        if !host.is_valid_location(&actor_box, dx, dy) {
            return false;
        }

        let corner = actor_box.top_left();
        host.mark_tile_as_walked(corner.x, corner.y);

        let target = Point::new(self.position.x + dx, self.position.y + dy);
        self.position = match tunnel_exit(direction) {
            Some(exit) if host.out_of_boundaries(target.x, target.y) => host.tunnel_position(exit),
            _ => target,
        };
        self.direction.committed = direction;
        true
    }
}

/// Leaving through the left edge re-enters from the right exit and vice versa.
fn tunnel_exit(direction: Direction) -> Option<TunnelSide> {
    match direction {
        Direction::Left => Some(TunnelSide::Right),
        Direction::Right => Some(TunnelSide::Left),
        Direction::Up | Direction::Down => None,
    }
}
