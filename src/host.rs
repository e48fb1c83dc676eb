use crate::types::{ActorBox, GameMode, Point, TunnelSide};

/// The game session as seen by an actor: maze geometry, walked-tile
/// bookkeeping and the active input mode.
pub trait GameHost {
    /// Whether `actor_box` shifted by `(dx, dy)` lies entirely on open tiles.
    fn is_valid_location(&self, actor_box: &ActorBox, dx: f32, dy: f32) -> bool;

    /// `(x, y)` is the top-left corner of the actor box before it moves.
    fn mark_tile_as_walked(&mut self, x: f32, y: f32);

    fn out_of_boundaries(&self, x: f32, y: f32) -> bool;

    fn tunnel_position(&self, side: TunnelSide) -> Point;

    fn current_game_mode(&self) -> GameMode;
}
