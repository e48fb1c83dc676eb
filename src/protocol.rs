use serde_json::Value;

use crate::types::{Direction, QueuedDirection};

/// True only for a JSON string holding one of the four cardinal tokens.
pub fn is_valid_direction_token(value: &Value) -> bool {
    value.as_str().and_then(Direction::parse).is_some()
}

/// Single-remote payloads are a bare JSON string such as `"up"`.
pub fn single_remote_direction(value: Option<&Value>) -> Option<Direction> {
    let value = value?;
    if !is_valid_direction_token(value) {
        return None;
    }
    value.as_str().and_then(Direction::parse)
}

/// Multi-remote payloads are a list of peer records; only the first is read.
///
/// The token is taken as sent, without checking it is a cardinal. The peer
/// server is the authority in this mode. Once anything has been received, a
/// payload whose first record lacks a string `direction` still yields an
/// `Unchecked` token holding the JSON text found there (`null` when absent),
/// so the actor stops instead of coasting on a stale direction.
pub fn multi_remote_direction(value: Option<&Value>) -> Option<QueuedDirection> {
    let field = value?.get(0).and_then(|record| record.get("direction"));
    Some(match field {
        Some(Value::String(token)) => QueuedDirection::from_token(token),
        Some(other) => QueuedDirection::Unchecked(other.to_string()),
        None => QueuedDirection::Unchecked(Value::Null.to_string()),
    })
}

/// A direction pushed by a peer of the control feed.
///
/// Accepts either the bare single-remote form or `{"direction": "..."}`.
pub fn parse_peer_direction(raw: &str) -> Option<Direction> {
    let value: Value = serde_json::from_str(raw).ok()?;
    match &value {
        Value::String(token) => Direction::parse(token),
        Value::Object(object) => Direction::parse(object.get("direction")?.as_str()?),
        _ => None,
    }
}
