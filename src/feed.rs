//! Control-feed server. Peers connect over WebSocket at `/ws`; whatever they
//! push reaches the game's [`crate::channel::RemoteChannel`] either verbatim
//! (`Relay`) or folded into a list of peer-state records (`Roster`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::constants::OUTBOUND_QUEUE_CAPACITY;
use crate::protocol::parse_peer_direction;
use crate::types::{Direction, PeerState};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub type SharedFeed = Arc<Mutex<FeedState>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Forward each peer's text frames to every other peer.
    Relay,
    /// Track each peer's latest direction and broadcast the whole list.
    Roster,
}

impl FeedMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relay" => Some(Self::Relay),
            "roster" => Some(Self::Roster),
            _ => None,
        }
    }
}

struct PeerContext {
    tx: mpsc::Sender<String>,
    direction: Option<Direction>,
}

pub struct FeedState {
    mode: FeedMode,
    peers: HashMap<String, PeerContext>,
}

impl FeedState {
    pub fn new(mode: FeedMode) -> Self {
        Self {
            mode,
            peers: HashMap::new(),
        }
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Peers that have announced a direction, in join order.
    pub fn roster(&self) -> Vec<PeerState> {
        let mut roster: Vec<PeerState> = self
            .peers
            .iter()
            .filter_map(|(id, peer)| {
                peer.direction.map(|direction| PeerState {
                    id: id.clone(),
                    direction,
                })
            })
            .collect();
        roster.sort_by_key(|peer| peer_order_key(&peer.id));
        roster
    }

    fn register_peer(&mut self, tx: mpsc::Sender<String>) -> String {
        let peer_id = make_id("peer");
        self.peers.insert(
            peer_id.clone(),
            PeerContext {
                tx,
                direction: None,
            },
        );
        peer_id
    }

    fn remove_peer(&mut self, peer_id: &str) {
        let Some(peer) = self.peers.remove(peer_id) else {
            return;
        };
        if self.mode == FeedMode::Roster && peer.direction.is_some() {
            self.broadcast_roster();
        }
    }

    fn handle_peer_text(&mut self, peer_id: &str, raw: &str) {
        match self.mode {
            FeedMode::Relay => self.broadcast(raw, Some(peer_id)),
            FeedMode::Roster => {
                let Some(direction) = parse_peer_direction(raw) else {
                    debug!(%peer_id, "ignoring peer frame without a direction");
                    return;
                };
                let Some(peer) = self.peers.get_mut(peer_id) else {
                    return;
                };
                peer.direction = Some(direction);
                self.broadcast_roster();
            }
        }
    }

    fn broadcast_roster(&mut self) {
        let roster = self.roster();
        self.broadcast(&json!(roster).to_string(), None);
    }

    /// Peers whose queue is full or gone are dropped.
    fn broadcast(&mut self, payload: &str, except: Option<&str>) {
        let mut failed_peers = Vec::new();
        for (peer_id, peer) in &self.peers {
            if except == Some(peer_id.as_str()) {
                continue;
            }
            if peer.tx.try_send(payload.to_string()).is_err() {
                failed_peers.push(peer_id.clone());
            }
        }
        for peer_id in failed_peers {
            debug!(%peer_id, "dropping peer with a stalled outbound queue");
            self.peers.remove(&peer_id);
        }
    }
}

pub fn shared_state(mode: FeedMode) -> SharedFeed {
    Arc::new(Mutex::new(FeedState::new(mode)))
}

pub fn router(state: SharedFeed) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/publish", post(publish_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: SharedFeed) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

async fn healthz(State(state): State<SharedFeed>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(json!({
        "ok": true,
        "mode": guard.mode(),
        "peers": guard.peer_count(),
    }))
}

async fn publish_handler(
    State(state): State<SharedFeed>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let mut guard = state.lock().await;
    guard.broadcast(&payload.to_string(), None);
    Json(json!({ "ok": true, "peers": guard.peer_count() }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedFeed>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedFeed, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);
    let peer_id = state.lock().await.register_peer(tx);
    debug!(%peer_id, "peer connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                state.lock().await.handle_peer_text(&peer_id, raw.as_str());
            }
            Message::Binary(raw) => {
                debug!(%peer_id, len = raw.len(), "ignoring binary frame");
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.lock().await.remove_peer(&peer_id);
    debug!(%peer_id, "peer disconnected");
    let _ = writer.await;
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn peer_order_key(peer_id: &str) -> u64 {
    peer_id
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(state: &mut FeedState) -> (String, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (state.register_peer(tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn feed_mode_parse_is_case_insensitive() {
        assert_eq!(FeedMode::parse("Relay"), Some(FeedMode::Relay));
        assert_eq!(FeedMode::parse(" roster "), Some(FeedMode::Roster));
        assert_eq!(FeedMode::parse("mesh"), None);
    }

    #[test]
    fn peer_order_key_uses_numeric_suffix() {
        assert!(peer_order_key("peer_2") < peer_order_key("peer_10"));
        assert_eq!(peer_order_key("peer"), u64::MAX);
    }

    #[test]
    fn relay_forwards_to_everyone_but_the_sender() {
        let mut state = FeedState::new(FeedMode::Relay);
        let (game_id, mut game_rx) = join(&mut state);
        let (pilot_id, mut pilot_rx) = join(&mut state);
        assert_ne!(game_id, pilot_id);

        state.handle_peer_text(&pilot_id, r#""up""#);

        assert_eq!(drain(&mut game_rx), vec![r#""up""#.to_string()]);
        assert!(drain(&mut pilot_rx).is_empty());
    }

    #[test]
    fn roster_broadcasts_directions_in_join_order() {
        let mut state = FeedState::new(FeedMode::Roster);
        let (_game_id, mut game_rx) = join(&mut state);
        let (first_id, _first_rx) = join(&mut state);
        let (second_id, _second_rx) = join(&mut state);

        state.handle_peer_text(&second_id, r#""down""#);
        state.handle_peer_text(&first_id, r#"{"direction":"left"}"#);
        state.handle_peer_text(&first_id, "garbage");

        let frames = drain(&mut game_rx);
        assert_eq!(frames.len(), 2);
        let latest: Vec<PeerState> =
            serde_json::from_str(&frames[1]).expect("roster should decode");
        assert_eq!(
            latest,
            vec![
                PeerState {
                    id: first_id.clone(),
                    direction: Direction::Left
                },
                PeerState {
                    id: second_id.clone(),
                    direction: Direction::Down
                },
            ]
        );
    }

    #[test]
    fn removing_an_active_peer_rebroadcasts_roster() {
        let mut state = FeedState::new(FeedMode::Roster);
        let (_game_id, mut game_rx) = join(&mut state);
        let (pilot_id, _pilot_rx) = join(&mut state);
        state.handle_peer_text(&pilot_id, r#""right""#);
        drain(&mut game_rx);

        state.remove_peer(&pilot_id);

        assert_eq!(drain(&mut game_rx), vec!["[]".to_string()]);
        assert_eq!(state.peer_count(), 1);
    }

    #[test]
    fn broadcast_drops_peers_whose_receiver_is_gone() {
        let mut state = FeedState::new(FeedMode::Relay);
        let (_kept_id, mut kept_rx) = join(&mut state);
        let (_gone_id, gone_rx) = join(&mut state);
        drop(gone_rx);

        state.broadcast("hello", None);

        assert_eq!(state.peer_count(), 1);
        assert_eq!(drain(&mut kept_rx), vec!["hello".to_string()]);
    }
}
