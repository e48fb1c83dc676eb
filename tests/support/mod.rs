// Per-test feed server bootstrapping and readiness polling.
use std::future::Future;
use std::time::Duration;

use maze_chase_core::channel::{ChannelState, RemoteChannel};
use maze_chase_core::feed::{self, FeedMode, SharedFeed};
use tokio::net::TcpListener;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

// Start a feed on an ephemeral port and return its `/ws` address.
pub async fn start_feed(mode: FeedMode) -> (String, SharedFeed) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    let state = feed::shared_state(mode);
    tokio::spawn(feed::serve(listener, state.clone()));
    (format!("ws://{addr}/ws"), state)
}

pub async fn within<F: Future>(what: &str, future: F) -> F::Output {
    tokio::time::timeout(WAIT_LIMIT, future)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

pub async fn wait_for_state(channel: &RemoteChannel, expected: ChannelState) {
    let mut state = channel.subscribe_state();
    within("channel state", state.wait_for(|s| *s == expected))
        .await
        .expect("channel state sender should be alive");
}

// Peers register after the upgrade completes, which can trail the client's `Open`.
pub async fn wait_for_peers(state: &SharedFeed, count: usize) {
    within("peer registration", async {
        while state.lock().await.peer_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}
