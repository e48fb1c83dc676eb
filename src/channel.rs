//! Duplex message endpoint feeding remote directions to the actor.
//!
//! The channel is deliberately tolerant: inbound frames that are binary or do
//! not decode as JSON are dropped, and sends on a channel that is not open are
//! discarded. Neither case is an error for the caller; both are reported to an
//! optional [`DiagnosticHook`] instead.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::constants::{NORMAL_CLOSURE, OUTBOUND_QUEUE_CAPACITY};
use crate::error::ChannelError;
use crate::ws_client;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Serialize the payload as JSON text.
    Structured,
    /// Send a string payload verbatim.
    Raw,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Lifecycle and data events delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Frame(Frame),
    Closed { code: Option<u16> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelDiagnostic {
    DecodeFailed { error: String },
    BinaryFrameIgnored { len: usize },
    EncodeFailed { error: String },
    SendWhileNotOpen { state: ChannelState },
    OutboundDropped,
    TransportFailed { error: String },
}

pub type DiagnosticHook = Arc<dyn Fn(&ChannelDiagnostic) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ChannelOptions {
    pub diagnostics: Option<DiagnosticHook>,
}

impl ChannelOptions {
    pub fn with_diagnostics(hook: impl Fn(&ChannelDiagnostic) + Send + Sync + 'static) -> Self {
        Self {
            diagnostics: Some(Arc::new(hook)),
        }
    }
}

impl fmt::Debug for ChannelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelOptions")
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

pub(crate) struct ChannelShared {
    state: watch::Sender<ChannelState>,
    last_decoded: watch::Sender<Option<Value>>,
    diagnostics: Option<DiagnosticHook>,
}

impl ChannelShared {
    fn new(options: ChannelOptions) -> Self {
        let (state, _) = watch::channel(ChannelState::Connecting);
        let (last_decoded, _) = watch::channel(None);
        Self {
            state,
            last_decoded,
            diagnostics: options.diagnostics,
        }
    }

    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Once closed the channel is inert; late events are discarded.
    pub(crate) fn apply_event(&self, event: TransportEvent) {
        if self.state() == ChannelState::Closed {
            return;
        }
        match event {
            TransportEvent::Open => {
                self.state.send_replace(ChannelState::Open);
                info!("remote channel connected");
            }
            TransportEvent::Frame(Frame::Text(text)) => {
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => {
                        self.last_decoded.send_replace(Some(value));
                    }
                    Err(error) => self.report(ChannelDiagnostic::DecodeFailed {
                        error: error.to_string(),
                    }),
                }
            }
            TransportEvent::Frame(Frame::Binary(bytes)) => {
                self.report(ChannelDiagnostic::BinaryFrameIgnored { len: bytes.len() });
            }
            TransportEvent::Closed { code } => {
                self.state.send_replace(ChannelState::Closed);
                info!(?code, "remote channel closed");
            }
        }
    }

    pub(crate) fn report(&self, diagnostic: ChannelDiagnostic) {
        if let Some(hook) = &self.diagnostics {
            hook(&diagnostic);
        }
    }
}

/// Cheap to clone; every clone observes and drives the same connection.
#[derive(Clone)]
pub struct RemoteChannel {
    shared: Arc<ChannelShared>,
    outbound: mpsc::Sender<OutboundFrame>,
}

impl RemoteChannel {
    /// Starts connecting to a `ws://` or `wss://` address in the background.
    ///
    /// Returns immediately in [`ChannelState::Connecting`]. A failed
    /// connection moves the channel to [`ChannelState::Closed`].
    pub fn connect(address: &str, options: ChannelOptions) -> Result<Self, ChannelError> {
        if !(address.starts_with("ws://") || address.starts_with("wss://")) {
            return Err(ChannelError::InvalidAddress(address.to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ChannelError::NoRuntime)?;

        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let channel = Self::with_transport(tx, options);
        runtime.spawn(ws_client::run(
            address.to_string(),
            channel.shared.clone(),
            rx,
        ));
        Ok(channel)
    }

    /// Builds a channel over an arbitrary outbound queue. Whoever owns the
    /// receiving end is the transport and reports back via [`Self::apply_event`].
    pub fn with_transport(outbound: mpsc::Sender<OutboundFrame>, options: ChannelOptions) -> Self {
        Self {
            shared: Arc::new(ChannelShared::new(options)),
            outbound,
        }
    }

    pub fn apply_event(&self, event: TransportEvent) {
        self.shared.apply_event(event);
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    pub fn last_decoded(&self) -> Option<Value> {
        self.shared.last_decoded.borrow().clone()
    }

    /// Reads the latest payload in place. The value cannot change while `f` runs.
    pub fn read_last_decoded<R>(&self, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let guard = self.shared.last_decoded.borrow();
        f(guard.as_ref())
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe_decoded(&self) -> watch::Receiver<Option<Value>> {
        self.shared.last_decoded.subscribe()
    }

    pub fn send(&self, payload: &Value, encoding: Encoding) {
        let state = self.state();
        if state != ChannelState::Open {
            warn!(?state, "remote channel is not open; outbound message dropped");
            self.shared
                .report(ChannelDiagnostic::SendWhileNotOpen { state });
            return;
        }

        let text = match (encoding, payload) {
            (Encoding::Raw, Value::String(raw)) => raw.clone(),
            _ => payload.to_string(),
        };
        self.enqueue(OutboundFrame::Text(text));
    }

    pub fn send_text(&self, text: &str) {
        self.send(&Value::String(text.to_string()), Encoding::Raw);
    }

    pub fn send_json<T: Serialize + ?Sized>(&self, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.send(&value, Encoding::Structured),
            Err(error) => self.shared.report(ChannelDiagnostic::EncodeFailed {
                error: error.to_string(),
            }),
        }
    }

    /// Requests a normal closure. Does nothing once the channel is closed.
    pub fn close(&self) {
        if self.state() == ChannelState::Closed {
            return;
        }
        self.enqueue(OutboundFrame::Close {
            code: NORMAL_CLOSURE,
        });
    }

    fn enqueue(&self, frame: OutboundFrame) {
        if let Err(error) = self.outbound.try_send(frame) {
            warn!(%error, "remote channel outbound queue rejected message");
            self.shared.report(ChannelDiagnostic::OutboundDropped);
        }
    }
}

impl fmt::Debug for RemoteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteChannel")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn stub_channel() -> (RemoteChannel, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(8);
        (RemoteChannel::with_transport(tx, ChannelOptions::default()), rx)
    }

    fn recording_channel() -> (
        RemoteChannel,
        mpsc::Receiver<OutboundFrame>,
        Arc<Mutex<Vec<ChannelDiagnostic>>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = ChannelOptions::with_diagnostics(move |diagnostic| {
            sink.lock().expect("diagnostics lock").push(diagnostic.clone());
        });
        let (tx, rx) = mpsc::channel(8);
        (RemoteChannel::with_transport(tx, options), rx, seen)
    }

    fn text(raw: &str) -> TransportEvent {
        TransportEvent::Frame(Frame::Text(raw.to_string()))
    }

    #[test]
    fn lifecycle_follows_transport_events() {
        let (channel, _rx) = stub_channel();
        assert_eq!(channel.state(), ChannelState::Connecting);

        channel.apply_event(TransportEvent::Open);
        assert_eq!(channel.state(), ChannelState::Open);

        channel.apply_event(TransportEvent::Closed { code: Some(1000) });
        assert_eq!(channel.state(), ChannelState::Closed);

        channel.apply_event(TransportEvent::Open);
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[test]
    fn text_frame_replaces_last_decoded() {
        let (channel, _rx) = stub_channel();
        assert_eq!(channel.last_decoded(), None);

        channel.apply_event(text(r#""up""#));
        assert_eq!(channel.last_decoded(), Some(json!("up")));

        channel.apply_event(text(r#"[{"direction":"left"}]"#));
        assert_eq!(channel.last_decoded(), Some(json!([{ "direction": "left" }])));
    }

    #[test]
    fn binary_and_undecodable_frames_leave_value_untouched() {
        let (channel, _rx, seen) = recording_channel();
        channel.apply_event(text(r#""up""#));

        channel.apply_event(TransportEvent::Frame(Frame::Binary(vec![1, 2, 3])));
        channel.apply_event(text("not json"));

        assert_eq!(channel.last_decoded(), Some(json!("up")));
        let seen = seen.lock().expect("diagnostics lock");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ChannelDiagnostic::BinaryFrameIgnored { len: 3 });
        assert!(matches!(seen[1], ChannelDiagnostic::DecodeFailed { .. }));
    }

    #[test]
    fn frames_after_close_are_ignored() {
        let (channel, _rx) = stub_channel();
        channel.apply_event(TransportEvent::Closed { code: None });
        channel.apply_event(text(r#""down""#));
        assert_eq!(channel.last_decoded(), None);
    }

    #[test]
    fn send_before_open_transmits_nothing() {
        let (channel, mut rx, seen) = recording_channel();

        channel.send(&json!({ "x": 1 }), Encoding::Structured);
        channel.send_text("hello");

        assert!(rx.try_recv().is_err());
        let seen = seen.lock().expect("diagnostics lock");
        assert_eq!(
            seen.as_slice(),
            &[
                ChannelDiagnostic::SendWhileNotOpen {
                    state: ChannelState::Connecting
                },
                ChannelDiagnostic::SendWhileNotOpen {
                    state: ChannelState::Connecting
                },
            ]
        );
    }

    #[test]
    fn send_after_close_transmits_nothing() {
        let (channel, mut rx) = stub_channel();
        channel.apply_event(TransportEvent::Open);
        channel.apply_event(TransportEvent::Closed { code: Some(1000) });

        channel.send(&json!("up"), Encoding::Structured);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn structured_and_raw_encodings_differ_for_strings() {
        let (channel, mut rx) = stub_channel();
        channel.apply_event(TransportEvent::Open);

        channel.send(&json!("up"), Encoding::Structured);
        channel.send(&json!("up"), Encoding::Raw);
        channel.send(&json!({ "a": [1, 2] }), Encoding::Structured);
        channel.send_text("plain text");

        let frames: Vec<OutboundFrame> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            frames,
            vec![
                OutboundFrame::Text(r#""up""#.to_string()),
                OutboundFrame::Text("up".to_string()),
                OutboundFrame::Text(r#"{"a":[1,2]}"#.to_string()),
                OutboundFrame::Text("plain text".to_string()),
            ]
        );
    }

    #[test]
    fn send_json_serializes_structs() {
        #[derive(Serialize)]
        struct Report {
            tick: u64,
        }

        let (channel, mut rx) = stub_channel();
        channel.apply_event(TransportEvent::Open);
        channel.send_json(&Report { tick: 9 });

        assert_eq!(
            rx.try_recv().expect("frame should be queued"),
            OutboundFrame::Text(r#"{"tick":9}"#.to_string())
        );
    }

    #[test]
    fn close_requests_normal_closure_until_closed() {
        let (channel, mut rx) = stub_channel();
        channel.apply_event(TransportEvent::Open);

        channel.close();
        assert_eq!(
            rx.try_recv().expect("close should be queued"),
            OutboundFrame::Close { code: 1000 }
        );

        channel.apply_event(TransportEvent::Closed { code: Some(1000) });
        channel.close();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_outbound_queue_reports_drop() {
        let (tx, _rx) = mpsc::channel(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let channel = RemoteChannel::with_transport(
            tx,
            ChannelOptions::with_diagnostics(move |diagnostic| {
                sink.lock().expect("diagnostics lock").push(diagnostic.clone());
            }),
        );
        channel.apply_event(TransportEvent::Open);

        channel.send_text("first");
        channel.send_text("second");

        let seen = seen.lock().expect("diagnostics lock");
        assert_eq!(seen.as_slice(), &[ChannelDiagnostic::OutboundDropped]);
    }

    #[test]
    fn clones_share_state_and_value() {
        let (channel, _rx) = stub_channel();
        let reader = channel.clone();
        channel.apply_event(TransportEvent::Open);
        channel.apply_event(text(r#""right""#));

        assert!(reader.is_open());
        assert_eq!(
            reader.read_last_decoded(|value| value.and_then(Value::as_str).map(str::to_string)),
            Some("right".to_string())
        );
    }

    #[test]
    fn connect_rejects_non_websocket_addresses() {
        let result = RemoteChannel::connect("http://localhost:8080", ChannelOptions::default());
        assert!(matches!(result, Err(ChannelError::InvalidAddress(_))));
    }

    #[test]
    fn connect_requires_a_runtime() {
        let result = RemoteChannel::connect("ws://127.0.0.1:9/ws", ChannelOptions::default());
        assert!(matches!(result, Err(ChannelError::NoRuntime)));
    }
}
