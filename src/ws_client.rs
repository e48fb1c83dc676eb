use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::channel::{ChannelDiagnostic, ChannelShared, Frame, OutboundFrame, TransportEvent};

/// Drives one WebSocket connection for a [`crate::channel::RemoteChannel`].
///
/// Runs until the peer closes, the socket fails, or every channel handle is
/// dropped. Always finishes by reporting `Closed`.
pub(crate) async fn run(
    address: String,
    shared: Arc<ChannelShared>,
    mut outbound: mpsc::Receiver<OutboundFrame>,
) {
    let stream = match connect_async(address.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(error) => {
            warn!(%address, %error, "remote channel failed to connect");
            shared.report(ChannelDiagnostic::TransportFailed {
                error: error.to_string(),
            });
            shared.apply_event(TransportEvent::Closed { code: None });
            return;
        }
    };
    shared.apply_event(TransportEvent::Open);

    let (mut sink, mut source) = stream.split();
    let mut close_code = None;
    let mut close_sent = false;

    loop {
        tokio::select! {
            queued = outbound.recv(), if !close_sent => {
                let Some(frame) = queued else {
                    break;
                };
                let result = match frame {
                    OutboundFrame::Text(text) => sink.send(Message::text(text)).await,
                    OutboundFrame::Close { code } => {
                        close_sent = true;
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        };
                        sink.send(Message::Close(Some(frame))).await
                    }
                };
                if let Err(error) = result {
                    debug!(%error, "remote channel send failed");
                    shared.report(ChannelDiagnostic::TransportFailed {
                        error: error.to_string(),
                    });
                    break;
                }
            }
            received = source.next() => {
                match received {
                    Some(Ok(Message::Text(text))) => {
                        shared.apply_event(TransportEvent::Frame(Frame::Text(text.as_str().to_owned())));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        shared.apply_event(TransportEvent::Frame(Frame::Binary(bytes.to_vec())));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        close_code = frame.map(|frame| u16::from(frame.code));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!(%error, "remote channel receive failed");
                        shared.report(ChannelDiagnostic::TransportFailed {
                            error: error.to_string(),
                        });
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let _ = sink.close().await;
    shared.apply_event(TransportEvent::Closed { code: close_code });
}
