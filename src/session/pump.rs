//! Read and write duties of a session.
//!
//! Both pumps are generic over the socket halves so they can be driven by
//! anything that looks like a WebSocket stream or sink.

use std::fmt;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::Message as WsMessage;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout, timeout_at};
use tracing::{debug, trace};

use crate::broker::{HubHandle, SessionId};
use crate::session::{Disconnect, Session, SessionLimits};

/// Drains inbound frames into `Broadcast(session.topic, frame)` until the
/// socket fails, the peer goes quiet for `pong_wait`, or `writer_done`
/// resolves.
pub async fn read_pump<R, D>(
    mut stream: R,
    session: &Session,
    hub: &HubHandle,
    limits: &SessionLimits,
    mut writer_done: D,
) -> Disconnect
where
    R: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
    D: Future + Unpin,
{
    let mut deadline = Instant::now() + limits.pong_wait;

    loop {
        let next = tokio::select! {
            next = timeout_at(deadline, stream.next()) => next,
            _ = &mut writer_done => return Disconnect::WriterClosed,
        };

        let frame = match next {
            Err(_) => return Disconnect::Timeout,
            Ok(None) => return Disconnect::StreamEnded,
            Ok(Some(Err(e))) => return Disconnect::Transport(e.to_string()),
            Ok(Some(Ok(frame))) => frame,
        };
        deadline = Instant::now() + limits.pong_wait;

        match frame {
            WsMessage::Text(_) | WsMessage::Binary(_) => {
                let len = payload_len(&frame);
                if len > limits.max_frame_size {
                    return Disconnect::FrameTooLarge(len);
                }
                trace!("{} published {len} bytes", session.id());
                if hub.broadcast(session.topic(), frame).await.is_err() {
                    return Disconnect::HubClosed;
                }
            }
            WsMessage::Pong(_) => trace!("{} pong", session.id()),
            // the websocket layer answers pings on its own
            WsMessage::Ping(_) => {}
            WsMessage::Close(_) => return Disconnect::PeerClosed,
        }
    }
}

/// Writes queued frames and periodic pings until the queue closes or a
/// write fails. The sink is always closed on the way out.
pub async fn write_pump<W>(
    mut sink: W,
    mut queue: mpsc::Receiver<WsMessage>,
    limits: &SessionLimits,
    id: &SessionId,
) -> Disconnect
where
    W: Sink<WsMessage> + Unpin,
    W::Error: fmt::Display,
{
    let period = limits.ping_period();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            item = queue.recv() => match item {
                Some(message) => {
                    if let Err(reason) = write(&mut sink, message, limits.write_wait).await {
                        break reason;
                    }
                }
                None => {
                    let _ = write(&mut sink, WsMessage::Close(None), limits.write_wait).await;
                    break Disconnect::QueueClosed;
                }
            },
            _ = ticker.tick() => {
                trace!("{id} ping");
                if let Err(reason) = write(&mut sink, WsMessage::Ping(Bytes::new()), limits.write_wait).await {
                    break reason;
                }
            }
        }
    };

    debug!("{id} write duty stopping: {reason}");
    let _ = timeout(limits.write_wait, sink.close()).await;
    reason
}

async fn write<W>(sink: &mut W, message: WsMessage, wait: Duration) -> Result<(), Disconnect>
where
    W: Sink<WsMessage> + Unpin,
    W::Error: fmt::Display,
{
    match timeout(wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Disconnect::Transport(e.to_string())),
        Err(_) => Err(Disconnect::WriteTimeout),
    }
}

fn payload_len(frame: &WsMessage) -> usize {
    match frame {
        WsMessage::Text(text) => text.as_str().len(),
        WsMessage::Binary(data) => data.len(),
        _ => 0,
    }
}
