//! One connected client.
//!
//! A session runs two tasks over its WebSocket: the reader decodes operations,
//! persists them, asks the hub to fan them out and acknowledges them; the
//! writer drains the outbound queue to the socket. The queue is the only thing
//! the two share.

use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::models::{Ack, Message};
use crate::ws::hub::{Frame, HubHandle, Member, SessionInfo};
use crate::ws::msg_handler::MessageHandler;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub queue_capacity: usize,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub write_wait: Duration,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        SessionSettings {
            queue_capacity: config.session_queue_capacity.max(1),
            pong_wait: config.pong_wait(),
            ping_period: config.ping_period(),
            write_wait: config.write_wait(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
    #[error("write timed out")]
    Timeout,
}

/// Drive a session until its connection ends or the hub closes its queue.
///
/// The session is always unregistered on exit, whichever side stopped first.
pub async fn run_session(
    socket: WebSocket,
    info: SessionInfo,
    hub: HubHandle,
    handler: MessageHandler,
    settings: SessionSettings,
) {
    let (tx, rx) = mpsc::channel::<Frame>(settings.queue_capacity);
    // The hub holds the only strong sender; acknowledgments go through a weak one
    // so that the hub alone decides when the queue closes.
    let acks = tx.downgrade();
    hub.register(Member::new(info.clone(), tx)).await;

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, rx, info.clone(), settings.clone()));

    let reader_finished = tokio::select! {
        _ = read_loop(stream, &info, &hub, &handler, acks, settings.pong_wait) => true,
        _ = &mut writer => false,
    };

    hub.unregister(&info).await;

    if reader_finished && timeout(settings.write_wait, &mut writer).await.is_err() {
        warn!("Client {} writer did not stop in time, aborting", info.id);
        writer.abort();
    }

    info!("Client {} (user: {}) disconnected from room {}", info.id, info.user_id, info.room_id);
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    info: &SessionInfo,
    hub: &HubHandle,
    handler: &MessageHandler,
    acks: mpsc::WeakSender<Frame>,
    pong_wait: Duration,
) {
    loop {
        let frame = match timeout(pong_wait, stream.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                warn!("Client {} receive error: {}", info.id, e);
                return;
            }
            Ok(None) => {
                debug!("Client {} stream ended", info.id);
                return;
            }
            Err(_) => {
                warn!("Client {} sent nothing for {:?}, closing", info.id, pong_wait);
                return;
            }
        };

        let decoded = match frame {
            WsMessage::Text(text) => decode_frame(text.as_bytes(), info),
            WsMessage::Binary(data) => decode_frame(&data, info),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            WsMessage::Close(reason) => {
                debug!("Client {} closed the connection: {:?}", info.id, reason);
                return;
            }
        };
        let Some(mut msg) = decoded else {
            continue;
        };

        if msg.meta.document_id.is_empty() {
            msg.meta.document_id = info.room_id.clone();
        }
        if msg.meta.user_id.is_empty() {
            msg.meta.user_id = info.user_id.clone();
        }

        let result = if msg.is_persisted() {
            handler.handle(&mut msg).await
        } else {
            Ok(())
        };
        let ack = Ack::for_result(&msg.meta.op_id, &result);

        hub.broadcast(msg, &info.room_id, Some(info.id)).await;

        let ack_frame = match serde_json::to_string(&ack) {
            Ok(json) => Frame::from(json),
            Err(e) => {
                error!("Failed to serialize ack for {}: {}", ack.op_id, e);
                continue;
            }
        };
        // No strong sender left means the hub has closed this session's queue.
        let Some(outbound) = acks.upgrade() else {
            debug!("Client {} queue closed by hub", info.id);
            return;
        };
        if outbound.send(ack_frame).await.is_err() {
            debug!("Client {} writer is gone", info.id);
            return;
        }
    }
}

fn decode_frame(bytes: &[u8], info: &SessionInfo) -> Option<Message> {
    match serde_json::from_slice::<Message>(bytes) {
        Ok(msg) => {
            debug!("Client {} sent {} (op {})", info.id, msg.meta.kind, msg.meta.op_id);
            Some(msg)
        }
        Err(e) => {
            warn!("Client {} sent a malformed message: {}", info.id, e);
            None
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Frame>,
    info: SessionInfo,
    settings: SessionSettings,
) {
    let mut keepalive = interval_at(Instant::now() + settings.ping_period, settings.ping_period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    debug!("Client {} outbound queue closed", info.id);
                    let _ = timeout(settings.write_wait, sink.send(WsMessage::Close(None))).await;
                    return;
                };
                if let Err(e) = flush(&mut sink, &mut rx, frame, settings.write_wait).await {
                    warn!("Client {} write failed: {}", info.id, e);
                    return;
                }
            }
            // Pings go out on schedule even under traffic; the peer's pong is
            // what keeps its read deadline alive.
            _ = keepalive.tick() => {
                let ping = timeout(settings.write_wait, sink.send(WsMessage::Ping(Vec::new()))).await;
                if !matches!(ping, Ok(Ok(()))) {
                    warn!("Client {} keepalive ping failed", info.id);
                    return;
                }
            }
        }
    }
}

/// Write `first` plus whatever is already queued behind it, then flush once.
async fn flush(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    rx: &mut mpsc::Receiver<Frame>,
    first: Frame,
    write_wait: Duration,
) -> Result<(), WriteError> {
    let write = async {
        sink.feed(WsMessage::Text(first.to_string())).await?;
        for _ in 0..rx.len() {
            match rx.try_recv() {
                Ok(frame) => sink.feed(WsMessage::Text(frame.to_string())).await?,
                Err(_) => break,
            }
        }
        sink.flush().await?;
        Ok::<(), WriteError>(())
    };
    timeout(write_wait, write).await.map_err(|_| WriteError::Timeout)?
}
