//! Room registry.
//!
//! One task owns the room membership map. Every other task talks to it through
//! [`HubHandle`], which pushes commands onto a single FIFO mailbox, so register,
//! unregister and broadcast are applied in exactly the order they were submitted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{Message, OperationKind, RoomUser};

/// Serialized frame as queued for a session's writer.
pub type Frame = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Immutable identity of a session, readable from any task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub room_id: String,
    pub user_id: String,
}

impl SessionInfo {
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        SessionInfo {
            id: SessionId::new(),
            room_id: room_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// A session as the hub sees it.
///
/// `outbound` is the only strong sender of the session's queue. Dropping the
/// member closes the queue, which ends the session's writer.
#[derive(Debug)]
pub struct Member {
    pub info: SessionInfo,
    outbound: mpsc::Sender<Frame>,
}

impl Member {
    pub fn new(info: SessionInfo, outbound: mpsc::Sender<Frame>) -> Self {
        Member { info, outbound }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    pub rooms: usize,
    pub sessions: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub control loop is not running")]
    Closed,
}

enum HubCommand {
    Register(Member),
    Unregister(SessionInfo),
    Broadcast {
        message: Message,
        room_id: String,
        exclude: Option<SessionId>,
    },
    RoomMembers {
        room_id: String,
        reply: oneshot::Sender<Vec<RoomUser>>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

type Room = HashMap<SessionId, Member>;

pub struct Hub {
    rooms: HashMap<String, Room>,
    commands: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Start the control loop and return a handle to it.
    ///
    /// The loop runs until every handle has been dropped.
    pub fn spawn(capacity: usize) -> HubHandle {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let hub = Hub {
            rooms: HashMap::new(),
            commands: rx,
        };
        tokio::spawn(hub.run());
        HubHandle { tx }
    }

    async fn run(mut self) {
        info!("Hub control loop started");
        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register(member) => self.register(member),
                HubCommand::Unregister(info) => self.unregister(&info),
                HubCommand::Broadcast { message, room_id, exclude } => {
                    if let Some(frame) = encode(&message) {
                        self.fan_out(&room_id, frame, exclude);
                    }
                }
                HubCommand::RoomMembers { room_id, reply } => {
                    let _ = reply.send(self.room_members(&room_id));
                }
                HubCommand::Stats { reply } => {
                    let _ = reply.send(HubStats {
                        rooms: self.rooms.len(),
                        sessions: self.rooms.values().map(|r| r.len()).sum(),
                    });
                }
            }
        }
        info!("Hub control loop stopped");
    }

    fn register(&mut self, member: Member) {
        let info = member.info.clone();
        self.rooms
            .entry(info.room_id.clone())
            .or_default()
            .insert(info.id, member);
        info!("Client {} (user: {}) joined room {}", info.id, info.user_id, info.room_id);

        let joined = Message::presence(OperationKind::UserJoin, &info.user_id, &info.room_id);
        if let Some(frame) = encode(&joined) {
            self.fan_out(&info.room_id, frame, Some(info.id));
        }
    }

    fn unregister(&mut self, info: &SessionInfo) {
        let Some(room) = self.rooms.get_mut(&info.room_id) else {
            return;
        };
        // Dropping the member closes its outbound queue.
        if room.remove(&info.id).is_none() {
            return;
        }
        info!("Client {} (user: {}) left room {}", info.id, info.user_id, info.room_id);

        if room.is_empty() {
            self.rooms.remove(&info.room_id);
            info!("Room {} is empty and removed", info.room_id);
            return;
        }

        let left = Message::presence(OperationKind::UserLeave, &info.user_id, &info.room_id);
        if let Some(frame) = encode(&left) {
            self.fan_out(&info.room_id, frame, None);
        }
    }

    /// Offer `frame` to every member of the room except `exclude`, never waiting.
    ///
    /// Members whose queue is full or already closed are evicted, and the rest
    /// of the room is told they left, which may evict further members in turn.
    fn fan_out(&mut self, room_id: &str, frame: Frame, exclude: Option<SessionId>) {
        let mut pending = vec![(frame, exclude)];

        while let Some((frame, exclude)) = pending.pop() {
            let Some(room) = self.rooms.get_mut(room_id) else {
                return;
            };

            let mut evicted = Vec::new();
            room.retain(|id, member| {
                if Some(*id) == exclude {
                    return true;
                }
                match member.outbound.try_send(frame.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            "Client {} (user: {}) is not keeping up, evicting from room {}",
                            id, member.info.user_id, room_id
                        );
                        evicted.push(member.info.clone());
                        false
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Client {} outbound queue already closed, removing from room {}", id, room_id);
                        evicted.push(member.info.clone());
                        false
                    }
                }
            });

            if room.is_empty() {
                self.rooms.remove(room_id);
                info!("Room {} is empty and removed", room_id);
                return;
            }

            for info in evicted {
                let left = Message::presence(OperationKind::UserLeave, &info.user_id, &info.room_id);
                if let Some(frame) = encode(&left) {
                    pending.push((frame, None));
                }
            }
        }
    }

    fn room_members(&self, room_id: &str) -> Vec<RoomUser> {
        self.rooms
            .get(room_id)
            .map(|room| {
                room.values()
                    .map(|m| RoomUser {
                        user_id: m.info.user_id.clone(),
                        client_id: m.info.id.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn encode(message: &Message) -> Option<Frame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Frame::from(json)),
        Err(e) => {
            error!("Failed to serialize message {}: {}", message.meta.op_id, e);
            None
        }
    }
}

/// Cloneable entry point to the hub control loop.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Admit a session into its room. Other members receive `user_join`.
    pub async fn register(&self, member: Member) {
        let id = member.info.id;
        if self.tx.send(HubCommand::Register(member)).await.is_err() {
            error!("Hub is gone, cannot register client {}", id);
        }
    }

    /// Remove a session from its room. A session that is no longer a member is ignored.
    pub async fn unregister(&self, info: &SessionInfo) {
        if self.tx.send(HubCommand::Unregister(info.clone())).await.is_err() {
            error!("Hub is gone, cannot unregister client {}", info.id);
        }
    }

    /// Deliver `message` to every member of `room_id` except `exclude`.
    pub async fn broadcast(&self, message: Message, room_id: &str, exclude: Option<SessionId>) {
        let command = HubCommand::Broadcast {
            message,
            room_id: room_id.to_string(),
            exclude,
        };
        if self.tx.send(command).await.is_err() {
            error!("Hub is gone, dropping broadcast for room {}", room_id);
        }
    }

    /// Snapshot of a room's members, taken inside the control loop.
    pub async fn room_members(&self, room_id: &str) -> Result<Vec<RoomUser>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubCommand::RoomMembers { room_id: room_id.to_string(), reply })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubCommand::Stats { reply })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }
}
