//! The seam between the session and whatever carries bytes to the room.
//!
//! Inbound traffic is a queue the session drains at tick boundaries rather
//! than a set of callbacks, so nothing from the network can land mid-tick.

use shared::{Command, RoomHandle, ServerMessage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected to a room")]
    NotConnected,
    #[error("connection closed")]
    Closed,
    #[error("join rejected: {0}")]
    Rejected(String),
    #[error("no answer from room within {0:?}")]
    Timeout(Duration),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Transport {
    /// Joins (or creates) the named room.
    fn connect(&mut self, room: &str) -> Result<RoomHandle, TransportError>;

    /// Starts resuming a previously joined room session on a new
    /// connection. Returns at once; `poll_reconnect` reports the outcome.
    fn begin_reconnect(&mut self, previous: &RoomHandle);

    /// Outcome of the attempt started by `begin_reconnect`, or `None` while
    /// it is still in flight.
    fn poll_reconnect(&mut self) -> Option<Result<RoomHandle, TransportError>>;

    /// Queues a command for the room. Never waits for acknowledgement.
    fn send(&mut self, command: &Command) -> Result<(), TransportError>;

    /// Next inbound message, if one has arrived.
    fn poll(&mut self) -> Option<ServerMessage>;

    /// Tears the connection down. Safe to call when already closed.
    fn close(&mut self);
}

#[derive(Debug, Default)]
struct MemoryState {
    connected: bool,
    inbound: VecDeque<ServerMessage>,
    sent: Vec<Command>,
    joins: Vec<String>,
    rejoins: Vec<RoomHandle>,
    sessions: u32,
    reject_connect: Option<String>,
    reject_reconnect: Option<String>,
    hold_reconnect: bool,
    pending_rejoin: Option<RoomHandle>,
    fail_sends: bool,
}

/// In-process transport with a scriptable room on the other end.
///
/// Clones share state: keep one clone to inject server messages and inspect
/// the commands the session sent through the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues a message as if the room had sent it.
    pub fn push(&self, message: ServerMessage) {
        self.lock().inbound.push_back(message);
    }

    pub fn sent(&self) -> Vec<Command> {
        self.lock().sent.clone()
    }

    pub fn take_sent(&self) -> Vec<Command> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Commands sent so far whose wire name is `name`.
    pub fn sent_named(&self, name: &str) -> Vec<Command> {
        self.lock()
            .sent
            .iter()
            .filter(|command| command.name() == name)
            .cloned()
            .collect()
    }

    pub fn joins(&self) -> Vec<String> {
        self.lock().joins.clone()
    }

    pub fn rejoins(&self) -> Vec<RoomHandle> {
        self.lock().rejoins.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn reject_connect(&self, reason: Option<&str>) {
        self.lock().reject_connect = reason.map(str::to_string);
    }

    pub fn reject_reconnect(&self, reason: Option<&str>) {
        self.lock().reject_reconnect = reason.map(str::to_string);
    }

    /// Keeps a started reconnect in flight until released.
    pub fn hold_reconnect(&self, hold: bool) {
        self.lock().hold_reconnect = hold;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    fn open(state: &mut MemoryState, room_id: String) -> RoomHandle {
        state.sessions += 1;
        state.connected = true;
        RoomHandle {
            room_id,
            session_id: format!("session-{}", state.sessions),
        }
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, room: &str) -> Result<RoomHandle, TransportError> {
        let mut state = self.lock();
        state.joins.push(room.to_string());
        if let Some(reason) = state.reject_connect.clone() {
            return Err(TransportError::Rejected(reason));
        }
        Ok(Self::open(&mut state, room.to_string()))
    }

    fn begin_reconnect(&mut self, previous: &RoomHandle) {
        let mut state = self.lock();
        state.connected = false;
        state.inbound.clear();
        state.rejoins.push(previous.clone());
        state.pending_rejoin = Some(previous.clone());
    }

    fn poll_reconnect(&mut self) -> Option<Result<RoomHandle, TransportError>> {
        let mut state = self.lock();
        if state.hold_reconnect && state.pending_rejoin.is_some() {
            return None;
        }
        let Some(previous) = state.pending_rejoin.take() else {
            return Some(Err(TransportError::NotConnected));
        };
        if let Some(reason) = state.reject_reconnect.clone() {
            return Some(Err(TransportError::Rejected(reason)));
        }
        Some(Ok(Self::open(&mut state, previous.room_id)))
    }

    fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.fail_sends {
            return Err(TransportError::Closed);
        }
        state.sent.push(command.clone());
        Ok(())
    }

    fn poll(&mut self) -> Option<ServerMessage> {
        let mut state = self.lock();
        if !state.connected {
            return None;
        }
        state.inbound.pop_front()
    }

    /// Drops the connection along with anything still queued on it.
    fn close(&mut self) {
        let mut state = self.lock();
        state.connected = false;
        state.inbound.clear();
        state.pending_rejoin = None;
    }
}
