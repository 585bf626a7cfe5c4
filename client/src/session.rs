//! Room connection lifecycle: join, heartbeat, resume on staleness, leave.

use crate::rtt::RttTracker;
use crate::transport::{Transport, TransportError};
use log::{debug, error, info, warn};
use shared::{Command, RoomHandle, ServerMessage};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Transitions the coordinator has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Heartbeat went stale; the old connection is gone.
    ConnectionLost,
    /// The room session was resumed on a new connection.
    Resumed,
    /// Resuming failed; the session is disconnected for good.
    ReconnectFailed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to join room {room}: {source}")]
    Connect {
        room: String,
        #[source]
        source: TransportError,
    },
}

pub struct Session<T: Transport> {
    transport: T,
    state: SessionState,
    handle: Option<RoomHandle>,
    rtt: RttTracker,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, heartbeat_interval_ms: u64, stale_timeout_ms: u64) -> Self {
        Self {
            transport,
            state: SessionState::Disconnected,
            handle: None,
            rtt: RttTracker::new(heartbeat_interval_ms, stale_timeout_ms),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn handle(&self) -> Option<&RoomHandle> {
        self.handle.as_ref()
    }

    pub fn rtt(&self) -> Option<u64> {
        self.rtt.current_rtt()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Joins `room`. A failure is final for this attempt; nothing retries.
    pub fn connect(&mut self, room: &str, now: u64) -> Result<(), SessionError> {
        self.state = SessionState::Connecting;
        info!("Connecting to room {}...", room);

        match self.transport.connect(room) {
            Ok(handle) => {
                info!("Connected! Session {}", handle.session_id);
                self.handle = Some(handle);
                self.state = SessionState::Connected;
                self.rtt.reset(now);
                Ok(())
            }
            Err(source) => {
                error!("Failed to join room {}: {}", room, source);
                self.state = SessionState::Disconnected;
                Err(SessionError::Connect {
                    room: room.to_string(),
                    source,
                })
            }
        }
    }

    /// Heartbeat and staleness handling, run once per tick.
    ///
    /// A stale link is closed and a resume attempt is started in the
    /// background. Later updates stay `Reconnecting` until the transport
    /// reports how the attempt ended.
    pub fn update(&mut self, now: u64) -> Option<SessionEvent> {
        match self.state {
            SessionState::Connected => {
                if self.rtt.is_stale(now) {
                    warn!(
                        "No pong for {}ms, reconnecting",
                        now.saturating_sub(self.rtt.last_pong_at())
                    );
                    self.transport.close();
                    if let Some(previous) = &self.handle {
                        self.transport.begin_reconnect(previous);
                    }
                    self.state = SessionState::Reconnecting;
                    return Some(SessionEvent::ConnectionLost);
                }

                if self.rtt.ping_due(now) {
                    self.send(&Command::Ping { timestamp: now });
                    self.rtt.mark_ping_sent(now);
                }
                None
            }
            SessionState::Reconnecting => {
                let outcome = self.transport.poll_reconnect()?;
                Some(self.finish_resume(outcome, now))
            }
            SessionState::Disconnected | SessionState::Connecting => None,
        }
    }

    fn finish_resume(
        &mut self,
        outcome: Result<RoomHandle, TransportError>,
        now: u64,
    ) -> SessionEvent {
        match outcome {
            Ok(handle) => {
                info!(
                    "Reconnected to room {} as session {}",
                    handle.room_id, handle.session_id
                );
                self.handle = Some(handle);
                self.state = SessionState::Connected;
                self.rtt.reset(now);
                SessionEvent::Resumed
            }
            Err(e) => {
                error!("Cannot reconnect: {}", e);
                self.handle = None;
                self.state = SessionState::Disconnected;
                SessionEvent::ReconnectFailed
            }
        }
    }

    /// Drains everything that arrived since the last tick.
    ///
    /// Heartbeat traffic is consumed here; everything else is handed back in
    /// arrival order.
    pub fn drain_inbound(&mut self, now: u64) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        if !self.is_connected() {
            return messages;
        }

        while let Some(message) = self.transport.poll() {
            match message {
                ServerMessage::Ping { timestamp } => {
                    self.send(&Command::Pong {
                        echoed_timestamp: timestamp,
                    });
                }
                ServerMessage::Pong { timestamp } => {
                    let rtt = self.rtt.record_pong(timestamp, now);
                    debug!("RTT {}ms", rtt);
                }
                other => messages.push(other),
            }
        }
        messages
    }

    /// Fire-and-forget send. Returns whether the transport accepted it.
    pub fn send(&mut self, command: &Command) -> bool {
        if !self.is_connected() {
            debug!("Dropping {} while {:?}", command.name(), self.state);
            return false;
        }

        match self.transport.send(command) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send {}: {}", command.name(), e);
                false
            }
        }
    }

    /// Explicit disconnect. Idempotent.
    pub fn leave(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        info!("Leaving room");
        self.transport.close();
        self.handle = None;
        self.state = SessionState::Disconnected;
    }
}
