//! UDP transport: one bincode-encoded `Packet` per datagram.
//!
//! The transport owns a small tokio runtime. A receiver task decodes
//! datagrams into the inbound queue and a sender task drains the outbound
//! queue, so the synchronous game tick only ever touches channels. Resume
//! handshakes and the leave packet also run as tasks on that runtime.

use crate::transport::{Transport, TransportError};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Command, Packet, RoomHandle, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const RECV_BUFFER: usize = 64 * 1024;

struct Link {
    socket: Arc<UdpSocket>,
    outbound: mpsc::UnboundedSender<Packet>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    tasks: Vec<JoinHandle<()>>,
}

type Opened = Result<(UdpSocket, RoomHandle), TransportError>;

/// A rejoin handshake running on the runtime.
struct PendingRejoin {
    outcome: oneshot::Receiver<Opened>,
    task: JoinHandle<()>,
}

pub struct UdpTransport {
    runtime: Runtime,
    server_addr: SocketAddr,
    fake_ping_ms: u64,
    handshake_timeout: Duration,
    link: Option<Link>,
    pending: Option<PendingRejoin>,
}

impl UdpTransport {
    pub fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        handshake_timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("net")
            .enable_all()
            .build()?;
        let server_addr = server_addr.parse()?;

        Ok(UdpTransport {
            runtime,
            server_addr,
            fake_ping_ms,
            handshake_timeout,
            link: None,
            pending: None,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Blocking join used for the player-initiated connect.
    fn open(&mut self, hello: Packet) -> Result<RoomHandle, TransportError> {
        let opened = self.runtime.block_on(join(
            self.server_addr,
            hello,
            self.handshake_timeout,
        ));
        self.attach(opened)
    }

    fn attach(&mut self, opened: Opened) -> Result<RoomHandle, TransportError> {
        let (socket, handle) = opened?;
        info!(
            "Joined room {} as session {}",
            handle.room_id, handle.session_id
        );
        self.link = Some(self.spawn_link(Arc::new(socket)));
        Ok(handle)
    }

    fn spawn_link(&self, socket: Arc<UdpSocket>) -> Link {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let receiver = self.runtime.spawn(run_receiver(
            Arc::clone(&socket),
            inbound_tx,
            self.fake_ping_ms,
        ));
        let sender = self.runtime.spawn(run_sender(
            Arc::clone(&socket),
            self.server_addr,
            outbound_rx,
            self.fake_ping_ms,
        ));

        Link {
            socket,
            outbound: outbound_tx,
            inbound: inbound_rx,
            tasks: vec![receiver, sender],
        }
    }
}

/// Binds a fresh socket and performs the join handshake on it.
async fn join(server_addr: SocketAddr, hello: Packet, wait: Duration) -> Opened {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let handle = handshake(&socket, server_addr, &hello, wait).await?;
    Ok((socket, handle))
}

async fn handshake(
    socket: &UdpSocket,
    server_addr: SocketAddr,
    hello: &Packet,
    wait: Duration,
) -> Result<RoomHandle, TransportError> {
    let data = serialize(hello)?;
    socket.send_to(&data, server_addr).await?;

    let deadline = Instant::now() + wait;
    let mut buffer = vec![0u8; RECV_BUFFER];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let (len, from) = match timeout(remaining, socket.recv_from(&mut buffer)).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::Timeout(wait)),
        };
        if from != server_addr {
            continue;
        }

        match deserialize::<Packet>(&buffer[..len]) {
            Ok(Packet::Joined {
                room_id,
                session_id,
            }) => return Ok(RoomHandle { room_id, session_id }),
            Ok(Packet::Rejected { reason }) => return Err(TransportError::Rejected(reason)),
            Ok(other) => debug!("Ignoring {:?} during handshake", other),
            Err(e) => warn!("Failed to deserialize handshake reply: {}", e),
        }
    }
}

async fn send_leave(socket: Arc<UdpSocket>, server_addr: SocketAddr) {
    let data = match serialize(&Packet::Leave) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to serialize leave: {}", e);
            return;
        }
    };
    if let Err(e) = socket.send_to(&data, server_addr).await {
        warn!("Failed to send leave: {}", e);
    }
}

async fn run_receiver(
    socket: Arc<UdpSocket>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
    fake_ping_ms: u64,
) {
    let mut buffer = vec![0u8; RECV_BUFFER];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, _)) => {
                if fake_ping_ms > 0 {
                    sleep(Duration::from_millis(fake_ping_ms / 2)).await;
                }

                match deserialize::<Packet>(&buffer[..len]) {
                    Ok(Packet::Server(message)) => {
                        if inbound.send(message).is_err() {
                            break;
                        }
                    }
                    Ok(other) => debug!("Unexpected packet from room: {:?}", other),
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            }
            Err(e) => {
                error!("Error receiving packet: {}", e);
                sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn run_sender(
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    mut outbound: mpsc::UnboundedReceiver<Packet>,
    fake_ping_ms: u64,
) {
    while let Some(packet) = outbound.recv().await {
        if fake_ping_ms > 0 {
            sleep(Duration::from_millis(fake_ping_ms / 2)).await;
        }

        let data = match serialize(&packet) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize packet: {}", e);
                continue;
            }
        };
        if let Err(e) = socket.send_to(&data, server_addr).await {
            error!("Failed to send packet to {}: {}", server_addr, e);
        }
    }
}

impl Transport for UdpTransport {
    fn connect(&mut self, room: &str) -> Result<RoomHandle, TransportError> {
        self.close();
        self.open(Packet::Join {
            room: room.to_string(),
        })
    }

    fn begin_reconnect(&mut self, previous: &RoomHandle) {
        self.close();
        let hello = Packet::Rejoin {
            room_id: previous.room_id.clone(),
            session_id: previous.session_id.clone(),
        };

        let server_addr = self.server_addr;
        let wait = self.handshake_timeout;
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let task = self.runtime.spawn(async move {
            let _ = outcome_tx.send(join(server_addr, hello, wait).await);
        });
        self.pending = Some(PendingRejoin {
            outcome: outcome_rx,
            task,
        });
        debug!("Rejoin of session {} started", previous.session_id);
    }

    fn poll_reconnect(&mut self) -> Option<Result<RoomHandle, TransportError>> {
        let Some(pending) = self.pending.as_mut() else {
            return Some(Err(TransportError::NotConnected));
        };
        let opened = match pending.outcome.try_recv() {
            Ok(opened) => opened,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(TransportError::Closed),
        };
        self.pending = None;
        Some(self.attach(opened))
    }

    fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let link = self.link.as_ref().ok_or(TransportError::NotConnected)?;
        link.outbound
            .send(Packet::Command(command.clone()))
            .map_err(|_| TransportError::Closed)
    }

    fn poll(&mut self) -> Option<ServerMessage> {
        self.link.as_mut()?.inbound.try_recv().ok()
    }

    fn close(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
            debug!("Abandoned pending rejoin");
        }

        let Some(link) = self.link.take() else {
            return;
        };
        for task in link.tasks {
            task.abort();
        }
        self.runtime
            .spawn(send_leave(Arc::clone(&link.socket), self.server_addr));
        debug!("Link to {} closed", self.server_addr);
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.close();
    }
}
