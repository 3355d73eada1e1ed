//! Server network layer handling WebSocket sessions and the event loop

use crate::client_manager::{ClientId, Outbound};
use crate::config::Config;
use crate::session::Arcade;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Messages sent from connection tasks to the event loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        sender: mpsc::UnboundedSender<Outbound>,
        reply: oneshot::Sender<ClientId>,
    },
    Frame {
        client_id: ClientId,
        data: Vec<u8>,
    },
    Pong {
        client_id: ClientId,
    },
    Disconnected {
        client_id: ClientId,
    },
    Shutdown,
}

/// Cloneable handle for stopping a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Owns the listening socket and the authoritative game state
pub struct Server {
    listener: TcpListener,
    arcade: Arcade,
    config: Config,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(config: Config) -> Result<Self, BoxError> {
        let arcade = Arcade::new(&config);
        Self::with_arcade(config, arcade).await
    }

    /// Binds with a prepared game, e.g. one with a known set of targets
    pub async fn with_arcade(config: Config, arcade: Arcade) -> Result<Self, BoxError> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            arcade,
            config,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    pub fn arcade_mut(&mut self) -> &mut Arcade {
        &mut self.arcade
    }

    /// Main server loop. All game state is touched only from here.
    pub async fn run(self) -> Result<(), BoxError> {
        let Server {
            listener,
            mut arcade,
            config,
            server_tx,
            mut server_rx,
        } = self;

        let acceptor = spawn_acceptor(listener, server_tx);

        let mut liveness_timer = interval(config.liveness_interval().max(MIN_TIMER_PERIOD));
        liveness_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut spawn_timer = interval(config.spawn_interval().max(MIN_TIMER_PERIOD));
        spawn_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first ticks since they fire immediately
        liveness_timer.tick().await;
        spawn_timer.tick().await;

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Connected { sender, reply }) => {
                            let client_id = arcade.connect(sender);
                            if reply.send(client_id).is_err() {
                                warn!("Client {} went away during registration", client_id);
                                arcade.disconnect(client_id);
                            }
                        }
                        Some(ServerMessage::Frame { client_id, data }) => {
                            arcade.handle_frame(client_id, &data);
                        }
                        Some(ServerMessage::Pong { client_id }) => {
                            arcade.pong(client_id);
                        }
                        Some(ServerMessage::Disconnected { client_id }) => {
                            arcade.disconnect(client_id);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = liveness_timer.tick() => {
                    let evicted = arcade.liveness_tick(Instant::now());
                    if !evicted.is_empty() {
                        debug!("Liveness sweep evicted {:?}", evicted);
                    }
                },

                _ = spawn_timer.tick() => {
                    arcade.spawn_tick();
                },
            }
        }

        // Dropping the acceptor task releases the listening socket
        acceptor.abort();
        let _ = acceptor.await;

        Ok(())
    }
}

/// Spawns task that accepts TCP connections and upgrades them
fn spawn_acceptor(
    listener: TcpListener,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(stream, addr, server_tx.clone()));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }

            if server_tx.is_closed() {
                break;
            }
        }
    })
}

/// Reader side of one session. Forwards inbound traffic to the event loop
/// until either side goes away.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let (write, mut read) = ws_stream.split();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = oneshot::channel();

    if server_tx
        .send(ServerMessage::Connected {
            sender: out_tx,
            reply: reply_tx,
        })
        .is_err()
    {
        error!("Event loop gone, dropping connection from {}", addr);
        return;
    }

    let client_id = match reply_rx.await {
        Ok(id) => id,
        Err(_) => return,
    };
    debug!("Client {} is {}", client_id, addr);

    let mut writer = tokio::spawn(write_outbound(write, out_rx));

    loop {
        tokio::select! {
            message = read.next() => {
                let forwarded = match message {
                    Some(Ok(Message::Binary(data))) => {
                        server_tx.send(ServerMessage::Frame { client_id, data })
                    }
                    Some(Ok(Message::Pong(_))) => {
                        server_tx.send(ServerMessage::Pong { client_id })
                    }
                    Some(Ok(Message::Text(_))) => {
                        warn!("Client {} sent a text frame, ignoring", client_id);
                        Ok(())
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered by tungstenite itself
                    Some(Ok(_)) => Ok(()),
                    Some(Err(e)) => {
                        debug!("Read error from client {}: {}", client_id, e);
                        break;
                    }
                };

                if forwarded.is_err() {
                    error!("Failed to forward message from client {}", client_id);
                    break;
                }
            },

            _ = &mut writer => {
                debug!("Transport for client {} closed by server", client_id);
                break;
            },
        }
    }

    writer.abort();
    if server_tx
        .send(ServerMessage::Disconnected { client_id })
        .is_err()
    {
        debug!("Event loop gone before client {} disconnected", client_id);
    }
}

/// Writer side of one session. Ends on `Terminate`, on a send error, or when
/// the registry drops the session's sender.
async fn write_outbound(
    mut write: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(outbound) = out_rx.recv().await {
        let result = match outbound {
            Outbound::Frame(bytes) => write.send(Message::Binary(bytes)).await,
            Outbound::Ping => write.send(Message::Ping(Vec::new())).await,
            Outbound::Terminate => break,
        };

        if let Err(e) = result {
            debug!("Failed to write to socket: {}", e);
            break;
        }
    }
}
