use super::*;
use crossbeam_channel::Sender as InputSender;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

type Clients = Arc<Mutex<HashSet<String>>>;

/// Broadcasts frames to every connected client and forwards their input
/// messages to the frame loop.
pub struct WebSocketSender {
    host: String,
    port: u16,
    tx: Option<broadcast::Sender<String>>,
    runtime: Option<Runtime>,
    clients: Clients,
    input: Option<InputSender<InputMessage>>,
}

impl WebSocketSender {
    pub fn new(host: &str, port: u16) -> Self {
        WebSocketSender {
            host: host.to_string(),
            port,
            tx: None,
            runtime: None,
            clients: Arc::new(Mutex::new(HashSet::new())),
            input: None,
        }
    }

    /// Client messages that parse as `InputMessage` are pushed into `input`.
    pub fn with_input(mut self, input: InputSender<InputMessage>) -> Self {
        self.input = Some(input);
        self
    }

    /// Binds the listener and starts accepting clients on a background runtime.
    pub fn start(&mut self) -> Result<(), TransportError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        let addr = format!("{}:{}", self.host, self.port);
        let socket_addr: SocketAddr =
            addr.parse().map_err(|e| TransportError::WebSocket(format!("Invalid address: {}", e)))?;

        let listener = runtime
            .block_on(TcpListener::bind(&socket_addr))
            .map_err(|e| TransportError::WebSocket(format!("Failed to bind {}: {}", socket_addr, e)))?;
        info!("WebSocket server listening on ws://{}", socket_addr);

        let (tx, _) = broadcast::channel::<String>(16);
        self.tx = Some(tx.clone());

        let clients = self.clients.clone();
        let input = self.input.clone();

        runtime.spawn(async move {
            while let Ok((stream, addr)) = listener.accept().await {
                let peer = addr.to_string();
                let count = match clients.lock() {
                    Ok(mut set) => {
                        if !set.insert(peer.clone()) {
                            continue;
                        }
                        set.len()
                    }
                    Err(_) => break,
                };
                info!("Client connected: {}. Total clients: {}", peer, count);

                let rx = tx.subscribe();
                tokio::spawn(handle_connection(stream, rx, peer, clients.clone(), input.clone()));
            }
        });

        self.runtime = Some(runtime);
        Ok(())
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().map(|set| set.len()).unwrap_or(0)
    }
}

impl Sender for WebSocketSender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let Some(tx) = &self.tx else {
            return Err(TransportError::WebSocket("WebSocket server not started".to_string()));
        };
        let data_str =
            std::str::from_utf8(data).map_err(|e| TransportError::WebSocket(format!("Invalid UTF-8: {}", e)))?;

        // no receivers just means every client has gone
        if self.client_count() > 0 {
            let _ = tx.send(data_str.to_string());
        }
        Ok(())
    }
}

async fn handle_connection(
    raw_stream: TcpStream,
    mut rx: broadcast::Receiver<String>,
    peer: String,
    clients: Clients,
    input: Option<InputSender<InputMessage>>,
) {
    let ws_stream = match accept_async(raw_stream).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Error during WebSocket handshake with {}: {}", peer, e);
            remove_client(&peer, &clients);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let receive_peer = peer.clone();
    let receive_clients = clients.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match InputMessage::parse(&text) {
                    Ok(message) => {
                        if let Some(input) = &input {
                            if input.send(message).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => debug!("Ignoring message from {}: {}", receive_peer, e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    if !is_disconnect_error(&e) {
                        warn!("WebSocket receive error: {} - {}", receive_peer, e);
                    }
                    break;
                }
            }
        }
        remove_client(&receive_peer, &receive_clients);
    });

    while let Ok(data) = rx.recv().await {
        if !is_connected(&peer, &clients) {
            break;
        }
        if let Err(e) = ws_sender.send(Message::Text(data)).await {
            if !is_disconnect_error(&e) {
                warn!("WebSocket send error: {} - {}", peer, e);
            }
            break;
        }
    }

    remove_client(&peer, &clients);
    let _ = receive_task.await;
}

fn is_connected(peer: &str, clients: &Clients) -> bool {
    clients.lock().map(|set| set.contains(peer)).unwrap_or(false)
}

fn is_disconnect_error(e: &WsError) -> bool {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Io(io_err) => matches!(
            io_err.kind(),
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

fn remove_client(peer: &str, clients: &Clients) {
    let Ok(mut set) = clients.lock() else {
        return;
    };
    if set.remove(peer) {
        info!("Client disconnected: {}. Total clients: {}", peer, set.len());
    }
}
