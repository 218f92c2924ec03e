//! Websocket channel service.
//!
//! Hosts any number of named channels on one loopback listener. Peers
//! connect to `ws://<address>/<channel>`; every peer on a channel receives
//! each broadcast, and every frame a peer sends is handed to the channel's
//! single inbound handler together with the peer's client id.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::Bytes;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, OnceCell};
use tower_http::trace::TraceLayer;

use super::BridgeError;

/// Outbound frames buffered per peer before it starts lagging.
const OUTBOUND_CAPACITY: usize = 64;

/// Callback for inbound frames: `(client_id, bytes)`.
pub type InboundHandler = Arc<dyn Fn(u32, Bytes) + Send + Sync>;

/// Snapshot of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u32,
    pub name: String,
    /// Peers currently subscribed to broadcasts.
    pub peers: usize,
}

struct ChannelEntry {
    id: u32,
    name: String,
    outbound: broadcast::Sender<Bytes>,
    handler: RwLock<Option<InboundHandler>>,
}

impl ChannelEntry {
    fn new(id: u32, name: &str) -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            id,
            name: name.to_string(),
            outbound,
            handler: RwLock::new(None),
        }
    }

    fn info(&self) -> ChannelInfo {
        ChannelInfo {
            id: self.id,
            name: self.name.clone(),
            peers: self.outbound.receiver_count(),
        }
    }

    fn deliver(&self, client_id: u32, data: Bytes) {
        info!(
            "[Bridge] Received {} bytes from client {} on '{}'",
            data.len(),
            client_id,
            self.name
        );
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler(client_id, data),
            None => debug!("[Bridge] No handler on '{}'; frame dropped", self.name),
        }
    }
}

#[derive(Default)]
pub struct ChannelService {
    channels: DashMap<String, Arc<ChannelEntry>>,
    next_channel_id: AtomicU32,
    next_client_id: AtomicU32,
    address: OnceCell<SocketAddr>,
}

impl ChannelService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start listening on `bind` unless already running. Returns the bound
    /// address; later calls return the first address and ignore `bind`.
    pub async fn ensure_running(self: &Arc<Self>, bind: &str) -> Result<SocketAddr, BridgeError> {
        let address = self
            .address
            .get_or_try_init(|| async {
                let listener = TcpListener::bind(bind).await?;
                let address = listener.local_addr()?;
                let app = Router::new()
                    .route("/:channel", get(ws_handler))
                    .layer(TraceLayer::new_for_http())
                    .with_state(Arc::clone(self));

                tokio::spawn(async move {
                    if let Err(e) = axum::serve(listener, app).await {
                        error!("[Bridge] Channel service stopped: {}", e);
                    }
                });
                info!("[Bridge] Channel service active on {}", address);
                Ok::<_, BridgeError>(address)
            })
            .await?;
        Ok(*address)
    }

    pub fn is_running(&self) -> bool {
        self.address.initialized()
    }

    pub fn address(&self) -> Option<SocketAddr> {
        self.address.get().copied()
    }

    pub fn port(&self) -> Option<u16> {
        self.address().map(|a| a.port())
    }

    /// Id of the channel called `name`, creating it if needed.
    pub fn get_or_create_channel(&self, name: &str) -> u32 {
        self.entry(name).id
    }

    /// Install the inbound handler for `name`. A channel has at most one.
    pub fn set_handler(&self, name: &str, handler: InboundHandler) -> Result<(), BridgeError> {
        let entry = self.entry(name);
        let mut slot = entry.handler.write();
        if slot.is_some() {
            return Err(BridgeError::HandlerAlreadyRegistered(name.to_string()));
        }
        *slot = Some(handler);
        Ok(())
    }

    /// All channels, ordered by id.
    pub fn channel_list(&self) -> Vec<ChannelInfo> {
        let mut list: Vec<ChannelInfo> = self.channels.iter().map(|e| e.value().info()).collect();
        list.sort_by_key(|info| info.id);
        list
    }

    /// Send `data` to every peer on channel `id`. Returns the peer count.
    pub fn broadcast(&self, id: u32, data: Bytes) -> Result<usize, BridgeError> {
        let entry = self
            .channels
            .iter()
            .find(|e| e.value().id == id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| BridgeError::ChannelNotFound(format!("#{}", id)))?;

        entry
            .outbound
            .send(data)
            .map_err(|_| BridgeError::NoPeers(entry.name.clone()))
    }

    fn entry(&self, name: &str) -> Arc<ChannelEntry> {
        let entry = self.channels.entry(name.to_string()).or_insert_with(|| {
            let id = self.next_channel_id.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("[Bridge] Created channel '{}' (#{})", name, id);
            Arc::new(ChannelEntry::new(id, name))
        });
        Arc::clone(entry.value())
    }
}

// ---------------------------------------------------------------------------
// Websocket handling
// ---------------------------------------------------------------------------

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(channel): Path<String>,
    State(service): State<Arc<ChannelService>>,
) -> impl IntoResponse {
    let entry = service.entry(&channel);
    let client_id = service.next_client_id.fetch_add(1, Ordering::SeqCst) + 1;
    ws.on_upgrade(move |socket| serve_peer(socket, entry, client_id))
}

async fn serve_peer(socket: WebSocket, entry: Arc<ChannelEntry>, client_id: u32) {
    let (mut sink, mut stream) = socket.split();
    let mut outbound = entry.outbound.subscribe();
    info!("[Bridge] Client {} connected to '{}'", client_id, entry.name);

    let writer = tokio::spawn(async move {
        loop {
            match outbound.recv().await {
                Ok(data) => {
                    if sink.send(Message::Binary(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("[Bridge] Client {} lagged; {} frame(s) skipped", client_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => entry.deliver(client_id, Bytes::from(text)),
            Ok(Message::Binary(data)) => entry.deliver(client_id, Bytes::from(data)),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("[Bridge] Client {} read error: {}", client_id, e);
                break;
            }
        }
    }

    writer.abort();
    info!("[Bridge] Client {} disconnected from '{}'", client_id, entry.name);
}
