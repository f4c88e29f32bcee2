use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, PoisonError,
};

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{net::TcpStream, sync::Mutex, task::JoinHandle, time::sleep};
use tokio_tungstenite::{
    connect_async, tungstenite, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::{
    event::DeliveryBatch,
    manifest::stream::WebSocketStreamConfig,
    streams::{retry::retry_fixed, DeliveryOutcome, DeliverySink, StreamError},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(thiserror::Error, Debug)]
pub enum WebSocketError {
    #[error("Could not connect to {0}: {1}")]
    CouldNotConnect(String, tungstenite::Error),

    #[error("Could not send frame: {0}")]
    CouldNotSend(tungstenite::Error),

    #[error("Sink is closed")]
    SinkClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

struct Connection {
    state: ConnectionState,
    sink: Option<SplitSink<WsStream, Message>>,
    /// Watches the read half of the open connection for a close or an error.
    reader: Option<JoinHandle<()>>,
    /// Bumped on every successful connect so a stale reader can not close a newer connection.
    generation: u64,
}

impl Connection {
    fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
        self.sink = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

struct Shared {
    config: WebSocketStreamConfig,
    connection: Mutex<Connection>,
    reconnect_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Shared {
    async fn open(self: &Arc<Self>, connection: &mut Connection) -> Result<(), WebSocketError> {
        connection.state = ConnectionState::Connecting;

        match connect_async(&self.config.url).await {
            Ok((stream, _)) => {
                let (sink, stream) = stream.split();
                connection.generation += 1;
                connection.sink = Some(sink);
                connection.reader =
                    Some(tokio::spawn(watch_connection(Arc::clone(self), stream, connection.generation)));
                connection.state = ConnectionState::Open;
                info!("WebSocket stream connected to {}", self.config.url);
                Ok(())
            }
            Err(e) => {
                connection.mark_closed();
                Err(WebSocketError::CouldNotConnect(self.config.url.clone(), e))
            }
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let mut reconnect_task =
            self.reconnect_task.lock().unwrap_or_else(PoisonError::into_inner);
        if reconnect_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let shared = Arc::clone(self);
        *reconnect_task = Some(tokio::spawn(async move {
            let delay = shared.config.reconnect_delay();
            loop {
                sleep(delay).await;
                if shared.closed.load(Ordering::SeqCst) {
                    return;
                }

                let mut guard = shared.connection.lock().await;
                if guard.state == ConnectionState::Open {
                    return;
                }

                match shared.open(&mut guard).await {
                    Ok(()) => return,
                    Err(e) => warn!("WebSocket reconnect failed, retrying in {:?}: {}", delay, e),
                }
            }
        }));
    }

    async fn send_frame(self: &Arc<Self>, payload: &str) -> Result<(), WebSocketError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WebSocketError::SinkClosed);
        }

        let mut connection = self.connection.lock().await;
        if connection.state != ConnectionState::Open {
            self.open(&mut connection).await?;
        }

        let Some(sink) = connection.sink.as_mut() else {
            connection.mark_closed();
            return Err(WebSocketError::SinkClosed);
        };

        match sink.send(Message::Text(payload.to_string().into())).await {
            Ok(()) => Ok(()),
            Err(e) => {
                connection.mark_closed();
                drop(connection);
                self.schedule_reconnect();
                Err(WebSocketError::CouldNotSend(e))
            }
        }
    }
}

/// Reads until the server closes the connection or the socket errors, then marks the sink
/// closed and hands over to the reconnect loop.
async fn watch_connection(shared: Arc<Shared>, mut stream: SplitStream<WsStream>, generation: u64) {
    loop {
        match stream.next().await {
            Some(Ok(Message::Close(frame))) => {
                debug!("WebSocket server closed the connection: {:?}", frame);
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
            None => break,
        }
    }

    {
        let mut connection = shared.connection.lock().await;
        if connection.generation != generation || connection.state != ConnectionState::Open {
            return;
        }
        // this task, detach instead of aborting
        connection.reader = None;
        connection.mark_closed();
    }

    warn!("WebSocket stream to {} disconnected", shared.config.url);
    shared.schedule_reconnect();
}

/// Writes each batch as one text frame over a single persistent connection.
///
/// A send on a connection that is not open reconnects inline, sharing the retry budget. A
/// connection dropped by the server or lost while sending is handed to one background loop
/// that reconnects with a fixed delay until it succeeds or the sink is closed.
pub struct WebSocket {
    shared: Arc<Shared>,
}

impl WebSocket {
    pub fn new(config: &WebSocketStreamConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: config.clone(),
                connection: Mutex::new(Connection {
                    state: ConnectionState::Closed,
                    sink: None,
                    reader: None,
                    generation: 0,
                }),
                reconnect_task: std::sync::Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Creates the sink and tries to connect once. A failed first connect is not fatal: the
    /// background loop keeps trying and sends reconnect on their own.
    pub async fn connect(config: &WebSocketStreamConfig) -> Self {
        let websocket = Self::new(config);

        let result = {
            let mut connection = websocket.shared.connection.lock().await;
            websocket.shared.open(&mut connection).await
        };

        if let Err(e) = result {
            error!("WebSocket stream initial connection failed: {}", e);
            websocket.schedule_reconnect();
        }

        websocket
    }

    pub async fn state(&self) -> ConnectionState {
        self.shared.connection.lock().await.state
    }

    /// Starts the background reconnect loop unless one is already running.
    pub fn schedule_reconnect(&self) {
        self.shared.schedule_reconnect();
    }
}

#[async_trait]
impl DeliverySink for WebSocket {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn send(&self, batch: &DeliveryBatch) -> Result<DeliveryOutcome, StreamError> {
        let payload = batch.to_json()?;
        let payload = payload.as_str();
        let label = format!("WebSocket delivery of block {}", batch.block_label());
        let shared = &self.shared;

        match retry_fixed(&shared.config.retry, &label, move |_| shared.send_frame(payload)).await {
            Ok(((), attempts)) => {
                debug!("WebSocket sent block {} on attempt {}", batch.block_label(), attempts);
                Ok(DeliveryOutcome { success: true, status: None, attempts })
            }
            Err(exhausted) => {
                error!(
                    "WebSocket delivery of block {} to {} failed after {} attempts: {}",
                    batch.block_label(),
                    shared.config.url,
                    exhausted.attempts,
                    exhausted.last_error
                );
                Err(StreamError::WebSocketExhausted {
                    block: batch.block_label(),
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error.to_string(),
                })
            }
        }
    }

    async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);

        let reconnect_task =
            self.shared.reconnect_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = reconnect_task {
            task.abort();
        }

        let mut connection = self.shared.connection.lock().await;
        if let Some(reader) = connection.reader.take() {
            reader.abort();
        }
        if let Some(mut sink) = connection.sink.take() {
            if let Err(e) = sink.close().await {
                debug!("WebSocket close handshake failed: {}", e);
            }
        }
        connection.mark_closed();
    }
}
