//! Low-level Chrome DevTools Protocol client.
//!
//! Connects to a page target's DevTools WebSocket and provides JSON-RPC
//! command/response correlation plus a stream of protocol events. The
//! event receiver is handed to the caller at connect time so a dedicated
//! observer task can own it while commands flow from the main sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::errors::BookingError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// A protocol event pushed by the browser.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// The event method name (e.g. "Network.responseReceived").
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, serde::Serialize)]
struct CdpCommand {
    id: u64,
    method: String,
    params: Value,
}

/// A response correlated back to a sent command.
#[derive(Debug, Clone)]
pub(crate) struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpResponseError>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct CdpResponseError {
    pub code: i64,
    pub message: String,
}

/// An incoming WebSocket message, discriminated by shape: responses carry
/// an `id`, events carry a `method` and no `id`.
#[derive(Debug)]
pub(crate) enum CdpMessage {
    Response(CdpResponse),
    Event(CdpEvent),
}

pub(crate) fn classify_message(json: &Value) -> Option<CdpMessage> {
    if let Some(id) = json.get("id").and_then(Value::as_u64) {
        return Some(CdpMessage::Response(CdpResponse {
            id,
            result: json.get("result").cloned(),
            error: json
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
        }));
    }
    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(CdpMessage::Event(CdpEvent { method, params }))
}

/// DevTools WebSocket client with command/response correlation.
pub struct CdpClient {
    next_id: AtomicU64,
    pending: Pending,
    writer: Arc<Mutex<WsSink>>,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CdpClient {
    /// Connect to a page target's DevTools WebSocket endpoint
    /// (`ws://localhost:{port}/devtools/page/{target_id}`).
    ///
    /// Returns the client plus the receiving end of the event stream;
    /// events arriving with nobody listening are dropped.
    pub async fn connect(
        ws_url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CdpEvent>), BookingError> {
        info!(url = ws_url, "connecting to DevTools WebSocket");

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| BookingError::Connection {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;

        let (writer, reader) = ws_stream.split();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let pending_clone = Arc::clone(&pending);
        let reader_handle = tokio::spawn(async move {
            Self::read_loop(reader, pending_clone, event_tx).await;
        });

        let client = Self {
            next_id: AtomicU64::new(1),
            pending,
            writer: Arc::new(Mutex::new(writer)),
            reader: std::sync::Mutex::new(Some(reader_handle)),
        };
        Ok((client, event_rx))
    }

    /// Send a command and wait for its response, with the default
    /// timeout.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, BookingError> {
        self.send_command_with_timeout(method, params, COMMAND_TIMEOUT)
            .await
    }

    pub async fn send_command_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, BookingError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let command = CdpCommand {
            id,
            method: method.to_string(),
            params,
        };
        let json = serde_json::to_string(&command)
            .map_err(|e| BookingError::Protocol(format!("failed to serialize command: {e}")))?;

        debug!(id, method, "sending CDP command");

        // Register the reply slot before sending to avoid a race with the
        // reader task.
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        {
            let mut writer = self.writer.lock().await;
            writer.send(Message::Text(json)).await.map_err(|e| {
                BookingError::Protocol(format!("failed to send WebSocket message: {e}"))
            })?;
        }

        let response = tokio::time::timeout(timeout, rx)
            .await
            .map_err(|_| {
                BookingError::Protocol(format!("command '{method}' timed out after {timeout:?}"))
            })?
            .map_err(|_| {
                BookingError::Protocol("response channel closed unexpectedly".to_string())
            })?;

        if let Some(err) = response.error {
            return Err(BookingError::Cdp {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Enable a protocol domain; most domains emit no events until
    /// explicitly enabled.
    pub async fn enable_domain(&self, domain: &str) -> Result<(), BookingError> {
        self.send_command(&format!("{domain}.enable"), serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Tear down the connection. Pending commands resolve with a
    /// protocol error via their dropped reply slots.
    pub async fn close(&self) {
        if let Some(handle) = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        let mut writer = self.writer.lock().await;
        let _ = writer.close().await;
    }

    async fn read_loop(
        mut reader: WsSource,
        pending: Pending,
        event_tx: mpsc::UnboundedSender<CdpEvent>,
    ) {
        while let Some(message) = reader.next().await {
            let message = match message {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "WebSocket read error, stopping reader");
                    break;
                }
            };

            let text = match message {
                Message::Text(t) => t,
                Message::Binary(b) => match String::from_utf8(b) {
                    Ok(s) => s,
                    Err(_) => continue,
                },
                Message::Close(_) => {
                    info!("WebSocket closed by remote");
                    break;
                }
                _ => continue,
            };

            let json: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "unparseable CDP message");
                    continue;
                }
            };

            match classify_message(&json) {
                Some(CdpMessage::Response(response)) => {
                    let mut pending = pending.lock().await;
                    if let Some(tx) = pending.remove(&response.id) {
                        let _ = tx.send(response);
                    } else {
                        debug!(id = response.id, "response for unknown command id");
                    }
                }
                Some(CdpMessage::Event(event)) => {
                    // Dropped if nobody is listening.
                    let _ = event_tx.send(event);
                }
                None => {}
            }
        }

        // Unblock anything still waiting on a reply.
        pending.lock().await.clear();
    }
}
