//! WebSocket connection handler
//!
//! Upgrades a TCP connection at `/api/ws/register/<name>`, adapts the
//! WebSocket stream to the frame transport traits and hands it to a
//! `Session`.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info};

use crate::error::{AppError, TransportError};
use crate::server::BrokerHandle;
use crate::session::Session;
use crate::transport::{FrameReader, FrameWriter};

/// Path prefix of the registration endpoint
pub const REGISTER_PATH: &str = "/api/ws/register/";

/// Receiving half of a WebSocket
pub struct WsReader<S>(SplitStream<WebSocketStream<S>>);

/// Sending half of a WebSocket
pub struct WsWriter<S>(SplitSink<WebSocketStream<S>, Message>);

#[async_trait]
impl<S> FrameReader for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_frame(&mut self) -> Result<String, TransportError> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                // Non-UTF-8 payloads fail to decode later and get skipped
                Some(Ok(Message::Binary(data))) => {
                    return Ok(String::from_utf8_lossy(&data).into_owned())
                }
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                // Pong is handled automatically by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl<S> FrameWriter for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_frame(&mut self, payload: String) -> Result<(), TransportError> {
        self.0.send(Message::Text(payload.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.0.close().await?;
        Ok(())
    }
}

/// Display name requested by an upgrade path
///
/// The name is percent-decoded and trimmed; empty names and nested paths
/// are refused.
pub fn register_name(path: &str) -> Option<String> {
    let raw = path.strip_prefix(REGISTER_PATH)?;
    if raw.contains('/') {
        return None;
    }
    let decoded = urlencoding::decode(raw).ok()?;
    let name = decoded.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers the session and waits until
/// it is torn down.
pub async fn handle_connection(stream: TcpStream, broker: BrokerHandle) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let mut requested: Option<String> = None;
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        match register_name(req.uri().path()) {
            Some(name) => {
                requested = Some(name);
                Ok(resp)
            }
            None => {
                let mut rejection = ErrorResponse::new(Some(format!(
                    "expected {}<name>",
                    REGISTER_PATH
                )));
                *rejection.status_mut() = StatusCode::NOT_FOUND;
                Err(rejection)
            }
        }
    };

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, callback).await?;
    let Some(name) = requested else {
        return Err(AppError::Handshake(peer_addr));
    };

    let (ws_sender, ws_receiver) = ws_stream.split();
    let session = Session::start(broker, name, WsReader(ws_receiver), WsWriter(ws_sender)).await?;
    info!("Client {} ('{}') connected from {}", session.id, session.name, peer_addr);

    session.wait().await;
    Ok(())
}
