//! Per-connection session pumps
//!
//! Registers a client with the broker, then runs two loops:
//! - inbound: transport frames → `ServerCommand::Send`
//! - outbound: bounded client queue → transport frames
//!
//! Both loops are torn down together when either one ends.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::error::AppError;
use crate::message::{ChatMessage, ServerMessage};
use crate::server::{BrokerHandle, ServerCommand};
use crate::transport::{FrameReader, FrameWriter};
use crate::types::ClientId;

/// A registered session whose pumps are running
#[derive(Debug)]
pub struct Session {
    pub id: ClientId,
    pub name: String,
    task: JoinHandle<()>,
}

impl Session {
    /// Register `name` with the broker and start the duplex pumps
    pub async fn start<R, W>(
        broker: BrokerHandle,
        name: impl Into<String>,
        reader: R,
        writer: W,
    ) -> Result<Self, AppError>
    where
        R: FrameReader + 'static,
        W: FrameWriter + 'static,
    {
        let name = name.into();
        let id = ClientId::new();
        let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(broker.outbound_capacity());

        broker.register(Client::new(id, name.clone(), msg_tx)).await?;
        info!("Session {} started for '{}'", id, name);

        let mut read_task = tokio::spawn(inbound_loop(broker.clone(), id, name.clone(), reader));
        let mut write_task = tokio::spawn(outbound_loop(id, msg_rx, writer));

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = &mut read_task => {
                    debug!("Read task completed for {}", id);
                    // Unregistering closes the queue, which ends the writer
                    if broker.unregister(id).await.is_err() {
                        write_task.abort();
                    }
                    let _ = write_task.await;
                }
                _ = &mut write_task => {
                    debug!("Write task completed for {}", id);
                    read_task.abort();
                    let _ = read_task.await;
                    let _ = broker.unregister(id).await;
                }
            }
            info!("Session {} closed", id);
        });

        Ok(Self { id, name, task })
    }

    /// Wait until both pumps have stopped
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

/// Transport → broker
///
/// Undecodable frames are skipped; the loop ends on the first read failure.
async fn inbound_loop<R: FrameReader>(
    broker: BrokerHandle,
    id: ClientId,
    name: String,
    mut reader: R,
) {
    loop {
        let text = match reader.read_frame().await {
            Ok(text) => text,
            Err(e) => {
                debug!("Read ended for {}: {}", id, e);
                break;
            }
        };

        let message = match serde_json::from_str::<ChatMessage>(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Invalid JSON from {}: {}", id, e);
                continue;
            }
        };

        let cmd = ServerCommand::Send {
            origin_id: id,
            origin_name: name.clone(),
            message,
        };
        if broker.send_command(cmd).await.is_err() {
            debug!("Broker closed, ending read task for {}", id);
            break;
        }
    }
}

/// Client queue → transport, in FIFO order until the queue closes
async fn outbound_loop<W: FrameWriter>(
    id: ClientId,
    mut queue: mpsc::Receiver<ServerMessage>,
    mut writer: W,
) {
    while let Some(msg) = queue.recv().await {
        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize message for {}: {}", id, e);
                continue;
            }
        };
        if let Err(e) = writer.write_frame(json).await {
            debug!("Write failed for {}: {}", id, e);
            break;
        }
    }

    let _ = writer.close().await;
    debug!("Write task ended for {}", id);
}
