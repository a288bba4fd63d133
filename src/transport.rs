//! Transport boundary
//!
//! A session only needs to read and write whole text frames. The two
//! halves are separate traits so the inbound and outbound loops can own
//! them independently. WebSocket streams implement them in `handler`;
//! `memory_transport` provides an in-process pair for tests and embedding.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Receiving half of a duplex frame channel
#[async_trait]
pub trait FrameReader: Send {
    /// Wait for the next frame
    ///
    /// Remote close is reported as `TransportError::Closed`.
    async fn read_frame(&mut self) -> Result<String, TransportError>;
}

/// Sending half of a duplex frame channel
#[async_trait]
pub trait FrameWriter: Send {
    async fn write_frame(&mut self, payload: String) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// In-memory reader fed by a `MemoryPeer`
#[derive(Debug)]
pub struct MemoryReader {
    inbound: mpsc::Receiver<String>,
}

/// In-memory writer drained by a `MemoryPeer`
#[derive(Debug)]
pub struct MemoryWriter {
    outbound: Option<mpsc::Sender<String>>,
}

/// The remote end of an in-memory transport
#[derive(Debug)]
pub struct MemoryPeer {
    to_session: Option<mpsc::Sender<String>>,
    from_session: mpsc::Receiver<String>,
}

/// Create a connected in-memory transport
///
/// `capacity` bounds each direction.
pub fn memory_transport(capacity: usize) -> (MemoryReader, MemoryWriter, MemoryPeer) {
    let (to_session, inbound) = mpsc::channel(capacity);
    let (outbound, from_session) = mpsc::channel(capacity);
    (
        MemoryReader { inbound },
        MemoryWriter {
            outbound: Some(outbound),
        },
        MemoryPeer {
            to_session: Some(to_session),
            from_session,
        },
    )
}

#[async_trait]
impl FrameReader for MemoryReader {
    async fn read_frame(&mut self) -> Result<String, TransportError> {
        self.inbound.recv().await.ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl FrameWriter for MemoryWriter {
    async fn write_frame(&mut self, payload: String) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound
            .send(payload)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.outbound = None;
        Ok(())
    }
}

impl MemoryPeer {
    /// Push a frame towards the session
    pub async fn send(&self, payload: impl Into<String>) -> Result<(), TransportError> {
        let to_session = self.to_session.as_ref().ok_or(TransportError::Closed)?;
        to_session
            .send(payload.into())
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Next frame written by the session, None once it closed its side
    pub async fn recv(&mut self) -> Option<String> {
        self.from_session.recv().await
    }

    /// Hang up: the session's next read fails
    pub fn close(&mut self) {
        self.to_session = None;
    }
}
