//! Real-time Chat Broker Library
//!
//! A WebSocket messaging backend built with tokio-tungstenite and axum,
//! using the Actor pattern for all state mutations.
//!
//! # Features
//! - Self-asserted display names, registered per connection
//! - Direct messages with sender echo
//! - Owned and ownerless rooms with subscriptions
//! - Per-user inbox previews with unread counts
//! - Join/leave notices to every connected client
//! - Best-effort delivery over bounded per-client queues
//!
//! # Architecture
//! - `ChatServer` is the router actor and the only writer of `ChatState`
//! - Each connection runs a `Session` with an inbound and an outbound pump
//! - Queries read `ChatState` under a shared lock via `BrokerHandle`
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_broker::{handle_connection, ChatServer, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let (broker, _router) = ChatServer::start(&config);
//!     let listener = TcpListener::bind(&config.ws_addr).await.unwrap();
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, broker.clone()));
//!     }
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod inbox;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod state;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::Config;
pub use error::{AppError, RoomError, TransportError};
pub use handler::handle_connection;
pub use message::{ChatMessage, ClientInfo, InboxSignal, RoomListing, ServerMessage, ThreadKind, ThreadPreview};
pub use server::{BrokerHandle, ChatServer, ServerCommand};
pub use session::Session;
pub use transport::{memory_transport, FrameReader, FrameWriter};
pub use types::{normalize_room, ClientId};
