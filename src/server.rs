//! ChatServer actor implementation
//!
//! The router: a single task that consumes commands one at a time and is
//! the only writer of the shared state. Query handlers read the state
//! through a `BrokerHandle`; room and inbox mutations requested by them are
//! sent to the router as commands with a reply channel.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::Client;
use crate::config::Config;
use crate::error::{AppError, RoomError};
use crate::message::{ChatMessage, ClientInfo, InboxSignal, RoomListing, ServerMessage, ThreadPreview};
use crate::state::{ChatState, SharedState};
use crate::types::{normalize_room, ClientId};

/// Reply channel for room commands
pub type RoomReply = oneshot::Sender<Result<String, RoomError>>;

/// Commands sent to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New session connected
    Register {
        client: Client,
        respond_to: oneshot::Sender<()>,
    },
    /// Session disconnected
    Unregister {
        client_id: ClientId,
    },
    /// Chat message read from a session
    Send {
        origin_id: ClientId,
        origin_name: String,
        message: ChatMessage,
    },
    /// Broker notice for every connected session
    Notify {
        content: String,
    },
    CreateRoom {
        owner: String,
        room: String,
        respond_to: RoomReply,
    },
    DeleteRoom {
        owner: String,
        room: String,
        respond_to: RoomReply,
    },
    Subscribe {
        user: String,
        room: String,
        respond_to: RoomReply,
    },
    Unsubscribe {
        user: String,
        room: String,
        respond_to: RoomReply,
    },
    MarkRead {
        user: String,
        thread_id: String,
        respond_to: oneshot::Sender<bool>,
    },
    /// Stop after everything queued before this command
    Shutdown,
}

/// The main ChatServer actor
pub struct ChatServer {
    state: SharedState,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
    /// Room used for broadcasts without a valid room name
    default_room: String,
}

impl ChatServer {
    /// Create a new ChatServer over the given state and command receiver
    pub fn new(
        state: SharedState,
        receiver: mpsc::Receiver<ServerCommand>,
        default_room: impl Into<String>,
    ) -> Self {
        Self {
            state,
            receiver,
            default_room: default_room.into(),
        }
    }

    /// Build the broker and spawn its router task
    pub fn start(config: &Config) -> (BrokerHandle, JoinHandle<()>) {
        let state = ChatState::new(&config.default_room).shared();
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_capacity);

        let server = ChatServer::new(state.clone(), cmd_rx, config.default_room.clone());
        let task = tokio::spawn(server.run());

        let handle = BrokerHandle {
            state,
            commands: cmd_tx,
            outbound_capacity: config.outbound_capacity,
        };
        (handle, task)
    }

    /// Run the ChatServer event loop
    ///
    /// Processes commands until a `Shutdown` arrives or all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            if !self.handle_command(cmd).await {
                break;
            }
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command, returning false to stop the loop
    async fn handle_command(&mut self, cmd: ServerCommand) -> bool {
        match cmd {
            ServerCommand::Register { client, respond_to } => {
                self.handle_register(client).await;
                let _ = respond_to.send(());
            }
            ServerCommand::Unregister { client_id } => {
                self.handle_unregister(client_id).await;
            }
            ServerCommand::Send {
                origin_id,
                origin_name,
                message,
            } => {
                if message.broadcast {
                    self.dispatch_broadcast(origin_id, origin_name, message).await;
                } else {
                    self.dispatch_direct(origin_id, origin_name, message).await;
                }
            }
            ServerCommand::Notify { content } => {
                self.handle_notify(content).await;
            }
            ServerCommand::CreateRoom {
                owner,
                room,
                respond_to,
            } => {
                let result = self.state.write().await.rooms.create(&owner, &room);
                debug!("Create room {:?} by {}: {:?}", room, owner, result);
                let _ = respond_to.send(result);
            }
            ServerCommand::DeleteRoom {
                owner,
                room,
                respond_to,
            } => {
                let result = self.state.write().await.delete_room(&owner, &room);
                match &result {
                    Ok(name) => info!("Room {} deleted by {}", name, owner),
                    Err(e) => debug!("Delete room {:?} by {} refused: {}", room, owner, e),
                }
                let _ = respond_to.send(result);
            }
            ServerCommand::Subscribe {
                user,
                room,
                respond_to,
            } => {
                let result = self.state.write().await.rooms.subscribe(&user, &room);
                debug!("Subscribe {} to {:?}: {:?}", user, room, result);
                let _ = respond_to.send(result);
            }
            ServerCommand::Unsubscribe {
                user,
                room,
                respond_to,
            } => {
                let result = self.state.write().await.unsubscribe(&user, &room);
                debug!("Unsubscribe {} from {:?}: {:?}", user, room, result);
                let _ = respond_to.send(result);
            }
            ServerCommand::MarkRead {
                user,
                thread_id,
                respond_to,
            } => {
                let found = self.state.write().await.inbox.mark_read(&user, &thread_id);
                let _ = respond_to.send(found);
            }
            ServerCommand::Shutdown => return false,
        }
        true
    }

    /// Handle new session registration
    async fn handle_register(&mut self, client: Client) {
        let name = client.name.clone();
        {
            let mut state = self.state.write().await;
            info!("Client {} registered as '{}'", client.id, name);
            state.registry.register(client);
            debug!("Total clients: {}", state.registry.len());
        }
        self.handle_notify(format!("{} joined", name)).await;
    }

    /// Handle session disconnection
    ///
    /// Dropping the registry entry closes the session's outbound queue.
    async fn handle_unregister(&mut self, client_id: ClientId) {
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.registry.unregister(client_id);
            debug!("Total clients: {}", state.registry.len());
            removed
        };

        if let Some(client) = removed {
            info!("Client {} ('{}') unregistered", client_id, client.name);
            self.handle_notify(format!("{} left", client.name)).await;
        }
    }

    /// Fan a broker notice out to every connected session
    async fn handle_notify(&mut self, content: String) {
        let state = self.state.read().await;
        let notice = ServerMessage::Chat(ChatMessage::system(content));
        for client in state.registry.clients() {
            client.try_deliver(notice.clone());
        }
    }

    /// Deliver a room message to the room's live subscribers
    async fn dispatch_broadcast(
        &mut self,
        origin_id: ClientId,
        origin_name: String,
        message: ChatMessage,
    ) {
        let now = Utc::now().timestamp();
        let room = normalize_room(&message.room).unwrap_or_else(|| self.default_room.clone());

        let mut state = self.state.write().await;
        state.rooms.ensure(&room);

        let sender = state.registry.get(origin_id).cloned();
        let (id, name) = match &sender {
            Some(s) => (s.id.to_string(), s.name.clone()),
            None => (origin_id.to_string(), origin_name),
        };
        let out = ChatMessage {
            broadcast: true,
            room: room.clone(),
            destination_id: String::new(),
            content: message.content,
            origin_id: id,
            origin_name: name,
        };

        let subscribers = state.rooms.subscribers(&room);
        let mut delivered = 0;
        for user in &subscribers {
            if let Some(client) = state.registry.by_name(user) {
                if client.try_deliver(ServerMessage::Chat(out.clone())) {
                    delivered += 1;
                }
            }
        }
        debug!(
            "Broadcast in {} from {}: {}/{} subscribers reached",
            room,
            out.origin_name,
            delivered,
            subscribers.len()
        );

        if let Some(sender) = sender {
            let changed =
                state
                    .inbox
                    .on_group_message(&room, &sender.name, &out.content, now, &subscribers);
            signal_inbox(&state, &changed);
        }
    }

    /// Deliver a direct message and echo it back to the sender
    async fn dispatch_direct(
        &mut self,
        origin_id: ClientId,
        origin_name: String,
        message: ChatMessage,
    ) {
        let now = Utc::now().timestamp();
        let mut state = self.state.write().await;

        let Some(target) = ClientId::parse(&message.destination_id)
            .and_then(|id| state.registry.get(id))
            .cloned()
        else {
            debug!(
                "Direct message from {} to unknown destination {:?} dropped",
                origin_id, message.destination_id
            );
            return;
        };

        let sender = state.registry.get(origin_id).cloned();
        let (id, name) = match &sender {
            Some(s) => (s.id.to_string(), s.name.clone()),
            None => (origin_id.to_string(), origin_name),
        };
        let out = ChatMessage {
            broadcast: false,
            room: String::new(),
            destination_id: target.id.to_string(),
            content: message.content,
            origin_id: id,
            origin_name: name,
        };

        target.try_deliver(ServerMessage::Chat(out.clone()));

        if let Some(sender) = sender {
            if sender.id != target.id {
                sender.try_deliver(ServerMessage::Chat(out.clone()));
            }
            let changed = state
                .inbox
                .on_direct_message(&sender.name, &target.name, &out.content, now);
            signal_inbox(&state, &changed);
        }
    }
}

/// Tell connected users their inbox changed
fn signal_inbox(state: &ChatState, users: &[String]) {
    for user in users {
        if let Some(client) = state.registry.by_name(user) {
            client.try_deliver(ServerMessage::Signal(InboxSignal::update()));
        }
    }
}

/// Cloneable handle to a running broker
///
/// Reads take the shared lock directly; mutations go through the router.
#[derive(Debug, Clone)]
pub struct BrokerHandle {
    state: SharedState,
    commands: mpsc::Sender<ServerCommand>,
    outbound_capacity: usize,
}

impl BrokerHandle {
    /// Queue a command for the router
    pub async fn send_command(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.commands.send(cmd).await.map_err(|_| AppError::ChannelSend)
    }

    /// Size of each session's outbound queue
    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    /// Register a client and wait until the router has recorded it
    pub async fn register(&self, client: Client) -> Result<(), AppError> {
        let (respond_to, ack) = oneshot::channel();
        self.send_command(ServerCommand::Register { client, respond_to })
            .await?;
        ack.await.map_err(|_| AppError::ChannelSend)
    }

    pub async fn unregister(&self, client_id: ClientId) -> Result<(), AppError> {
        self.send_command(ServerCommand::Unregister { client_id }).await
    }

    /// Send a notice to every connected session
    pub async fn announce(&self, content: impl Into<String>) -> Result<(), AppError> {
        self.send_command(ServerCommand::Notify {
            content: content.into(),
        })
        .await
    }

    /// Stop the router once queued commands are processed
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.send_command(ServerCommand::Shutdown).await
    }

    /// Connected clients sorted by name, minus `exclude` (id or name)
    pub async fn list_clients(&self, exclude: Option<&str>) -> Vec<ClientInfo> {
        self.state.read().await.registry.list(exclude)
    }

    /// Inbox previews of `user`, most recent first
    pub async fn inbox(&self, user: &str) -> Vec<ThreadPreview> {
        self.state.read().await.inbox.list(user)
    }

    /// Rooms with `user`'s subscription state, sorted by name
    pub async fn list_rooms(&self, user: &str) -> Vec<RoomListing> {
        self.state.read().await.rooms.list_for(user)
    }

    /// Reset a thread's unread count; Ok(false) if the thread is unknown
    pub async fn mark_read(&self, user: &str, thread_id: &str) -> Result<bool, AppError> {
        let (respond_to, reply) = oneshot::channel();
        self.send_command(ServerCommand::MarkRead {
            user: user.to_string(),
            thread_id: thread_id.to_string(),
            respond_to,
        })
        .await?;
        reply.await.map_err(|_| AppError::ChannelSend)
    }

    /// Create a room owned by `owner`; returns the normalized name
    pub async fn create_room(&self, owner: &str, room: &str) -> Result<String, AppError> {
        self.room_command(|respond_to| ServerCommand::CreateRoom {
            owner: owner.to_string(),
            room: room.to_string(),
            respond_to,
        })
        .await
    }

    pub async fn delete_room(&self, owner: &str, room: &str) -> Result<String, AppError> {
        self.room_command(|respond_to| ServerCommand::DeleteRoom {
            owner: owner.to_string(),
            room: room.to_string(),
            respond_to,
        })
        .await
    }

    pub async fn subscribe(&self, user: &str, room: &str) -> Result<String, AppError> {
        self.room_command(|respond_to| ServerCommand::Subscribe {
            user: user.to_string(),
            room: room.to_string(),
            respond_to,
        })
        .await
    }

    pub async fn unsubscribe(&self, user: &str, room: &str) -> Result<String, AppError> {
        self.room_command(|respond_to| ServerCommand::Unsubscribe {
            user: user.to_string(),
            room: room.to_string(),
            respond_to,
        })
        .await
    }

    async fn room_command<F>(&self, build: F) -> Result<String, AppError>
    where
        F: FnOnce(RoomReply) -> ServerCommand,
    {
        let (respond_to, reply) = oneshot::channel();
        self.send_command(build(respond_to)).await?;
        let result = reply.await.map_err(|_| AppError::ChannelSend)?;
        Ok(result?)
    }
}
