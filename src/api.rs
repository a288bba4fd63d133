//! HTTP query/command API
//!
//! Thin axum layer over `BrokerHandle`: one route per broker operation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{AppError, RoomError};
use crate::message::{ClientInfo, RoomListing, ThreadPreview};
use crate::server::BrokerHandle;

/// Build the API router
pub fn router(broker: BrokerHandle) -> Router {
    Router::new()
        .route("/api/clients", get(list_clients))
        .route("/api/inbox/read", post(mark_read))
        .route("/api/inbox/{nick}", get(inbox))
        .route("/api/rooms", get(list_rooms))
        .route("/api/room/create", post(create_room))
        .route("/api/room/delete", post(delete_room))
        .route("/api/room/subscribe", post(subscribe))
        .route("/api/room/unsubscribe", post(unsubscribe))
        .with_state(broker)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Failed request: status plus a machine-readable reason
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    reason: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, reason: &'static str) -> Self {
        Self { status, reason }
    }

    fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "missing nick or room")
    }

    /// Map a broker error, choosing the status of a refused room operation
    fn from_app(err: AppError, refused: fn(RoomError) -> StatusCode) -> Self {
        match err {
            AppError::Room(room_err) => Self::new(refused(room_err), room_err.reason()),
            other => {
                error!("Broker unavailable: {}", other);
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.reason })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ClientsParams {
    exclude: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NickParams {
    #[serde(default)]
    nick: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReadParams {
    #[serde(default)]
    nick: String,
    #[serde(default)]
    thread_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RoomParams {
    #[serde(default)]
    nick: String,
    #[serde(default)]
    room: String,
}

impl RoomParams {
    /// Trimmed (nick, room), both required
    fn required(&self) -> Result<(&str, &str), ApiError> {
        let nick = self.nick.trim();
        let room = self.room.trim();
        if nick.is_empty() || room.is_empty() {
            return Err(ApiError::bad_request());
        }
        Ok((nick, room))
    }
}

/// GET /api/clients?exclude=nickOrId
async fn list_clients(
    State(broker): State<BrokerHandle>,
    Query(params): Query<ClientsParams>,
) -> Json<Vec<ClientInfo>> {
    Json(broker.list_clients(params.exclude.as_deref()).await)
}

/// GET /api/inbox/{nick}
async fn inbox(
    State(broker): State<BrokerHandle>,
    Path(nick): Path<String>,
) -> Json<Vec<ThreadPreview>> {
    Json(broker.inbox(&nick).await)
}

/// POST /api/inbox/read?nick=&thread_id=
async fn mark_read(
    State(broker): State<BrokerHandle>,
    Query(params): Query<ReadParams>,
) -> Result<StatusCode, ApiError> {
    let nick = params.nick.trim();
    let thread_id = params.thread_id.trim();
    if nick.is_empty() || thread_id.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "missing nick or thread_id"));
    }
    broker
        .mark_read(nick, thread_id)
        .await
        .map_err(|e| ApiError::from_app(e, |_| StatusCode::BAD_REQUEST))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/rooms?nick=
async fn list_rooms(
    State(broker): State<BrokerHandle>,
    Query(params): Query<NickParams>,
) -> Json<Vec<RoomListing>> {
    Json(broker.list_rooms(&params.nick).await)
}

/// POST /api/room/create?nick=&room=
async fn create_room(
    State(broker): State<BrokerHandle>,
    Query(params): Query<RoomParams>,
) -> Result<StatusCode, ApiError> {
    let (nick, room) = params.required()?;
    broker
        .create_room(nick, room)
        .await
        .map_err(|e| ApiError::from_app(e, |_| StatusCode::CONFLICT))?;
    Ok(StatusCode::CREATED)
}

/// POST /api/room/delete?nick=&room=
async fn delete_room(
    State(broker): State<BrokerHandle>,
    Query(params): Query<RoomParams>,
) -> Result<StatusCode, ApiError> {
    let (nick, room) = params.required()?;
    broker
        .delete_room(nick, room)
        .await
        .map_err(|e| {
            ApiError::from_app(e, |reason| match reason {
                RoomError::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::FORBIDDEN,
            })
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/room/subscribe?nick=&room=
async fn subscribe(
    State(broker): State<BrokerHandle>,
    Query(params): Query<RoomParams>,
) -> Result<StatusCode, ApiError> {
    let (nick, room) = params.required()?;
    broker
        .subscribe(nick, room)
        .await
        .map_err(|e| ApiError::from_app(e, |_| StatusCode::NOT_FOUND))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/room/unsubscribe?nick=&room=
async fn unsubscribe(
    State(broker): State<BrokerHandle>,
    Query(params): Query<RoomParams>,
) -> Result<StatusCode, ApiError> {
    let (nick, room) = params.required()?;
    broker
        .unsubscribe(nick, room)
        .await
        .map_err(|e| ApiError::from_app(e, |_| StatusCode::FORBIDDEN))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::client::Client;
    use crate::config::Config;
    use crate::message::ChatMessage;
    use crate::server::{ChatServer, ServerCommand};
    use crate::types::ClientId;

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn app() -> (Router, BrokerHandle) {
        let (broker, _task) = ChatServer::start(&Config::default());
        (router(broker.clone()), broker)
    }

    #[tokio::test]
    async fn test_room_lifecycle_over_http() {
        let (app, _broker) = app();

        let (status, _) = call(&app, "POST", "/api/room/create?nick=A&room=team").await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&app, "POST", "/api/room/create?nick=B&room=%20team%20").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_exists");

        let (status, _) = call(&app, "POST", "/api/room/subscribe?nick=B&room=team").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, "GET", "/api/rooms?nick=B").await;
        assert_eq!(status, StatusCode::OK);
        let rooms = body.as_array().unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0]["room"], "general");
        assert_eq!(rooms[1]["room"], "team");
        assert_eq!(rooms[1]["subscribed"], true);
        assert_eq!(rooms[1]["owner"], "A");
        assert_eq!(rooms[1]["is_owner"], false);

        let (status, body) = call(&app, "POST", "/api/room/unsubscribe?nick=A&room=team").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "owner_cannot_unsubscribe");

        let (status, body) = call(&app, "POST", "/api/room/delete?nick=B&room=team").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "not_owner");

        let (status, _) = call(&app, "POST", "/api/room/delete?nick=A&room=team").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, "POST", "/api/room/delete?nick=A&room=team").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (_, body) = call(&app, "GET", "/api/rooms?nick=A").await;
        assert!(body.as_array().unwrap().iter().all(|r| r["room"] != "team"));
    }

    #[tokio::test]
    async fn test_missing_parameters_are_bad_requests() {
        let (app, _broker) = app();
        for uri in [
            "/api/room/create?nick=A",
            "/api/room/delete?room=x",
            "/api/room/subscribe?nick=%20&room=x",
            "/api/room/unsubscribe",
            "/api/inbox/read?nick=A",
            "/api/inbox/read?nick=A&thread_id=%20%20",
        ] {
            let (status, _) = call(&app, "POST", uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_subscribe_unknown_room_not_found() {
        let (app, _broker) = app();
        let (status, body) = call(&app, "POST", "/api/room/subscribe?nick=B&room=nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_delete_default_room_has_no_owner() {
        let (app, _broker) = app();
        let (status, body) = call(&app, "POST", "/api/room/delete?nick=A&room=general").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "no_owner");
    }

    #[tokio::test]
    async fn test_inbox_and_mark_read_over_http() {
        let (app, broker) = app();
        let (status, body) = call(&app, "GET", "/api/inbox/nobody").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(Vec::new()));

        // Unknown thread is a no-op
        let (status, _) = call(&app, "POST", "/api/inbox/read?nick=B&thread_id=g:team").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(broker.inbox("B").await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_trims_parameters() {
        let (app, broker) = app();
        let (tx, _rx) = mpsc::channel(8);
        let client = Client::new(ClientId::new(), "A", tx);
        let a = client.id;
        broker.register(client).await.unwrap();
        broker.create_room("A", "team").await.unwrap();
        broker.subscribe("B", "team").await.unwrap();

        let message = ChatMessage {
            broadcast: true,
            room: "team".to_string(),
            content: "hi".to_string(),
            ..ChatMessage::default()
        };
        broker
            .send_command(ServerCommand::Send {
                origin_id: a,
                origin_name: "A".to_string(),
                message,
            })
            .await
            .unwrap();
        // Barrier: the broadcast is processed before this reply
        broker.create_room("A", "barrier").await.unwrap();
        assert_eq!(broker.inbox("B").await[0].unread, 1);

        let (status, _) = call(&app, "POST", "/api/inbox/read?nick=%20B%20&thread_id=%20g:team").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(broker.inbox("B").await[0].unread, 0);
    }

    #[tokio::test]
    async fn test_clients_listing_empty() {
        let (app, _broker) = app();
        let (status, body) = call(&app, "GET", "/api/clients?exclude=alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(Vec::new()));
    }
}
