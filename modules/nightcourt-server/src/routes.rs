//! HTTP surface: the WebSocket endpoint plus the health and snapshot
//! side-channels.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

use nightcourt_common::config::MAX_FRAME_BYTES;
use nightcourt_common::Message;
use nightcourt_engine::player::OUTBOUND_BUFFER;
use nightcourt_engine::{GameId, GameRegistry, Session};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<GameRegistry>,
    pub started_at: Instant,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_handler))
        .route("/health", get(health))
        .route("/info", get(info))
        .layer(cors)
        .with_state(state)
}

async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// One connection: a write task draining the outbound buffer plus this
/// read loop feeding the session router.
async fn handle_socket(socket: WebSocket, state: AppState, addr: SocketAddr) {
    tracing::debug!(%addr, "client connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    let mut session = Session::new(Arc::clone(&state.registry), tx).with_addr(addr.to_string());

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "encoding outbound message");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(WsMessage::Close(None)).await;
    });

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(%addr, error = %err, "read failed");
                break;
            }
        };

        match frame {
            WsMessage::Text(text) => {
                if text.len() > MAX_FRAME_BYTES {
                    tracing::warn!(%addr, len = text.len(), "oversized frame dropped");
                    continue;
                }
                match serde_json::from_str::<Message>(text.as_str()) {
                    Ok(msg) => session.on_message(msg).await,
                    Err(err) => {
                        tracing::error!(%addr, error = %err, "undecodable message");
                        break;
                    }
                }
            }
            WsMessage::Close(_) => break,
            // Pings are answered by axum itself; binary frames are not part
            // of the protocol.
            _ => {}
        }
    }

    // The player, if attached, stays in its game for a later reconnect.
    drop(session);
    writer.abort();
    tracing::debug!(%addr, "client disconnected");
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "games": state.registry.count().await,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct InfoQuery {
    game: Option<u32>,
}

async fn info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> impl IntoResponse {
    let Some(id) = query.game else {
        return (StatusCode::BAD_REQUEST, "param \"game\" can't be empty").into_response();
    };
    let Some(game) = state.registry.get(GameId(id)).await else {
        return (StatusCode::BAD_REQUEST, "invalid game id").into_response();
    };

    let mut game = game.lock().await;
    let is_over = game.is_over();
    let players: Vec<_> = game
        .players()
        .active()
        .map(|p| {
            json!({
                "id": p.id(),
                "name": p.name(),
                "addr": p.addr(),
                "createdAt": p.created_at(),
                "role": p.role().map(u8::from).unwrap_or(0),
            })
        })
        .collect();

    Json(json!({
        "id": game.id(),
        "event": game.current().name(),
        "event_status": game.current().status().as_u8(),
        "iter": game.iteration(),
        "win": game.winner().map(u8::from).unwrap_or(0),
        "is_over": is_over,
        "players": players,
    }))
    .into_response()
}
