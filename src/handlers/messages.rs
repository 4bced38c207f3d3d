use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::models::ChatMessageView;
use crate::utils::auth::CurrentUser;
use crate::AppState;

/// GET /api/chat/messages — Most recent global messages, newest first.
pub async fn get_recent_messages(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatMessageView>>, (StatusCode, &'static str)> {
    let messages = state
        .store
        .fetch_recent_global(state.history_limit)
        .map_err(|e| {
            tracing::error!("fetch recent messages: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch messages")
        })?;
    Ok(Json(messages))
}

#[derive(serde::Deserialize)]
pub struct PeerPath {
    peer_id: i32,
}

/// GET /api/chat/direct/:peer_id — Direct messages between the caller and a peer, oldest first.
pub async fn get_direct_history(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(PeerPath { peer_id }): Path<PeerPath>,
) -> Result<Json<Vec<ChatMessageView>>, (StatusCode, &'static str)> {
    if peer_id == user.id {
        return Err((StatusCode::BAD_REQUEST, "Cannot fetch a conversation with yourself"));
    }
    let messages = state
        .store
        .fetch_direct_history(user.id, peer_id)
        .map_err(|e| {
            tracing::error!(user_id = user.id, peer_id, "fetch direct history: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch messages")
        })?;
    Ok(Json(messages))
}
