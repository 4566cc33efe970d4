use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use tracing::warn;

use parley_types::api::{GroupMessageResponse, PrivateMessageResponse};

use crate::auth::AppState;
use crate::error::{ApiError, join_error};

/// History queries return at most this many rows, newest first.
const HISTORY_LIMIT: u32 = 50;

pub async fn room_history(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<Vec<GroupMessageResponse>>, ApiError> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_group_messages(&room, HISTORY_LIMIT))
        .await
        .map_err(join_error)??;

    let messages = rows
        .into_iter()
        .map(|row| GroupMessageResponse {
            date_sent: parse_date_sent(&row.date_sent, &row.id),
            from_user: row.from_user,
            room: row.room,
            message: row.message,
        })
        .collect();

    Ok(Json(messages))
}

pub async fn private_history(
    State(state): State<AppState>,
    Path((from_user, to_user)): Path<(String, String)>,
) -> Result<Json<Vec<PrivateMessageResponse>>, ApiError> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.list_private_messages(&from_user, &to_user, HISTORY_LIMIT)
    })
    .await
    .map_err(join_error)??;

    let messages = rows
        .into_iter()
        .map(|row| PrivateMessageResponse {
            date_sent: parse_date_sent(&row.date_sent, &row.id),
            from_user: row.from_user,
            to_user: row.to_user,
            message: row.message,
        })
        .collect();

    Ok(Json(messages))
}

fn parse_date_sent(raw: &str, id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt date_sent '{}' on message '{}': {}", raw, id, e);
        DateTime::default()
    })
}
