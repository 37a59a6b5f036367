//! 系统时间 handler
//!
//! - GET /api/v1/system/time - 返回纯文本 UNIX 秒；早于有效起点时返回 -1
//! - GET /api/v1/system/time?value=N - 设置 UNIX 时间，返回 OK

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::handlers::{error_response, text_response};
use crate::AppState;

#[derive(serde::Deserialize)]
pub struct TimeQuery {
    value: Option<String>,
}

/// 读取或设置系统 UNIX 时间。
pub async fn system_time(
    State(state): State<AppState>,
    Query(query): Query<TimeQuery>,
) -> Response {
    let value = match query.value {
        None => return read_time(&state).await,
        Some(value) => value,
    };

    let timestamp = match value.parse::<i64>() {
        Ok(timestamp) => timestamp,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, format!("error: {err}")),
    };

    match state.system_clock.set_timestamp(timestamp).await {
        Ok(()) => text_response("OK"),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to set UNIX time: {err}"),
        ),
    }
}

async fn read_time(state: &AppState) -> Response {
    let timestamp = match state.system_clock.get_timestamp().await {
        Ok(timestamp) => timestamp,
        Err(err) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to get UNIX time: {err}"),
            )
        }
    };

    // 早于有效起点的读数视为时钟尚未设置。
    let timestamp = if timestamp < state.time_valid_since {
        -1
    } else {
        timestamp
    };

    text_response(timestamp.to_string())
}
