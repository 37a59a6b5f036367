//! 设备管理 handlers
//!
//! 提供设备注册生命周期的控制接口：
//! - GET /api/v1/device/add?uri=&desc= - 注册设备
//! - GET /api/v1/device/remove?uri= - 注销设备
//! - GET /api/v1/device/list - 列出已注册设备
//!
//! 注册冲突（DeviceExists）、未知 URI（NoData）等注册表错误统一
//! 以 400 返回给调用方。

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::handlers::{error_response, text_response};
use crate::AppState;

#[derive(serde::Deserialize)]
pub struct AddQuery {
    uri: Option<String>,
    desc: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct RemoveQuery {
    uri: Option<String>,
}

/// 注册设备。
pub async fn add_device(
    State(state): State<AppState>,
    Query(query): Query<AddQuery>,
) -> Response {
    let uri = match query.uri.filter(|uri| !uri.is_empty()) {
        Some(uri) => uri,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "error: missed `uri` query parameter",
            )
        }
    };

    let desc = match query.desc.filter(|desc| !desc.is_empty()) {
        Some(desc) => desc,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "error: missed `desc` query parameter",
            )
        }
    };

    match state.store.add(&uri, &desc).await {
        Ok(()) => text_response("OK"),
        Err(err) => error_response(
            StatusCode::BAD_REQUEST,
            format!("error: failed to add device with uri={uri}: {err}"),
        ),
    }
}

/// 注销设备。
pub async fn remove_device(
    State(state): State<AppState>,
    Query(query): Query<RemoveQuery>,
) -> Response {
    let uri = match query.uri.filter(|uri| !uri.is_empty()) {
        Some(uri) => uri,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "error: missed `uri` query parameter",
            )
        }
    };

    match state.store.remove(&uri).await {
        Ok(()) => text_response("OK"),
        Err(err) => error_response(
            StatusCode::BAD_REQUEST,
            format!("error: failed to remove device with uri={uri}: {err}"),
        ),
    }
}

/// 列出已注册设备。
pub async fn list_devices(State(state): State<AppState>) -> Response {
    let views = state.store.get_desc().await;

    match serde_json::to_string(&views) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("error: failed to format JSON: {err}"),
        ),
    }
}
