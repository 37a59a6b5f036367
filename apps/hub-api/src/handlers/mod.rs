//! 控制面 handlers
//!
//! 响应约定：
//! - 成功的写操作返回纯文本 OK
//! - 错误返回简明的纯文本与对应状态码
//! - 列表返回 JSON

pub mod devices;
pub mod system_time;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub use devices::{add_device, list_devices, remove_device};
pub use system_time::system_time;

/// 纯文本成功响应。
pub fn text_response(body: impl Into<String>) -> Response {
    (StatusCode::OK, body.into()).into_response()
}

/// 纯文本错误响应。
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}
