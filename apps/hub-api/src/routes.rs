//! 路由定义
//!
//! 集中管理控制面 API 路由：
//! - 系统时间：/api/v1/system/time
//! - 设备管理：/api/v1/device/{add,remove,list}
//!
//! 所有端点仅接受 GET，其余方法由路由层返回 405。

use axum::{routing::get, Router};

use super::handlers::*;
use super::AppState;

/// 创建控制面路由。
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/system/time", get(system_time))
        .route("/api/v1/device/add", get(add_device))
        .route("/api/v1/device/remove", get(remove_device))
        .route("/api/v1/device/list", get(list_devices))
}
