//! 设备注册表
//!
//! 管理设备注册生命周期的核心模块：
//!
//! - `store`：持久化注册表 + 每设备轮询流水线
//! - `alive`：基于存活通知的不活跃设备回收
//! - `awake`：注册成功后唤醒 mDNS 浏览的装饰器
//! - `mdns_handler`：局域网自动发现注入
//! - `error_handler`：每流水线的轮询错误日志

pub mod alive;
pub mod awake;
pub mod error_handler;
pub mod mdns_handler;
pub mod store;

use async_trait::async_trait;

use domain::HubResult;
use hub_scheduler::AliveNotifier;

pub use alive::StoreAliveMonitor;
pub use awake::AwakeStore;
pub use error_handler::LogErrorHandler;
pub use mdns_handler::StoreMdnsHandler;
pub use store::{DeviceStore, StoreParams};

/// 单个已注册设备的描述。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceView {
    /// 设备 URI，设备的唯一标识。
    pub uri: String,
    /// 人类可读的设备描述。
    pub desc: String,
    /// 设备自报的唯一标识，尚未观测到时为空串。
    pub id: String,
    /// 注册时间，RFC-1123 格式。
    pub created_at: String,
}

/// 设备注册生命周期管理接口。
///
/// URI 示例：
/// - http://bonsai-growlab.local/api/v1（mDNS HTTP API）
/// - http://192.168.4.1:17321（静态 IP 地址）
///
/// 描述示例：
/// - room-plant-zamioculcas
/// - living-room-light-bulb
#[async_trait]
pub trait Store: Send + Sync {
    /// 注册设备，uri 必须唯一。
    async fn add(&self, uri: &str, desc: &str) -> HubResult<()>;

    /// 注销 uri 对应的设备。
    async fn remove(&self, uri: &str) -> HubResult<()>;

    /// 返回全部已注册设备的描述。
    async fn get_desc(&self) -> Vec<DeviceView>;
}

/// 设备活跃度监控接口。
pub trait AliveMonitor: Send + Sync {
    /// 返回 uri 对应的存活通知器。
    ///
    /// 设备若不通过该通知器上报存活，会被视为不活跃。
    fn monitor(&self, uri: &str) -> std::sync::Arc<dyn AliveNotifier>;
}
