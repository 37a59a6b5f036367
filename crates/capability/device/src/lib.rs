//! 设备数据面
//!
//! - DataHandler：注册 / 遥测数据的落地接口
//! - IdHolder：设备唯一标识持有者
//! - TimeVerifier：设备时间戳校验
//! - PollDevice：对单个设备的一轮抓取

pub mod holder;
pub mod poll;
pub mod verifier;

use async_trait::async_trait;

use domain::{HubResult, Payload};

pub use holder::IdHolder;
pub use poll::PollDevice;
pub use verifier::{BasicTimeVerifier, DriftTimeVerifier, TimeVerifier};

/// 设备数据落地接口。
#[async_trait]
pub trait DataHandler: Send + Sync {
    /// 处理设备遥测数据。
    async fn handle_telemetry(&self, device_id: &str, payload: &Payload) -> HubResult<()>;

    /// 处理设备注册数据。
    async fn handle_registration(&self, device_id: &str, payload: &Payload) -> HubResult<()>;
}
