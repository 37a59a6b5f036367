//! 核心共享类型：错误、设备负载、时钟。
//!
//! 所有模块共享的最小内核：
//! - HubError：统一错误哨兵
//! - Payload：设备上报的动态 JSON 映射
//! - SystemClock / MonotonicClock：时钟抽象
//! - ClockSynchronizer：三方时间校准

pub mod clock;
pub mod error;
pub mod payload;

pub use clock::{
    ClockSynchronizer, LocalMonotonicClock, LocalSystemClock, MonotonicClock, SystemClock,
};
pub use error::{HubError, HubResult};
pub use payload::{payload_timestamp, Payload};
