//! 统一错误类型
//!
//! 定义贯穿所有模块的错误哨兵：
//! - OperationFailed：操作失败（附带上下文）
//! - InvalidState：状态不允许执行操作
//! - NotSupported：不支持的操作
//! - NoData：数据不存在
//! - Timeout：等待超时
//! - InvalidArg：非法参数
//! - DeviceExists：设备已注册

/// 全局错误哨兵。
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("operation failed: {0}")]
    OperationFailed(String),
    #[error("invalid state")]
    InvalidState,
    #[error("not supported")]
    NotSupported,
    #[error("no data")]
    NoData,
    #[error("timeout")]
    Timeout,
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("device already exists")]
    DeviceExists,
}

impl HubError {
    /// 构造带上下文的操作失败错误。
    pub fn failed(message: impl Into<String>) -> Self {
        Self::OperationFailed(message.into())
    }

    /// 判断是否为 NoData。
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

impl PartialEq for HubError {
    /// 按错误种类比较，OperationFailed/InvalidArg 忽略附带文本。
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

pub type HubResult<T> = Result<T, HubError>;
