//! 每流水线的轮询错误日志

use domain::HubError;
use hub_scheduler::ErrorHandler;

/// 把某个设备的轮询错误写入日志。
///
/// 每轮错误不拆除流水线，下一个周期会重试。
pub struct LogErrorHandler {
    uri: String,
    desc: String,
}

impl LogErrorHandler {
    pub fn new(uri: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            desc: desc.into(),
        }
    }
}

impl ErrorHandler for LogErrorHandler {
    fn handle_error(&self, err: &HubError) {
        tracing::warn!(
            uri = %self.uri,
            desc = %self.desc,
            err = %err,
            "failed to handle device data"
        );
    }
}
