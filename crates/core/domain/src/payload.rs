//! 设备负载类型
//!
//! 设备上报的数据是无序的 string → JSON 值映射，字段集合除 timestamp 与
//! device_id 外对 Hub 不可知，必须原样透传给数据落地端。

use crate::error::{HubError, HubResult};

/// 设备上报负载：动态 JSON 对象。
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// 提取负载中的 timestamp 字段（UNIX 秒）。
///
/// 字段缺失或非数值类型时返回 OperationFailed。
pub fn payload_timestamp(payload: &Payload) -> HubResult<i64> {
    let value = payload
        .get("timestamp")
        .ok_or_else(|| HubError::failed("missing timestamp field"))?;

    let timestamp = value
        .as_f64()
        .ok_or_else(|| HubError::failed("invalid type for timestamp"))?;

    Ok(timestamp as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_present() {
        let mut payload = Payload::new();
        payload.insert("timestamp".to_string(), serde_json::json!(123));
        assert_eq!(payload_timestamp(&payload).expect("timestamp"), 123);
    }

    #[test]
    fn timestamp_negative_one() {
        let mut payload = Payload::new();
        payload.insert("timestamp".to_string(), serde_json::json!(-1));
        assert_eq!(payload_timestamp(&payload).expect("timestamp"), -1);
    }

    #[test]
    fn timestamp_missing() {
        let payload = Payload::new();
        assert!(payload_timestamp(&payload).is_err());
    }

    #[test]
    fn timestamp_wrong_type() {
        let mut payload = Payload::new();
        payload.insert("timestamp".to_string(), serde_json::json!("123"));
        assert!(payload_timestamp(&payload).is_err());
    }
}
