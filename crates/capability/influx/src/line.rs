//! Line Protocol 编码
//!
//! 格式：measurement,tag1=v1 field1=v1,field2=v2 timestamp

use domain::{HubError, HubResult, Payload};

/// 编码单个数据点。
///
/// 负载字段按 JSON 类型映射：数值 → float、字符串 → 带引号转义、
/// 布尔 → true/false、数组与对象 → JSON 文本字段、null 跳过。
/// 时间戳精度为秒。
pub fn encode_point(
    measurement: &str,
    device_id: &str,
    payload: &Payload,
    timestamp: i64,
) -> HubResult<String> {
    let mut line = escape_name(measurement);

    line.push(',');
    line.push_str("device_id=");
    line.push_str(&escape_name(device_id));

    let mut first = true;
    for (key, value) in payload {
        let encoded = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::Bool(v) => v.to_string(),
            serde_json::Value::Number(v) => {
                let v = v
                    .as_f64()
                    .ok_or_else(|| HubError::failed(format!("non-finite field: {key}")))?;
                format!("{v}")
            }
            serde_json::Value::String(v) => quote_string(v),
            other => quote_string(&other.to_string()),
        };

        line.push(if first { ' ' } else { ',' });
        first = false;

        line.push_str(&escape_name(key));
        line.push('=');
        line.push_str(&encoded);
    }

    if first {
        return Err(HubError::failed("point without fields"));
    }

    line.push(' ');
    line.push_str(&timestamp.to_string());

    Ok(line)
}

fn escape_name(name: &str) -> String {
    name.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn quote_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_telemetry_point() {
        let mut payload = Payload::new();
        payload.insert("timestamp".to_string(), serde_json::json!(123));
        payload.insert("temperature".to_string(), serde_json::json!(123.222));

        let line = encode_point("telemetry", "0xABCD", &payload, 123).expect("encode");
        assert_eq!(line, "telemetry,device_id=0xABCD temperature=123.222,timestamp=123 123");
    }

    #[test]
    fn encode_escapes_strings() {
        let mut payload = Payload::new();
        payload.insert("status".to_string(), serde_json::json!("a \"b\""));
        payload.insert("timestamp".to_string(), serde_json::json!(1));

        let line = encode_point("registration", "dev 1", &payload, 1).expect("encode");
        assert_eq!(
            line,
            "registration,device_id=dev\\ 1 status=\"a \\\"b\\\"\",timestamp=1 1"
        );
    }

    #[test]
    fn encode_passes_nested_values_through_as_json() {
        let mut payload = Payload::new();
        payload.insert("timestamp".to_string(), serde_json::json!(1));
        payload.insert("sensors".to_string(), serde_json::json!(["a", "b"]));

        let line = encode_point("telemetry", "id", &payload, 1).expect("encode");
        assert!(line.contains("sensors=\"[\\\"a\\\",\\\"b\\\"]\""));
    }

    #[test]
    fn encode_rejects_empty_payload() {
        let payload = Payload::new();
        assert!(encode_point("telemetry", "id", &payload, 1).is_err());
    }
}
