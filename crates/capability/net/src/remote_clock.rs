//! 设备 /system/time 契约的客户端

use std::time::Duration;

use async_trait::async_trait;

use domain::{HubError, HubResult, SystemClock};

use crate::fetcher::map_request_error;

/// 通过设备 HTTP API 读写设备 UNIX 时间。
///
/// GET <url> 返回纯文本 UNIX 秒；GET <url>?value=N 设置时间并返回 OK。
pub struct HttpSystemClock {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSystemClock {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    async fn request(&self, query: Option<(&str, String)>) -> HubResult<String> {
        let mut request = self.client.get(&self.url).timeout(self.timeout);
        if let Some((key, value)) = query {
            request = request.query(&[(key, value)]);
        }

        let response = request.send().await.map_err(map_request_error)?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(HubError::failed(format!(
                "system-clock: unexpected response: code={}",
                response.status().as_u16()
            )));
        }

        response.text().await.map_err(map_request_error)
    }
}

#[async_trait]
impl SystemClock for HttpSystemClock {
    async fn get_timestamp(&self) -> HubResult<i64> {
        let body = self.request(None).await?;

        body.trim()
            .parse::<i64>()
            .map_err(|err| HubError::failed(format!("system-clock: invalid timestamp: {err}")))
    }

    async fn set_timestamp(&self, timestamp: i64) -> HubResult<()> {
        self.request(Some(("value", timestamp.to_string()))).await?;

        Ok(())
    }
}
