//! 单 URL 抓取

use std::time::Duration;

use async_trait::async_trait;

use domain::{HubError, HubResult};

/// 从任意来源抓取设备数据。
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 抓取一次设备数据。
    async fn fetch(&self) -> HubResult<Vec<u8>>;
}

/// 向固定 HTTP 端点发送 GET 请求。
pub struct UrlFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl UrlFetcher {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Fetcher for UrlFetcher {
    async fn fetch(&self) -> HubResult<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(HubError::failed(format!(
                "url-fetcher: failed to fetch data: code={}",
                response.status().as_u16()
            )));
        }

        let body = response.bytes().await.map_err(map_request_error)?;

        Ok(body.to_vec())
    }
}

pub(crate) fn map_request_error(err: reqwest::Error) -> HubError {
    if err.is_timeout() {
        return HubError::Timeout;
    }

    HubError::failed(format!("HTTP request failed: {err}"))
}
