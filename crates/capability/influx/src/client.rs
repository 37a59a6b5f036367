//! InfluxDB v2 HTTP API 客户端

use async_trait::async_trait;

use domain::{HubError, HubResult};
use hub_storage::SystemClockReader;

/// InfluxDB 连接参数。
#[derive(Debug, Clone)]
pub struct InfluxParams {
    pub url: String,
    pub org: String,
    pub token: String,
    pub bucket: String,
}

/// v2 API 客户端：同步写入 + Flux 查询。
pub struct InfluxClient {
    client: reqwest::Client,
    params: InfluxParams,
}

impl InfluxClient {
    pub fn new(client: reqwest::Client, params: InfluxParams) -> Self {
        Self { client, params }
    }

    /// 写入一条 Line Protocol 数据点（秒精度）。
    pub async fn write_point(&self, line: &str) -> HubResult<()> {
        let url = format!(
            "{}/api/v2/write?org={}&bucket={}&precision=s",
            self.params.url.trim_end_matches('/'),
            self.params.org,
            self.params.bucket
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Token {}", self.params.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line.to_string())
            .send()
            .await
            .map_err(|err| HubError::failed(format!("influxdb: write failed: {err}")))?;

        map_status(response.status())
    }

    /// 查询 30 天窗口内最近一次 telemetry 数据点的时间。
    async fn query_last_timestamp(&self) -> HubResult<i64> {
        let query = format!(
            r#"
	from(bucket: "{}")
	  |> range(start: -30d)
	  |> filter(fn: (r) => r["_measurement"] == "telemetry")
	  |> aggregateWindow(every: 10m, fn: last, createEmpty: false)
	  |> keep(columns: ["_time"])
	  |> sort(columns: ["_time"], desc: true)
	  |> limit(n: 1)"#,
            self.params.bucket
        );

        let url = format!(
            "{}/api/v2/query?org={}",
            self.params.url.trim_end_matches('/'),
            self.params.org
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Token {}", self.params.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(query)
            .send()
            .await
            .map_err(|err| HubError::failed(format!("influxdb: query failed: {err}")))?;

        let status = response.status();
        map_status(status)?;

        let body = response
            .text()
            .await
            .map_err(|err| HubError::failed(format!("influxdb: invalid response: {err}")))?;

        parse_last_time(&body)
    }
}

fn map_status(status: reqwest::StatusCode) -> HubResult<()> {
    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        401 | 403 => Err(HubError::InvalidState),
        404 => Err(HubError::NoData),
        code => Err(HubError::failed(format!("influxdb: code={code}"))),
    }
}

/// 从带注解的 CSV 响应中提取 _time 列的第一行。
fn parse_last_time(body: &str) -> HubResult<i64> {
    let mut time_column = None;

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();

        match time_column {
            None => {
                time_column = fields.iter().position(|field| *field == "_time");
                if time_column.is_none() {
                    return Err(HubError::failed("influxdb: no _time column in result"));
                }
            }
            Some(index) => {
                let value = fields
                    .get(index)
                    .ok_or_else(|| HubError::failed("influxdb: malformed CSV row"))?;

                let time = chrono::DateTime::parse_from_rfc3339(value).map_err(|err| {
                    HubError::failed(format!("influxdb: invalid _time value: {err}"))
                })?;

                return Ok(time.timestamp());
            }
        }
    }

    Err(HubError::NoData)
}

#[async_trait]
impl SystemClockReader for InfluxClient {
    async fn read_timestamp(&self) -> HubResult<i64> {
        self.query_last_timestamp().await
    }
}
