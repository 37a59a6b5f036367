//! 应用运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_port: u16,
    pub cache_dir: Option<String>,
    pub log_path: String,
    pub influxdb_url: String,
    pub influxdb_org: String,
    pub influxdb_token: String,
    pub influxdb_bucket: String,
    pub fetch_interval: Duration,
    pub fetch_timeout: Duration,
    pub max_clock_drift_seconds: i64,
    pub monitor_inactive_disable: bool,
    pub monitor_inactive_max_interval: Duration,
    pub monitor_inactive_update_interval: Duration,
    pub mdns_browse_interval: Duration,
    pub mdns_browse_timeout: Duration,
    pub mdns_autodiscovery_disable: bool,
    pub mdns_server_disable: bool,
    pub mdns_server_hostname: String,
    pub mdns_server_instance: String,
    pub time_valid_since: i64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_port = read_u16_with_default("DEVHUB_HTTP_PORT", 0)?;
        let cache_dir = read_optional("DEVHUB_CACHE_DIR");
        let log_path = env::var("DEVHUB_LOG_PATH")
            .map_err(|_| ConfigError::Missing("DEVHUB_LOG_PATH".to_string()))?;

        let influxdb_url = env::var("DEVHUB_INFLUXDB_URL")
            .map_err(|_| ConfigError::Missing("DEVHUB_INFLUXDB_URL".to_string()))?;
        let influxdb_org = env::var("DEVHUB_INFLUXDB_ORG")
            .map_err(|_| ConfigError::Missing("DEVHUB_INFLUXDB_ORG".to_string()))?;
        let influxdb_token = env::var("DEVHUB_INFLUXDB_API_TOKEN")
            .map_err(|_| ConfigError::Missing("DEVHUB_INFLUXDB_API_TOKEN".to_string()))?;
        let influxdb_bucket = env::var("DEVHUB_INFLUXDB_BUCKET")
            .map_err(|_| ConfigError::Missing("DEVHUB_INFLUXDB_BUCKET".to_string()))?;

        let fetch_interval = read_duration_ms("DEVHUB_FETCH_INTERVAL_MS", 5000)?;
        let fetch_timeout = read_duration_ms("DEVHUB_FETCH_TIMEOUT_MS", 5000)?;
        let max_clock_drift_seconds = read_i64_with_default("DEVHUB_MAX_CLOCK_DRIFT_SECONDS", 0)?;

        let monitor_inactive_disable = read_bool_with_default("DEVHUB_MONITOR_INACTIVE_DISABLE", false);
        let monitor_inactive_max_interval =
            read_duration_ms("DEVHUB_MONITOR_INACTIVE_MAX_INTERVAL_MS", 120_000)?;
        let monitor_inactive_update_interval =
            read_duration_ms("DEVHUB_MONITOR_INACTIVE_UPDATE_INTERVAL_MS", 10_000)?;

        let mdns_browse_interval = read_duration_ms("DEVHUB_MDNS_BROWSE_INTERVAL_MS", 40_000)?;
        let mdns_browse_timeout = read_duration_ms("DEVHUB_MDNS_BROWSE_TIMEOUT_MS", 10_000)?;
        let mdns_autodiscovery_disable =
            read_bool_with_default("DEVHUB_MDNS_AUTODISCOVERY_DISABLE", false);
        let mdns_server_disable = read_bool_with_default("DEVHUB_MDNS_SERVER_DISABLE", false);
        let mdns_server_hostname = env::var("DEVHUB_MDNS_SERVER_HOSTNAME")
            .unwrap_or_else(|_| "device-hub".to_string());
        let mdns_server_instance = env::var("DEVHUB_MDNS_SERVER_INSTANCE")
            .unwrap_or_else(|_| "Device Hub Software".to_string());

        // 时间有效起点：2024/12/03。
        let time_valid_since = read_i64_with_default("DEVHUB_TIME_VALID_SINCE", 1_733_215_816)?;

        let config = Self {
            http_port,
            cache_dir,
            log_path,
            influxdb_url,
            influxdb_org,
            influxdb_token,
            influxdb_bucket,
            fetch_interval,
            fetch_timeout,
            max_clock_drift_seconds,
            monitor_inactive_disable,
            monitor_inactive_max_interval,
            monitor_inactive_update_interval,
            mdns_browse_interval,
            mdns_browse_timeout,
            mdns_autodiscovery_disable,
            mdns_server_disable,
            mdns_server_hostname,
            mdns_server_instance,
            time_valid_since,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_interval < Duration::from_millis(1) {
            return Err(invalid("DEVHUB_FETCH_INTERVAL_MS", "must be >= 1ms"));
        }
        if self.fetch_timeout < Duration::from_millis(1) {
            return Err(invalid("DEVHUB_FETCH_TIMEOUT_MS", "must be >= 1ms"));
        }
        if self.mdns_browse_interval < Duration::from_secs(1) {
            return Err(invalid("DEVHUB_MDNS_BROWSE_INTERVAL_MS", "must be >= 1s"));
        }
        if self.mdns_browse_timeout < Duration::from_secs(1) {
            return Err(invalid("DEVHUB_MDNS_BROWSE_TIMEOUT_MS", "must be >= 1s"));
        }
        if !self.monitor_inactive_disable {
            if self.monitor_inactive_max_interval < Duration::from_millis(1) {
                return Err(invalid(
                    "DEVHUB_MONITOR_INACTIVE_MAX_INTERVAL_MS",
                    "must be >= 1ms",
                ));
            }
            if self.monitor_inactive_update_interval < Duration::from_millis(1) {
                return Err(invalid(
                    "DEVHUB_MONITOR_INACTIVE_UPDATE_INTERVAL_MS",
                    "must be >= 1ms",
                ));
            }

            // 自动发现开启时，允许的不活跃窗口不能小于浏览间隔，否则
            // 设备可能在两次浏览之间就被回收。
            if !self.mdns_autodiscovery_disable
                && self.monitor_inactive_max_interval < self.mdns_browse_interval
            {
                return Err(invalid(
                    "DEVHUB_MONITOR_INACTIVE_MAX_INTERVAL_MS",
                    "must be >= mDNS browse interval when autodiscovery is enabled",
                ));
            }
        }
        if !self.mdns_server_disable {
            if self.mdns_server_hostname.is_empty() {
                return Err(invalid("DEVHUB_MDNS_SERVER_HOSTNAME", "can't be empty"));
            }
            if self.mdns_server_instance.is_empty() {
                return Err(invalid("DEVHUB_MDNS_SERVER_INSTANCE", "can't be empty"));
            }
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid(key.to_string(), reason.to_string())
}

fn read_duration_ms(key: &str, default: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_millis(read_u64_with_default(key, default)?))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_i64_with_default(key: &str, default: i64) -> Result<i64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<i64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
