use hub_config::AppConfig;

#[test]
fn load_config_from_env() {
    std::env::set_var("DEVHUB_LOG_PATH", "/tmp/device-hub.log");
    std::env::set_var("DEVHUB_INFLUXDB_URL", "http://localhost:8086");
    std::env::set_var("DEVHUB_INFLUXDB_ORG", "hub");
    std::env::set_var("DEVHUB_INFLUXDB_API_TOKEN", "token");
    std::env::set_var("DEVHUB_INFLUXDB_BUCKET", "telemetry");
    std::env::set_var("DEVHUB_HTTP_PORT", "8081");
    std::env::set_var("DEVHUB_FETCH_INTERVAL_MS", "100");

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.http_port, 8081);
    assert_eq!(config.fetch_interval.as_millis(), 100);
    assert_eq!(config.fetch_timeout.as_millis(), 5000);
    assert_eq!(config.mdns_browse_interval.as_millis(), 40_000);
    assert!(!config.monitor_inactive_disable);
    assert_eq!(config.time_valid_since, 1_733_215_816);

    // 浏览间隔下限校验。
    std::env::set_var("DEVHUB_MDNS_BROWSE_INTERVAL_MS", "10");
    AppConfig::from_env().expect_err("browse interval below 1s");
    std::env::set_var("DEVHUB_MDNS_BROWSE_INTERVAL_MS", "40000");

    // 自动发现开启时，不活跃窗口不能小于浏览间隔。
    std::env::set_var("DEVHUB_MONITOR_INACTIVE_MAX_INTERVAL_MS", "1000");
    AppConfig::from_env().expect_err("inactive window below browse interval");
    std::env::set_var("DEVHUB_MDNS_AUTODISCOVERY_DISABLE", "1");
    AppConfig::from_env().expect("autodiscovery disabled lifts the constraint");
}
