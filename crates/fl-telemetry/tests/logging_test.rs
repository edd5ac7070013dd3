use fl_telemetry::logging::{self, LogFormat};

#[test]
fn only_the_first_subscriber_is_installed() {
    // Both formats share one process-wide slot.
    let first = logging::init(LogFormat::Pretty, "test-service", "debug");
    let second = logging::init(LogFormat::Json, "test-service", "info");
    assert!(!second || !first);

    logging::init_logging("test-service", "info");
    logging::init_logging_json("test-service", "info");
    tracing::info!(key = "value", "log line after repeated init");
}

#[test]
fn default_level_is_used_without_rust_log() {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let filter = logging::env_filter("fl_integrations=debug,warn");
    assert!(filter.to_string().contains("fl_integrations=debug"));
}
