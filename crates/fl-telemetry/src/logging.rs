use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            LogFormat::Pretty => "human-readable",
            LogFormat::Json => "json",
        }
    }
}

/// `RUST_LOG` when set and valid, else `default_level`
/// (e.g. "info" or "fl_integrations=debug,warn").
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber, writing to stderr so stdout stays free for
/// command output. Returns `false` when a subscriber was already installed.
pub fn init(format: LogFormat, service_name: &str, default_level: &str) -> bool {
    let builder = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    if installed {
        tracing::debug!(service = service_name, format = format.as_str(), "logging initialised");
    }
    installed
}

pub fn init_logging(service_name: &str, default_level: &str) {
    init(LogFormat::Pretty, service_name, default_level);
}

pub fn init_logging_json(service_name: &str, default_level: &str) {
    init(LogFormat::Json, service_name, default_level);
}
