// Tracing subscriber setup for the binary
//
// stderr always gets human-readable or JSON output. A daily rolling file is
// added when a log directory is configured; the returned guard must stay
// alive until exit or buffered lines are lost.

use crate::error::{EraseError, EraseResult};
use crate::settings::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub const LOG_FILE_PREFIX: &str = "secure-erase.log";

/// Filter from RUST_LOG, else the configured level bumped by `-v` flags
pub fn build_filter(config: &LogConfig, verbose: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = match verbose {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(config: &LogConfig, verbose: u8) -> EraseResult<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stderr_layer: BoxedLayer = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(std::io::stderr).boxed()
    };
    layers.push(stderr_layer);

    let guard = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(config, verbose))
        .try_init()
        .map_err(|e| EraseError::Config(format!("logging already initialised: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_verbose_overrides_configured_level() {
        std::env::remove_var("RUST_LOG");
        let config = LogConfig::default();
        assert_eq!(build_filter(&config, 1).to_string(), "debug");
        assert_eq!(build_filter(&config, 3).to_string(), "trace");
        assert_eq!(build_filter(&config, 0).to_string(), "info");
    }
}
