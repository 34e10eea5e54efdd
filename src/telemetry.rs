//! Logging setup. stdout carries IPC responses, so logs go to stderr.
//!
//! `CLASSDESK_LOG` (EnvFilter directives) overrides `log.level` from the
//! config file; `log.format = "json"` switches to JSON lines.

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CLASSDESK_LOG";

pub fn init_tracing(cfg: &LogConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    match cfg.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
}
