//! Diagnostic logger setup.

use log::debug;

use crate::config::LogConfig;

/// Install `env_logger` with the configured level as the default filter.
///
/// `RUST_LOG` still takes precedence. Returns `false` if a logger was already
/// installed by the host.
pub fn init(config: &LogConfig) -> bool {
    let env = env_logger::Env::default().default_filter_or(config.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if config.monochrome {
        builder.write_style(env_logger::WriteStyle::Never);
    }
    match builder.try_init() {
        Ok(()) => true,
        Err(e) => {
            debug!("Logger already initialized: {}", e);
            false
        }
    }
}
