// Logging setup
// `env_logger` behind the `log` facade; RUST_LOG overrides the default level.

use env_logger::Env;

pub const DEFAULT_FILTER: &str = "info";

/// Install the global logger. Later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER))
        .format_timestamp_millis()
        .try_init();
}
