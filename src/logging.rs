//! Log setup and the coarse progress marker.

use tracing::info;
use tracing_subscriber::EnvFilter;

pub const WORKING_ON_PREFIX: &str = "WORKING ON: ";

/// Install the fmt subscriber on stderr; `RUST_LOG` overrides the default
/// `info` level. Calling it twice is harmless.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn working_on_message(message: &str) -> String {
    format!("{WORKING_ON_PREFIX}{message}")
}

/// Emit `WORKING ON: <message>` at info level.
pub fn working_on(message: &str) {
    info!("{}", working_on_message(message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_on_uses_reserved_prefix() {
        assert_eq!(working_on_message("loading data"), "WORKING ON: loading data");
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        working_on("test");
    }
}
