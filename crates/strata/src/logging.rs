//! Logger setup.
//!
//! Everything in strata logs through the [`log`] facade. Call
//! [`init_logger`] once at startup to route those messages to stderr via
//! `env_logger`; `RUST_LOG` overrides the default `info` filter
//! (`RUST_LOG=strata=debug` shows bucket occupancy changes and dropped adds).

use std::sync::OnceLock;

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the stderr logger. Returns `false` if another logger was already
/// set by the application; calling it twice is harmless.
pub fn init_logger() -> bool {
    *INSTALLED.get_or_init(|| {
        let result = env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .try_init();
        if result.is_err() {
            eprintln!("[strata] Warning: a logger is already set. Using it instead.");
        }
        result.is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let first = init_logger();
        let second = init_logger();
        assert_eq!(first, second);
        log::debug!("logger initialised");
    }
}
