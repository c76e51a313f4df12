//! Logger setup.

/// Initialise env_logger once per process. `RUST_LOG` overrides the default
/// filter (`info`, or `debug` with `--verbose`).
pub fn init(verbose: bool) {
    let default = default_filter(verbose);
    let _ = env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(default))
        .format_timestamp_millis()
        .try_init();
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
