//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter directive for a verbosity level.
///
/// `quiet` wins over any `-v` count.
pub fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbosity {
        0 => "info",
        1 => "info,minutes=debug",
        _ => "trace",
    }
}

/// Whether `LOG_FORMAT` asks for JSON lines.
pub fn json_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for results.
///
/// `RUST_LOG` overrides the verbosity flags; `LOG_FORMAT=json` switches to
/// JSON lines. A second call leaves the first subscriber in place.
pub fn init_tracing(verbosity: u8, quiet: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));
    let json = json_requested(std::env::var("LOG_FORMAT").ok().as_deref());

    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbosity > 0),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_overrides_verbosity() {
        assert_eq!(default_directive(3, true), "warn");
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_directive(0, false), "info");
        assert_eq!(default_directive(1, false), "info,minutes=debug");
        assert_eq!(default_directive(2, false), "trace");
    }

    #[test]
    fn json_format_detection() {
        assert!(json_requested(Some("json")));
        assert!(json_requested(Some(" JSON ")));
        assert!(!json_requested(Some("pretty")));
        assert!(!json_requested(None));
    }
}
