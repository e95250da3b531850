use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "tickerlens_core=debug,tickerlens_cli=debug,info";

/// Filter directive: `--verbose` wins, then `RUST_LOG`, then `warn`.
pub fn filter_directive(verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return String::from(VERBOSE_DIRECTIVE);
    }
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| String::from(DEFAULT_DIRECTIVE))
}

/// Installs a stderr fmt layer so stdout carries only the JSON envelope.
pub fn init_logging(verbose: bool) {
    let directive = filter_directive(verbose, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_overrides_rust_log() {
        assert_eq!(
            filter_directive(true, Some(String::from("error"))),
            VERBOSE_DIRECTIVE
        );
    }

    #[test]
    fn rust_log_is_used_when_set() {
        assert_eq!(filter_directive(false, Some(String::from("info"))), "info");
        assert_eq!(filter_directive(false, Some(String::from("  "))), "warn");
        assert_eq!(filter_directive(false, None), "warn");
    }
}
