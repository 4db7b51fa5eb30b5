//! Log subscriber for the ledger host.
//!
//! Every subcommand installs one subscriber before touching the store.
//! Output goes to stderr; `invoke` and `query` reserve stdout for the
//! response JSON so it can be piped.
//!
//! `RUST_LOG` replaces the host's filter entirely when set, e.g.
//! `RUST_LOG=tally_contracts=debug` to see each dispatched operation.

use clap::ValueEnum;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
    Registry,
};

/// Filter used when `RUST_LOG` is unset: the three ledger crates at `info`.
pub const DEFAULT_FILTER: &str = "tally_node=info,tally_contracts=info,tally_protocol=info";

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with source locations.
    Pretty,
    /// One JSON object per event.
    Json,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(format: LogFormat) -> BoxedLayer {
    let base = fmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Pretty => base.with_file(true).with_line_number(true).boxed(),
        LogFormat::Json => base.json().with_current_span(false).boxed(),
    }
}

/// Installs the global subscriber.
///
/// `filter` is an `EnvFilter` directive string. Fails if a subscriber is
/// already installed instead of panicking.
pub fn init_logging(filter: &str, format: LogFormat) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(output_layer(format))
        .with(env_filter)
        .try_init()?;

    tracing::debug!(?format, "log subscriber installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_ignore_case() {
        assert_eq!(LogFormat::from_str("JSON", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("pretty", true), Ok(LogFormat::Pretty));
        assert!(LogFormat::from_str("xml", true).is_err());
    }

    #[test]
    fn second_install_is_an_error() {
        let _ = init_logging(DEFAULT_FILTER, LogFormat::Json);
        assert!(init_logging(DEFAULT_FILTER, LogFormat::Pretty).is_err());
    }
}
