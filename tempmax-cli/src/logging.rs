//! Tracing subscriber initialization.
//!
//! Filter priority, highest first: `TEMPMAX_LOG`, `RUST_LOG`, the
//! `--verbose` / `--quiet` flags, then `warn`.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_ENV: &str = "TEMPMAX_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Install the global subscriber writing to stderr. Call once, first thing in `main`.
pub fn init_subscriber(verbosity: Verbosity, no_color: bool) {
    let use_ansi = !no_color && std::io::IsTerminal::is_terminal(&std::io::stderr());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(verbosity == Verbosity::Verbose);

    tracing_subscriber::registry()
        .with(build_env_filter(verbosity))
        .with(fmt_layer.without_time().compact())
        .init();
}

fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    // Unparseable directives fall through to the next source.
    if let Ok(directives) = std::env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    default_filter(verbosity)
}

fn default_filter(verbosity: Verbosity) -> EnvFilter {
    let level = verbosity.default_level().as_str().to_ascii_lowercase();
    if verbosity == Verbosity::Verbose {
        EnvFilter::new(format!("warn,tempmax_core={level},tempmax={level}"))
    } else {
        EnvFilter::new(level)
    }
}
