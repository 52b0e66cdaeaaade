//! Log setup for binaries built on the lab.
//!
//! The library only emits `tracing` events; nothing is printed unless a
//! subscriber is installed here.
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;

/// Install a compact stderr formatter capped at `level`.
///
/// Stdout is left to the command output. Fails if a global subscriber is
/// already set.
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Map `-v` repetitions onto a level, starting from `base`.
pub fn level_for_verbosity(base: Level, verbose: u8) -> Level {
    match verbose {
        0 => base,
        1 if base < Level::DEBUG => Level::DEBUG,
        1 => base,
        _ => Level::TRACE,
    }
}
