use thiserror::Error;

/// Errors raised while building a dataset.
///
/// Only these surface to the caller of a load; everything else the core
/// handles internally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error(
        "parallel arrays disagree: {positions} positions, {colors} colors, {labels} labels, {media} media paths"
    )]
    Mismatch {
        positions: usize,
        colors: usize,
        labels: usize,
        media: usize,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// A playback that could not be started. Recoverable; the scheduler logs and drops it.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("cannot resolve media '{0}'")]
    Unresolvable(String),

    #[error("cannot decode '{media}': {reason}")]
    Decode { media: String, reason: String },

    #[error("audio output unavailable: {0}")]
    Output(String),
}
