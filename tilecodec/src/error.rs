use std::error;
use std::fmt;

/// Errors surfaced by [`crate::encode`] and [`crate::decode`].
///
/// Mirrors the teacher codec's hand-rolled marker/box error enums: one
/// struct-like variant per failure mode, a manual [`fmt::Display`] impl, no
/// `thiserror`/`anyhow` dependency.
#[derive(Debug, PartialEq, Eq)]
pub enum TileCodecError {
    UnsupportedVersion { version: u8 },
    UnknownTileType { index: u16 },
    StringTooLong { field: &'static str, len: usize, max: usize },
    InvalidString { len: usize, max: usize },
    Truncated,
    InvalidInput { reason: String },
    InvalidStepCode { code: u8 },
}

impl error::Error for TileCodecError {}

impl fmt::Display for TileCodecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { version } => {
                write!(f, "unsupported codec version {}", version)
            }
            Self::UnknownTileType { index } => {
                write!(f, "tile references unknown palette index {}", index)
            }
            Self::StringTooLong { field, len, max } => {
                write!(
                    f,
                    "field {:?} has length {} exceeding max {}",
                    field, len, max
                )
            }
            Self::InvalidString { len, max } => {
                write!(
                    f,
                    "decoded string length {} exceeds field max {}",
                    len, max
                )
            }
            Self::Truncated => write!(f, "reader reached end of buffer mid-field"),
            Self::InvalidInput { reason } => write!(f, "invalid input: {}", reason),
            Self::InvalidStepCode { code } => write!(f, "invalid step code {}", code),
        }
    }
}
