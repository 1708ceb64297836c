use std::io;
use thiserror::Error;

use crate::layout::PlaneKind;

/// Every failure the decoder can report.
///
/// `OutOfBounds`, `CorruptContainer` and `FrameNotFound` are structural and
/// abort the frame being decoded.  `PlaneLayoutMismatch`, `InsufficientData`
/// and `MissingDimensions` are per-plane: the frame decoder records them in the
/// plane's status and carries on with the rest of the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("read of {wanted} bytes at offset {offset} exceeds buffer length {len}")]
    OutOfBounds { offset: usize, wanted: usize, len: usize },

    #[error("corrupt container at offset {offset}: {reason}")]
    CorruptContainer { offset: usize, reason: String },

    #[error("frame {index} not found ({available} frame(s) in recording)")]
    FrameNotFound { index: usize, available: usize },

    #[error("{plane} plane ends at byte {end} but only {available} bytes of plane data exist")]
    PlaneLayoutMismatch { plane: PlaneKind, end: usize, available: usize },

    #[error("insufficient data for {what}: need {needed} bytes, have {available}")]
    InsufficientData { what: &'static str, needed: usize, available: usize },

    #[error("{plane} plane cannot be placed: frame reports zero width or height")]
    MissingDimensions { plane: PlaneKind },

    #[error("IO error: {0}")]
    Io(String),
}

impl DecodeError {
    /// True for errors that terminate decoding of the whole frame.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DecodeError::OutOfBounds { .. }
                | DecodeError::CorruptContainer { .. }
                | DecodeError::FrameNotFound { .. }
                | DecodeError::Io(_)
        )
    }

    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        DecodeError::CorruptContainer { offset, reason: reason.into() }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
