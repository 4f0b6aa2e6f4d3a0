//! Error types for capture sessions

use std::{io, time::Duration};

use thiserror::Error;

use crate::io::mmap::buffer::State;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between opening a device and tearing the session down
#[derive(Debug, Error)]
pub enum Error {
    /// A device request failed for a reason other than "enumeration exhausted"
    #[error("{request} failed: {source}")]
    Device {
        request: &'static str,
        #[source]
        source: io::Error,
    },

    /// The device lacks a capability required for streaming capture
    #[error("device does not support {0}")]
    MissingCapability(&'static str),

    /// No enumerated format/size pair satisfies the constraints
    #[error("no frame format is suitable for capturing")]
    NoSuitableFormat,

    /// The driver refused to allocate buffers
    #[error("buffer allocation failed: {0}")]
    Allocation(#[source] io::Error),

    /// Querying or mapping a buffer failed; earlier mappings were rolled back
    #[error("mapping buffer {index} failed: {source}")]
    Mapping {
        index: u32,
        #[source]
        source: io::Error,
    },

    #[error("VIDIOC_STREAMON failed: {0}")]
    StreamOn(#[source] io::Error),

    #[error("VIDIOC_STREAMOFF failed: {0}")]
    StreamOff(#[source] io::Error),

    /// No buffer became ready within the readiness timeout
    #[error("no data within {0:?}, timeout expired")]
    Timeout(Duration),

    /// A buffer index was used against its ownership state
    #[error("buffer {index} cannot be used while {state}")]
    InvalidBuffer { index: u32, state: State },

    /// A frame could not be persisted
    #[error("storing frame {sequence} failed: {source}")]
    Sink {
        sequence: u32,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wraps a failed device request
    pub fn device(request: &'static str, source: io::Error) -> Self {
        Error::Device { request, source }
    }

    /// Whether the session has to be aborted
    ///
    /// Readiness timeouts and sink failures only affect a single frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Timeout(_) | Error::Sink { .. })
    }
}

/// Whether a failed enumeration request means "no more entries"
pub(crate) fn is_exhausted(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINVAL)
}
