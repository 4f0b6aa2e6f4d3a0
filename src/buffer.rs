use bitflags::bitflags;
use std::fmt;

use crate::timestamp::Timestamp;

/// Buffer type
///
/// Specific types of devices require buffers of corresponding types.
/// Only [`Type::VideoCapture`] is used for streaming by this crate.
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    VideoCapture        = 1,
    VideoOutput         = 2,
    VideoOverlay        = 3,
    VbiCapture          = 4,
    VbiOutput           = 5,
    SlicedVbiCapture    = 6,
    SlicedVbiOutput     = 7,
    VideoOutputOverlay  = 8,
    VideoCaptureMplane  = 9,
    VideoOutputMplane   = 10,
    SdrCapture          = 11,
    SdrOutput           = 12,
    MetaCapture         = 13,
    MetaOutput          = 14,
}

impl TryFrom<u32> for Type {
    type Error = ();

    fn try_from(repr: u32) -> Result<Self, Self::Error> {
        match repr {
            1 => Ok(Type::VideoCapture),
            2 => Ok(Type::VideoOutput),
            3 => Ok(Type::VideoOverlay),
            4 => Ok(Type::VbiCapture),
            5 => Ok(Type::VbiOutput),
            6 => Ok(Type::SlicedVbiCapture),
            7 => Ok(Type::SlicedVbiOutput),
            8 => Ok(Type::VideoOutputOverlay),
            9 => Ok(Type::VideoCaptureMplane),
            10 => Ok(Type::VideoOutputMplane),
            11 => Ok(Type::SdrCapture),
            12 => Ok(Type::SdrOutput),
            13 => Ok(Type::MetaCapture),
            14 => Ok(Type::MetaOutput),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Type::VideoCapture => "video capture",
            Type::VideoOutput => "video output",
            Type::VideoOverlay => "video overlay",
            Type::VbiCapture => "VBI capture",
            Type::VbiOutput => "VBI output",
            Type::SlicedVbiCapture => "sliced VBI capture",
            Type::SlicedVbiOutput => "sliced VBI output",
            Type::VideoOutputOverlay => "video output overlay",
            Type::VideoCaptureMplane => "video capture (multi-planar)",
            Type::VideoOutputMplane => "video output (multi-planar)",
            Type::SdrCapture => "SDR capture",
            Type::SdrOutput => "SDR output",
            Type::MetaCapture => "metadata capture",
            Type::MetaOutput => "metadata output",
        };
        write!(f, "{}", name)
    }
}

/// Name of a raw `v4l2_buf_type` value as reported by the driver
pub fn type_name(raw: u32) -> String {
    match Type::try_from(raw) {
        Ok(typ) => typ.to_string(),
        Err(()) => format!("unknown ({})", raw),
    }
}

bitflags! {
    #[allow(clippy::unreadable_literal)]
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Buffer is mapped
        const MAPPED                = 0x00000001;
        /// Buffer is queued for processing
        const QUEUED                = 0x00000002;
        /// Buffer is ready
        const DONE                  = 0x00000004;
        /// Image is a keyframe (I-frame)
        const KEYFRAME              = 0x00000008;
        /// Image is a P-frame
        const PFRAME                = 0x00000010;
        /// Image is a B-frame
        const BFRAME                = 0x00000020;
        /// Buffer is ready, but the data contained within is corrupted
        const ERROR                 = 0x00000040;
        /// Buffer is added to an unqueued request
        const IN_REQUEST            = 0x00000080;
        /// Timecode field is valid
        const TIMECODE              = 0x00000100;
        /// Buffer is prepared for queuing
        const PREPARED              = 0x00000400;
        /// Cache handling flags
        const NO_CACHE_INVALIDATE   = 0x00000800;
        const NO_CACHE_CLEAN        = 0x00001000;
        /// Timestamp type
        const TIMESTAMP_MONOTONIC   = 0x00002000;
        const TIMESTAMP_COPY        = 0x00004000;
        /// Timestamp sources
        const TSTAMP_SRC_SOE        = 0x00010000;
        /// mem2mem encoder/decoder
        const LAST                  = 0x00100000;
        /// request_fd is valid
        const REQUEST_FD            = 0x00800000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_retain(flags)
    }
}

impl From<Flags> for u32 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Buffer metadata, as filled in by the driver on dequeue
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Index of the buffer within the pool
    pub index: u32,
    /// Number of bytes occupied by data in the buffer
    pub bytesused: u32,
    /// Buffer flags
    pub flags: Flags,
    /// Time of capture (usually set by the driver)
    pub timestamp: Timestamp,
    /// Sequence number, counting the frames
    pub sequence: u32,
}
