use std::io;

use crate::{
    capability::Capabilities, crop::CropCapabilities, format::Description as FormatDescription,
    format::Format, format::FourCC, frameinterval::FrameInterval, framesize::FrameSize,
};

/// Capture device protocol
///
/// Enumeration requests operate on a single index. Once the index runs past the last entry, the
/// driver answers with `EINVAL`; walking the entries is left to the caller.
pub trait Capture {
    /// Returns the capabilities of the device
    fn query_caps(&self) -> io::Result<Capabilities>;

    /// Returns the capture pixel format at `index`
    fn enum_format(&self, index: u32) -> io::Result<FormatDescription>;

    /// Returns the frame size at `index` supported for the given pixel format
    fn enum_framesize(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSize>;

    /// Returns the frame interval at `index` supported for the given pixel format and frame size
    fn enum_frameinterval(
        &self,
        fourcc: FourCC,
        width: u32,
        height: u32,
        index: u32,
    ) -> io::Result<FrameInterval>;

    /// Returns the cropping limits of the capture buffer type
    fn crop_capabilities(&self) -> io::Result<CropCapabilities>;

    /// Returns the format currently in use
    fn format(&self) -> io::Result<Format>;

    /// Modifies the capture format and returns the actual format
    ///
    /// The driver tries to match the format parameters on a best effort basis.
    /// Thus, if the combination of format properties cannot be achieved, the closest possible
    /// settings are used and reported back.
    ///
    /// # Arguments
    ///
    /// * `fmt` - Desired format
    fn set_format(&self, fmt: &Format) -> io::Result<Format>;
}
