use std::fmt;

use crate::fraction::Fraction;
use crate::v4l_sys::{v4l2_cropcap, v4l2_rect};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Rectangle in device pixel coordinates
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left: {}, top: {}, width: {}, height: {}",
            self.left, self.top, self.width, self.height
        )
    }
}

impl From<v4l2_rect> for Rect {
    fn from(rect: v4l2_rect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Cropping limits as returned by [`crate::v4l2::vidioc::VIDIOC_CROPCAP`]
pub struct CropCapabilities {
    /// Area in which cropping is possible
    pub bounds: Rect,
    /// Default cropping rectangle, covering the whole picture
    pub defrect: Rect,
    /// Pixel aspect (y / x) when no scaling is applied
    pub pixelaspect: Fraction,
}

impl fmt::Display for CropCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bounds      : {}", self.bounds)?;
        writeln!(f, "defrect     : {}", self.defrect)?;
        writeln!(f, "pixelaspect : {}", self.pixelaspect)?;
        Ok(())
    }
}

impl From<v4l2_cropcap> for CropCapabilities {
    fn from(cropcap: v4l2_cropcap) -> Self {
        Self {
            bounds: Rect::from(cropcap.bounds),
            defrect: Rect::from(cropcap.defrect),
            pixelaspect: Fraction::from(cropcap.pixelaspect),
        }
    }
}
