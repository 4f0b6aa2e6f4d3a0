//! Capability negotiation
//!
//! A [`DeviceCapabilities`] snapshot is taken once per session and format selection is a pure
//! function over it.

use std::{fmt, io};

use crate::buffer::Type;
use crate::capability::{self, Capabilities};
use crate::crop::CropCapabilities;
use crate::error::{is_exhausted, Error, Result};
use crate::format::{Description as FormatDescription, Format, FourCC};
use crate::frameinterval::FrameIntervalEnum;
use crate::framesize::FrameSizeEnum;
use crate::video::Capture;

/// Caller requirements for the capture format
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    /// Select a compressed pixelformat (MJPEG, H.264, ..) instead of a raw one
    pub prefer_compressed: bool,
}

/// A frame size supported for a pixelformat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedSize {
    pub size: FrameSizeEnum,
    /// Frame intervals, only enumerated for discrete sizes
    pub intervals: Vec<FrameIntervalEnum>,
}

/// A pixelformat along with its frame sizes, in device order
#[derive(Debug, Clone)]
pub struct SupportedFormat {
    pub description: FormatDescription,
    pub sizes: Vec<SupportedSize>,
}

/// Read-only snapshot of what a device can capture
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub caps: Capabilities,
    pub formats: Vec<SupportedFormat>,
    /// Cropping limits, if the driver reports them
    pub crop: Option<CropCapabilities>,
}

/// The format chosen for capturing
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CaptureFormat {
    pub typ: Type,
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
    pub compressed: bool,
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} ({})",
            self.fourcc,
            self.width,
            self.height,
            if self.compressed { "compressed" } else { "raw" }
        )
    }
}

impl From<CaptureFormat> for Format {
    fn from(fmt: CaptureFormat) -> Self {
        Format::new(fmt.width, fmt.height, fmt.fourcc)
    }
}

/// Walks an enumeration until the driver reports `EINVAL`
fn enumerate<T, F>(request: &'static str, mut next: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> io::Result<T>,
{
    let mut entries = Vec::new();
    loop {
        match next(entries.len() as u32) {
            Ok(entry) => entries.push(entry),
            Err(e) if is_exhausted(&e) => return Ok(entries),
            Err(e) => return Err(Error::device(request, e)),
        }
    }
}

/// Takes a capability snapshot of the device
///
/// Queries the device capabilities, then enumerates all capture pixelformats, their frame
/// sizes and, for discrete sizes, their frame intervals. Missing crop capabilities are not
/// an error.
pub fn query<C: Capture + ?Sized>(dev: &C) -> Result<DeviceCapabilities> {
    let caps = dev
        .query_caps()
        .map_err(|e| Error::device("VIDIOC_QUERYCAP", e))?;
    let version = format!("{}.{}.{}", caps.version.0, caps.version.1, caps.version.2);
    tracing::info!(
        driver = %caps.driver,
        card = %caps.card,
        bus = %caps.bus,
        %version,
        capabilities = %caps.capabilities,
        "device capabilities"
    );

    let descriptions = enumerate("VIDIOC_ENUM_FMT", |index| dev.enum_format(index))?;
    let mut formats = Vec::with_capacity(descriptions.len());
    for description in descriptions {
        tracing::debug!(
            index = description.index,
            fourcc = %description.fourcc,
            flags = %description.flags,
            "format: {}",
            description.description
        );

        let fourcc = description.fourcc;
        let framesizes = enumerate("VIDIOC_ENUM_FRAMESIZES", |index| {
            dev.enum_framesize(fourcc, index)
        })?;

        let mut sizes = Vec::with_capacity(framesizes.len());
        for framesize in framesizes {
            tracing::debug!(%fourcc, index = framesize.index, "frame size: {}", framesize);

            let intervals = match framesize.size.discrete() {
                Some(discrete) => {
                    let (width, height) = (discrete.width, discrete.height);
                    enumerate("VIDIOC_ENUM_FRAMEINTERVALS", |index| {
                        dev.enum_frameinterval(fourcc, width, height, index)
                    })?
                    .into_iter()
                    .map(|ival| {
                        tracing::debug!(%fourcc, width, height, "frame interval: {}", ival);
                        ival.interval
                    })
                    .collect()
                }
                None => Vec::new(),
            };

            sizes.push(SupportedSize {
                size: framesize.size,
                intervals,
            });
        }

        formats.push(SupportedFormat { description, sizes });
    }

    let crop = match dev.crop_capabilities() {
        Ok(crop) => {
            tracing::debug!("crop capabilities: {}", crop);
            Some(crop)
        }
        Err(e) => {
            tracing::warn!("VIDIOC_CROPCAP failed: {}", e);
            None
        }
    };

    Ok(DeviceCapabilities {
        caps,
        formats,
        crop,
    })
}

/// Ensures the device can stream captured video
pub fn check_capabilities(caps: &DeviceCapabilities) -> Result<()> {
    let flags = caps.caps.capabilities;
    if !flags.contains(capability::Flags::VIDEO_CAPTURE) {
        return Err(Error::MissingCapability("video capture"));
    }
    if !flags.contains(capability::Flags::STREAMING) {
        return Err(Error::MissingCapability("streaming"));
    }

    Ok(())
}

/// Picks the capture format
///
/// Returns the first discrete frame size of the first pixelformat whose compression matches
/// the constraints, both in device order. Continuous and stepwise sizes are never selected.
pub fn select_format(
    caps: &DeviceCapabilities,
    constraints: &Constraints,
) -> Result<CaptureFormat> {
    caps.formats
        .iter()
        .filter(|fmt| fmt.description.compressed() == constraints.prefer_compressed)
        .find_map(|fmt| {
            fmt.sizes
                .iter()
                .find_map(|size| size.size.discrete())
                .map(|discrete| CaptureFormat {
                    typ: Type::VideoCapture,
                    width: discrete.width,
                    height: discrete.height,
                    fourcc: fmt.description.fourcc,
                    compressed: fmt.description.compressed(),
                })
        })
        .ok_or(Error::NoSuitableFormat)
}
