use std::fmt;

use crate::v4l_sys::*;
use crate::{format::FourCC, fraction::Fraction};

#[derive(Debug, Clone)]
/// Frame interval as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FRAMEINTERVALS`]
pub struct FrameInterval {
    pub index: u32,
    pub fourcc: FourCC,
    pub width: u32,
    pub height: u32,
    pub typ: u32,
    pub interval: FrameIntervalEnum,
}

impl fmt::Display for FrameInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.interval.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameIntervalEnum {
    Discrete(Fraction),
    Continuous(Stepwise),
    Stepwise(Stepwise),
}

impl fmt::Display for FrameIntervalEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameIntervalEnum::Discrete(val) => write!(f, "Discrete({})", val)?,
            FrameIntervalEnum::Continuous(val) => write!(f, "Continuous({})", val)?,
            FrameIntervalEnum::Stepwise(val) => write!(f, "Stepwise({})", val)?,
        }

        Ok(())
    }
}

impl TryFrom<v4l2_frmivalenum> for FrameIntervalEnum {
    type Error = String;

    fn try_from(desc: v4l2_frmivalenum) -> Result<Self, Self::Error> {
        // Unsafe because of access to union __bindgen_anon_1, which is tagged by `type_`
        unsafe {
            let stepwise = || Stepwise {
                min: Fraction::from(desc.__bindgen_anon_1.stepwise.min),
                max: Fraction::from(desc.__bindgen_anon_1.stepwise.max),
                step: Fraction::from(desc.__bindgen_anon_1.stepwise.step),
            };

            match desc.type_ {
                v4l2_frmivaltypes_V4L2_FRMIVAL_TYPE_DISCRETE => Ok(FrameIntervalEnum::Discrete(
                    Fraction::from(desc.__bindgen_anon_1.discrete),
                )),
                v4l2_frmivaltypes_V4L2_FRMIVAL_TYPE_CONTINUOUS => {
                    Ok(FrameIntervalEnum::Continuous(stepwise()))
                }
                v4l2_frmivaltypes_V4L2_FRMIVAL_TYPE_STEPWISE => {
                    Ok(FrameIntervalEnum::Stepwise(stepwise()))
                }
                typ => Err(format!("Unknown frame interval type: {}", typ)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stepwise {
    /// Minimum frame interval (in seconds).
    pub min: Fraction,
    /// Maximum frame interval (in seconds).
    pub max: Fraction,
    /// Frame interval step size (in seconds).
    pub step: Fraction,
}

impl fmt::Display for Stepwise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} with step {}", self.min, self.max, self.step)?;
        Ok(())
    }
}

impl TryFrom<v4l2_frmivalenum> for FrameInterval {
    type Error = String;

    fn try_from(desc: v4l2_frmivalenum) -> Result<Self, Self::Error> {
        Ok(FrameInterval {
            index: desc.index,
            fourcc: FourCC::from(desc.pixel_format),
            width: desc.width,
            height: desc.height,
            typ: desc.type_,
            interval: FrameIntervalEnum::try_from(desc)?,
        })
    }
}

/// Name of a raw `v4l2_frmivaltypes` value
pub fn type_name(typ: u32) -> &'static str {
    match typ {
        v4l2_frmivaltypes_V4L2_FRMIVAL_TYPE_DISCRETE => "discrete",
        v4l2_frmivaltypes_V4L2_FRMIVAL_TYPE_CONTINUOUS => "continuous",
        v4l2_frmivaltypes_V4L2_FRMIVAL_TYPE_STEPWISE => "stepwise",
        _ => "unknown",
    }
}
