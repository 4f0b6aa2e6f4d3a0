use std::fmt;

use crate::format::FourCC;
use crate::v4l_sys::*;

#[derive(Debug, Clone)]
/// Frame size as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FRAMESIZES`]
pub struct FrameSize {
    pub index: u32,
    pub fourcc: FourCC,
    pub typ: u32,
    pub size: FrameSizeEnum,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.size.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSizeEnum {
    Discrete(Discrete),
    Continuous(Stepwise),
    Stepwise(Stepwise),
}

impl FrameSizeEnum {
    /// Returns the exact size if the driver reported a discrete one
    pub fn discrete(&self) -> Option<&Discrete> {
        match self {
            FrameSizeEnum::Discrete(discrete) => Some(discrete),
            FrameSizeEnum::Continuous(_) | FrameSizeEnum::Stepwise(_) => None,
        }
    }
}

impl fmt::Display for FrameSizeEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSizeEnum::Discrete(val) => write!(f, "Discrete({})", val)?,
            FrameSizeEnum::Continuous(val) => write!(f, "Continuous({})", val)?,
            FrameSizeEnum::Stepwise(val) => write!(f, "Stepwise({})", val)?,
        }

        Ok(())
    }
}

impl TryFrom<v4l2_frmsizeenum> for FrameSizeEnum {
    type Error = String;

    fn try_from(desc: v4l2_frmsizeenum) -> Result<Self, Self::Error> {
        // Unsafe because of access to union __bindgen_anon_1, which is tagged by `type_`
        unsafe {
            let stepwise = || Stepwise {
                min_width: desc.__bindgen_anon_1.stepwise.min_width,
                max_width: desc.__bindgen_anon_1.stepwise.max_width,
                step_width: desc.__bindgen_anon_1.stepwise.step_width,
                min_height: desc.__bindgen_anon_1.stepwise.min_height,
                max_height: desc.__bindgen_anon_1.stepwise.max_height,
                step_height: desc.__bindgen_anon_1.stepwise.step_height,
            };

            match desc.type_ {
                v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_DISCRETE => {
                    Ok(FrameSizeEnum::Discrete(Discrete {
                        width: desc.__bindgen_anon_1.discrete.width,
                        height: desc.__bindgen_anon_1.discrete.height,
                    }))
                }
                v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_CONTINUOUS => {
                    Ok(FrameSizeEnum::Continuous(stepwise()))
                }
                v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_STEPWISE => {
                    Ok(FrameSizeEnum::Stepwise(stepwise()))
                }
                typ => Err(format!("Unknown frame size type: {}", typ)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discrete {
    /// Width of the frame (in pixels).
    pub width: u32,
    /// Height of the frame (in pixels).
    pub height: u32,
}

impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stepwise {
    /// Minimum frame width (in pixels).
    pub min_width: u32,
    /// Maximum frame width (in pixels).
    pub max_width: u32,
    /// Frame width step size (in pixels).
    pub step_width: u32,
    /// Minimum frame height (in pixels).
    pub min_height: u32,
    /// Maximum frame height (in pixels).
    pub max_height: u32,
    /// Frame height step size (in pixels).
    pub step_height: u32,
}

impl fmt::Display for Stepwise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} - {}x{} with step {}/{}",
            self.min_width,
            self.min_height,
            self.max_width,
            self.max_height,
            self.step_width,
            self.step_height,
        )?;
        Ok(())
    }
}

impl TryFrom<v4l2_frmsizeenum> for FrameSize {
    type Error = String;

    fn try_from(desc: v4l2_frmsizeenum) -> Result<Self, Self::Error> {
        Ok(FrameSize {
            index: desc.index,
            typ: desc.type_,
            fourcc: FourCC::from(desc.pixel_format),
            size: FrameSizeEnum::try_from(desc)?,
        })
    }
}

/// Name of a raw `v4l2_frmsizetypes` value
pub fn type_name(typ: u32) -> &'static str {
    match typ {
        v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_DISCRETE => "discrete",
        v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_CONTINUOUS => "continuous",
        v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_STEPWISE => "stepwise",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    fn raw(typ: u32) -> v4l2_frmsizeenum {
        let mut desc: v4l2_frmsizeenum = unsafe { mem::zeroed() };
        desc.type_ = typ;
        desc.pixel_format = u32::from(FourCC::new(b"YUYV"));
        desc
    }

    #[test]
    fn decodes_discrete_size() {
        let mut desc = raw(v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_DISCRETE);
        desc.__bindgen_anon_1.discrete = v4l2_frmsize_discrete {
            width: 640,
            height: 480,
        };

        let size = FrameSize::try_from(desc).unwrap();
        assert_eq!(size.fourcc, FourCC::new(b"YUYV"));
        assert_eq!(
            size.size.discrete(),
            Some(&Discrete {
                width: 640,
                height: 480
            })
        );
        assert_eq!(size.to_string(), "Discrete(640x480)");
    }

    #[test]
    fn stepwise_is_not_discrete() {
        let desc = raw(v4l2_frmsizetypes_V4L2_FRMSIZE_TYPE_STEPWISE);
        let size = FrameSizeEnum::try_from(desc).unwrap();
        assert!(size.discrete().is_none());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(FrameSizeEnum::try_from(raw(7)).is_err());
        assert_eq!(type_name(7), "unknown");
    }
}
