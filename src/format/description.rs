use bitflags::bitflags;
use std::{fmt, str};

use crate::format::FourCC;
use crate::v4l_sys::v4l2_fmtdesc;

bitflags! {
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Flags : u32 {
        const COMPRESSED            = 0x0001;
        const EMULATED              = 0x0002;
        const CONTINUOUS_BITSTREAM  = 0x0004;
        const DYN_RESOLUTION        = 0x0008;
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
        if self.is_empty() {
            return write!(f, "none");
        }

        let mut prefix = "";
        for (name, _) in self.iter_names() {
            write!(f, "{}{}", prefix, name)?;
            prefix = ", ";
        }

        // flags we do not recognize
        let unknown = self.bits() & !Self::all().bits();
        if unknown != 0 {
            write!(f, "{}{:#010x}", prefix, unknown)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Format description as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FMT`]
pub struct Description {
    pub index: u32,
    pub typ: u32,
    pub flags: Flags,
    pub description: String,
    pub fourcc: FourCC,
}

impl Description {
    /// Whether the driver reports this pixelformat as compressed (MJPEG, H.264, ..)
    pub fn compressed(&self) -> bool {
        self.flags.contains(Flags::COMPRESSED)
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "index       : {}", self.index)?;
        writeln!(f, "type        : {}", crate::buffer::type_name(self.typ))?;
        writeln!(f, "flags       : {}", self.flags)?;
        writeln!(f, "description : {}", self.description)?;
        writeln!(f, "fourcc      : {}", self.fourcc)?;
        Ok(())
    }
}

impl From<v4l2_fmtdesc> for Description {
    fn from(desc: v4l2_fmtdesc) -> Self {
        Self {
            index: desc.index,
            typ: desc.type_,
            flags: Flags::from(desc.flags),
            description: String::from_utf8_lossy(&desc.description)
                .trim_matches(char::from(0))
                .to_string(),
            fourcc: FourCC::from(desc.pixelformat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_render_names_and_unknown_bits() {
        assert_eq!(Flags::empty().to_string(), "none");
        assert_eq!(Flags::from(0x0003).to_string(), "COMPRESSED, EMULATED");
        assert_eq!(Flags::from(0x0101).to_string(), "COMPRESSED, 0x00000100");
    }
}
