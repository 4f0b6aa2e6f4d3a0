use std::{fmt, ptr::NonNull};

/// Ownership of a mapped buffer
///
/// The memory is shared with the driver. It may only be touched by the process while the buffer
/// is [`State::Free`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// Owned by the process
    Free,
    /// Owned by the driver, which may write into it at any time
    Queued,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Queued => write!(f, "queued"),
        }
    }
}

/// A driver buffer mapped into the address space of the process
#[derive(Debug)]
pub struct MappedBuffer {
    pub(crate) index: u32,
    pub(crate) ptr: NonNull<u8>,
    pub(crate) length: usize,
    pub(crate) offset: u32,
    pub(crate) state: State,
}

impl MappedBuffer {
    /// Position in the pool, as assigned by the driver
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Base address of the mapping
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Size of the mapping in bytes
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Offset the driver reported for mapping this buffer
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn state(&self) -> State {
        self.state
    }
}
