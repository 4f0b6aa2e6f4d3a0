use std::{io, ptr::NonNull, time::Duration};

use crate::buffer::Metadata;

/// Location of a driver-owned buffer, as reported by `VIDIOC_QUERYBUF`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    /// Size of the buffer in bytes
    pub length: u32,
    /// Offset to pass to mmap
    pub offset: u32,
}

/// Buffer exchange with the driver
///
/// All buffers are memory-mapped capture buffers.
pub trait Driver {
    /// Requests `count` buffers and returns the number the driver actually committed
    ///
    /// Requesting zero buffers frees all of them.
    fn request_buffers(&self, count: u32) -> io::Result<u32>;

    /// Returns length and mmap offset of the buffer at `index`
    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo>;

    /// Maps `length` bytes at `offset` read-write, shared with the driver
    fn map(&self, length: usize, offset: u32) -> io::Result<NonNull<u8>>;

    /// Unmaps a region returned by [`Driver::map`]
    ///
    /// # Safety
    ///
    /// `ptr` and `length` must come from a prior `map` call and the region must not be accessed
    /// afterwards.
    unsafe fn unmap(&self, ptr: NonNull<u8>, length: usize) -> io::Result<()>;

    /// Insert a buffer into the drivers' incoming queue
    fn queue_buffer(&self, index: u32) -> io::Result<()>;

    /// Remove a buffer from the drivers' outgoing queue
    ///
    /// The driver picks the buffer; its index is part of the returned metadata.
    fn dequeue_buffer(&self) -> io::Result<Metadata>;

    /// Start streaming
    fn stream_on(&self) -> io::Result<()>;

    /// Stop streaming, the driver drops all queued buffers
    fn stream_off(&self) -> io::Result<()>;

    /// Blocks until a buffer is ready to be dequeued
    ///
    /// Returns `false` if `timeout` elapsed first.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool>;
}
