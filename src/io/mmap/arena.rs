use std::{io, slice};

use crate::error::{Error, Result};
use crate::io::mmap::buffer::{MappedBuffer, State};
use crate::io::traits::Driver;

/// Manage mapped buffers
///
/// The pool size is fixed once the driver committed a buffer count. All buffers are unmapped
/// on [`Arena::release`], or in the Drop impl if the owner never released them.
pub struct Arena<'a, D: Driver + ?Sized> {
    dev: &'a D,
    bufs: Vec<MappedBuffer>,
    count: u32,
    released: bool,
}

impl<'a, D: Driver + ?Sized> Arena<'a, D> {
    /// Requests buffers from the driver
    ///
    /// The driver may commit a different count than requested, the committed count is the one
    /// returned by [`Arena::len`]. Nothing is mapped yet, see [`Arena::map_all`].
    ///
    /// # Arguments
    ///
    /// * `dev` - Device to allocate the buffers on
    /// * `count` - Number of buffers to request, at least one is always requested
    pub fn allocate(dev: &'a D, count: u32) -> Result<Self> {
        let requested = count.max(1);
        let committed = dev.request_buffers(requested).map_err(Error::Allocation)?;
        if committed == 0 {
            return Err(Error::Allocation(io::Error::new(
                io::ErrorKind::Other,
                "driver committed no buffers",
            )));
        }

        tracing::info!(requested, committed, "buffers allocated");

        Ok(Arena {
            dev,
            bufs: Vec::with_capacity(committed as usize),
            count: committed,
            released: false,
        })
    }

    /// Maps every committed buffer into memory
    ///
    /// If querying or mapping buffer `k` fails, buffers `0..k` are unmapped again before the
    /// error is returned.
    pub fn map_all(&mut self) -> Result<()> {
        for index in self.bufs.len() as u32..self.count {
            if let Err(e) = self.map_one(index) {
                if let Err(unmap_err) = self.unmap_all() {
                    tracing::warn!("rolling back mappings failed: {}", unmap_err);
                }
                return Err(e);
            }
        }

        Ok(())
    }

    fn map_one(&mut self, index: u32) -> Result<()> {
        let info = self
            .dev
            .query_buffer(index)
            .map_err(|source| Error::Mapping { index, source })?;
        let ptr = self
            .dev
            .map(info.length as usize, info.offset)
            .map_err(|source| Error::Mapping { index, source })?;

        tracing::debug!(index, length = info.length, offset = info.offset, "buffer mapped");

        self.bufs.push(MappedBuffer {
            index,
            ptr,
            length: info.length as usize,
            offset: info.offset,
            state: State::Free,
        });
        Ok(())
    }

    /// Unmaps all buffers and returns the first unmap failure, if any
    fn unmap_all(&mut self) -> io::Result<()> {
        let mut result = Ok(());
        for buf in self.bufs.drain(..) {
            if let Err(e) = unsafe { self.dev.unmap(buf.ptr, buf.length) } {
                tracing::warn!(index = buf.index, "unmapping buffer failed: {}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }

    /// Unmaps every buffer and hands the buffers back to the driver
    ///
    /// Calling this more than once is a no-op.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let result = self.unmap_all();

        // free all buffers by requesting 0
        if let Err(e) = self.dev.request_buffers(0) {
            tracing::warn!("freeing driver buffers failed: {}", e);
        }

        result.map_err(|e| Error::device("munmap", e))
    }

    /// Number of buffers committed by the driver
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of buffers currently mapped
    pub fn mapped(&self) -> usize {
        self.bufs.len()
    }

    /// Returns the device the buffers live on
    pub fn device(&self) -> &'a D {
        self.dev
    }

    pub fn get(&self, index: u32) -> Option<&MappedBuffer> {
        self.bufs.get(index as usize)
    }

    /// Returns all mapped buffers, ordered by index
    pub fn buffers(&self) -> &[MappedBuffer] {
        &self.bufs
    }

    pub fn state(&self, index: u32) -> Option<State> {
        self.get(index).map(|buf| buf.state)
    }

    /// Returns the full contents of a buffer
    ///
    /// Only buffers owned by the process can be read.
    pub fn data(&self, index: u32) -> Result<&[u8]> {
        let buf = self.get(index).ok_or_else(|| out_of_range("read", index))?;
        if buf.state != State::Free {
            return Err(Error::InvalidBuffer {
                index,
                state: buf.state,
            });
        }

        // the mapping stays alive until release, which needs &mut self
        Ok(unsafe { slice::from_raw_parts(buf.ptr.as_ptr(), buf.length) })
    }

    pub(crate) fn mark_queued(&mut self, index: u32) {
        if let Some(buf) = self.bufs.get_mut(index as usize) {
            buf.state = State::Queued;
        }
    }

    pub(crate) fn mark_free(&mut self, index: u32) {
        if let Some(buf) = self.bufs.get_mut(index as usize) {
            buf.state = State::Free;
        }
    }

    pub(crate) fn mark_all_free(&mut self) {
        for buf in &mut self.bufs {
            buf.state = State::Free;
        }
    }
}

pub(crate) fn out_of_range(request: &'static str, index: u32) -> Error {
    Error::device(
        request,
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("buffer index {} out of range", index),
        ),
    )
}

impl<'a, D: Driver + ?Sized> Drop for Arena<'a, D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("releasing buffers failed: {}", e);
        }
    }
}
