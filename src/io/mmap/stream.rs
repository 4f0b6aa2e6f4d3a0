use std::time::Duration;

use crate::buffer::Metadata;
use crate::error::{Error, Result};
use crate::format::FourCC;
use crate::io::mmap::arena::{out_of_range, Arena};
use crate::io::mmap::buffer::State;
use crate::io::traits::Driver;
use crate::sink::{Frame, Sink};

/// How long to wait for a buffer before giving up on a frame
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of a capture run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Number of frames asked for
    pub requested: u32,
    /// Number of frames dequeued from the driver
    pub captured: u32,
    /// Number of frames the sink accepted
    pub stored: u32,
    /// Whether the run ended early because no buffer became ready in time
    pub timed_out: bool,
}

/// Stream of mapped buffers
///
/// The stream drives the buffers of an [`Arena`] between the process and the driver. It
/// starts out idle; streaming is stopped again when the stream is dropped.
pub struct Stream<'s, 'a, D: Driver + ?Sized> {
    arena: &'s mut Arena<'a, D>,
    timeout: Duration,
    active: bool,
}

impl<'s, 'a, D: Driver + ?Sized> Stream<'s, 'a, D> {
    /// Returns an idle stream over the buffers of `arena`
    pub fn new(arena: &'s mut Arena<'a, D>) -> Self {
        Stream {
            arena,
            timeout: DEFAULT_TIMEOUT,
            active: false,
        }
    }

    /// Sets the readiness timeout for [`Stream::capture_one`]
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the device is streaming
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the buffer pool
    pub fn arena(&self) -> &Arena<'a, D> {
        &*self.arena
    }

    /// Hands every free buffer to the driver
    pub fn queue_all(&mut self) -> Result<()> {
        for index in 0..self.arena.mapped() as u32 {
            if self.arena.state(index) == Some(State::Free) {
                self.queue(index)?;
            }
        }

        Ok(())
    }

    fn queue(&mut self, index: u32) -> Result<()> {
        self.arena
            .device()
            .queue_buffer(index)
            .map_err(|e| Error::device("VIDIOC_QBUF", e))?;
        self.arena.mark_queued(index);
        Ok(())
    }

    /// Starts streaming
    ///
    /// Buffers should be queued beforehand, see [`Stream::queue_all`].
    pub fn start(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }

        self.arena.device().stream_on().map_err(Error::StreamOn)?;
        self.active = true;
        Ok(())
    }

    /// Stops streaming
    ///
    /// The driver drops its queue on stream-off, so all buffers belong to the process again
    /// afterwards, even if the request failed.
    pub fn stop(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        self.active = false;
        let result = self.arena.device().stream_off();
        self.arena.mark_all_free();
        result.map_err(Error::StreamOff)
    }

    /// Takes back buffers queued before streaming could start
    fn reclaim(&mut self) {
        // stream-off also empties the queue of an idle device
        if let Err(e) = self.arena.device().stream_off() {
            tracing::warn!("reclaiming queued buffers failed: {}", e);
        }
        self.arena.mark_all_free();
    }

    /// Waits for the driver to fill a buffer and takes it back
    ///
    /// The returned buffer is free and can be read through the arena until it is handed back
    /// with [`Stream::requeue`]. `bytesused` never exceeds the buffer length.
    pub fn capture_one(&mut self) -> Result<Metadata> {
        let dev = self.arena.device();
        let ready = dev
            .wait_readable(self.timeout)
            .map_err(|e| Error::device("pselect", e))?;
        if !ready {
            return Err(Error::Timeout(self.timeout));
        }

        let mut meta = dev
            .dequeue_buffer()
            .map_err(|e| Error::device("VIDIOC_DQBUF", e))?;

        let buf = self
            .arena
            .get(meta.index)
            .ok_or_else(|| out_of_range("VIDIOC_DQBUF", meta.index))?;
        if buf.state() != State::Queued {
            return Err(Error::InvalidBuffer {
                index: meta.index,
                state: buf.state(),
            });
        }
        meta.bytesused = meta.bytesused.min(buf.len() as u32);
        self.arena.mark_free(meta.index);

        tracing::debug!(
            index = meta.index,
            bytesused = meta.bytesused,
            sequence = meta.sequence,
            timestamp = %meta.timestamp,
            flags = %meta.flags,
            "buffer dequeued"
        );

        Ok(meta)
    }

    /// Hands a dequeued buffer back to the driver
    pub fn requeue(&mut self, index: u32) -> Result<()> {
        match self.arena.state(index) {
            Some(State::Free) => self.queue(index),
            Some(state) => Err(Error::InvalidBuffer { index, state }),
            None => Err(out_of_range("VIDIOC_QBUF", index)),
        }
    }

    /// Captures up to `frames` frames into `sink`
    ///
    /// All buffers are queued and streaming is started. Each captured frame is passed to the
    /// sink with a 1-based sequence number, then its buffer is requeued. A readiness timeout
    /// ends the run early, a sink failure is logged and skipped. Stream-off is issued exactly
    /// once before returning, also when queueing or starting failed.
    ///
    /// # Arguments
    ///
    /// * `frames` - Number of frames to capture
    /// * `fourcc` - Pixel format passed along with each frame
    /// * `sink` - Consumer of the frames
    pub fn run_capture_loop(
        &mut self,
        frames: u32,
        fourcc: FourCC,
        sink: &mut dyn Sink,
    ) -> Result<Summary> {
        let mut summary = Summary {
            requested: frames,
            ..Summary::default()
        };

        if let Err(e) = self.queue_all().and_then(|_| self.start()) {
            self.reclaim();
            return Err(e);
        }

        let outcome = self.capture_frames(fourcc, sink, &mut summary);
        let stopped = self.stop();

        match (outcome, stopped) {
            (Ok(()), Ok(())) => {
                tracing::info!(
                    requested = summary.requested,
                    captured = summary.captured,
                    stored = summary.stored,
                    timed_out = summary.timed_out,
                    "capture finished"
                );
                Ok(summary)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(e), Err(stop_err)) => {
                tracing::warn!("{}", stop_err);
                Err(e)
            }
        }
    }

    fn capture_frames(
        &mut self,
        fourcc: FourCC,
        sink: &mut dyn Sink,
        summary: &mut Summary,
    ) -> Result<()> {
        for sequence in 1..=summary.requested {
            let meta = match self.capture_one() {
                Ok(meta) => meta,
                Err(Error::Timeout(timeout)) => {
                    tracing::warn!(sequence, "no data within {:?}, stopping capture", timeout);
                    summary.timed_out = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            summary.captured += 1;

            let stored = {
                let data = self.arena.data(meta.index)?;
                let frame = Frame {
                    data: &data[..meta.bytesused as usize],
                    fourcc,
                    bytes_used: meta.bytesused,
                    sequence,
                };
                sink.store(&frame)
            };
            match stored {
                Ok(()) => summary.stored += 1,
                Err(source) => tracing::warn!("{}", Error::Sink { sequence, source }),
            }

            self.requeue(meta.index)?;
        }

        Ok(())
    }
}

impl<'s, 'a, D: Driver + ?Sized> Drop for Stream<'s, 'a, D> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            if let Error::StreamOff(ref source) = e {
                // ENODEV means the device vanished (unplugged, connection broke down), there is
                // nothing left to stop
                if source.raw_os_error() == Some(libc::ENODEV) {
                    return;
                }
            }
            tracing::warn!("{}", e);
        }
    }
}

