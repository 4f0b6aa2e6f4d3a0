//! Capture sessions
//!
//! A session threads one device through negotiation, buffer allocation and streaming:
//!
//! ```no_run
//! use v4l2_capture::{config::Config, device::Device, session::CaptureSession, sink::FileSink};
//!
//! let dev = Device::with_path("/dev/video0").unwrap();
//! let config = Config::new(5, 4, false);
//! let mut session = CaptureSession::open(&dev, &config).unwrap();
//! let summary = session.capture(&mut FileSink::new(".")).unwrap();
//! session.close().unwrap();
//! println!("{} frames stored", summary.stored);
//! ```

use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::io::mmap::{Arena, Stream, Summary};
use crate::io::traits::Driver;
use crate::negotiate::{self, CaptureFormat, DeviceCapabilities};
use crate::sink::Sink;
use crate::video::Capture;

/// State of a negotiated device with mapped buffers
///
/// Buffers are released by [`CaptureSession::close`], or when the session is dropped.
pub struct CaptureSession<'d, D: Capture + Driver + ?Sized> {
    caps: DeviceCapabilities,
    selected: CaptureFormat,
    applied: Format,
    arena: Arena<'d, D>,
    frames: u32,
    timeout: Duration,
}

impl<'d, D: Capture + Driver + ?Sized> CaptureSession<'d, D> {
    /// Negotiates a format and maps the capture buffers
    ///
    /// The device must support video capture and streaming. Nothing is allocated unless a
    /// format matching the constraints of `config` was found and applied.
    pub fn open(dev: &'d D, config: &Config) -> Result<Self> {
        let caps = negotiate::query(dev)?;
        negotiate::check_capabilities(&caps)?;

        let selected = negotiate::select_format(&caps, &config.constraints)?;
        tracing::info!(format = %selected, "format selected");

        let applied = dev
            .set_format(&Format::from(selected))
            .map_err(|e| Error::device("VIDIOC_S_FMT", e))?;
        tracing::info!(
            width = applied.width,
            height = applied.height,
            fourcc = %applied.fourcc,
            stride = applied.stride,
            size = applied.size,
            "format applied"
        );

        let mut arena = Arena::allocate(dev, config.buffers)?;
        arena.map_all()?;

        Ok(CaptureSession {
            caps,
            selected,
            applied,
            arena,
            frames: config.frames,
            timeout: config.timeout,
        })
    }

    /// Returns the capability snapshot taken while opening
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.caps
    }

    /// Returns the format chosen during negotiation
    pub fn selected_format(&self) -> CaptureFormat {
        self.selected
    }

    /// Returns the format the driver actually applied
    pub fn format(&self) -> Format {
        self.applied
    }

    pub fn arena(&self) -> &Arena<'d, D> {
        &self.arena
    }

    /// Captures the configured number of frames into `sink`
    ///
    /// Streaming is stopped again before this returns, whatever the outcome.
    pub fn capture(&mut self, sink: &mut dyn Sink) -> Result<Summary> {
        let mut stream = Stream::new(&mut self.arena);
        stream.set_timeout(self.timeout);
        stream.run_capture_loop(self.frames, self.applied.fourcc, sink)
    }

    /// Releases all buffers
    pub fn close(mut self) -> Result<()> {
        self.arena.release()
    }
}

/// Opens a session, captures into `sink` and tears the session down again
///
/// Buffers are released on every path. If capturing failed, that error is returned and a
/// failure to release is only logged.
pub fn run<D: Capture + Driver + ?Sized>(
    dev: &D,
    config: &Config,
    sink: &mut dyn Sink,
) -> Result<Summary> {
    let mut session = CaptureSession::open(dev, config)?;
    let captured = session.capture(sink);
    let closed = session.close();

    match (captured, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!("{}", close_err);
            }
            Err(e)
        }
    }
}
