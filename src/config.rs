//! Run parameters

use std::path::PathBuf;
use std::time::Duration;

use crate::negotiate::Constraints;

pub use crate::io::mmap::stream::DEFAULT_TIMEOUT;

/// Parameters of a capture run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of frames to capture, at least 1
    pub frames: u32,
    /// Number of buffers to request from the driver, at least 1
    pub buffers: u32,
    pub constraints: Constraints,
    /// Readiness timeout per frame
    pub timeout: Duration,
    /// Directory the frames are written to
    pub output_dir: PathBuf,
}

impl Config {
    /// Returns a configuration with the default timeout and output directory
    ///
    /// Counts below 1 are raised to 1.
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::config::Config;
    /// let config = Config::new(-3, 4, false);
    /// assert_eq!(config.frames, 1);
    /// assert_eq!(config.buffers, 4);
    /// ```
    pub fn new(frames: i64, buffers: i64, prefer_compressed: bool) -> Self {
        Config {
            frames: clamp_count(frames),
            buffers: clamp_count(buffers),
            constraints: Constraints { prefer_compressed },
            timeout: DEFAULT_TIMEOUT,
            output_dir: PathBuf::from("."),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(1, 1, false)
    }
}

fn clamp_count(count: i64) -> u32 {
    count.clamp(1, u32::MAX as i64) as u32
}
