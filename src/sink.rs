//! Frame consumers

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::format::FourCC;

/// A captured frame, borrowed from a mapped buffer
///
/// The data is only valid until the buffer is handed back to the driver.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Payload, `bytes_used` bytes long
    pub data: &'a [u8],
    /// Pixel format of the payload
    pub fourcc: FourCC,
    pub bytes_used: u32,
    /// 1-based position of the frame within the run
    pub sequence: u32,
}

/// Persists captured frames
pub trait Sink {
    /// Consumes a frame
    ///
    /// A failure is reported for this frame only, capturing carries on.
    fn store(&mut self, frame: &Frame) -> io::Result<()>;
}

/// Writes one file per frame into a directory
///
/// Files are named `image0001.YUYV`, `image0002.YUYV` and so on.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        FileSink {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the path a frame is written to
    pub fn path(&self, sequence: u32, fourcc: FourCC) -> PathBuf {
        self.dir.join(file_name(sequence, fourcc))
    }
}

fn file_name(sequence: u32, fourcc: FourCC) -> String {
    format!("image{:04}.{}", sequence, fourcc)
}

impl Sink for FileSink {
    fn store(&mut self, frame: &Frame) -> io::Result<()> {
        let path = self.path(frame.sequence, frame.fourcc);
        let mut file: File = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o664)
            .open(&path)?;
        file.write_all(frame.data)?;

        tracing::debug!(path = %path.display(), bytes = frame.data.len(), "frame stored");
        Ok(())
    }
}
