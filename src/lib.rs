//! Streaming frame capture from video4linux devices
//!
//! A capture run negotiates a format with the device, maps a pool of driver buffers into
//! memory and exchanges them with the driver until enough frames were handed to a [`Sink`].
//!
//! The device boundary is split into two traits, [`video::Capture`] for capability and format
//! requests and [`io::Driver`] for buffer exchange, both implemented by [`Device`].

pub use v4l2_sys as v4l_sys;

pub mod v4l2;

pub mod pselect;

pub mod buffer;
pub mod capability;
pub mod crop;
pub mod format;
pub mod fraction;
pub mod frameinterval;
pub mod framesize;
pub mod timestamp;

pub mod device;
pub use device::Device;

pub mod error;
pub use error::{Error, Result};

pub mod io;
pub mod video;

pub mod negotiate;
pub use negotiate::{CaptureFormat, Constraints, DeviceCapabilities};

pub mod config;
pub use config::Config;

pub mod session;
pub use session::CaptureSession;

pub mod sink;
pub use sink::{FileSink, Frame, Sink};
