//! Thin wrappers around the raw video4linux2 kernel interface.
//!
//! Every call reports failures as [`std::io::Error`] built from the last OS error (errno), so
//! callers can tell "enumeration exhausted" (`EINVAL`) apart from genuine failures.

mod api;
pub use api::*;

pub mod vidioc;
