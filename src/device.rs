use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::time::Duration;
use std::{io, mem};

use crate::buffer::Metadata;
use crate::capability::Capabilities;
use crate::crop::CropCapabilities;
use crate::format::{Description as FormatDescription, Format, FourCC};
use crate::frameinterval::FrameInterval;
use crate::framesize::FrameSize;
use crate::io::traits::{BufferInfo, Driver};
use crate::pselect;
use crate::v4l2;
use crate::v4l_sys::*;
use crate::video::Capture;

/// Device handle for low-level access.
///
/// Acquiring a handle facilitates (possibly mutating) interactions with the device.
pub struct Handle {
    fd: std::os::raw::c_int,
}

impl Handle {
    /// Returns the raw file descriptor
    pub fn fd(&self) -> std::os::raw::c_int {
        self.fd
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = v4l2::close(self.fd) {
            tracing::warn!(fd = self.fd, "closing device failed: {}", e);
        }
    }
}

/// Linux capture device abstraction
pub struct Device {
    /// Raw handle
    handle: Arc<Handle>,
    /// Device node path
    path: PathBuf,
}

impl Device {
    /// Returns a capture device by path
    ///
    /// The device is opened read-write, as streaming requires.
    ///
    /// # Arguments
    ///
    /// * `path` - Path (e.g. "/dev/video0")
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::device::Device;
    /// let dev = Device::with_path("/dev/video0");
    /// ```
    pub fn with_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let fd = v4l2::open(path, libc::O_RDWR)?;

        Ok(Device {
            handle: Arc::new(Handle { fd }),
            path: path.to_path_buf(),
        })
    }

    /// Returns the raw device handle
    pub fn handle(&self) -> Arc<Handle> {
        self.handle.clone()
    }

    /// Returns the path of the device node
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn buffer_desc(&self) -> v4l2_buffer {
        v4l2_buffer {
            type_: v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: v4l2_memory_V4L2_MEMORY_MMAP,
            ..unsafe { mem::zeroed() }
        }
    }

    fn stream_request(&self, request: v4l2::vidioc::_IOC_TYPE) -> io::Result<()> {
        unsafe {
            let mut typ = v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2::ioctl(
                self.handle.fd(),
                request,
                &mut typ as *mut _ as *mut std::os::raw::c_void,
            )
        }
    }
}

fn invalid_data(e: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

impl Capture for Device {
    fn query_caps(&self) -> io::Result<Capabilities> {
        unsafe {
            let mut v4l2_caps: v4l2_capability = mem::zeroed();
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYCAP,
                &mut v4l2_caps as *mut _ as *mut std::os::raw::c_void,
            )?;

            Ok(Capabilities::from(v4l2_caps))
        }
    }

    fn enum_format(&self, index: u32) -> io::Result<FormatDescription> {
        let mut v4l2_fmt = v4l2_fmtdesc {
            index,
            type_: v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE,
            ..unsafe { mem::zeroed() }
        };

        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_ENUM_FMT,
                &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        Ok(FormatDescription::from(v4l2_fmt))
    }

    fn enum_framesize(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSize> {
        let mut v4l2_struct = v4l2_frmsizeenum {
            index,
            pixel_format: fourcc.into(),
            ..unsafe { mem::zeroed() }
        };

        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_ENUM_FRAMESIZES,
                &mut v4l2_struct as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        FrameSize::try_from(v4l2_struct).map_err(invalid_data)
    }

    fn enum_frameinterval(
        &self,
        fourcc: FourCC,
        width: u32,
        height: u32,
        index: u32,
    ) -> io::Result<FrameInterval> {
        let mut v4l2_struct = v4l2_frmivalenum {
            index,
            pixel_format: fourcc.into(),
            width,
            height,
            ..unsafe { mem::zeroed() }
        };

        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_ENUM_FRAMEINTERVALS,
                &mut v4l2_struct as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        FrameInterval::try_from(v4l2_struct).map_err(invalid_data)
    }

    fn crop_capabilities(&self) -> io::Result<CropCapabilities> {
        let mut v4l2_cropcap = v4l2_cropcap {
            type_: v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE,
            ..unsafe { mem::zeroed() }
        };

        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_CROPCAP,
                &mut v4l2_cropcap as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        Ok(CropCapabilities::from(v4l2_cropcap))
    }

    fn format(&self) -> io::Result<Format> {
        unsafe {
            let mut v4l2_fmt = v4l2_format {
                type_: v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE,
                ..mem::zeroed()
            };
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_G_FMT,
                &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
            )?;

            Ok(Format::from(v4l2_fmt.fmt.pix))
        }
    }

    fn set_format(&self, fmt: &Format) -> io::Result<Format> {
        unsafe {
            let mut v4l2_fmt: v4l2_format = mem::zeroed();
            v4l2_fmt.type_ = v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2_fmt.fmt.pix = (*fmt).into();
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_S_FMT,
                &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
            )?;

            // the driver writes back what it actually applied
            Ok(Format::from(v4l2_fmt.fmt.pix))
        }
    }
}

impl Driver for Device {
    fn request_buffers(&self, count: u32) -> io::Result<u32> {
        let mut v4l2_reqbufs = v4l2_requestbuffers {
            count,
            type_: v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: v4l2_memory_V4L2_MEMORY_MMAP,
            ..unsafe { mem::zeroed() }
        };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_REQBUFS,
                &mut v4l2_reqbufs as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        Ok(v4l2_reqbufs.count)
    }

    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo> {
        let mut v4l2_buf = v4l2_buffer {
            index,
            ..self.buffer_desc()
        };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )?;

            Ok(BufferInfo {
                length: v4l2_buf.length,
                offset: v4l2_buf.m.offset,
            })
        }
    }

    fn map(&self, length: usize, offset: u32) -> io::Result<NonNull<u8>> {
        let ptr = unsafe {
            v4l2::mmap(
                ptr::null_mut(),
                length,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.handle.fd(),
                offset as libc::off_t,
            )?
        };

        NonNull::new(ptr as *mut u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned NULL"))
    }

    unsafe fn unmap(&self, ptr: NonNull<u8>, length: usize) -> io::Result<()> {
        v4l2::munmap(ptr.as_ptr() as *mut std::os::raw::c_void, length)
    }

    fn queue_buffer(&self, index: u32) -> io::Result<()> {
        let mut v4l2_buf = v4l2_buffer {
            index,
            ..self.buffer_desc()
        };

        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )
        }
    }

    fn dequeue_buffer(&self) -> io::Result<Metadata> {
        let mut v4l2_buf = self.buffer_desc();

        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_DQBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        Ok(Metadata {
            index: v4l2_buf.index,
            bytesused: v4l2_buf.bytesused,
            flags: v4l2_buf.flags.into(),
            timestamp: v4l2_buf.timestamp.into(),
            sequence: v4l2_buf.sequence,
        })
    }

    fn stream_on(&self) -> io::Result<()> {
        self.stream_request(v4l2::vidioc::VIDIOC_STREAMON)
    }

    fn stream_off(&self) -> io::Result<()> {
        self.stream_request(v4l2::vidioc::VIDIOC_STREAMOFF)
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        pselect::wait_readable(self.handle.fd(), timeout)
    }
}
