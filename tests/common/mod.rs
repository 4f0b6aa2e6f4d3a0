#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::ptr::NonNull;
use std::rc::Rc;
use std::time::Duration;

use v4l2_capture::buffer::{self, Metadata, Type};
use v4l2_capture::capability::{self, Capabilities};
use v4l2_capture::crop::CropCapabilities;
use v4l2_capture::format::description::Flags as FormatFlags;
use v4l2_capture::format::{Description as FormatDescription, Format, FourCC};
use v4l2_capture::fraction::Fraction;
use v4l2_capture::frameinterval::{FrameInterval, FrameIntervalEnum};
use v4l2_capture::framesize::{Discrete, FrameSize, FrameSizeEnum, Stepwise};
use v4l2_capture::io::{BufferInfo, Driver};
use v4l2_capture::sink::{Frame, Sink};
use v4l2_capture::video::Capture;

const PAGE: u32 = 0x1000;

/// Everything the mock observed, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SetFormat(FourCC, u32, u32),
    RequestBuffers(u32),
    Map(u32),
    Unmap(u32),
    Queue(u32),
    Dequeue(u32),
    StreamOn,
    StreamOff,
    Store(u32),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Behaviour of the mock, adjustable per test
#[derive(Debug, Clone)]
pub struct Script {
    pub capabilities: capability::Flags,
    pub formats: Vec<(FormatDescription, Vec<FrameSizeEnum>)>,
    /// Errno returned by VIDIOC_ENUM_FMT at index 0 instead of the first format
    pub enum_format_errno: Option<i32>,
    /// Number of buffers the driver commits, regardless of the request
    pub commit: Option<u32>,
    pub buffer_len: u32,
    pub bytesused: u32,
    pub fail_request_buffers: bool,
    pub fail_map_at: Option<u32>,
    /// Buffer whose unmap reports an error, after the region is gone
    pub fail_unmap_at: Option<u32>,
    pub fail_queue_at: Option<u32>,
    pub fail_stream_on: bool,
    pub fail_stream_off: bool,
    /// 1-based readiness wait that times out
    pub timeout_on_wait: Option<u32>,
    /// Hand out the most recently queued buffer first
    pub reverse_dequeue: bool,
    pub crop_errno: Option<i32>,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            capabilities: capability::Flags::VIDEO_CAPTURE | capability::Flags::STREAMING,
            formats: vec![
                (
                    description(0, b"MJPG", FormatFlags::COMPRESSED),
                    vec![discrete(1280, 720), discrete(640, 480)],
                ),
                (
                    description(1, b"YUYV", FormatFlags::empty()),
                    vec![stepwise(), discrete(640, 480), discrete(320, 240)],
                ),
            ],
            enum_format_errno: None,
            commit: None,
            buffer_len: 4096,
            bytesused: 1024,
            fail_request_buffers: false,
            fail_map_at: None,
            fail_unmap_at: None,
            fail_queue_at: None,
            fail_stream_on: false,
            fail_stream_off: false,
            timeout_on_wait: None,
            reverse_dequeue: false,
            crop_errno: None,
        }
    }
}

pub fn description(index: u32, fourcc: &[u8; 4], flags: FormatFlags) -> FormatDescription {
    FormatDescription {
        index,
        typ: Type::VideoCapture as u32,
        flags,
        description: String::from_utf8_lossy(fourcc).into_owned(),
        fourcc: FourCC::new(fourcc),
    }
}

pub fn discrete(width: u32, height: u32) -> FrameSizeEnum {
    FrameSizeEnum::Discrete(Discrete { width, height })
}

pub fn stepwise() -> FrameSizeEnum {
    FrameSizeEnum::Stepwise(Stepwise {
        min_width: 16,
        max_width: 1920,
        step_width: 16,
        min_height: 16,
        max_height: 1080,
        step_height: 16,
    })
}

#[derive(Default)]
struct Driverside {
    count: u32,
    mappings: HashMap<u32, (NonNull<u8>, usize)>,
    queued: VecDeque<u32>,
    streaming: bool,
    waits: u32,
    sequence: u32,
}

/// A capture device living entirely in memory
///
/// Buffers are heap regions. Queueing a buffer twice or dequeuing with nothing queued fails
/// with `EINVAL`, like a real driver.
pub struct MockDevice {
    pub script: Script,
    pub events: EventLog,
    state: RefCell<Driverside>,
}

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

impl MockDevice {
    pub fn new(script: Script) -> Self {
        MockDevice {
            script,
            events: Rc::new(RefCell::new(Vec::new())),
            state: RefCell::new(Driverside::default()),
        }
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn count(&self, wanted: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| wanted(e)).count()
    }

    /// Number of regions currently mapped
    pub fn live_mappings(&self) -> usize {
        self.state.borrow().mappings.len()
    }

    pub fn queued(&self) -> Vec<u32> {
        self.state.borrow().queued.iter().copied().collect()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.borrow().streaming
    }

    /// A sink recording into the event log of this device
    pub fn sink(&self) -> RecordingSink {
        RecordingSink {
            events: self.events.clone(),
            frames: Vec::new(),
            fail_on: Vec::new(),
        }
    }

    fn sizes(&self, fourcc: FourCC) -> io::Result<&[FrameSizeEnum]> {
        self.script
            .formats
            .iter()
            .find(|(desc, _)| desc.fourcc == fourcc)
            .map(|(_, sizes)| sizes.as_slice())
            .ok_or_else(|| errno(libc::EINVAL))
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        for (_, (ptr, len)) in self.state.get_mut().mappings.drain() {
            unsafe { drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len))) };
        }
    }
}

impl Capture for MockDevice {
    fn query_caps(&self) -> io::Result<Capabilities> {
        Ok(Capabilities {
            driver: "mock".to_string(),
            card: "Mock Camera".to_string(),
            bus: "platform:mock".to_string(),
            version: (6, 1, 0),
            capabilities: self.script.capabilities,
            device_caps: self.script.capabilities,
        })
    }

    fn enum_format(&self, index: u32) -> io::Result<FormatDescription> {
        if let (0, Some(code)) = (index, self.script.enum_format_errno) {
            return Err(errno(code));
        }

        self.script
            .formats
            .get(index as usize)
            .map(|(desc, _)| desc.clone())
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn enum_framesize(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSize> {
        let size = self
            .sizes(fourcc)?
            .get(index as usize)
            .cloned()
            .ok_or_else(|| errno(libc::EINVAL))?;
        let typ = match size {
            FrameSizeEnum::Discrete(_) => 1,
            FrameSizeEnum::Continuous(_) => 2,
            FrameSizeEnum::Stepwise(_) => 3,
        };

        Ok(FrameSize {
            index,
            fourcc,
            typ,
            size,
        })
    }

    fn enum_frameinterval(
        &self,
        fourcc: FourCC,
        width: u32,
        height: u32,
        index: u32,
    ) -> io::Result<FrameInterval> {
        let known = self
            .sizes(fourcc)?
            .iter()
            .filter_map(|size| size.discrete())
            .any(|d| d.width == width && d.height == height);
        let fps = [30, 15];
        if !known || index as usize >= fps.len() {
            return Err(errno(libc::EINVAL));
        }

        Ok(FrameInterval {
            index,
            fourcc,
            width,
            height,
            typ: 1,
            interval: FrameIntervalEnum::Discrete(Fraction::new(1, fps[index as usize])),
        })
    }

    fn crop_capabilities(&self) -> io::Result<CropCapabilities> {
        match self.script.crop_errno {
            Some(code) => Err(errno(code)),
            None => Ok(CropCapabilities::default()),
        }
    }

    fn format(&self) -> io::Result<Format> {
        Err(errno(libc::ENOTTY))
    }

    fn set_format(&self, fmt: &Format) -> io::Result<Format> {
        self.record(Event::SetFormat(fmt.fourcc, fmt.width, fmt.height));
        Ok(Format {
            stride: fmt.width * 2,
            size: self.script.buffer_len,
            ..*fmt
        })
    }
}

impl Driver for MockDevice {
    fn request_buffers(&self, count: u32) -> io::Result<u32> {
        self.record(Event::RequestBuffers(count));
        if self.script.fail_request_buffers {
            return Err(errno(libc::ENOMEM));
        }

        let mut state = self.state.borrow_mut();
        if count == 0 {
            state.count = 0;
            state.queued.clear();
            return Ok(0);
        }

        state.count = self.script.commit.unwrap_or(count);
        Ok(state.count)
    }

    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo> {
        if index >= self.state.borrow().count {
            return Err(errno(libc::EINVAL));
        }

        Ok(BufferInfo {
            length: self.script.buffer_len,
            offset: index * PAGE,
        })
    }

    fn map(&self, length: usize, offset: u32) -> io::Result<NonNull<u8>> {
        let index = offset / PAGE;
        if self.script.fail_map_at == Some(index) {
            return Err(errno(libc::ENOMEM));
        }

        let region = Box::into_raw(vec![0u8; length].into_boxed_slice()) as *mut u8;
        let ptr = NonNull::new(region).ok_or_else(|| errno(libc::ENOMEM))?;
        self.state
            .borrow_mut()
            .mappings
            .insert(index, (ptr, length));
        self.record(Event::Map(index));
        Ok(ptr)
    }

    unsafe fn unmap(&self, ptr: NonNull<u8>, length: usize) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let index = state
            .mappings
            .iter()
            .find(|(_, (p, _))| *p == ptr)
            .map(|(index, _)| *index)
            .ok_or_else(|| errno(libc::EINVAL))?;
        let (ptr, len) = state.mappings.remove(&index).ok_or_else(|| errno(libc::EINVAL))?;
        assert_eq!(len, length);
        drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len)));
        drop(state);

        self.record(Event::Unmap(index));
        if self.script.fail_unmap_at == Some(index) {
            return Err(errno(libc::EINVAL));
        }
        Ok(())
    }

    fn queue_buffer(&self, index: u32) -> io::Result<()> {
        if self.script.fail_queue_at == Some(index) {
            return Err(errno(libc::EIO));
        }
        let mut state = self.state.borrow_mut();
        if index >= state.count || state.queued.contains(&index) {
            return Err(errno(libc::EINVAL));
        }
        state.queued.push_back(index);
        drop(state);

        self.record(Event::Queue(index));
        Ok(())
    }

    fn dequeue_buffer(&self) -> io::Result<Metadata> {
        let mut state = self.state.borrow_mut();
        if !state.streaming {
            return Err(errno(libc::EINVAL));
        }
        let index = if self.script.reverse_dequeue {
            state.queued.pop_back()
        } else {
            state.queued.pop_front()
        }
        .ok_or_else(|| errno(libc::EINVAL))?;

        // the frame content is the driver sequence number
        let sequence = state.sequence;
        state.sequence += 1;
        if let Some((ptr, len)) = state.mappings.get(&index) {
            unsafe { std::ptr::write_bytes(ptr.as_ptr(), sequence as u8, *len) };
        }
        drop(state);

        self.record(Event::Dequeue(index));
        Ok(Metadata {
            index,
            bytesused: self.script.bytesused,
            flags: buffer::Flags::DONE,
            timestamp: Default::default(),
            sequence,
        })
    }

    fn stream_on(&self) -> io::Result<()> {
        self.record(Event::StreamOn);
        if self.script.fail_stream_on {
            return Err(errno(libc::EIO));
        }

        self.state.borrow_mut().streaming = true;
        Ok(())
    }

    fn stream_off(&self) -> io::Result<()> {
        self.record(Event::StreamOff);
        let mut state = self.state.borrow_mut();
        state.streaming = false;
        state.queued.clear();
        if self.script.fail_stream_off {
            return Err(errno(libc::EIO));
        }

        Ok(())
    }

    fn wait_readable(&self, _timeout: Duration) -> io::Result<bool> {
        let mut state = self.state.borrow_mut();
        state.waits += 1;
        if self.script.timeout_on_wait == Some(state.waits) {
            return Ok(false);
        }

        Ok(state.streaming && !state.queued.is_empty())
    }
}

/// A frame as seen by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFrame {
    pub sequence: u32,
    pub fourcc: FourCC,
    pub bytes_used: u32,
    pub data: Vec<u8>,
}

/// Keeps copies of all frames and logs them next to the device events
pub struct RecordingSink {
    events: EventLog,
    pub frames: Vec<StoredFrame>,
    /// Sequence numbers to fail on
    pub fail_on: Vec<u32>,
}

impl Sink for RecordingSink {
    fn store(&mut self, frame: &Frame) -> io::Result<()> {
        self.events.borrow_mut().push(Event::Store(frame.sequence));
        if self.fail_on.contains(&frame.sequence) {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }

        self.frames.push(StoredFrame {
            sequence: frame.sequence,
            fourcc: frame.fourcc,
            bytes_used: frame.bytes_used,
            data: frame.data.to_vec(),
        });
        Ok(())
    }
}
