mod common;

use std::time::Duration;

use common::{description, discrete, Event, MockDevice, Script};
use v4l2_capture::capability;
use v4l2_capture::format::description::Flags as FormatFlags;
use v4l2_capture::format::FourCC;
use v4l2_capture::frameinterval::FrameIntervalEnum;
use v4l2_capture::fraction::Fraction;
use v4l2_capture::{session, CaptureSession, Config, Error, FileSink};

fn allocations(dev: &MockDevice) -> usize {
    dev.count(|e| matches!(e, Event::RequestBuffers(n) if *n > 0))
}

#[test]
fn captures_raw_frames_by_default() {
    let dev = MockDevice::new(Script::default());
    let config = Config::new(2, 2, false);
    let mut sink = dev.sink();

    let summary = session::run(&dev, &config, &mut sink).unwrap();

    assert_eq!(summary.stored, 2);
    assert_eq!(
        dev.events()[0],
        Event::SetFormat(FourCC::new(b"YUYV"), 640, 480)
    );
    assert!(sink.frames.iter().all(|f| f.fourcc == FourCC::new(b"YUYV")));
    assert_eq!(dev.live_mappings(), 0);
    assert_eq!(dev.events().last(), Some(&Event::RequestBuffers(0)));
}

#[test]
fn captures_compressed_frames_on_request() {
    let dev = MockDevice::new(Script::default());
    let config = Config::new(1, 1, true);

    let mut session = CaptureSession::open(&dev, &config).unwrap();
    assert_eq!(session.selected_format().fourcc, FourCC::new(b"MJPG"));
    assert_eq!(session.format().width, 1280);
    assert_eq!(session.format().stride, 2560);
    assert_eq!(session.arena().len(), 1);

    let mut sink = dev.sink();
    session.capture(&mut sink).unwrap();
    session.close().unwrap();

    assert_eq!(sink.frames[0].fourcc, FourCC::new(b"MJPG"));
    assert_eq!(dev.live_mappings(), 0);
}

#[test]
fn missing_compressed_format_allocates_nothing() {
    let dev = MockDevice::new(Script {
        formats: vec![(
            description(0, b"YUYV", FormatFlags::empty()),
            vec![discrete(640, 480)],
        )],
        ..Script::default()
    });
    let config = Config::new(1, 1, true);

    let result = CaptureSession::open(&dev, &config);

    assert!(matches!(result, Err(Error::NoSuitableFormat)));
    assert_eq!(allocations(&dev), 0);
    assert_eq!(dev.count(|e| matches!(e, Event::SetFormat(..))), 0);
}

#[test]
fn streaming_capability_is_required() {
    let dev = MockDevice::new(Script {
        capabilities: capability::Flags::VIDEO_CAPTURE | capability::Flags::READ_WRITE,
        ..Script::default()
    });

    let result = CaptureSession::open(&dev, &Config::default());

    assert!(matches!(result, Err(Error::MissingCapability("streaming"))));
    assert!(dev.events().is_empty());
}

#[test]
fn enumeration_errors_other_than_einval_are_fatal() {
    let dev = MockDevice::new(Script {
        enum_format_errno: Some(libc::EIO),
        ..Script::default()
    });

    match CaptureSession::open(&dev, &Config::default()) {
        Err(Error::Device { request, source }) => {
            assert_eq!(request, "VIDIOC_ENUM_FMT");
            assert_eq!(source.raw_os_error(), Some(libc::EIO));
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("session opened despite failing enumeration"),
    };
}

#[test]
fn snapshot_lists_intervals_for_discrete_sizes_only() {
    let dev = MockDevice::new(Script {
        crop_errno: Some(libc::ENOTTY),
        ..Script::default()
    });

    let session = CaptureSession::open(&dev, &Config::default()).unwrap();
    let caps = session.capabilities();

    assert_eq!(caps.caps.driver, "mock");
    assert!(caps.crop.is_none());
    assert_eq!(caps.formats.len(), 2);

    let yuyv = &caps.formats[1];
    assert_eq!(yuyv.sizes.len(), 3);
    assert!(yuyv.sizes[0].intervals.is_empty());
    assert_eq!(
        yuyv.sizes[1].intervals,
        [
            FrameIntervalEnum::Discrete(Fraction::new(1, 30)),
            FrameIntervalEnum::Discrete(Fraction::new(1, 15)),
        ]
    );
}

#[test]
fn timeout_is_a_partial_success() {
    let dev = MockDevice::new(Script {
        timeout_on_wait: Some(2),
        ..Script::default()
    });
    let config = Config::new(3, 1, false).with_timeout(Duration::from_millis(5));
    let mut sink = dev.sink();

    let summary = session::run(&dev, &config, &mut sink).unwrap();

    assert!(summary.timed_out);
    assert_eq!(summary.stored, 1);
    assert_eq!(dev.count(|e| *e == Event::StreamOff), 1);
    assert_eq!(dev.live_mappings(), 0);
}

#[test]
fn failed_stream_off_still_releases_buffers() {
    let dev = MockDevice::new(Script {
        fail_stream_off: true,
        ..Script::default()
    });
    let mut sink = dev.sink();

    let result = session::run(&dev, &Config::new(1, 3, false), &mut sink);

    assert!(matches!(result, Err(Error::StreamOff(_))));
    assert_eq!(dev.live_mappings(), 0);
    assert_eq!(dev.events().last(), Some(&Event::RequestBuffers(0)));
}

#[test]
fn mapping_failure_releases_driver_buffers() {
    let dev = MockDevice::new(Script {
        fail_map_at: Some(1),
        ..Script::default()
    });

    let result = CaptureSession::open(&dev, &Config::new(1, 3, false));

    assert!(matches!(result, Err(Error::Mapping { index: 1, .. })));
    assert_eq!(dev.live_mappings(), 0);
    assert_eq!(dev.events().last(), Some(&Event::RequestBuffers(0)));
}

#[test]
fn frames_land_in_files() {
    let dir = tempfile::tempdir().unwrap();
    let dev = MockDevice::new(Script::default());
    let config = Config::new(3, 2, false).with_output_dir(dir.path());
    let mut sink = FileSink::new(&config.output_dir);

    let summary = session::run(&dev, &config, &mut sink).unwrap();

    assert_eq!(summary.stored, 3);
    for sequence in 1..=3 {
        let path = dir.path().join(format!("image{:04}.YUYV", sequence));
        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 1024);
    }
}
