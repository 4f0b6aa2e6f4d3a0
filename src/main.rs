use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use v4l2_capture::{session, Config, Device, FileSink};

/// Capture frames from a video4linux device into files
#[derive(Debug, Parser)]
#[command(version, about, allow_negative_numbers = true)]
struct Args {
    /// Number of frames to capture
    #[arg(short = 'n', long = "number-of-frames", default_value_t = 1)]
    frames: i64,

    /// Number of buffers to request from the driver
    #[arg(short = 'b', long = "number-of-buffers", default_value_t = 1)]
    buffers: i64,

    /// Capture a compressed format (MJPEG, H.264, ..) instead of a raw one
    #[arg(short = 'c', long = "use-compressed-formats")]
    compressed: bool,

    /// Seconds to wait for a frame before giving up
    #[arg(short = 't', long = "timeout", default_value_t = 2)]
    timeout: u64,

    /// Directory to write the frames to
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Device node, e.g. /dev/video0
    device: PathBuf,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::new(args.frames, args.buffers, args.compressed)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_output_dir(args.output_dir);

    let dev = Device::with_path(&args.device)
        .with_context(|| format!("failed to open {}", args.device.display()))?;
    let mut sink = FileSink::new(&config.output_dir);

    let summary = session::run(&dev, &config, &mut sink)
        .with_context(|| format!("capturing from {} failed", args.device.display()))?;
    if summary.timed_out {
        tracing::warn!(
            "stopped after {} of {} frames",
            summary.captured,
            summary.requested
        );
    }

    Ok(())
}
