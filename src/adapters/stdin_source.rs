//! Line-oriented telemetry source.
//!
//! Stands in for the wireless link on the desktop: one JSON notification
//! per line, plus two operator commands.
//!
//! | line     | frame                      |
//! |----------|----------------------------|
//! | `cancel` | [`SourceFrame::Cancel`]    |
//! | `lost`   | [`SourceFrame::LinkLost`]  |
//! | blank    | skipped                    |
//! | anything | [`SourceFrame::Payload`]   |
//!
//! A reader thread does the blocking I/O and feeds a bounded
//! `embassy-sync` channel; the runtime side awaits it. `None` in the
//! channel marks end of input.

use core::future::Future;
use std::io::BufRead;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::ports::{SourceFrame, TelemetrySource};

const FRAME_DEPTH: usize = 16;

type Frames = Channel<CriticalSectionRawMutex, Option<SourceFrame>, FRAME_DEPTH>;

pub struct StdinSource {
    frames: Arc<Frames>,
}

impl StdinSource {
    /// Read frames from the process's standard input.
    pub fn spawn() -> std::io::Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read frames from any line-oriented reader on a background thread.
    pub fn from_reader<R>(reader: R) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let frames: Arc<Frames> = Arc::new(Channel::new());
        let tx = frames.clone();
        std::thread::Builder::new()
            .name("telemetry-in".into())
            .spawn(move || {
                let mut reader = reader;
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf) {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!("telemetry-in: read error: {}", e);
                            break;
                        }
                    }
                    // Bytes go through untouched; the decoder rejects bad ones.
                    if let Some(frame) = parse_line(&buf) {
                        futures_lite::future::block_on(tx.send(Some(frame)));
                    }
                }
                info!("telemetry-in: end of input");
                futures_lite::future::block_on(tx.send(None));
            })?;
        Ok(Self { frames })
    }
}

/// Map one raw input line to a frame.
pub fn parse_line(line: &[u8]) -> Option<SourceFrame> {
    match line.trim_ascii() {
        b"" => None,
        b"cancel" => Some(SourceFrame::Cancel),
        b"lost" => Some(SourceFrame::LinkLost),
        payload => Some(SourceFrame::Payload(payload.to_vec())),
    }
}

impl TelemetrySource for StdinSource {
    fn next_frame(&mut self) -> impl Future<Output = Option<SourceFrame>> {
        self.frames.receive()
    }
}
