//! Capture sources and the background reader thread
//!
//! Every source ends up as a pcap byte stream:
//! - **File** - a saved capture, read directly
//! - **Stdin** - `tcpdump -w - | querytap -r -`
//! - **Interface** - a child `tcpdump` writing pcap to its stdout
//!
//! The stream is decoded on a dedicated thread and segments flow to the
//! main loop over a bounded channel. The thread exits when the stream ends
//! or the receiving side is dropped.

use crossbeam_channel::Sender;
use log::{debug, info};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use super::decode::Segment;
use super::pcap::{read_pcap, CaptureSummary};
use crate::domain::CaptureError;

const TCPDUMP: &str = "tcpdump";

/// Where packets come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    File(PathBuf),
    Stdin,
    Interface(String),
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::File(path) => write!(f, "file {}", path.display()),
            CaptureSource::Stdin => write!(f, "stdin"),
            CaptureSource::Interface(name) => write!(f, "interface {name}"),
        }
    }
}

/// Arguments for a live `tcpdump` writing unbuffered pcap to stdout
#[must_use]
pub fn tcpdump_args(interface: &str, port: u16) -> Vec<String> {
    ["-i", interface, "-U", "-n", "-s", "65535", "-w", "-", "tcp", "port"]
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once(port.to_string()))
        .collect()
}

/// A running capture: reader thread plus the child process, if any
pub struct CaptureHandle {
    thread: JoinHandle<Result<CaptureSummary, CaptureError>>,
    child: Option<Child>,
}

impl CaptureHandle {
    /// Kill the capture child so the reader thread sees end of stream.
    pub fn stop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            debug!("Stopping {TCPDUMP} (pid {})", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Wait for the reader thread and return its summary.
    ///
    /// # Errors
    /// The reader's own error, or `CaptureError::ParseFailed` if it panicked.
    pub fn join(mut self) -> Result<CaptureSummary, CaptureError> {
        let result = self
            .thread
            .join()
            .map_err(|_| CaptureError::ParseFailed("capture reader panicked".to_string()))?;
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
        result
    }
}

/// Open `source` and start decoding it into `tx`.
///
/// # Errors
/// `CaptureError::OpenFailed` for an unreadable file,
/// `CaptureError::SpawnFailed` when `tcpdump` cannot be started.
pub fn start_capture(
    source: &CaptureSource,
    port: u16,
    tx: Sender<Segment>,
) -> Result<CaptureHandle, CaptureError> {
    let (stream, child): (Box<dyn Read + Send>, Option<Child>) = match source {
        CaptureSource::File(path) => {
            let file = File::open(path)
                .map_err(|error| CaptureError::OpenFailed { path: path.display().to_string(), error })?;
            (Box::new(BufReader::new(file)), None)
        }
        CaptureSource::Stdin => (Box::new(std::io::stdin()), None),
        CaptureSource::Interface(interface) => {
            let mut child = Command::new(TCPDUMP)
                .args(tcpdump_args(interface, port))
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|error| CaptureError::SpawnFailed { program: TCPDUMP.to_string(), error })?;
            let Some(stdout) = child.stdout.take() else {
                let _ = child.kill();
                return Err(CaptureError::SpawnFailed {
                    program: TCPDUMP.to_string(),
                    error: std::io::Error::other("child stdout not captured"),
                });
            };
            info!("Started {TCPDUMP} (pid {}) on {interface}", child.id());
            (Box::new(stdout), Some(child))
        }
    };

    let thread = std::thread::spawn(move || {
        let summary = read_pcap(stream, port, |segment| tx.send(segment).is_ok())?;
        debug!(
            "Capture reader finished: {} frames, {} segments, {} skipped",
            summary.frames, summary.segments, summary.skipped
        );
        Ok(summary)
    });

    Ok(CaptureHandle { thread, child })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcpdump_args() {
        let args = tcpdump_args("lo", 3307);
        assert_eq!(args.join(" "), "-i lo -U -n -s 65535 -w - tcp port 3307");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(CaptureSource::Stdin.to_string(), "stdin");
        assert_eq!(CaptureSource::Interface("eth0".into()).to_string(), "interface eth0");
        assert_eq!(CaptureSource::File("a.pcap".into()).to_string(), "file a.pcap");
    }

    #[test]
    fn test_missing_file() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let err = start_capture(&CaptureSource::File("/nonexistent/x.pcap".into()), 3306, tx)
            .err()
            .unwrap();
        assert!(matches!(err, CaptureError::OpenFailed { .. }));
    }
}
