//! # querytap - Main Entry Point
//!
//! Supports two capture modes:
//! - **Live** (`-i <IFACE>`): spawns `tcpdump` and reports every period
//! - **Replay** (`-r FILE` or `-r -`): reads a saved pcap to the end and
//!   prints a final report
//!
//! Ctrl+C, `--duration` or the end of the capture stream stop the loop.

// Main function is intentionally long for clarity
#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, TryRecvError};
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::time::{Duration, Instant};

use querytap::capture::{start_capture, CaptureSource, Segment};
use querytap::cli::{Args, Config};
use querytap::domain::ConfigError;
use querytap::processing::{Cadence, Sniffer};
use querytap::report::{export_snapshot, render_snapshot, Palette, Reporter};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

/// Segments buffered between the capture thread and the main loop
const SEGMENT_QUEUE: usize = 4096;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_USAGE;
    }
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") || msg.contains("operation not permitted") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

fn print_report(sniffer: &Sniffer, reporter: &Reporter, palette: &Palette) {
    let snapshot = reporter.snapshot(sniffer.stats(), sniffer.elapsed());
    println!();
    for line in render_snapshot(&snapshot, palette) {
        println!("{line}");
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_args(&args)?;
    let quiet = args.quiet;

    if !quiet {
        println!("querytap v{}", env!("CARGO_PKG_VERSION"));
        println!("source: {}", config.source);
        println!("port: {}", config.port);
    }
    info!("Initializing query sniffing on {}:{}...", config.source, config.port);

    let (tx, rx) = bounded::<Segment>(SEGMENT_QUEUE);
    let mut capture = start_capture(&config.source, config.port, tx)
        .with_context(|| format!("Failed to start capture on {}", config.source))?;

    let mut sniffer = Sniffer::new(&config);
    let reporter = config.reporter();
    let palette = Palette::new(config.color);
    let mut cadence = Cadence::new(config.period);

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let started = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };

    let mut exit_reason = "interrupted";
    let mut capture_ended = false;

    loop {
        if let Some(limit) = duration_limit {
            if started.elapsed() >= limit {
                exit_reason = "duration limit reached";
                break;
            }
        }

        // Drain everything the capture thread has queued
        loop {
            match rx.try_recv() {
                Ok(segment) => {
                    let step = sniffer.step(&segment, &mut cadence, config.verbose);
                    if let Some(line) = step.verbose_line {
                        println!("{line}");
                    }
                    if step.report_due {
                        print_report(&sniffer, &reporter, &palette);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    capture_ended = true;
                    break;
                }
            }
        }

        if capture_ended {
            exit_reason = "capture ended";
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {
                // Continue loop
            }
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    // Unblocks a reader stuck on a full channel
    drop(rx);
    capture.stop();

    // Reported after the final report and export so collected stats survive
    let mut capture_error = None;
    let summary = if capture_ended || !matches!(config.source, CaptureSource::Stdin) {
        match capture.join() {
            Ok(summary) => Some(summary),
            Err(e) if capture_ended => {
                exit_reason = "capture failed";
                capture_error = Some(e);
                None
            }
            Err(e) => {
                warn!("Capture reader ended with error: {e}");
                None
            }
        }
    } else {
        // A blocked stdin read cannot be interrupted; leave the thread behind
        None
    };

    if !config.verbose {
        print_report(&sniffer, &reporter, &palette);
    }

    if !quiet {
        let global = sniffer.stats().global();
        eprintln!(
            "\n{}: {:.1}s wall, {:.1}s captured, {} requests, {} streams, {} desyncs{}",
            exit_reason,
            started.elapsed().as_secs_f64(),
            sniffer.elapsed().as_secs_f64(),
            global.requests,
            global.streams,
            global.desyncs,
            summary
                .map(|s| format!(", {} frames ({} skipped)", s.frames, s.skipped))
                .unwrap_or_default(),
        );
    }

    if let Some(export_path) = args.export.as_ref() {
        let snapshot = reporter.snapshot(sniffer.stats(), sniffer.elapsed());
        let file = File::create(export_path).context("Failed to create export file")?;
        export_snapshot(&snapshot, BufWriter::new(file)).context("Failed to export report")?;

        if !quiet {
            println!("saved: {}", export_path.display());
        }
    }

    if let Some(e) = capture_error {
        return Err(e).context("Capture failed");
    }
    Ok(())
}
