//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::report::SortKey;

#[derive(Parser, Debug)]
#[command(
    name = "querytap",
    version,
    about = "Passive MySQL query sniffer with latency and throughput stats",
    after_help = "\
FORMAT PLACEHOLDERS:
    #s  client ip:port      #i  client ip
    #r  route annotation    #q  canonical query

EXAMPLES:
    sudo querytap -i eth0                    Live capture on port 3306
    querytap -r dump.pcap -s avg             Replay a capture, slowest first
    tcpdump -w - port 3306 | querytap -r -   Read pcap from stdin"
)]
pub struct Args {
    /// Server port to watch
    #[arg(short = 'P', long, default_value_t = 3306)]
    pub port: u16,

    /// Interface for live capture
    #[arg(short, long, default_value = "eth0")]
    pub interface: String,

    /// Read a pcap file instead of capturing live ("-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub read: Option<PathBuf>,

    /// Aggregate raw query text instead of canonical text
    #[arg(short, long)]
    pub unsanitized: bool,

    /// Seconds between reports
    #[arg(short = 't', long, default_value_t = 10)]
    pub period: u64,

    /// Rows per report
    #[arg(short, long, default_value_t = 15)]
    pub display: usize,

    /// Print every timed query instead of periodic reports
    #[arg(short, long)]
    pub verbose: bool,

    /// With --verbose, skip literal/whitespace cleanup entirely
    #[arg(short, long)]
    pub no_clean: bool,

    /// Aggregation key format
    #[arg(short, long, default_value = "#s:#q")]
    pub format: String,

    /// Report ordering
    #[arg(short, long, value_enum, default_value_t = SortKey::Count)]
    pub sort: SortKey,

    /// Hide rows below this many requests per second
    #[arg(short, long, default_value_t = 0)]
    pub cutoff: u32,

    /// Write the final report to FILE as JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
