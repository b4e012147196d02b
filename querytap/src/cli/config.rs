//! Validated runtime configuration
//!
//! [`Config::from_args`] turns parsed arguments into the values the
//! pipeline consumes and rejects anything that would make ingestion
//! meaningless.

use std::path::Path;
use std::time::Duration;

use super::args::Args;
use crate::capture::CaptureSource;
use crate::domain::ConfigError;
use crate::query::{FormatProgram, Tokenizer};
use crate::report::{Reporter, SortKey};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub source: CaptureSource,
    /// Replace literals in `#q` (off with `--unsanitized`)
    pub canonicalize: bool,
    pub period: Duration,
    pub display_count: usize,
    pub verbose: bool,
    pub no_clean: bool,
    pub format: FormatProgram,
    pub sort_key: SortKey,
    pub cutoff: f64,
    pub color: bool,
}

impl Config {
    /// # Errors
    /// `ConfigError` for port 0, a zero display count or an empty format.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if args.port == 0 {
            return Err(ConfigError::InvalidPort(args.port));
        }
        if args.display == 0 {
            return Err(ConfigError::ZeroDisplayCount);
        }
        let format = FormatProgram::parse(&args.format)?;

        let source = match args.read.as_deref() {
            Some(path) if path == Path::new("-") => CaptureSource::Stdin,
            Some(path) => CaptureSource::File(path.to_path_buf()),
            None => CaptureSource::Interface(args.interface.clone()),
        };

        Ok(Self {
            port: args.port,
            source,
            canonicalize: !args.unsanitized,
            period: Duration::from_secs(args.period),
            display_count: args.display,
            verbose: args.verbose,
            no_clean: args.no_clean,
            format,
            sort_key: args.sort,
            cutoff: f64::from(args.cutoff),
            color: !args.no_color,
        })
    }

    /// Tokenizer for canonicalization; `--verbose --no-clean` passes text through
    #[must_use]
    pub fn tokenizer(&self) -> Tokenizer {
        if self.verbose && self.no_clean {
            Tokenizer::passthrough()
        } else {
            Tokenizer::new()
        }
    }

    #[must_use]
    pub fn reporter(&self) -> Reporter {
        Reporter { display_count: self.display_count, sort_key: self.sort_key, cutoff: self.cutoff }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(extra: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec!["querytap"];
        argv.extend_from_slice(extra);
        Config::from_args(&Args::parse_from(argv))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.port, 3306);
        assert_eq!(config.source, CaptureSource::Interface("eth0".to_string()));
        assert!(config.canonicalize);
        assert_eq!(config.period, Duration::from_secs(10));
        assert_eq!(config.display_count, 15);
        assert_eq!(config.sort_key, SortKey::Count);
        assert!(config.color);
        assert_eq!(config.format, FormatProgram::parse("#s:#q").unwrap());
    }

    #[test]
    fn test_read_sources() {
        assert_eq!(parse(&["-r", "-"]).unwrap().source, CaptureSource::Stdin);
        assert_eq!(
            parse(&["--read", "x.pcap"]).unwrap().source,
            CaptureSource::File("x.pcap".into())
        );
    }

    #[test]
    fn test_flags() {
        let config = parse(&["-P", "3307", "-u", "-s", "maxbytes", "-c", "5", "-d", "3", "--no-color"]).unwrap();
        assert_eq!(config.port, 3307);
        assert!(!config.canonicalize);
        assert_eq!(config.sort_key, SortKey::MaxBytes);
        assert!((config.cutoff - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.reporter().display_count, 3);
        assert!(!config.color);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(parse(&["-P", "0"]).unwrap_err(), ConfigError::InvalidPort(0));
        assert_eq!(parse(&["-d", "0"]).unwrap_err(), ConfigError::ZeroDisplayCount);
        assert_eq!(parse(&["-f", "  "]).unwrap_err(), ConfigError::EmptyFormat);
    }

    #[test]
    fn test_passthrough_needs_verbose_and_no_clean() {
        assert!(!parse(&["-n"]).unwrap().tokenizer().is_passthrough());
        assert!(parse(&["-v", "-n"]).unwrap().tokenizer().is_passthrough());
    }
}
