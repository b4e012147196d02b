//! Command-line surface: argument parsing and validated configuration

pub mod args;
pub mod config;

pub use args::Args;
pub use config::Config;
