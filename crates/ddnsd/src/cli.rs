//! Command-line interface

use clap::{Parser, ValueEnum};
use ddns_core::DiscoveryMode;
use std::path::PathBuf;
use tracing::Level;

macro_rules! env_prefix {
    () => {
        "DDNS_"
    };
}

/// Keep DnsPod subdomains pointed at this host's current address
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(
        short = 'c',
        long = "conf",
        value_name = "PATH",
        default_value = "ddnsd.conf",
        env = concat!(env_prefix!(), "CONFIG")
    )]
    pub conf: PathBuf,

    /// Use the first non-loopback IPv4 address of a local interface instead of ip_fetch_url
    #[arg(short = 'i', long, action, default_value_t = false)]
    pub internal: bool,

    /// Print the current address and exit
    #[arg(long = "ip", action, default_value_t = false)]
    pub print_ip: bool,

    /// Perform lookups but do not modify any DNS record
    #[arg(long, action, default_value_t = false)]
    pub dry_run: bool,

    /// Set the loglevel of the daemon
    #[arg(
        value_enum,
        short = 'l',
        long,
        ignore_case = true,
        default_value_t = Loglevel::Info,
        value_name = "LEVEL",
        env = concat!(env_prefix!(), "LOG_LEVEL")
    )]
    pub log_level: Loglevel,
}

impl Cli {
    /// Discovery mode selected by `--internal`
    pub fn mode(&self) -> DiscoveryMode {
        if self.internal {
            DiscoveryMode::Internal
        } else {
            DiscoveryMode::External
        }
    }
}

/// Used to set the daemon's loglevel
// tracing::Level doesn't derive ValueEnum, so it is mirrored here
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum Loglevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<Loglevel> for Level {
    fn from(ll: Loglevel) -> Self {
        match ll {
            Loglevel::Error => Level::ERROR,
            Loglevel::Warn => Level::WARN,
            Loglevel::Info => Level::INFO,
            Loglevel::Debug => Level::DEBUG,
            Loglevel::Trace => Level::TRACE,
        }
    }
}
