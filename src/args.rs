use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// CLI root definition. The daemon takes no options; clap still provides --help and --version.
#[derive(Parser, Debug)]
#[command(name = "daemon-time-logger", version)]
#[command(about = "Detach into the background and log the local time to syslog every second")]
pub struct Cli {}

// Fixed runtime settings. Kept in one struct so tests can point at alternate paths.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub ident: String,
    pub tick_interval: Duration,
    pub working_dir: PathBuf,
    pub null_device: PathBuf,
    pub umask: u32,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            ident: "daemon_time_logger".to_string(),
            tick_interval: Duration::from_secs(1),
            working_dir: PathBuf::from("/"),
            null_device: PathBuf::from("/dev/null"),
            umask: 0,
        }
    }
}

impl From<&Cli> for DaemonSettings {
    fn from(_cli: &Cli) -> Self {
        Self::default()
    }
}
