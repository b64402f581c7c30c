// Command implementations. The daemon has a single run mode.
pub mod run;

pub use run::run_daemon;
