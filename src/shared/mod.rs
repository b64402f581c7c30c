// Process-level plumbing shared by the run command.
pub mod detach;
pub mod signal;
pub mod syslog;
