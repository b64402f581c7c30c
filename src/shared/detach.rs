use crate::args::DaemonSettings;
use nix::fcntl::{OFlag, open};
use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, chdir, close, dup2, fork, setsid};
use std::os::fd::RawFd;
use std::path::Path;
use std::process;
use thiserror::Error;

// Ordered detachment steps. Each one that can fail gets its own exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachStep {
    FirstFork,
    SessionLeader,
    Signals,
    SecondFork,
    ChangeDir,
    NullDevice,
}

impl DetachStep {
    pub fn exit_code(self) -> u8 {
        match self {
            DetachStep::FirstFork => 2,
            DetachStep::SessionLeader => 3,
            DetachStep::Signals => 4,
            DetachStep::SecondFork => 5,
            DetachStep::ChangeDir => 6,
            DetachStep::NullDevice => 7,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            DetachStep::FirstFork => "first fork",
            DetachStep::SessionLeader => "setsid",
            DetachStep::Signals => "installing signal handlers",
            DetachStep::SecondFork => "second fork",
            DetachStep::ChangeDir => "changing working directory",
            DetachStep::NullDevice => "redirecting standard streams to the null device",
        }
    }
}

// Fatal failure while turning the process into a daemon.
#[derive(Debug, Error)]
#[error("daemonization failed during {}: {source}", .step.describe())]
pub struct DetachError {
    pub step: DetachStep,
    #[source]
    pub source: nix::Error,
}

impl DetachError {
    fn at(step: DetachStep) -> impl FnOnce(nix::Error) -> Self {
        move |source| Self { step, source }
    }
}

// Run the classic double-fork sequence and return inside the final daemon process.
// `install_handlers` runs after setsid and before the second fork so the grandchild inherits it.
// Intermediate processes exit with status 0 and never return.
pub fn detach<F>(settings: &DaemonSettings, install_handlers: F) -> Result<(), DetachError>
where
    F: FnOnce() -> nix::Result<()>,
{
    fork_and_exit_parent(DetachStep::FirstFork)?;
    setsid().map_err(DetachError::at(DetachStep::SessionLeader))?;
    install_handlers().map_err(DetachError::at(DetachStep::Signals))?;
    fork_and_exit_parent(DetachStep::SecondFork)?;

    umask(Mode::from_bits_truncate(settings.umask));
    chdir(settings.working_dir.as_path()).map_err(DetachError::at(DetachStep::ChangeDir))?;
    redirect_standard_streams(&settings.null_device)?;
    Ok(())
}

fn fork_and_exit_parent(step: DetachStep) -> Result<(), DetachError> {
    // SAFETY: called before any thread is spawned, so the child owns the only thread.
    match unsafe { fork() }.map_err(DetachError::at(step))? {
        ForkResult::Parent { .. } => process::exit(0),
        ForkResult::Child => Ok(()),
    }
}

pub(crate) fn open_null_device(path: &Path) -> Result<RawFd, DetachError> {
    open(path, OFlag::O_RDWR, Mode::empty()).map_err(DetachError::at(DetachStep::NullDevice))
}

// Point stdin, stdout, and stderr at the null device, then drop the extra descriptor.
fn redirect_standard_streams(null_device: &Path) -> Result<(), DetachError> {
    let fd = open_null_device(null_device)?;
    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if fd != target {
            dup2(fd, target).map_err(DetachError::at(DetachStep::NullDevice))?;
        }
    }
    if fd > libc::STDERR_FILENO {
        close(fd).map_err(DetachError::at(DetachStep::NullDevice))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_step_has_a_distinct_nonzero_exit_code() {
        let steps = [
            DetachStep::FirstFork,
            DetachStep::SessionLeader,
            DetachStep::Signals,
            DetachStep::SecondFork,
            DetachStep::ChangeDir,
            DetachStep::NullDevice,
        ];
        let codes: HashSet<u8> = steps.iter().map(|step| step.exit_code()).collect();
        assert_eq!(codes.len(), steps.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn missing_null_device_is_a_null_device_failure() {
        let err = open_null_device(Path::new("/nonexistent/daemon-time-logger/null")).unwrap_err();
        assert_eq!(err.step, DetachStep::NullDevice);
        assert_eq!(err.source, nix::Error::ENOENT);
        assert!(err.to_string().contains("null device"));
    }

    #[test]
    fn real_null_device_opens_above_standard_streams() {
        let fd = open_null_device(Path::new("/dev/null")).unwrap();
        assert!(fd > libc::STDERR_FILENO);
        close(fd).unwrap();
    }
}
