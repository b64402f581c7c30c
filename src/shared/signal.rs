use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

// Process-wide control state shared between the signal handler and the service loop.
// The handler only ever stores `true`; the loop reads terminate and swaps reload back to false.
#[derive(Debug)]
pub struct ControlFlags {
    terminate: AtomicBool,
    reload: AtomicBool,
}

pub static CONTROL: ControlFlags = ControlFlags::new();

impl ControlFlags {
    pub const fn new() -> Self {
        Self {
            terminate: AtomicBool::new(false),
            reload: AtomicBool::new(false),
        }
    }

    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    // Consume a pending reload request. Swapping keeps a signal that lands between check and clear.
    pub fn take_reload(&self) -> bool {
        self.reload.swap(false, Ordering::SeqCst)
    }

    // Record a delivered signal. Only atomic stores happen here, so it is async-signal-safe.
    pub(crate) fn record(&self, signo: c_int) {
        if signo == Signal::SIGTERM as c_int {
            self.terminate.store(true, Ordering::SeqCst);
        } else if signo == Signal::SIGHUP as c_int {
            self.reload.store(true, Ordering::SeqCst);
        }
    }
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::new()
    }
}

extern "C" fn handle_signal(signo: c_int) {
    CONTROL.record(signo);
}

// Install SIGTERM and SIGHUP handlers with an empty mask and no flags.
// Without SA_RESTART a sleeping loop is woken when either signal arrives.
pub fn install_signal_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only performs atomic stores on a static.
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigterm_sets_terminate_only() {
        let flags = ControlFlags::new();
        flags.record(Signal::SIGTERM as c_int);
        assert!(flags.terminate_requested());
        assert!(!flags.take_reload());
    }

    #[test]
    fn sighup_sets_reload_until_taken() {
        let flags = ControlFlags::new();
        flags.record(Signal::SIGHUP as c_int);
        assert!(!flags.terminate_requested());
        assert!(flags.take_reload());
        assert!(!flags.take_reload());
    }

    #[test]
    fn repeated_sighup_before_take_collapses() {
        let flags = ControlFlags::new();
        flags.record(Signal::SIGHUP as c_int);
        flags.record(Signal::SIGHUP as c_int);
        assert!(flags.take_reload());
        assert!(!flags.take_reload());
    }

    #[test]
    fn terminate_is_sticky() {
        let flags = ControlFlags::new();
        flags.record(Signal::SIGTERM as c_int);
        flags.record(Signal::SIGHUP as c_int);
        let _ = flags.take_reload();
        assert!(flags.terminate_requested());
    }

    // Real delivery through the installed handlers. Kept in one test because CONTROL is global.
    #[test]
    fn installed_handlers_set_flags_and_wake_the_sleep() {
        use crate::service::{Pause, SignalPause};
        use nix::sys::pthread::{pthread_kill, pthread_self};
        use nix::sys::signal::raise;
        use std::sync::Arc;
        use std::thread;
        use std::time::{Duration, Instant};

        install_signal_handlers().unwrap();

        raise(Signal::SIGHUP).unwrap();
        assert!(CONTROL.take_reload());
        assert!(!CONTROL.take_reload());

        let sleeper = pthread_self();
        let woke = Arc::new(AtomicBool::new(false));
        let woke_for_sender = Arc::clone(&woke);
        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            while !woke_for_sender.load(Ordering::SeqCst) {
                pthread_kill(sleeper, Signal::SIGHUP).unwrap();
                thread::sleep(Duration::from_millis(100));
            }
        });

        let started = Instant::now();
        SignalPause.pause(Duration::from_secs(3));
        let elapsed = started.elapsed();
        woke.store(true, Ordering::SeqCst);
        sender.join().unwrap();

        assert!(elapsed < Duration::from_secs(1), "pause lasted {elapsed:?}");
        assert!(CONTROL.take_reload());

        raise(Signal::SIGTERM).unwrap();
        assert!(CONTROL.terminate_requested());
    }

    #[test]
    fn other_signals_are_ignored() {
        let flags = ControlFlags::new();
        flags.record(Signal::SIGUSR1 as c_int);
        flags.record(Signal::SIGINT as c_int);
        assert!(!flags.terminate_requested());
        assert!(!flags.take_reload());
    }
}
