use crate::args::DaemonSettings;
use crate::service::{ServiceLoop, SignalPause, SystemClock};
use crate::shared::detach::detach;
use crate::shared::signal::{CONTROL, install_signal_handlers};
use crate::shared::syslog::{LogSink, Syslog};
use anyhow::Result;

// Public run entrypoint: detach, open syslog, then tick until SIGTERM is observed.
// Only the final daemon process returns from here; intermediate forks exit inside `detach`.
pub fn run_daemon(settings: DaemonSettings) -> Result<()> {
    detach(&settings, install_signal_handlers)?;

    let mut sink = Syslog::open(&settings.ident);
    sink.info("Daemon started...");

    ServiceLoop::new(
        &CONTROL,
        &mut sink,
        SystemClock,
        SignalPause,
        settings.tick_interval,
    )
    .run();
    Ok(())
}
