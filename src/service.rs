use crate::shared::signal::ControlFlags;
use crate::shared::syslog::LogSink;
use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use std::fmt::Write as _;
use std::time::Duration;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Wall-clock source plus conversion to local calendar time.
pub trait Clock {
    fn now_unix(&self) -> i64;
    fn to_local(&self, unix_secs: i64) -> Option<NaiveDateTime>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }

    // Ambiguous or nonexistent local times count as conversion failures.
    fn to_local(&self, unix_secs: i64) -> Option<NaiveDateTime> {
        Local
            .timestamp_opt(unix_secs, 0)
            .single()
            .map(|local| local.naive_local())
    }
}

// Sleep between ticks. Implementations must return early when a signal is delivered.
pub trait Pause {
    fn pause(&mut self, interval: Duration);
}

pub struct SignalPause;

impl Pause for SignalPause {
    fn pause(&mut self, interval: Duration) {
        let secs = u32::try_from(interval.as_secs()).unwrap_or(u32::MAX).max(1);
        // sleep(3) returns the unslept remainder on interruption; the next tick starts right away.
        let _ = nix::unistd::sleep(secs);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    Conversion(i64),
    Format,
}

impl TimeError {
    fn log_message(&self) -> String {
        match self {
            TimeError::Conversion(secs) => {
                format!("localtime conversion failed for unix time {secs}")
            }
            TimeError::Format => "time formatting failed.".to_string(),
        }
    }
}

pub fn format_timestamp(time: &NaiveDateTime) -> Result<String, TimeError> {
    format_with(time, TIMESTAMP_FORMAT)
}

fn format_with(time: &NaiveDateTime, pattern: &str) -> Result<String, TimeError> {
    let mut out = String::with_capacity(pattern.len() + 8);
    write!(out, "{}", time.format(pattern)).map_err(|_| TimeError::Format)?;
    Ok(out)
}

// Counters returned when the loop stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub iterations: u64,
    pub reloads: u64,
    pub time_errors: u64,
}

// Steady-state loop: check flags, log the current time, sleep, repeat until terminate is seen.
pub struct ServiceLoop<'a, S, C, P> {
    flags: &'a ControlFlags,
    sink: &'a mut S,
    clock: C,
    pause: P,
    interval: Duration,
}

impl<'a, S, C, P> ServiceLoop<'a, S, C, P>
where
    S: LogSink,
    C: Clock,
    P: Pause,
{
    pub fn new(
        flags: &'a ControlFlags,
        sink: &'a mut S,
        clock: C,
        pause: P,
        interval: Duration,
    ) -> Self {
        Self {
            flags,
            sink,
            clock,
            pause,
            interval,
        }
    }

    pub fn run(mut self) -> LoopReport {
        let mut report = LoopReport::default();

        while !self.flags.terminate_requested() {
            report.iterations += 1;

            if self.flags.take_reload() {
                self.on_reload();
                report.reloads += 1;
            }

            match self.current_time() {
                Ok(stamp) => self.sink.info(&format!("Current time: {stamp}")),
                Err(err) => {
                    self.sink.error(&err.log_message());
                    report.time_errors += 1;
                }
            }

            // A SIGTERM that landed while this tick was logging should not wait out the sleep.
            if self.flags.terminate_requested() {
                break;
            }
            self.pause.pause(self.interval);
        }

        self.sink.info("Daemon received SIGTERM... shutting down.");
        self.sink.info(&format!(
            "Stopped after {} tick(s), {} reload(s), {} time error(s).",
            report.iterations, report.reloads, report.time_errors
        ));
        self.sink.close();
        report
    }

    // Reload hook. There is no configuration to re-read yet, so only the notice is logged.
    fn on_reload(&mut self) {
        self.sink.info("Received SIGHUP... reload.");
    }

    fn current_time(&self) -> Result<String, TimeError> {
        let now = self.clock.now_unix();
        let local = self
            .clock
            .to_local(now)
            .ok_or(TimeError::Conversion(now))?;
        format_timestamp(&local)
    }
}
