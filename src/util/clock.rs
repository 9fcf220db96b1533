//! Named phase timers shared between pipeline stages
//!
//! A `Clock` accumulates wall time per phase ("read", "write", "copy", "sync",
//! "total"). The read stage, the write stage and the transfer that owns them
//! all hold the same `Clock`, so every operation goes through one mutex.
//!
//! Timer misuse (starting a running timer, stopping or querying one that is
//! not running) is a bug in the caller and panics.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Time spent reading from the source
pub const READ: &str = "read";
/// Time spent writing to the sink
pub const WRITE: &str = "write";
/// Time spent in the pipeline
pub const COPY: &str = "copy";
/// Time spent flushing the sink to stable storage
pub const SYNC: &str = "sync";
/// Time spent on the whole transfer
pub const TOTAL: &str = "total";

#[derive(Debug, Default)]
struct Timer {
    total: Duration,
    started: Option<Instant>,
}

impl Timer {
    fn total_now(&self, now: Instant) -> Duration {
        match self.started {
            Some(started) => self.total + now.duration_since(started),
            None => self.total,
        }
    }
}

#[derive(Debug, Default)]
struct Timers {
    by_name: HashMap<String, Timer>,
    /// First-use order, for reporting
    order: Vec<String>,
}

impl Timers {
    fn running(&mut self, name: &str) -> &mut Timer {
        let Some(timer) = self.by_name.get_mut(name) else {
            panic!("No such timer {}", name);
        };
        if timer.started.is_none() {
            panic!("Timer {} is not running", name);
        }
        timer
    }
}

/// One line of a clock snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub name: String,
    /// Accumulated time, including the in-flight part of a running timer
    #[serde(rename = "total_seconds", serialize_with = "as_secs_f64")]
    pub total: Duration,
    pub running: bool,
}

fn as_secs_f64<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Concurrency-safe registry of named timers
#[derive(Debug, Default)]
pub struct Clock {
    timers: Mutex<Timers>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Timers> {
        // A panic while holding the lock is a timer misuse; the state itself
        // is never left half-updated, so keep going with it.
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin timing phase `name`
    ///
    /// # Panics
    /// Panics if `name` is already running.
    pub fn start(&self, name: &str) {
        let mut timers = self.lock();
        if !timers.by_name.contains_key(name) {
            timers.order.push(name.to_string());
        }
        let timer = timers.by_name.entry(name.to_string()).or_default();
        if timer.started.is_some() {
            panic!("Timer {} is already started", name);
        }
        timer.started = Some(Instant::now());
    }

    /// End phase `name`, returning the time since it was started
    ///
    /// # Panics
    /// Panics if `name` was never started or is not running.
    pub fn stop(&self, name: &str) -> Duration {
        let mut timers = self.lock();
        let timer = timers.running(name);
        let elapsed = timer.started.take().map(|s| s.elapsed()).unwrap_or_default();
        timer.total += elapsed;
        elapsed
    }

    /// Time since `name` was started, without stopping it
    ///
    /// # Panics
    /// Panics if `name` was never started or is not running.
    pub fn elapsed(&self, name: &str) -> Duration {
        let mut timers = self.lock();
        let timer = timers.running(name);
        timer.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Accumulated time of `name`, or `None` if it was never started
    pub fn total(&self, name: &str) -> Option<Duration> {
        let now = Instant::now();
        self.lock().by_name.get(name).map(|t| t.total_now(now))
    }

    /// Whether `name` is currently running
    pub fn is_running(&self, name: &str) -> bool {
        self.lock()
            .by_name
            .get(name)
            .is_some_and(|t| t.started.is_some())
    }

    /// All timers in first-use order
    pub fn snapshot(&self) -> Vec<TimerSnapshot> {
        let now = Instant::now();
        let timers = self.lock();
        timers
            .order
            .iter()
            .map(|name| {
                let timer = &timers.by_name[name];
                TimerSnapshot {
                    name: name.clone(),
                    total: timer.total_now(now),
                    running: timer.started.is_some(),
                }
            })
            .collect()
    }
}

impl fmt::Display for Clock {
    /// Renders `read=0.120, write=0.345*` where `*` marks running timers
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, timer) in self.snapshot().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}={:.3}{}",
                timer.name,
                timer.total.as_secs_f64(),
                if timer.running { "*" } else { "" }
            )?;
        }
        Ok(())
    }
}
