//! Request counters and the task that periodically logs them.
//!
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::interval};

pub static METER: Meter = Meter::new();

/// Counts `/predict` outcomes since the last report.
#[derive(Default)]
pub struct Meter {
    served: AtomicU64,
    failed: AtomicU64,
    served_micros: AtomicU64,
}

/// Counter values taken out of a [`Meter`] for one reporting interval.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tally {
    pub served: u64,
    pub failed: u64,
    pub served_micros: u64,
}

impl Meter {
    pub const fn new() -> Meter {
        Meter {
            served: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            served_micros: AtomicU64::new(0),
        }
    }

    pub fn record_served(&self, took: Duration) {
        self.served.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(took.as_micros()).unwrap_or(u64::MAX);
        self.served_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and zero all counters.
    pub fn take(&self) -> Tally {
        Tally {
            served: self.served.swap(0, Ordering::Relaxed),
            failed: self.failed.swap(0, Ordering::Relaxed),
            served_micros: self.served_micros.swap(0, Ordering::Relaxed),
        }
    }
}

impl Tally {
    /// One log line with rates over `elapsed`, or `None` for an idle interval.
    pub fn summary(&self, elapsed: Duration) -> Option<String> {
        let total = self.served + self.failed;
        if total == 0 {
            return None;
        }
        let secs = elapsed.as_secs_f64().max(f64::EPSILON);

        let mut line = format!(
            "Predictions: {:.2}/s served, {:.2}/s failed ({} of {} failed)",
            self.served as f64 / secs,
            self.failed as f64 / secs,
            self.failed,
            total
        );
        if self.served > 0 {
            let avg_ms = self.served_micros as f64 / self.served as f64 / 1000.0;
            line.push_str(&format!(", {avg_ms:.1} ms average"));
        }
        Some(line)
    }
}

pub fn spawn_meter_logger(period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut log_interval = interval(period);
        log_interval.tick().await;

        loop {
            let start = Instant::now();
            log_interval.tick().await;

            if let Some(line) = METER.take().summary(start.elapsed()) {
                log::info!("{line}");
            }
        }
    })
}
