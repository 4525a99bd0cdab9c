//! Recurring jury top-up loop.
//!
//! # Responsibility
//! - Run one eager top-up pass as soon as the loop starts, then one pass per
//!   tick, so students who register after a due time are picked up without
//!   an external trigger.
//!
//! # Invariants
//! - Timing comes only from the injected `Ticker`; the loop itself never
//!   reads the wall clock.
//! - A failing pass is logged and the loop keeps going.

use crate::clock::Clock;
use crate::repo::state_repo::StateStore;
use crate::service::grading_service::GradingService;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STOP_POLL_SLICE: Duration = Duration::from_millis(50);

/// Paces the scheduler loop.
pub trait Ticker {
    /// Blocks until the next pass is due. Returns `false` to end the loop.
    fn wait_next(&mut self) -> bool;
}

/// Shared flag that ends an [`IntervalTicker`] from another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed-interval ticker backed by thread sleep.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Duration,
    stop: StopHandle,
}

impl IntervalTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl Ticker for IntervalTicker {
    fn wait_next(&mut self) -> bool {
        let deadline = Instant::now() + self.interval;
        while !self.stop.is_stopped() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(STOP_POLL_SLICE.min(deadline - now));
        }
        false
    }
}

/// Ticker that fires a fixed number of times without sleeping.
#[derive(Debug, Clone)]
pub struct BoundedTicker {
    remaining: usize,
}

impl BoundedTicker {
    pub fn new(ticks: usize) -> Self {
        Self { remaining: ticks }
    }
}

impl Ticker for BoundedTicker {
    fn wait_next(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Totals for one `JuryScheduler::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Passes attempted, including the eager first one.
    pub passes: usize,
    /// Sum of roster growth events across passes.
    pub rosters_grown: usize,
    pub jurors_added: usize,
    pub failed_passes: usize,
}

/// Drives `GradingService::top_up_all` on every tick.
pub struct JuryScheduler<'svc, S: StateStore, C: Clock> {
    service: &'svc GradingService<S, C>,
}

impl<'svc, S: StateStore, C: Clock> JuryScheduler<'svc, S, C> {
    pub fn new(service: &'svc GradingService<S, C>) -> Self {
        Self { service }
    }

    /// Runs until `ticker` ends the loop.
    pub fn run<T: Ticker + ?Sized>(&self, ticker: &mut T) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        info!("event=scheduler_start module=scheduler status=ok");

        self.pass(&mut report);
        while ticker.wait_next() {
            self.pass(&mut report);
        }

        info!(
            "event=scheduler_stop module=scheduler status=ok passes={} rosters_grown={} jurors_added={} failed_passes={}",
            report.passes, report.rosters_grown, report.jurors_added, report.failed_passes
        );
        report
    }

    fn pass(&self, report: &mut SchedulerReport) {
        report.passes += 1;
        match self.service.top_up_all() {
            Ok(grown) => {
                report.rosters_grown += grown.len();
                report.jurors_added += grown.iter().map(|top_up| top_up.added).sum::<usize>();
                debug!(
                    "event=scheduler_pass module=scheduler status=ok pass={} grown={}",
                    report.passes,
                    grown.len()
                );
            }
            Err(err) => {
                report.failed_passes += 1;
                warn!(
                    "event=scheduler_pass module=scheduler status=error pass={} error={}",
                    report.passes, err
                );
            }
        }
    }
}
