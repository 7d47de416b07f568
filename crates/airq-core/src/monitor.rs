//! Cooperative main loop
//!
//! [`Monitor::step`] is one pass of the device loop: let the dashboard process
//! its connection events, then run the read cycle if the sampling interval
//! has elapsed. The caller supplies the current time so the loop can run on
//! the embassy clock on the device and on the host clock in the simulator.

use embassy_time::{Duration, Instant};
use log::warn;

use crate::alarm::AlarmOutput;
use crate::config::DeviceConfig;
use crate::cycle::{CycleError, CycleReport, ReadCycle};
use crate::dashboard::Dashboard;
use crate::sensors::{ClimateSensor, GasSensor};

/// Fixed-interval timer polled from the main loop.
///
/// Fires one interval after the first poll, then once per interval. When the
/// loop falls more than an interval behind it resynchronises to `now` rather
/// than firing back-to-back.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl IntervalTimer {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(next_due) = self.next_due else {
            self.next_due = Some(now + self.interval);
            return false;
        };

        if now < next_due {
            return false;
        }

        let following = next_due + self.interval;
        self.next_due = Some(if following <= now {
            now + self.interval
        } else {
            following
        });
        true
    }
}

/// Collaborators and loop state, built once at startup
pub struct Monitor<G, C, D, A> {
    pub gas: G,
    pub climate: C,
    pub dashboard: D,
    pub alarm: A,
    cycle: ReadCycle,
    timer: IntervalTimer,
}

impl<G, C, D, A> Monitor<G, C, D, A>
where
    G: GasSensor,
    C: ClimateSensor,
    D: Dashboard,
    A: AlarmOutput,
{
    pub fn new(config: &DeviceConfig<'_>, gas: G, climate: C, dashboard: D, alarm: A) -> Self {
        Self {
            gas,
            climate,
            dashboard,
            alarm,
            cycle: ReadCycle::new(config),
            timer: IntervalTimer::new(config.sampling.interval()),
        }
    }

    /// One loop iteration. Returns the cycle result when a cycle ran.
    pub async fn step(&mut self, now: Instant) -> Option<Result<CycleReport, CycleError>> {
        if let Err(e) = self.dashboard.service().await {
            warn!("Dashboard service failed: {}", e);
        }

        if !self.timer.poll(now) {
            return None;
        }

        Some(
            self.cycle
                .run(
                    &mut self.gas,
                    &mut self.climate,
                    &mut self.dashboard,
                    &mut self.alarm,
                )
                .await,
        )
    }
}
