//! Periodic Timer
//!
//! Process-wide scheduler for periodic background jobs such as the cache
//! janitor. Jobs run on a small dedicated tokio runtime, so callers do not
//! need a runtime of their own and synchronous code can register jobs.

use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

static GLOBAL: Lazy<Timer> =
    Lazy::new(|| Timer::new().expect("failed to start the process-wide timer runtime"));

/// Returned by a job after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    /// Keep the job scheduled
    Continue,
    /// Deregister the job; it will not tick again
    Stop,
}

/// Runs registered jobs at a fixed period.
pub struct Timer {
    runtime: Runtime,
}

impl Timer {
    /// Starts a timer with its own single-worker runtime.
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("lazycache-timer")
            .enable_time()
            .build()?;
        Ok(Self { runtime })
    }

    /// The timer shared by every subsystem of the process.
    pub fn global() -> &'static Timer {
        &GLOBAL
    }

    /// Registers `job` to run every `period`, first after one full period.
    ///
    /// A job never overlaps with itself: a slow tick delays the next one
    /// instead of queueing a burst. The job is dropped once it returns
    /// [`TimerControl::Stop`].
    ///
    /// # Arguments
    /// * `name` - Label used in log output
    /// * `period` - Interval between ticks (clamped to at least 1 ms)
    /// * `job` - Callback run on each tick
    pub fn add<F>(&self, name: &'static str, period: Duration, mut job: F) -> JobHandle
    where
        F: FnMut() -> TimerControl + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        info!("Registering timer job '{}' every {:?}", name, period);

        let handle = self.runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if job() == TimerControl::Stop {
                    debug!("Timer job '{}' stopped", name);
                    break;
                }
            }
        });

        JobHandle { handle }
    }
}

/// Handle to a registered job.
#[derive(Debug)]
pub struct JobHandle {
    handle: JoinHandle<()>,
}

impl JobHandle {
    /// Deregisters the job without waiting for it to stop itself.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether the job has stopped, by returning `Stop` or by abort.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
