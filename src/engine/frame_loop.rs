//! Frame Loop
//!
//! Drives an [`Engine`] at its refresh rate on a tokio task. Each iteration
//! checks the stop flag, waits out the rest of the frame period and ticks.
//! A late frame is not caught up: the next wait is zero and the period
//! restarts from there.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self as time, Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::engine::engine::Engine;
use crate::engine::report::ErrorReporter;

/// Shared stop request.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop before its next tick.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fixed-period pacing.
///
/// The interval is created on the first wait, so a clock can be built
/// outside a runtime.
#[derive(Debug)]
pub struct FrameClock {
    period: Duration,
    interval: Option<Interval>,
}

impl FrameClock {
    /// Clock ticking every `period`.
    pub fn new(period: Duration) -> Self {
        // `interval` panics on a zero period
        let period = period.max(Duration::from_micros(1));
        Self { period, interval: None }
    }

    /// Frame period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep for what is left of the current period. The first call returns
    /// immediately; a late call returns at once and restarts the period.
    pub async fn wait(&mut self) {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}

/// The engine plus everything needed to run it.
#[derive(Debug)]
pub struct FrameLoop {
    engine: Engine,
    clock: FrameClock,
    reporter: ErrorReporter,
    stop: StopFlag,
}

impl FrameLoop {
    /// Loop paced by the engine's configured refresh rate.
    pub fn new(engine: Engine, reporter: ErrorReporter) -> Self {
        let clock = FrameClock::new(engine.config().tick_period());
        Self {
            engine,
            clock,
            reporter,
            stop: StopFlag::new(),
        }
    }

    /// Flag that stops this loop.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Borrow the engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutably borrow the engine.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Run until stopped, then drain error reports and hand the engine back.
    pub async fn run(mut self) -> Engine {
        info!(period = ?self.clock.period(), "Frame loop started");

        while !self.stop.is_stopped() {
            self.clock.wait().await;
            self.step();
        }

        let timeout = self.engine.config().report_drain_timeout();
        self.reporter.drain(timeout).await;
        info!(iterations = self.engine.iteration(), "Frame loop stopped");
        self.engine
    }

    /// Tick once, catching failures.
    ///
    /// A failed tick is handed to the [`ErrorReporter`], which spawns the
    /// report on the current tokio runtime. Calling this outside a runtime
    /// panics on the first failure.
    pub fn step(&mut self) {
        if let Err(err) = self.engine.tick() {
            warn!(iteration = self.engine.iteration(), error = %err, "Tick failed");
            self.engine.activate_error_indicator();
            self.reporter.report(&err);
        }
    }
}

/// A frame loop running on its own task.
#[derive(Debug)]
pub struct EngineTask {
    stop: StopFlag,
    handle: JoinHandle<Engine>,
}

impl EngineTask {
    /// Spawn `frame_loop` on the current runtime.
    pub fn spawn(frame_loop: FrameLoop) -> Self {
        let stop = frame_loop.stop_flag();
        let handle = tokio::spawn(frame_loop.run());
        Self { stop, handle }
    }

    /// Flag that stops the task.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Stop the loop and wait for it to finish.
    pub async fn stop_and_join(self) -> anyhow::Result<Engine> {
        self.stop.stop();
        Ok(self.handle.await?)
    }
}
