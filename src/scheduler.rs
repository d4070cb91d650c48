//! # Telemetry Scheduler
//!
//! Invokes a registered cycle once shortly after start and then at a fixed
//! period, until cancelled.
//!
//! Timer tasks never run the cycle themselves. Each fire first takes the
//! single permit of a one-slot semaphore with `try_acquire_owned` and hands
//! it to the worker task together with the fire; the permit is released when
//! the cycle returns. A fire that finds the permit taken is dropped, so at
//! most one cycle is ever in flight and overlapping fires never queue up.
//!
//! Cancellation is a `watch` flag that only ever goes from `false` to `true`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Default period between cycles
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

/// Work executed on every fire
#[async_trait]
pub trait Cycle: Send + 'static {
    /// Run one cycle
    ///
    /// Returning an error stops the scheduler; the error is reported by
    /// [`Scheduler::wait`].
    async fn run(&mut self, scheduler: &SchedulerHandle) -> Result<()>;
}

/// Timer that produced a fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSource {
    Once,
    Periodic,
}

struct Fire {
    source: FireSource,
    _permit: OwnedSemaphorePermit,
}

/// Cloneable handle used to cancel the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl SchedulerHandle {
    /// Stop all future fires; idempotent and irreversible
    pub fn cancel(&self) {
        if !self.cancel.send_replace(true) {
            info!("Telemetry scheduler cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }
}

/// Single-worker repeating timer
pub struct Scheduler {
    handle: SchedulerHandle,
    guard: Arc<Semaphore>,
    fires: mpsc::UnboundedSender<Fire>,
    worker: JoinHandle<Result<()>>,
    timers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the worker that will run `cycle`
    ///
    /// Nothing fires until [`schedule_once`](Self::schedule_once) or
    /// [`schedule_periodic`](Self::schedule_periodic) is called.
    pub fn start<C: Cycle>(cycle: C) -> Self {
        let (cancel, _) = watch::channel(false);
        let handle = SchedulerHandle {
            cancel: Arc::new(cancel),
        };
        let (fires, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(cycle, receiver, handle.clone()));

        Self {
            handle,
            guard: Arc::new(Semaphore::new(1)),
            fires,
            worker,
            timers: Vec::new(),
        }
    }

    /// Fire once after `delay`
    pub fn schedule_once(&mut self, delay: Duration) {
        let guard = self.guard.clone();
        let fires = self.fires.clone();
        let mut cancelled = self.handle.subscribe();

        debug!("Scheduling one-shot fire in {:?}", delay);
        self.timers.push(tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancelled) => {}
                _ = tokio::time::sleep(delay) => fire(&guard, &fires, FireSource::Once),
            }
        }));
    }

    /// Fire every `period`, starting one period from now
    pub fn schedule_periodic(&mut self, period: Duration) {
        let guard = self.guard.clone();
        let fires = self.fires.clone();
        let mut cancelled = self.handle.subscribe();

        debug!("Scheduling periodic fire every {:?}", period);
        self.timers.push(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = wait_cancelled(&mut cancelled) => return,
                    _ = ticker.tick() => fire(&guard, &fires, FireSource::Periodic),
                }
            }
        }));
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Stop all future fires; idempotent and irreversible
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Wait until the scheduler stops
    ///
    /// Returns `Ok(())` after cancellation, or the error of the cycle that
    /// stopped it.
    pub async fn wait(mut self) -> Result<()> {
        let result = (&mut self.worker).await;
        self.abort_timers();

        match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }

    /// Cancel and tear down all tasks without waiting for a running cycle
    pub fn shutdown(self) {
        self.handle.cancel();
        self.worker.abort();
        self.abort_timers();
    }

    fn abort_timers(&self) {
        for timer in &self.timers {
            timer.abort();
        }
    }
}

/// Hand a fire to the worker if no cycle is in flight
fn fire(guard: &Arc<Semaphore>, fires: &mpsc::UnboundedSender<Fire>, source: FireSource) {
    match guard.clone().try_acquire_owned() {
        Ok(permit) => {
            if fires.send(Fire { source, _permit: permit }).is_err() {
                debug!("Worker stopped, discarding {:?} fire", source);
            }
        }
        Err(TryAcquireError::NoPermits) => {
            warn!("Cycle still running, dropping {:?} fire", source);
        }
        Err(TryAcquireError::Closed) => {}
    }
}

async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
    loop {
        let is_cancelled = *cancelled.borrow_and_update();
        if is_cancelled {
            return;
        }
        if cancelled.changed().await.is_err() {
            // Sender gone: cancellation can no longer happen
            std::future::pending::<()>().await;
        }
    }
}

async fn run_worker<C: Cycle>(
    mut cycle: C,
    mut fires: mpsc::UnboundedReceiver<Fire>,
    handle: SchedulerHandle,
) -> Result<()> {
    let mut cancelled = handle.subscribe();

    loop {
        let fire = tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancelled) => return Ok(()),
            fire = fires.recv() => match fire {
                Some(fire) => fire,
                None => return Ok(()),
            },
        };

        // A fire may have been handed over just before cancellation
        if handle.is_cancelled() {
            return Ok(());
        }

        debug!("Running cycle ({:?} fire)", fire.source);
        if let Err(e) = cycle.run(&handle).await {
            handle.cancel();
            return Err(e);
        }
        drop(fire);
    }
}
