//! Scheduler: drives the sample -> aggregate -> publish tick at a fixed period with cooperative stop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::aggregator::{aggregate, Reducer};
use crate::pipeline::publisher::Publisher;
use crate::pipeline::sampler::Sampler;
use crate::sensor::types::AggregatedReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Draining,
}

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Loop exited at a tick boundary
    Drained,
    /// In-flight tick exceeded the drain timeout and was aborted
    Abandoned,
    /// Scheduler was not running
    NotRunning,
}

struct RunHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct Scheduler {
    sampler: Sampler,
    reducer: Arc<dyn Reducer>,
    publisher: Arc<Publisher>,
    period: Duration,
    drain_timeout: Duration,
    state: watch::Sender<SchedulerState>,
    run: Mutex<Option<RunHandle>>,
}

impl Scheduler {
    pub fn new(
        sampler: Sampler,
        reducer: Arc<dyn Reducer>,
        publisher: Arc<Publisher>,
        period: Duration,
        drain_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self {
            sampler,
            reducer,
            publisher,
            period,
            drain_timeout,
            state,
            run: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// One full tick. Sources are sampled, reduced and handed to the publisher in sequence.
    pub async fn run_tick(&self) -> AggregatedReading {
        let samples = self.sampler.sample().await;
        let reading = aggregate(&samples, self.reducer.as_ref(), Utc::now());

        if !reading.is_available() {
            debug!("No valid source this tick ({} configured)", samples.len());
        }

        self.publisher.publish(reading.clone()).await;
        reading
    }

    /// Begin ticking in a background task. The first tick runs immediately.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut run = self.run.lock().await;
        if run.is_some() {
            return Err(anyhow!("Scheduler is already running"));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        self.state.send_replace(SchedulerState::Running);
        let task = tokio::spawn(async move { scheduler.tick_loop(shutdown_rx).await });

        info!(
            "Scheduler started: {} sources every {:.1}s",
            self.sampler.descriptors().len(),
            self.period.as_secs_f64()
        );
        *run = Some(RunHandle { shutdown_tx, task });
        Ok(())
    }

    /// Request a stop and wait for the loop to reach a tick boundary.
    /// The in-flight tick is abandoned if it does not finish within the drain timeout.
    pub async fn stop(&self) -> StopOutcome {
        let Some(RunHandle { shutdown_tx, mut task }) = self.run.lock().await.take() else {
            return StopOutcome::NotRunning;
        };

        self.state.send_replace(SchedulerState::Draining);
        let _ = shutdown_tx.send(true);

        let outcome = match tokio::time::timeout(self.drain_timeout, &mut task).await {
            Ok(Ok(())) => StopOutcome::Drained,
            Ok(Err(e)) => {
                warn!("Tick task ended abnormally: {}", e);
                StopOutcome::Drained
            }
            Err(_) => {
                warn!(
                    "In-flight tick exceeded drain timeout ({:.1}s), abandoning it",
                    self.drain_timeout.as_secs_f64()
                );
                task.abort();
                StopOutcome::Abandoned
            }
        };

        self.state.send_replace(SchedulerState::Stopped);
        info!("Scheduler stopped");
        outcome
    }

    async fn tick_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticks: u64 = 0;

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            self.run_tick().await;

            ticks += 1;
            if ticks % 60 == 0 {
                debug!("Ticks completed: {}", ticks);
            }

            // Period counts from tick completion, so a slow tick never overlaps the next.
            // The only value ever sent is `true`; a dropped sender also means stop.
            tokio::select! {
                _ = tokio::time::sleep(self.period) => {}
                _ = shutdown.changed() => break,
            }
        }

        debug!("Tick loop exited after {} ticks", ticks);
    }
}
