//! Periodic, poke-driven driver for background work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Doer;
use crate::error::Result;

/// Drives a doer on a fixed interval and on demand.
///
/// A single worker task owns execution. Pokes arriving while a tick runs
/// coalesce into at most one follow-up tick; a zero interval disables
/// periodic firing so only pokes drive work.
pub struct Scheduler {
    notify: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Scheduler {
    pub fn new(doer: Arc<dyn Doer>, period: Duration) -> Self {
        let notify = Arc::new(Notify::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = tokio::spawn(Self::run(doer, notify.clone(), shutdown_rx, period));

        Self {
            notify,
            shutdown,
            worker: Mutex::new(Some(worker)),
            closed: AtomicBool::new(false),
        }
    }

    async fn run(
        doer: Arc<dyn Doer>,
        notify: Arc<Notify>,
        mut shutdown: watch::Receiver<bool>,
        period: Duration,
    ) {
        debug!(period_secs = period.as_secs(), "scheduler worker started");

        loop {
            tokio::select! {
                _ = Self::sleep(period) => {}
                _ = notify.notified() => {}
                _ = shutdown.changed() => {
                    debug!("scheduler worker stopping");
                    return;
                }
            }

            // The tick runs outside the select, so a close signal never
            // interrupts in-flight work.
            if let Err(err) = doer.do_work().await {
                warn!(error = %err, "scheduled work failed");
            }
        }
    }

    async fn sleep(period: Duration) {
        if period.is_zero() {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(period).await;
        }
    }

    /// Requests an immediate tick from any thread.
    ///
    /// `Notify` holds at most one permit, so any number of pokes during a
    /// running tick trigger at most one follow-up run.
    pub fn poke(&self) {
        self.notify.notify_one();
    }

    /// Signals the worker to exit after its current tick and waits for it.
    /// Safe to call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown.send(true);

        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                warn!(error = %err, "scheduler worker exited abnormally");
            }
        }
    }
}

#[async_trait]
impl Doer for Scheduler {
    /// External poke surface: callers that hold the scheduler as a doer can
    /// request an immediate tick.
    async fn do_work(&self) -> Result<()> {
        self.poke();
        Ok(())
    }
}
