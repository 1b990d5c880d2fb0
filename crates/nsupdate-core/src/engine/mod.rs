//! Update engine
//!
//! The UpdateEngine is responsible for:
//! - Accepting address snapshots from the tracker
//! - Building one transaction per delivery attempt
//! - Delivering transactions via Transport
//! - Retrying failed deliveries with linear backoff
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐  update(snapshot)  ┌───────────────┐
//! │ AddressTracker │ ─────────────────▶ │  UpdateEngine │
//! │   (caller)     │   bounded mpsc     │  (actor task) │
//! └────────────────┘                    └───────┬───────┘
//!                                               │ send(txn)
//!                                               ▼
//!                                       ┌───────────────┐
//!                                       │   Transport   │
//!                                       └───────────────┘
//! ```
//!
//! ## Single writer
//!
//! All retry state (the pending snapshot, the attempt counter, the armed
//! timer) lives inside one spawned task. The handle only submits snapshots
//! and awaits shutdown, so there is no shared mutable state and no lock.
//! The request channel is bounded at one entry: a caller submitting while
//! an attempt is in flight waits, which is the back-pressure that keeps at
//! most one transaction in flight at a time.
//!
//! ## Retry policy
//!
//! After `n` consecutive failures the next attempt is delayed by
//! `n × retry_interval`. There is no retry ceiling while the channel is
//! open; a superseding snapshot replaces the pending one and resets the
//! counter, since it starts a new update rather than continuing the failed
//! one. Each attempt rebuilds the transaction so the TSIG timestamp is
//! fresh.
//!
//! ## Shutdown
//!
//! [`UpdateEngine::done`] closes the channel and awaits the actor. An
//! already-armed retry still runs during this drain, but a failure while
//! draining arms no further retry; `done()` then returns that final error.
//! This keeps shutdown terminating even against an unreachable server.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::error::{Error, Result};
use crate::tracker::AddressSnapshot;
use crate::traits::Transport;
use crate::transaction::TransactionBuilder;

/// Handle to the update actor.
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateEngine::start()`]
/// 2. Submit snapshots with [`UpdateEngine::update()`]
/// 3. Shut down with [`UpdateEngine::done()`], which reports the final
///    delivery outcome
pub struct UpdateEngine {
    requests: Option<mpsc::Sender<AddressSnapshot>>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl UpdateEngine {
    /// Validate the configuration and spawn the actor task.
    pub fn start(config: UpdateConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        info!(
            name = %config.name,
            zone = %config.zone,
            server = %config.server,
            "update engine started"
        );

        let (tx, rx) = mpsc::channel(1);
        let actor = Actor {
            builder: TransactionBuilder::new(&config),
            config,
            transport,
        };
        let worker = tokio::spawn(actor.run(rx));

        Ok(Self {
            requests: Some(tx),
            worker: Some(worker),
        })
    }

    /// Submit a snapshot for delivery.
    ///
    /// Waits while the actor is busy with a previous submission. A
    /// snapshot accepted here supersedes any still-pending one.
    ///
    /// # Errors
    ///
    /// [`Error::EngineStopped`] once [`UpdateEngine::done`] has been
    /// called.
    pub async fn update(&self, snapshot: AddressSnapshot) -> Result<()> {
        let Some(requests) = &self.requests else {
            return Err(Error::EngineStopped);
        };
        requests
            .send(snapshot)
            .await
            .map_err(|_| Error::EngineStopped)
    }

    /// Close the request channel, drain, and return the final outcome.
    ///
    /// Returns `Ok(())` when the last accepted snapshot was delivered, or
    /// the error of the final failed attempt. Calling `done` twice returns
    /// [`Error::EngineStopped`].
    pub async fn done(&mut self) -> Result<()> {
        // Dropping the sender is what lets the actor's recv() observe the
        // close and begin draining.
        self.requests.take();
        let Some(worker) = self.worker.take() else {
            return Err(Error::EngineStopped);
        };
        match worker.await {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::other(format!("engine task failed: {e}"))),
        }
    }
}

/// State owned by the actor task.
struct Actor {
    config: UpdateConfig,
    builder: TransactionBuilder,
    transport: Arc<dyn Transport>,
}

impl Actor {
    async fn run(self, mut requests: mpsc::Receiver<AddressSnapshot>) -> Result<()> {
        let mut pending: Option<AddressSnapshot> = None;
        let mut attempts: u32 = 0;
        let mut deadline: Option<Instant> = None;
        let mut last_error: Option<Error> = None;
        let mut closed = false;

        loop {
            if closed && deadline.is_none() {
                break;
            }
            let retry_at = deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                request = requests.recv(), if !closed => {
                    match request {
                        Some(snapshot) => {
                            debug!(addrs = snapshot.addrs.len(), "snapshot accepted");
                            pending = Some(snapshot);
                            attempts = 0;
                            deadline = None;
                            self.attempt(
                                &mut pending,
                                &mut attempts,
                                &mut deadline,
                                &mut last_error,
                                closed,
                            )
                            .await;
                        }
                        None => {
                            debug!("request channel closed, draining");
                            closed = true;
                        }
                    }
                }
                _ = time::sleep_until(retry_at), if deadline.is_some() => {
                    deadline = None;
                    // A timer without a pending retry is stale; ignore it.
                    if attempts == 0 || pending.is_none() {
                        continue;
                    }
                    self.attempt(
                        &mut pending,
                        &mut attempts,
                        &mut deadline,
                        &mut last_error,
                        closed,
                    )
                    .await;
                }
            }
        }

        match last_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    async fn attempt(
        &self,
        pending: &mut Option<AddressSnapshot>,
        attempts: &mut u32,
        deadline: &mut Option<Instant>,
        last_error: &mut Option<Error>,
        closed: bool,
    ) {
        let Some(snapshot) = pending.as_ref() else {
            return;
        };
        let txn = self.builder.build(snapshot);
        match self
            .transport
            .send(&txn, self.config.server, self.config.timeout)
            .await
        {
            Ok(()) => {
                info!(
                    name = %txn.name,
                    addrs = txn.addrs.len(),
                    "update delivered"
                );
                *pending = None;
                *attempts = 0;
                *deadline = None;
                *last_error = None;
            }
            Err(e) => {
                *attempts += 1;
                if closed {
                    warn!(error = %e, "delivery failed during drain, giving up");
                    *deadline = None;
                } else {
                    let delay = self.config.retry_interval * *attempts;
                    warn!(
                        error = %e,
                        attempts = *attempts,
                        retry_in = ?delay,
                        "delivery failed, retry scheduled"
                    );
                    *deadline = Some(Instant::now() + delay);
                }
                *last_error = Some(e);
            }
        }
    }
}
