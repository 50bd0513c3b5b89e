//! Commit-gated effects.
//!
//! A handler that needs a side effect outside the room store (a push, an
//! unread counter change) registers it on its [`TransactionScope`] instead of
//! performing it inline:
//!
//! 1. Effects are registered as lazy futures; nothing runs at registration
//! 2. **`commit()` commits the store transaction, then hands the effects to
//!    the [`AfterCommitRunner`] as one batch**
//! 3. `rollback()`, a failed commit, or dropping the scope discards them
//!
//! ## Ordering
//!
//! The runner is a single background task fed by a FIFO channel, so batches
//! run in the order their transactions committed and effects within a batch
//! run in registration order. The caller never waits for them.
//!
//! ## Failures
//!
//! An effect that errors or panics is logged and skipped. It is never retried
//! and never reaches the transaction or the caller. Effects queued when the
//! process dies are lost; the unread counter and room list let clients catch
//! up.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::ports::{
    ChatStore, ChatTransaction, ConnectionRegistryError, PublishError, StoreError,
    UnreadCounterError,
};

/// Why an after-commit effect failed. Only ever logged.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error(transparent)]
    Counter(#[from] UnreadCounterError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Registry(#[from] ConnectionRegistryError),
}

/// A named, not yet started side effect.
pub struct Effect {
    name: &'static str,
    future: BoxFuture<'static, Result<(), EffectError>>,
}

impl Effect {
    pub fn new<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = Result<(), EffectError>> + Send + 'static,
    {
        Self {
            name,
            future: future.boxed(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    async fn run(self) {
        match AssertUnwindSafe(self.future).catch_unwind().await {
            Ok(Ok(())) => {
                tracing::trace!(effect = self.name, "after-commit effect completed");
            }
            Ok(Err(error)) => {
                tracing::warn!(effect = self.name, %error, "after-commit effect failed");
            }
            Err(_) => {
                tracing::error!(effect = self.name, "after-commit effect panicked");
            }
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect").field("name", &self.name).finish()
    }
}

enum Job {
    Batch(Vec<Effect>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the background task that runs committed effects.
///
/// Cheap to clone. The task stops once every handle is dropped and the queue
/// is drained.
#[derive(Clone)]
pub struct AfterCommitRunner {
    jobs: mpsc::UnboundedSender<Job>,
}

impl AfterCommitRunner {
    /// Spawn the runner task on the current tokio runtime.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();

        let worker = tokio::spawn(async move {
            let mut stopped = Vec::new();
            while let Some(job) = queue.recv().await {
                match job {
                    Job::Batch(effects) => {
                        for effect in effects {
                            effect.run().await;
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                    Job::Shutdown(done) => {
                        // Already queued jobs still drain.
                        queue.close();
                        stopped.push(done);
                    }
                }
            }
            for done in stopped {
                let _ = done.send(());
            }
            tracing::debug!("after-commit runner stopped");
        });

        (Self { jobs }, worker)
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        let count = effects.len();
        if self.jobs.send(Job::Batch(effects)).is_err() {
            tracing::error!(count, "after-commit runner is gone; dropping committed effects");
        }
    }

    /// Wait until every batch dispatched before this call has run.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Stop accepting batches and wait for the queue to drain.
    ///
    /// Commits after this point still succeed; their effects are dropped
    /// with an error log.
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Shutdown(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

/// One store transaction plus the effects waiting on its commit.
pub struct TransactionScope {
    tx: Box<dyn ChatTransaction>,
    effects: Vec<Effect>,
    runner: AfterCommitRunner,
}

impl TransactionScope {
    pub async fn begin(
        store: &dyn ChatStore,
        runner: &AfterCommitRunner,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            tx: store.begin().await?,
            effects: Vec::new(),
            runner: runner.clone(),
        })
    }

    /// The open transaction.
    pub fn tx(&mut self) -> &mut dyn ChatTransaction {
        self.tx.as_mut()
    }

    /// Register `effect` to run once after this scope commits.
    pub fn run_after_commit<F>(&mut self, name: &'static str, effect: F)
    where
        F: Future<Output = Result<(), EffectError>> + Send + 'static,
    {
        self.effects.push(Effect::new(name, effect));
    }

    pub fn pending_effects(&self) -> usize {
        self.effects.len()
    }

    /// Commit, then release the registered effects.
    ///
    /// If the commit fails the effects are dropped unexecuted.
    pub async fn commit(self) -> Result<(), StoreError> {
        let TransactionScope {
            tx,
            effects,
            runner,
        } = self;

        if let Err(error) = tx.commit().await {
            tracing::warn!(
                %error,
                discarded = effects.len(),
                "commit failed; after-commit effects discarded"
            );
            return Err(error);
        }
        runner.dispatch(effects);
        Ok(())
    }

    /// Roll back and discard every registered effect.
    pub async fn rollback(self) -> Result<(), StoreError> {
        if !self.effects.is_empty() {
            tracing::debug!(discarded = self.effects.len(), "rolling back with pending effects");
        }
        self.tx.rollback().await
    }
}
