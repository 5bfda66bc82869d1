//! Load, decide, append; retry on conflict.
//!
//! [`TransactionalStream`] is the only place in the workspace that talks to a
//! [`StreamStore`] on behalf of business logic. Every writing operation runs
//! the same cycle:
//!
//! 1. load the folded state and its version
//! 2. run the decision against a fresh [`Accumulator`]
//! 3. if nothing was proposed, stop: success with no write
//! 4. append the proposals at the loaded version
//! 5. on conflict, throw the attempt away and go back to 1, up to
//!    [`StreamConfig::max_attempts`] times
//!
//! Decision and store failures end the operation immediately. The loop only
//! yields at the load and the append; decisions and folds run inline.
//!
//! Decisions may run once per attempt, so they must not have effects outside
//! the events they propose.

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::metrics::{
    QUERY_TOTAL, TRANSACT_ATTEMPTS, TRANSACT_COMMITTED, TRANSACT_CONFLICTS, TRANSACT_EXHAUSTED,
    TRANSACT_NOOP,
};
use composable_stream_core::accumulator::{Accumulator, FoldFn};
use composable_stream_core::stream::{StreamId, Version};
use composable_stream_core::stream_store::{AppendOutcome, StreamStore};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// What one attempt's decision produced: the caller's value and the events to commit.
struct Decided<T, E> {
    outcome: T,
    events: Vec<E>,
}

/// Transactional access to one stream.
///
/// Cheap to clone; clones share the store and fold.
///
/// # Example
///
/// ```ignore
/// let stream = TransactionalStream::new(store, StreamId::new("counter-1"), fold)
///     .with_config(StreamConfig::default().with_max_attempts(5));
///
/// stream.transact(|count| if *count < 10 { vec![1] } else { vec![] }).await?;
///
/// let assigned = stream
///     .decide(|acc| {
///         acc.execute(|_| [1]);
///         acc.state()
///     })
///     .await?;
///
/// let current = stream.query(|count| *count).await?;
/// ```
pub struct TransactionalStream<E, S> {
    store: Arc<dyn StreamStore<E, S>>,
    stream_id: StreamId,
    fold: FoldFn<S, E>,
    config: StreamConfig,
    cancellation: Option<watch::Receiver<bool>>,
}

impl<E, S> Clone for TransactionalStream<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            stream_id: self.stream_id.clone(),
            fold: Arc::clone(&self.fold),
            config: self.config,
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<E, S> fmt::Debug for TransactionalStream<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionalStream")
            .field("stream_id", &self.stream_id)
            .field("config", &self.config)
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl<E, S> TransactionalStream<E, S>
where
    E: Send + 'static,
    S: Clone + Send + 'static,
{
    /// Bind a stream id to a store and the fold that reconstructs its state.
    #[must_use]
    pub fn new(store: Arc<dyn StreamStore<E, S>>, stream_id: StreamId, fold: FoldFn<S, E>) -> Self {
        Self {
            store,
            stream_id,
            fold,
            config: StreamConfig::default(),
            cancellation: None,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Observe a cancellation flag; `true` cancels.
    ///
    /// The flag is checked before every attempt and raced against each load.
    /// An append already sent to the store is allowed to finish so the
    /// reported outcome matches what the store did.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: watch::Receiver<bool>) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// The stream this handle writes to.
    #[must_use]
    pub const fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Run `interpret` against the latest state and commit what it proposes.
    ///
    /// An empty proposal succeeds without writing.
    ///
    /// # Errors
    ///
    /// [`StreamError::AttemptsExhausted`], [`StreamError::Store`] or
    /// [`StreamError::Cancelled`].
    pub async fn transact<I, F>(&self, mut interpret: F) -> Result<(), StreamError>
    where
        I: IntoIterator<Item = E>,
        F: FnMut(&S) -> I + Send,
    {
        self.run(|acc| {
            acc.execute(&mut interpret);
            Ok::<_, Infallible>(())
        })
        .await
    }

    /// [`transact`](Self::transact) with a decision that can reject the command.
    ///
    /// # Errors
    ///
    /// As [`transact`](Self::transact), plus [`StreamError::Domain`] carrying
    /// the decision's error unchanged. A rejection is never retried.
    pub async fn try_transact<I, D, F>(&self, mut interpret: F) -> Result<(), StreamError<D>>
    where
        I: IntoIterator<Item = E>,
        D: std::error::Error + Send + Sync + 'static,
        F: FnMut(&S) -> Result<I, D> + Send,
    {
        self.run(|acc| acc.try_execute(&mut interpret)).await
    }

    /// Run a multi-step decision and return its result once the events commit.
    ///
    /// `decide` gets the attempt's [`Accumulator`]: it may propose several
    /// times, read the state in between, and return anything derived from it.
    /// The value from a conflicting attempt is dropped with its events; only
    /// the value from the committing attempt is returned.
    ///
    /// # Errors
    ///
    /// As [`transact`](Self::transact).
    pub async fn decide<T, F>(&self, mut decide: F) -> Result<T, StreamError>
    where
        T: Send,
        F: FnMut(&mut Accumulator<'_, E, S>) -> T + Send,
    {
        self.run(|acc| Ok::<_, Infallible>(decide(acc))).await
    }

    /// [`decide`](Self::decide) with a decision that can reject the command.
    ///
    /// Events proposed before the rejection are discarded with the attempt.
    ///
    /// # Errors
    ///
    /// As [`try_transact`](Self::try_transact).
    pub async fn try_decide<T, D, F>(&self, decide: F) -> Result<T, StreamError<D>>
    where
        T: Send,
        D: std::error::Error + Send + Sync + 'static,
        F: FnMut(&mut Accumulator<'_, E, S>) -> Result<T, D> + Send,
    {
        self.run(decide).await
    }

    /// Project the latest state without writing.
    ///
    /// Never appends, so never conflicts and never retries.
    ///
    /// # Errors
    ///
    /// [`StreamError::Store`] if the load fails, [`StreamError::Cancelled`]
    /// if the flag is already set or fires during the load.
    pub async fn query<T, F>(&self, project: F) -> Result<T, StreamError>
    where
        F: FnOnce(&S) -> T + Send,
    {
        self.check_cancelled::<Infallible>()?;
        let (state, version) = self.load::<Infallible>().await?;
        tracing::trace!(stream_id = %self.stream_id, %version, "Serving query");
        metrics::counter!(QUERY_TOTAL).increment(1);
        Ok(project(&state))
    }

    #[tracing::instrument(
        skip(self, decide),
        fields(stream_id = %self.stream_id, max_attempts = self.config.max_attempts()),
        name = "stream_transact"
    )]
    async fn run<T, D, F>(&self, mut decide: F) -> Result<T, StreamError<D>>
    where
        T: Send,
        D: std::error::Error + Send + Sync + 'static,
        F: FnMut(&mut Accumulator<'_, E, S>) -> Result<T, D> + Send,
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt: u32 = 1;

        loop {
            self.check_cancelled::<D>()?;
            metrics::counter!(TRANSACT_ATTEMPTS).increment(1);

            let (state, version) = self.load::<D>().await?;
            let Decided { outcome, events } = self.decide_once(state, &mut decide)?;

            if events.is_empty() {
                tracing::trace!(attempt, %version, "Decision proposed no events");
                metrics::counter!(TRANSACT_NOOP).increment(1);
                return Ok(outcome);
            }

            let proposed = events.len();
            match self.store.try_append(&self.stream_id, version, events).await? {
                AppendOutcome::Written(new_version) => {
                    tracing::debug!(attempt, proposed, %new_version, "Committed events");
                    metrics::counter!(TRANSACT_COMMITTED).increment(1);
                    return Ok(outcome);
                }
                AppendOutcome::Conflict { actual } => {
                    metrics::counter!(TRANSACT_CONFLICTS).increment(1);
                    if attempt >= max_attempts {
                        tracing::warn!(
                            attempt,
                            expected = %version,
                            %actual,
                            "Version conflict on final attempt, giving up"
                        );
                        metrics::counter!(TRANSACT_EXHAUSTED).increment(1);
                        return Err(StreamError::AttemptsExhausted {
                            stream_id: self.stream_id.clone(),
                            attempts: attempt,
                        });
                    }
                    tracing::debug!(
                        attempt,
                        expected = %version,
                        %actual,
                        "Version conflict, reloading"
                    );
                    attempt += 1;
                }
            }
        }
    }

    /// One decision pass over a fresh accumulator.
    fn decide_once<T, D, F>(&self, state: S, decide: &mut F) -> Result<Decided<T, E>, StreamError<D>>
    where
        D: std::error::Error + Send + Sync + 'static,
        F: FnMut(&mut Accumulator<'_, E, S>) -> Result<T, D>,
    {
        let mut acc = Accumulator::new(&*self.fold, state);
        let outcome = decide(&mut acc).map_err(StreamError::Domain)?;
        Ok(Decided {
            outcome,
            events: acc.into_accumulated(),
        })
    }

    async fn load<D>(&self) -> Result<(S, Version), StreamError<D>>
    where
        D: std::error::Error + Send + Sync + 'static,
    {
        let Some(cancellation) = &self.cancellation else {
            return Ok(self.store.load(&self.stream_id).await?);
        };

        let mut cancellation = cancellation.clone();
        tokio::select! {
            biased;
            () = cancelled(&mut cancellation) => Err(self.cancelled_error()),
            loaded = self.store.load(&self.stream_id) => loaded.map_err(StreamError::Store),
        }
    }

    fn check_cancelled<D>(&self) -> Result<(), StreamError<D>>
    where
        D: std::error::Error + Send + Sync + 'static,
    {
        match &self.cancellation {
            Some(cancellation) if *cancellation.borrow() => Err(self.cancelled_error()),
            _ => Ok(()),
        }
    }

    fn cancelled_error<D>(&self) -> StreamError<D>
    where
        D: std::error::Error + Send + Sync + 'static,
    {
        tracing::debug!(stream_id = %self.stream_id, "Operation cancelled");
        StreamError::Cancelled {
            stream_id: self.stream_id.clone(),
        }
    }
}

/// Resolves once the flag reads `true`. Pends forever if the sender is gone.
async fn cancelled(cancellation: &mut watch::Receiver<bool>) {
    let sender_gone = cancellation.wait_for(|cancelled| *cancelled).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}
