//! Running state for a single decision pass.
//!
//! An [`Accumulator`] starts from the state loaded for one transaction attempt
//! and collects the events the decision proposes. Every read of
//! [`Accumulator::state`] folds the base state with everything proposed so far,
//! so a decision can emit an event, look at the result, and emit the next one
//! without committing anything in between.
//!
//! One accumulator lives for exactly one attempt. The runtime builds a new one
//! from freshly loaded state on every retry and drops the old one unread.

use std::fmt;
use std::sync::Arc;

/// Batch fold: `(state, events) -> state`.
///
/// Must be pure and deterministic, and folding two batches in turn must equal
/// folding their concatenation.
pub type FoldFn<S, E> = Arc<dyn Fn(S, &[E]) -> S + Send + Sync>;

/// Wrap a batch fold closure as a [`FoldFn`].
///
/// ```
/// use composable_stream_core::accumulator::fold_fn;
///
/// let fold = fold_fn(|total: i64, deltas: &[i64]| total + deltas.iter().sum::<i64>());
/// assert_eq!(fold(10, &[1, 2]), 13);
/// ```
pub fn fold_fn<S, E, F>(fold: F) -> FoldFn<S, E>
where
    F: Fn(S, &[E]) -> S + Send + Sync + 'static,
{
    Arc::new(fold)
}

/// Lift a per-event `apply` into a batch [`FoldFn`].
///
/// ```
/// use composable_stream_core::accumulator::evolve;
///
/// let fold = evolve(|mut names: Vec<String>, added: &String| {
///     names.push(added.clone());
///     names
/// });
/// assert_eq!(fold(vec![], &["a".to_string(), "b".to_string()]), vec!["a", "b"]);
/// ```
pub fn evolve<S, E, F>(apply: F) -> FoldFn<S, E>
where
    F: Fn(S, &E) -> S + Send + Sync + 'static,
{
    Arc::new(move |state: S, events: &[E]| events.iter().fold(state, |acc, event| apply(acc, event)))
}

/// Base state plus the events proposed so far in one attempt.
///
/// Decision code receives `&mut Accumulator` and can only read the current
/// state and propose more events. The base state and the pending list are
/// private; the runtime takes the list with [`Accumulator::into_accumulated`]
/// once the decision returns.
///
/// # Examples
///
/// ```
/// use composable_stream_core::accumulator::{Accumulator, fold_fn};
///
/// let fold = fold_fn(|total: i64, deltas: &[i64]| total + deltas.iter().sum::<i64>());
/// let mut acc = Accumulator::new(&*fold, 5);
///
/// acc.execute(|_| [1]);
/// // The second step sees the first step's event.
/// acc.execute(|total| if *total == 6 { vec![10] } else { vec![] });
///
/// assert_eq!(acc.state(), 16);
/// assert_eq!(acc.into_accumulated(), vec![1, 10]);
/// ```
pub struct Accumulator<'a, E, S> {
    fold: &'a (dyn Fn(S, &[E]) -> S + Send + Sync),
    base: S,
    accumulated: Vec<E>,
}

impl<'a, E, S: Clone> Accumulator<'a, E, S> {
    /// Start a pass from `base`, the state loaded for this attempt.
    #[must_use]
    pub fn new(fold: &'a (dyn Fn(S, &[E]) -> S + Send + Sync), base: S) -> Self {
        Self {
            fold,
            base,
            accumulated: Vec::new(),
        }
    }

    /// The base state folded with every event proposed so far.
    ///
    /// Recomputed on each call.
    #[must_use]
    pub fn state(&self) -> S {
        (self.fold)(self.base.clone(), &self.accumulated)
    }

    /// Run one decision step against the current state and keep its events.
    ///
    /// An empty result is a valid no-op step.
    pub fn execute<I, F>(&mut self, decide: F)
    where
        I: IntoIterator<Item = E>,
        F: FnOnce(&S) -> I,
    {
        let events = decide(&self.state());
        self.accumulated.extend(events);
    }

    /// Run a fallible decision step.
    ///
    /// On `Ok` the events are kept as with [`execute`](Self::execute). On
    /// `Err` nothing is kept and the error is handed back untouched.
    ///
    /// # Errors
    ///
    /// Whatever `decide` returns.
    pub fn try_execute<I, D, F>(&mut self, decide: F) -> Result<(), D>
    where
        I: IntoIterator<Item = E>,
        F: FnOnce(&S) -> Result<I, D>,
    {
        let events = decide(&self.state())?;
        self.accumulated.extend(events);
        Ok(())
    }
}

impl<E, S> Accumulator<'_, E, S> {
    /// Events proposed so far, in proposal order.
    #[must_use]
    pub fn accumulated(&self) -> &[E] {
        &self.accumulated
    }

    /// `true` if nothing has been proposed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    /// Consume the pass and return the proposed events.
    #[must_use]
    pub fn into_accumulated(self) -> Vec<E> {
        self.accumulated
    }
}

impl<E, S: fmt::Debug> fmt::Debug for Accumulator<'_, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("base", &self.base)
            .field("accumulated", &self.accumulated.len())
            .finish_non_exhaustive()
    }
}
