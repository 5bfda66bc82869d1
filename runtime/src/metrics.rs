//! Metric names emitted by the transaction loop.
//!
//! The library only records through the `metrics` facade. Installing a
//! recorder or exporter is up to the application; until one is installed the
//! calls are no-ops.
//!
//! # Example
//!
//! ```rust,no_run
//! use composable_stream_runtime::metrics::{describe_metrics, TRANSACT_CONFLICTS};
//!
//! // After installing a recorder of your choice:
//! describe_metrics();
//! println!("watch {TRANSACT_CONFLICTS} for write contention");
//! ```

use metrics::{Unit, describe_counter};

/// Load-decide-append cycles started.
pub const TRANSACT_ATTEMPTS: &str = "stream.transact.attempts";
/// Appends rejected because another writer got there first.
pub const TRANSACT_CONFLICTS: &str = "stream.transact.conflicts";
/// Operations that wrote their events.
pub const TRANSACT_COMMITTED: &str = "stream.transact.committed";
/// Operations whose decision proposed nothing, so nothing was written.
pub const TRANSACT_NOOP: &str = "stream.transact.noop";
/// Operations that ran out of attempts.
pub const TRANSACT_EXHAUSTED: &str = "stream.transact.exhausted";
/// Read-only projections served.
pub const QUERY_TOTAL: &str = "stream.query.total";

/// Register descriptions for every metric above with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        TRANSACT_ATTEMPTS,
        Unit::Count,
        "Load-decide-append cycles started"
    );
    describe_counter!(
        TRANSACT_CONFLICTS,
        Unit::Count,
        "Appends rejected by optimistic concurrency"
    );
    describe_counter!(
        TRANSACT_COMMITTED,
        Unit::Count,
        "Transactions that appended events"
    );
    describe_counter!(
        TRANSACT_NOOP,
        Unit::Count,
        "Transactions that proposed no events"
    );
    describe_counter!(
        TRANSACT_EXHAUSTED,
        Unit::Count,
        "Transactions that exhausted their attempts"
    );
    describe_counter!(QUERY_TOTAL, Unit::Count, "Read-only queries served");
}
