//! Counter demo binary
//!
//! Runs a counter through plain commands, a lost race that is retried, and a
//! race that is lost on every attempt.
//!
//! `COUNTER_MAX_ATTEMPTS` overrides the attempt limit; `RUST_LOG` the log filter.

use composable_stream_core::event_store::EventStore;
use composable_stream_core::stream::StreamId;
use composable_stream_runtime::{DEFAULT_MAX_ATTEMPTS, StreamConfig};
use composable_stream_testing::{InMemoryEventStore, InterleavingStore};
use counter::{Counter, CounterEvent, counter_store, fold};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn max_attempts_from_env() -> anyhow::Result<u32> {
    match std::env::var("COUNTER_MAX_ATTEMPTS") {
        Ok(raw) => Ok(counter::parse_max_attempts(&raw)?),
        Err(_) => Ok(DEFAULT_MAX_ATTEMPTS),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=debug,composable_stream_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    composable_stream_runtime::metrics::describe_metrics();

    let config = StreamConfig::new(max_attempts_from_env()?);
    tracing::info!(max_attempts = config.max_attempts(), "Counter demo starting");
    let events = InMemoryEventStore::new();

    println!("=== Counter Demo: Transactional Streams ===\n");

    // Plain commands
    let plain =
        counter::in_memory_counter(&events, StreamId::new("counter-plain")).with_config(config);

    counter::increment(&plain, 3).await?;
    println!("After +3: {}", counter::current(&plain).await?);

    let ticket = counter::take_ticket(&plain).await?;
    println!("Ticket taken: {ticket}");

    match counter::decrement(&plain, 10).await {
        Err(error) => println!("Decrement by 10 refused: {error}"),
        Ok(()) => println!("Decrement by 10 accepted"),
    }

    counter::reset(&plain).await?;
    counter::reset(&plain).await?;
    println!(
        "After two resets: {} ({} events stored)",
        counter::current(&plain).await?,
        events.event_count(plain.stream_id())
    );

    // A rival writer lands between our load and our append
    tracing::info!("Staging a rival write");
    println!("\n>>> Rival adds 5 while we add 1");
    let shared: Arc<dyn EventStore> = Arc::new(events.clone());
    let contended_id = StreamId::new("counter-contended");
    let contended = Arc::new(InterleavingStore::new(counter_store(Arc::clone(&shared))));
    contended.interleave(vec![CounterEvent::Incremented { by: 5 }]);

    let racer = Counter::new(Arc::clone(&contended) as _, contended_id, fold()).with_config(config);
    counter::increment(&racer, 1).await?;
    let (loads, appends) = (contended.loads(), contended.append_attempts());
    println!(
        "Final count: {} after {loads} loads and {appends} appends",
        counter::current(&racer).await?
    );

    // Every attempt loses
    tracing::info!(rivals = config.max_attempts(), "Staging a rival for every attempt");
    println!("\n>>> A rival wins every one of {} attempts", config.max_attempts());
    for _ in 0..config.max_attempts() {
        contended.interleave(vec![CounterEvent::Incremented { by: 5 }]);
    }
    match counter::increment(&racer, 1).await {
        Err(error) if error.is_attempts_exhausted() => println!("Gave up: {error}"),
        Err(error) => return Err(error.into()),
        Ok(()) => println!("Unexpectedly committed"),
    }
    println!("Count is now {}", counter::current(&racer).await?);

    println!("\n=== Demo Complete ===");
    Ok(())
}
