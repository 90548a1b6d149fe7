//! Shutdown Integration Tests
//!
//! Tests focused on close: buffered items survive it, consumers finish
//! after it, and misuse is reported.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mainbus::{BusError, Item, ResourceBus};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};

const DEADLINE: Duration = Duration::from_secs(5);

fn counting_consumers(
    bus: &Arc<ResourceBus<u64>>,
    counter: &Arc<AtomicUsize>,
) -> JoinSet<Result<usize, BusError>> {
    let mut consumers = JoinSet::new();
    bus.spawn_consumers(&mut consumers, |_| {
        let counter = Arc::clone(counter);
        move |_: &str, _: usize, _: Item<u64>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    consumers
}

#[tokio::test]
async fn test_items_buffered_before_close_are_all_delivered() {
    let bus = Arc::new(ResourceBus::new("iron", 4, 20));

    // No consumers yet: everything sits in the lanes across the close.
    for id in 0..40 {
        bus.produce(Item::new(id, "iron", id)).await;
    }
    bus.close();

    let counter = Arc::new(AtomicUsize::new(0));
    let mut consumers = counting_consumers(&bus, &counter);

    let mut reported = 0;
    while let Some(done) = timeout(DEADLINE, consumers.join_next())
        .await
        .expect("consumers did not drain")
    {
        reported += done.unwrap().unwrap();
    }

    assert_eq!(reported, 40);
    assert_eq!(counter.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn test_consumers_wait_until_close() {
    let bus = Arc::new(ResourceBus::new("iron", 2, 4));
    let counter = Arc::new(AtomicUsize::new(0));
    let mut consumers = counting_consumers(&bus, &counter);

    bus.produce(Item::new(0, "iron", 0)).await;
    sleep(Duration::from_millis(100)).await;

    // Empty lanes are not a reason to stop.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(consumers.len(), 2);
    assert!(consumers.try_join_next().is_none());

    bus.close();
    let mut finished = 0;
    while let Some(done) = timeout(DEADLINE, consumers.join_next())
        .await
        .expect("consumer ignored close")
    {
        done.unwrap().unwrap();
        finished += 1;
    }
    assert_eq!(finished, 2);
}

#[tokio::test]
async fn test_try_produce_after_close_reports_the_bus() {
    let bus: ResourceBus<u64> = ResourceBus::new("copper", 2, 4);
    bus.close();

    match bus.try_produce(Item::new(1, "copper", 1)).await {
        Err(BusError::ProduceAfterClose { resource, lane }) => {
            assert_eq!(resource, "copper");
            assert!(lane < 2);
        }
        other => panic!("expected ProduceAfterClose, got {other:?}"),
    }
}

#[tokio::test]
#[should_panic(expected = "produce on closed bus 'copper'")]
async fn test_produce_after_close_is_fatal() {
    let bus: ResourceBus<u64> = ResourceBus::new("copper", 2, 4);
    bus.close();

    bus.produce(Item::new(1, "copper", 1)).await;
}

#[test]
#[should_panic(expected = "close of closed bus 'copper'")]
fn test_second_close_is_fatal() {
    let bus: ResourceBus<u64> = ResourceBus::new("copper", 2, 4);

    bus.close();
    bus.close();
}

#[test]
fn test_closing_a_zero_lane_bus_is_tracked() {
    let bus: ResourceBus<u64> = ResourceBus::new("void", 0, 4);

    assert_eq!(bus.try_close(), Ok(()));
    assert!(bus.is_closed());
    assert!(matches!(bus.try_close(), Err(BusError::AlreadyClosed { .. })));
}

#[tokio::test]
async fn test_close_fails_a_producer_parked_on_a_full_lane() {
    // Two lanes of one slot: the third item has nowhere to go.
    let bus = Arc::new(ResourceBus::with_rng(
        "iron",
        2,
        1,
        StdRng::seed_from_u64(3),
    ));

    let producer = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            for id in 0..3 {
                bus.produce(Item::new(id, "iron", id)).await;
            }
        })
    };
    sleep(Duration::from_millis(100)).await;
    assert!(!producer.is_finished());

    bus.close();

    let err = timeout(DEADLINE, producer)
        .await
        .expect("parked producer ignored close")
        .unwrap_err();
    assert!(err.is_panic());
    let message = err
        .into_panic()
        .downcast::<String>()
        .map(|message| *message)
        .unwrap_or_default();
    assert!(
        message.starts_with("produce on closed bus 'iron'"),
        "unexpected panic: {message}"
    );

    let counter = Arc::new(AtomicUsize::new(0));
    let mut consumers = counting_consumers(&bus, &counter);
    while let Some(done) = consumers.join_next().await {
        done.unwrap().unwrap();
    }
    assert!(counter.load(Ordering::SeqCst) < 3);
}

#[tokio::test]
async fn test_try_produce_reports_close_while_parked() {
    let bus = Arc::new(ResourceBus::with_rng(
        "iron",
        2,
        1,
        StdRng::seed_from_u64(3),
    ));

    let producer = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            let mut accepted = 0;
            for id in 0..3 {
                if let Err(err) = bus.try_produce(Item::new(id, "iron", id)).await {
                    return (accepted, Some(err));
                }
                accepted += 1;
            }
            (accepted, None)
        })
    };
    sleep(Duration::from_millis(100)).await;
    bus.close();

    let (accepted, err) = timeout(DEADLINE, producer)
        .await
        .expect("parked producer ignored close")
        .unwrap();
    assert!(matches!(
        err,
        Some(BusError::ProduceAfterClose { ref resource, .. }) if resource == "iron"
    ));

    let counter = Arc::new(AtomicUsize::new(0));
    let mut consumers = counting_consumers(&bus, &counter);
    while let Some(done) = consumers.join_next().await {
        done.unwrap().unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), accepted);
}
