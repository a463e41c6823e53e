//! Group state aggregation tests
//!
//! Run with paused time: the debounce window elapses as soon as the test
//! sleeps, and every flush completes before the clock moves on.

use std::sync::Arc;
use std::time::Duration;
use tradfri_core::Value;
use tradfri_groups::{
    Consensus, GroupAggregator, GroupAttribute, GroupKey, GroupSyncConfig, MemoryStore,
    StoreWrite,
};
use tradfri_test_utils::{
    group, init_tracing, lightbulb, remote, reported, rgb_bulb, wait_for_state, white_bulb,
    FlakyStore, TestAggregator, DEFAULT_TIMEOUT, PLAIN_MODEL,
};

/// Longer than the default debounce window
async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

async fn living_room(store: Arc<MemoryStore>) -> GroupAggregator {
    init_tracing();
    let aggregator = GroupAggregator::new(store, GroupSyncConfig::default());
    aggregator
        .extend_group(group(1, "Living room", &[10, 11, 12]))
        .await
        .unwrap();
    aggregator
}

#[tokio::test(start_paused = true)]
async fn test_agreed_values_are_written() {
    let store = Arc::new(MemoryStore::new());
    let aggregator = living_room(store.clone()).await;

    for id in [10, 11, 12] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 100));
    }
    settle().await;

    assert_eq!(store.state("G-1.brightness"), Some(Value::Int(100)));
    assert_eq!(store.state("G-1.state"), Some(Value::Bool(true)));
    assert_eq!(store.is_acknowledged("G-1.brightness"), Some(true));

    // plain bulbs have no color
    assert_eq!(store.state("G-1.colorTemperature"), None);
    assert_eq!(store.state("G-1.color"), None);

    let group = aggregator.group(1).unwrap();
    assert_eq!(group.on_off, Some(true));
    assert_eq!(group.dimmer, Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_disagreement_deletes_persisted_value() {
    let store = Arc::new(MemoryStore::new());
    let aggregator = living_room(store.clone()).await;

    for id in [10, 11, 12] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 100));
    }
    settle().await;
    assert_eq!(store.state("G-1.brightness"), Some(Value::Int(100)));

    aggregator.observe_device(lightbulb(12, PLAIN_MODEL, true, 80));
    assert_eq!(
        aggregator.consensus(GroupKey::Gateway(1), GroupAttribute::Brightness),
        Consensus::Disagreement
    );
    settle().await;

    assert_eq!(store.state("G-1.brightness"), None);
    assert_eq!(
        store.writes_for("G-1.brightness").last(),
        Some(&StoreWrite::Delete {
            id: "G-1.brightness".to_string()
        })
    );
    assert_eq!(aggregator.group(1).unwrap().dimmer, None);

    // the members still agree on being on
    assert_eq!(store.state("G-1.state"), Some(Value::Bool(true)));
}

#[tokio::test(start_paused = true)]
async fn test_burst_is_written_once() {
    let store = Arc::new(MemoryStore::new());
    let aggregator = living_room(store.clone()).await;

    for id in [10, 11, 12] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 100));
    }
    settle().await;
    store.clear_writes();

    // a scene change reaching the members one by one
    for id in [10, 11, 12] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 50));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(aggregator.pending_writes(), 1);
    settle().await;

    assert_eq!(
        store.writes_for("G-1.brightness"),
        vec![StoreWrite::Set {
            id: "G-1.brightness".to_string(),
            value: Value::Int(50),
            ack: true,
        }]
    );
    assert_eq!(aggregator.pending_writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_consensus_is_not_rewritten() {
    let store = Arc::new(MemoryStore::new());
    let aggregator = living_room(store.clone()).await;

    for id in [10, 11, 12] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, false, 30));
    }
    settle().await;
    store.clear_writes();

    for id in [10, 11, 12] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, false, 30));
    }
    assert_eq!(aggregator.pending_writes(), 0);
    settle().await;
    assert!(store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_is_isolated() {
    init_tracing();
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let aggregator = GroupAggregator::new(store.clone(), GroupSyncConfig::default());
    aggregator
        .extend_group(group(1, "Hall", &[10, 11]))
        .await
        .unwrap();

    store.fail("G-1.brightness");
    for id in [10, 11] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 120));
    }
    settle().await;

    assert!(store.failures() >= 1);
    assert_eq!(store.inner().state("G-1.state"), Some(Value::Bool(true)));
    // still the value copied from the group definition
    assert_eq!(store.inner().state("G-1.brightness"), Some(Value::Int(0)));

    // the failed write is retried on the next trigger
    store.recover("G-1.brightness");
    aggregator.update_all();
    settle().await;
    assert_eq!(store.inner().state("G-1.brightness"), Some(Value::Int(120)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_flush_does_not_write_outdated_consensus() {
    init_tracing();
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let aggregator = GroupAggregator::new(store.clone(), GroupSyncConfig::default());
    aggregator
        .extend_group(group(1, "Hall", &[10, 11]))
        .await
        .unwrap();

    // the first flush stalls on its read while the members change again
    store.delay_next_read("G-1.brightness", Duration::from_secs(1));
    for id in [10, 11] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 100));
    }
    settle().await;
    for id in [10, 11] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 50));
    }

    aggregator.flushed().await;
    assert_eq!(aggregator.pending_writes(), 0);
    assert_eq!(store.inner().state("G-1.brightness"), Some(Value::Int(50)));
    assert!(!store.inner().writes_for("G-1.brightness").iter().any(|write| matches!(
        write,
        StoreWrite::Set { value: Value::Int(100), .. }
    )));
    assert_eq!(aggregator.group(1).unwrap().dimmer, Some(50));

    // the written value is known, so reporting it again schedules nothing
    for id in [10, 11] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 50));
    }
    assert_eq!(aggregator.pending_writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_flushed_waits_for_running_writes() {
    init_tracing();
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let aggregator = GroupAggregator::new(store.clone(), GroupSyncConfig::default());
    aggregator
        .extend_group(group(1, "Hall", &[10, 11]))
        .await
        .unwrap();

    store.delay_next_read("G-1.brightness", Duration::from_secs(5));
    for id in [10, 11] {
        aggregator.observe_device(lightbulb(id, PLAIN_MODEL, true, 80));
    }
    settle().await;
    // past the debounce window but the write hasn't landed yet
    assert_eq!(aggregator.pending_writes(), 0);
    assert_eq!(store.inner().state("G-1.brightness"), Some(Value::Int(0)));

    aggregator.flushed().await;
    assert_eq!(store.inner().state("G-1.brightness"), Some(Value::Int(80)));
}

#[tokio::test(start_paused = true)]
async fn test_color_attributes_use_capable_members() {
    let store = Arc::new(MemoryStore::new());
    init_tracing();
    let aggregator = GroupAggregator::new(store.clone(), GroupSyncConfig::default());
    aggregator
        .extend_group(group(1, "Office", &[10, 11, 12, 13]))
        .await
        .unwrap();

    aggregator.observe_device(white_bulb(10, true, 200, 40.0));
    aggregator.observe_device(white_bulb(11, true, 200, 40.0));
    aggregator.observe_device(rgb_bulb(12, true, 200, "dc4b31"));
    aggregator.observe_device(lightbulb(13, PLAIN_MODEL, true, 200));
    settle().await;

    let temperature = store
        .state("G-1.colorTemperature")
        .and_then(|v| v.as_f64())
        .unwrap();
    assert!((temperature - 40.0).abs() < 0.01);
    assert_eq!(store.state("G-1.color"), Some(Value::from("dc4b31")));
    assert_eq!(store.state("G-1.brightness"), Some(Value::Int(200)));

    // a second color bulb showing something else
    aggregator
        .extend_group(group(1, "Office", &[10, 11, 12, 13, 14]))
        .await
        .unwrap();
    aggregator.observe_device(rgb_bulb(14, true, 200, "4a418a"));
    settle().await;
    assert_eq!(store.state("G-1.color"), None);
    assert!(store.state("G-1.colorTemperature").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_groups_without_lightbulbs_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    let aggregator = GroupAggregator::new(store.clone(), GroupSyncConfig::default());
    aggregator
        .extend_group(group(2, "Remotes", &[20]))
        .await
        .unwrap();
    store.clear_writes();

    aggregator.observe_device(remote(20));
    settle().await;

    assert!(store.writes().is_empty());
    assert_eq!(
        aggregator.consensus(GroupKey::Gateway(2), GroupAttribute::State),
        Consensus::NoContributors
    );
}

#[tokio::test(start_paused = true)]
async fn test_removed_device_stops_contributing() {
    let store = Arc::new(MemoryStore::new());
    let aggregator = living_room(store.clone()).await;

    aggregator.observe_device(lightbulb(10, PLAIN_MODEL, true, 100));
    aggregator.observe_device(lightbulb(11, PLAIN_MODEL, true, 80));
    settle().await;
    assert_eq!(store.state("G-1.brightness"), None);

    assert!(aggregator.remove_device(11).is_some());
    assert!(aggregator.remove_device(11).is_none());
    settle().await;
    assert_eq!(store.state("G-1.brightness"), Some(Value::Int(100)));
}

#[tokio::test(start_paused = true)]
async fn test_device_state_changes_update_groups() {
    let store = Arc::new(MemoryStore::new());
    let aggregator = living_room(store.clone()).await;

    aggregator.observe_device(rgb_bulb(10, true, 100, "f1e0b5"));
    aggregator.observe_device(rgb_bulb(11, true, 100, "f1e0b5"));
    settle().await;
    assert_eq!(store.state("G-1.color"), Some(Value::from("f1e0b5")));

    for id in [10, 11] {
        aggregator.on_state_change(&reported(&format!("L-{}.lightbulb.color", id), "8f2686"));
    }
    settle().await;
    assert_eq!(store.state("G-1.color"), Some(Value::from("8f2686")));

    let light = aggregator.device(10).unwrap().first_light().cloned().unwrap();
    assert_eq!((light.color_x, light.color_y), (20316, 8520));
}

#[tokio::test(start_paused = true)]
async fn test_own_writes_do_not_trigger_recomputation() {
    init_tracing();
    let harness = TestAggregator::start(GroupSyncConfig::default());
    harness
        .aggregator
        .extend_group(group(1, "Bedroom", &[10, 11]))
        .await
        .unwrap();
    for id in [10, 11] {
        harness
            .aggregator
            .observe_device(lightbulb(id, PLAIN_MODEL, true, 150));
    }
    settle().await;
    assert_eq!(harness.store.state("G-1.brightness"), Some(Value::Int(150)));

    // the group writes above came back as events and were ignored
    assert_eq!(harness.aggregator.pending_writes(), 0);
    let writes = harness.store.writes().len();
    settle().await;
    assert_eq!(harness.store.writes().len(), writes);

    // a confirmed device change goes through
    harness.report("L-10.lightbulb.brightness", 90i64).await;
    assert!(wait_for_state(&harness.store, "G-1.brightness", None, DEFAULT_TIMEOUT).await);

    // a command that hasn't reached the device does not
    harness.command("L-11.lightbulb.brightness", 90i64).await;
    settle().await;
    assert_eq!(harness.store.state("G-1.brightness"), None);
    let light = harness.aggregator.device(11).unwrap().first_light().cloned().unwrap();
    assert_eq!(light.dimmer, 150);
}
