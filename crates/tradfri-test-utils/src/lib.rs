//! Common test helpers for tradfri-sync tests
//!
//! - Condition-based waiting (no hardcoded sleeps)
//! - Device and group fixtures
//! - A store with injectable failures
//! - An aggregator wired to an event source, cleaned up on drop

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tradfri_core::Value;
use tradfri_devices::device::DeviceHeader;
use tradfri_devices::{Accessory, AccessoryType, DeviceInfo, Group, Light};
use tradfri_groups::{
    GroupAggregator, GroupSyncConfig, MemoryStore, ObjectPatch, StateChange, StateStore,
    StoreError, StoreResult, StoredObject,
};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

pub const WHITE_SPECTRUM_MODEL: &str = "TRADFRI bulb E27 WS opal 980lm";
pub const RGB_MODEL: &str = "TRADFRI bulb E27 C/WS opal 600";
pub const PLAIN_MODEL: &str = "TRADFRI bulb E27 W opal 1000lm";

/// Log to the test output; `RUST_LOG` picks the level. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout. Uses tokio's clock, so it also works
/// with paused time.
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait until a state in the store holds `expected` (`None`: is absent)
pub async fn wait_for_state(
    store: &MemoryStore,
    id: &str,
    expected: Option<Value>,
    max_wait: Duration,
) -> bool {
    wait_for(
        || {
            let matches = store.state(id) == expected;
            async move { matches }
        },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

// ============================================================================
// Fixtures
// ============================================================================

/// A single-light bulb as the gateway reports it
pub fn lightbulb(instance_id: i64, model: &str, on_off: bool, dimmer: i64) -> Accessory {
    let mut light = Light::with_model(model);
    light.on_off = on_off;
    light.dimmer = dimmer;

    Accessory {
        header: DeviceHeader::new(instance_id, format!("Bulb {}", instance_id)),
        accessory_type: AccessoryType::Lightbulb,
        device_info: Some(DeviceInfo {
            manufacturer: "IKEA of Sweden".to_string(),
            model_number: model.to_string(),
            ..Default::default()
        }),
        alive: true,
        light_list: Some(vec![light]),
        ..Default::default()
    }
}

/// White spectrum bulb at a color temperature in percent
pub fn white_bulb(instance_id: i64, on_off: bool, dimmer: i64, temperature: f64) -> Accessory {
    let mut bulb = lightbulb(instance_id, WHITE_SPECTRUM_MODEL, on_off, dimmer);
    if let Some(light) = bulb.light_list.as_mut().and_then(|l| l.first_mut()) {
        let mut spectrum = tradfri_devices::SpectrumLight::new(std::mem::take(light));
        spectrum.set_color_temperature(temperature);
        *light = spectrum.into_inner();
    }
    bulb
}

/// Color bulb showing a hex color
pub fn rgb_bulb(instance_id: i64, on_off: bool, dimmer: i64, color: &str) -> Accessory {
    let mut bulb = lightbulb(instance_id, RGB_MODEL, on_off, dimmer);
    if let Some(light) = bulb.light_list.as_mut().and_then(|l| l.first_mut()) {
        let mut spectrum = tradfri_devices::SpectrumLight::new(std::mem::take(light));
        let _ = spectrum.set_color(color);
        *light = spectrum.into_inner();
    }
    bulb
}

pub fn remote(instance_id: i64) -> Accessory {
    Accessory {
        header: DeviceHeader::new(instance_id, "Remote"),
        accessory_type: AccessoryType::Remote,
        device_info: Some(DeviceInfo {
            model_number: "TRADFRI remote control".to_string(),
            battery: 87,
            ..Default::default()
        }),
        alive: true,
        ..Default::default()
    }
}

pub fn group(instance_id: i64, name: &str, device_ids: &[i64]) -> Group {
    Group::new(instance_id, name).with_device_ids(device_ids.to_vec())
}

// ============================================================================
// Flaky Store
// ============================================================================

/// A [`MemoryStore`] whose state operations fail for selected ids and
/// whose reads can be slowed down
pub struct FlakyStore {
    inner: MemoryStore,
    failing: RwLock<HashSet<String>>,
    failures: AtomicU32,
    slow_reads: Mutex<HashMap<String, Duration>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing: RwLock::new(HashSet::new()),
            failures: AtomicU32::new(0),
            slow_reads: Mutex::new(HashMap::new()),
        }
    }

    /// Make the next read of `id` take `delay` before answering
    pub fn delay_next_read(&self, id: &str, delay: Duration) {
        self.slow_reads.lock().insert(id.to_string(), delay);
    }

    /// Make state operations on `id` fail from now on
    pub fn fail(&self, id: &str) {
        self.failing.write().insert(id.to_string());
    }

    pub fn recover(&self, id: &str) {
        self.failing.write().remove(id);
    }

    /// Number of operations rejected so far
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self, id: &str) -> StoreResult<()> {
        if self.failing.read().contains(id) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get_state(&self, id: &str) -> StoreResult<Option<Value>> {
        self.check(id)?;
        let delay = self.slow_reads.lock().remove(id);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get_state(id).await
    }

    async fn set_state(&self, id: &str, value: Value, ack: bool) -> StoreResult<()> {
        self.check(id)?;
        self.inner.set_state(id, value, ack).await
    }

    async fn delete_state(&self, id: &str) -> StoreResult<()> {
        self.check(id)?;
        self.inner.delete_state(id).await
    }

    async fn create_if_absent(
        &self,
        object: StoredObject,
        initial: Option<Value>,
    ) -> StoreResult<bool> {
        self.inner.create_if_absent(object, initial).await
    }

    async fn extend_object(&self, id: &str, patch: ObjectPatch) -> StoreResult<()> {
        self.inner.extend_object(id, patch).await
    }

    async fn get_object(&self, id: &str) -> StoreResult<Option<StoredObject>> {
        self.inner.get_object(id).await
    }

    async fn list_objects(
        &self,
        predicate: &(dyn for<'o> Fn(&'o StoredObject) -> bool + Send + Sync),
    ) -> StoreResult<Vec<StoredObject>> {
        self.inner.list_objects(predicate).await
    }
}

// ============================================================================
// Test Aggregator - RAII wrapper with proper cleanup
// ============================================================================

/// An aggregator consuming the events of its own [`MemoryStore`].
/// The event loop is aborted on drop.
pub struct TestAggregator {
    pub store: Arc<MemoryStore>,
    pub aggregator: GroupAggregator,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestAggregator {
    /// Must be called from within a tokio runtime
    pub fn start(config: GroupSyncConfig) -> Self {
        let (store, events) = MemoryStore::with_events();
        let store = Arc::new(store);
        let aggregator = GroupAggregator::new(store.clone(), config);

        let runner = aggregator.clone();
        let handle = tokio::spawn(async move { runner.run(events).await });

        Self {
            store,
            aggregator,
            handle: Some(handle),
        }
    }

    /// Report a device state the way the device adapter would
    pub async fn report(&self, id: &str, value: impl Into<Value>) {
        // MemoryStore never fails
        let _ = self.store.set_state(id, value.into(), true).await;
    }

    /// Write a command that has not reached the device yet
    pub async fn command(&self, id: &str, value: impl Into<Value>) {
        let _ = self.store.set_state(id, value.into(), false).await;
    }

    pub fn stop(&mut self) {
        self.aggregator.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TestAggregator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shorthand for an acknowledged device state change
pub fn reported(id: &str, value: impl Into<Value>) -> StateChange {
    StateChange::ack(id, value)
}
