//! Group state aggregation
//!
//! The gateway doesn't report group states, so they are derived from the
//! member lights: whenever a member changes, each affected group attribute
//! is recomputed as the consensus over the members able to report it.
//! Changed results are written to the store after a debounce window, so a
//! scene change touching every member ends up as a single write per
//! attribute instead of a flurry of intermediate values.
//!
//! Writes carry `ack = true` and group state ids are never treated as
//! triggers, so the aggregator's own writes coming back through the event
//! source don't start another round.

use crate::config::GroupSyncConfig;
use crate::consensus::Consensus;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::event::StateChange;
use crate::objects::{
    self, dig_group, group_channel, group_common, group_native, round_to, GroupAttribute,
    GroupKey, GroupState, VirtualGroup,
};
use crate::store::{ObjectPatch, StateStore, StoredObject};
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, trace, warn};
use tradfri_core::Value;
use tradfri_devices::{Accessory, Group, Spectrum, SpectrumLight};

/// Devices and group definitions currently known
#[derive(Debug, Default)]
struct Session {
    devices: HashMap<i64, Accessory>,
    groups: HashMap<i64, Group>,
    virtual_groups: HashMap<i64, VirtualGroup>,
}

impl Session {
    fn member_ids(&self, key: GroupKey) -> &[i64] {
        match key {
            GroupKey::Gateway(id) => self.groups.get(&id).map(Group::device_ids),
            GroupKey::Virtual(id) => self.virtual_groups.get(&id).map(|g| g.device_ids.as_slice()),
        }
        .unwrap_or(&[])
    }

    fn all_groups(&self) -> Vec<GroupKey> {
        self.groups
            .keys()
            .map(|&id| GroupKey::Gateway(id))
            .chain(self.virtual_groups.keys().map(|&id| GroupKey::Virtual(id)))
            .collect()
    }

    fn groups_containing(&self, device: i64) -> Vec<GroupKey> {
        self.all_groups()
            .into_iter()
            .filter(|&key| self.member_ids(key).contains(&device))
            .collect()
    }

    /// The light of every lightbulb in the group
    fn member_lights(&self, key: GroupKey) -> Vec<SpectrumLight> {
        self.member_ids(key)
            .iter()
            .filter_map(|id| self.devices.get(id))
            .filter(|accessory| accessory.is_lightbulb())
            .filter_map(Accessory::first_light)
            .map(|light| SpectrumLight::new(light.clone()))
            .collect()
    }
}

fn with_spectrum(
    lights: &[SpectrumLight],
    spectrum: Spectrum,
) -> impl Iterator<Item = &SpectrumLight> + '_ {
    lights.iter().filter(move |light| light.spectrum() == spectrum)
}

/// Consensus of one attribute over the lights able to report it
fn consensus_of(lights: &[SpectrumLight], attribute: GroupAttribute) -> Consensus<Value> {
    match attribute {
        GroupAttribute::State => Consensus::of(lights.iter().map(|l| Value::Bool(l.inner().on_off))),
        GroupAttribute::Brightness => Consensus::of(lights.iter().map(|l| Value::Int(l.inner().dimmer))),
        GroupAttribute::ColorTemperature => Consensus::of(
            with_spectrum(lights, Spectrum::White).map(|l| Value::Float(l.color_temperature())),
        ),
        GroupAttribute::Color => {
            Consensus::of(with_spectrum(lights, Spectrum::Rgb).map(|l| Value::String(l.color())))
        }
        GroupAttribute::Hue => {
            Consensus::of(with_spectrum(lights, Spectrum::Rgb).map(|l| Value::Float(l.inner().hue)))
        }
        GroupAttribute::Saturation => Consensus::of(
            with_spectrum(lights, Spectrum::Rgb).map(|l| Value::Float(l.inner().saturation)),
        ),
    }
}

/// Apply a reported device state to the cached model of that device
fn apply_device_state(accessory: &mut Accessory, attribute: GroupAttribute, value: &Value) {
    let Some(slot) = accessory.light_list.as_mut().and_then(|lights| lights.first_mut()) else {
        return;
    };
    let mut light = SpectrumLight::new(std::mem::take(slot));

    let applied = match attribute {
        GroupAttribute::State => value.as_bool().map(|v| light.inner_mut().on_off = v).is_some(),
        GroupAttribute::Brightness => value
            .as_f64()
            .map(|v| light.inner_mut().dimmer = v.round() as i64)
            .is_some(),
        GroupAttribute::ColorTemperature => value.as_f64().map(|v| light.set_color_temperature(v)).is_some(),
        GroupAttribute::Color => match value.as_str() {
            Some(hex) => light.set_color(hex).is_ok(),
            None => false,
        },
        GroupAttribute::Hue => value.as_f64().map(|v| light.inner_mut().hue = v).is_some(),
        GroupAttribute::Saturation => value.as_f64().map(|v| light.inner_mut().saturation = v).is_some(),
    };
    if !applied {
        debug!("ignoring {} value {:?}", attribute.state_name(), value);
    }

    *slot = light.into_inner();
}

struct Inner {
    config: GroupSyncConfig,
    store: Arc<dyn StateStore>,
    session: RwLock<Session>,
    /// Last value known to be in the store per state id; `None` means absent.
    /// Ids without an entry are unknown.
    persisted: DashMap<String, Option<Value>>,
    /// Held for the whole of a flush, one per state id
    flush_locks: DashMap<String, Arc<Mutex<()>>>,
    debouncer: Debouncer<String>,
}

impl Inner {
    fn is_persisted(&self, state_id: &str, consensus: &Consensus<Value>) -> bool {
        self.persisted
            .get(state_id)
            .map(|known| known.as_ref() == consensus.as_agreed())
            .unwrap_or(false)
    }

    /// Gateway and virtual group definitions follow the on/off and brightness consensus
    fn mirror(&self, key: GroupKey, attribute: GroupAttribute, consensus: &Consensus<Value>) {
        let agreed = consensus.as_agreed();
        let mut session = self.session.write();
        match (key, attribute) {
            (GroupKey::Gateway(id), GroupAttribute::State) => {
                if let Some(group) = session.groups.get_mut(&id) {
                    group.on_off = agreed.and_then(Value::as_bool);
                }
            }
            (GroupKey::Gateway(id), GroupAttribute::Brightness) => {
                if let Some(group) = session.groups.get_mut(&id) {
                    group.dimmer = agreed.and_then(Value::as_i64);
                }
            }
            (GroupKey::Virtual(id), GroupAttribute::State) => {
                if let Some(group) = session.virtual_groups.get_mut(&id) {
                    group.on_off = agreed.and_then(Value::as_bool);
                }
            }
            (GroupKey::Virtual(id), GroupAttribute::Brightness) => {
                if let Some(group) = session.virtual_groups.get_mut(&id) {
                    group.dimmer = agreed.and_then(Value::as_i64);
                }
            }
            _ => {}
        }
    }

    fn consensus(&self, key: GroupKey, attribute: GroupAttribute) -> Consensus<Value> {
        let session = self.session.read();
        consensus_of(&session.member_lights(key), attribute)
    }

    /// Debounce timer fired: recompute and write the result.
    ///
    /// Flushes of the same state run one after another. The consensus is
    /// taken after the store read, so a flush never writes a result older
    /// than the member states it has seen.
    async fn flush(&self, key: GroupKey, attribute: GroupAttribute, state_id: String) {
        let lock = self.flush_locks.entry(state_id.clone()).or_default().clone();
        let _flushing = lock.lock().await;

        // triggers arriving while this flush runs must not be skipped as already written
        self.persisted.remove(&state_id);

        let current = match self.store.get_state(&state_id).await {
            Ok(current) => current,
            Err(e) => {
                warn!("Failed to read {}: {}", state_id, e);
                return;
            }
        };

        let consensus = self.consensus(key, attribute);
        self.mirror(key, attribute, &consensus);

        let result = match consensus {
            Consensus::Agreed(value) => {
                if current.as_ref() == Some(&value) {
                    trace!("{} already is {:?}", state_id, value);
                    Ok(Some(value))
                } else {
                    debug!("{} = {:?}", state_id, value);
                    self.store
                        .set_state(&state_id, value.clone(), true)
                        .await
                        .map(|_| Some(value))
                }
            }
            indeterminate => {
                match indeterminate {
                    Consensus::Disagreement => debug!("members of {} disagree on {}", key.object_id(), attribute.state_name()),
                    _ => debug!("no member of {} reports {}", key.object_id(), attribute.state_name()),
                }
                if current.is_some() {
                    self.store.delete_state(&state_id).await.map(|_| None)
                } else {
                    Ok(None)
                }
            }
        };

        match result {
            Ok(persisted) => {
                self.persisted.insert(state_id, persisted);
            }
            Err(e) => {
                // the next trigger recomputes and tries again
                warn!("Failed to update group state {}: {}", state_id, e);
                self.persisted.remove(&state_id);
            }
        }
    }
}

/// Keeps group states in sync with their member lights
#[derive(Clone)]
pub struct GroupAggregator {
    inner: Arc<Inner>,
}

impl GroupAggregator {
    pub fn new(store: Arc<dyn StateStore>, config: GroupSyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                session: RwLock::new(Session::default()),
                persisted: DashMap::new(),
                flush_locks: DashMap::new(),
                debouncer: Debouncer::new(),
            }),
        }
    }

    pub fn config(&self) -> &GroupSyncConfig {
        &self.inner.config
    }

    // ========================================================================
    // Triggers
    // ========================================================================

    /// A device was reported by the gateway. Recomputes every attribute of
    /// every group containing it.
    pub fn observe_device(&self, accessory: Accessory) {
        let instance_id = accessory.instance_id();
        let groups = {
            let mut session = self.inner.session.write();
            session.devices.insert(instance_id, accessory);
            session.groups_containing(instance_id)
        };
        for key in groups {
            self.update_group_states(key, None);
        }
    }

    /// A device was removed from the gateway
    pub fn remove_device(&self, instance_id: i64) -> Option<Accessory> {
        let (removed, groups) = {
            let mut session = self.inner.session.write();
            let removed = session.devices.remove(&instance_id);
            (removed, session.groups_containing(instance_id))
        };
        if removed.is_some() {
            for key in groups {
                self.update_group_states(key, None);
            }
        }
        removed
    }

    /// A state changed in the store.
    ///
    /// Only acknowledged changes of known devices count. The changed
    /// attribute is applied to the cached device and recomputed for every
    /// group containing the device; other states of the device are ignored.
    pub fn on_state_change(&self, change: &StateChange) {
        if !change.ack {
            trace!("ignoring unacknowledged change of {}", change.id);
            return;
        }
        let Some(instance_id) = objects::device_instance_id(&change.id) else {
            return;
        };
        let Some(attribute) = GroupAttribute::from_device_state(&change.id) else {
            return;
        };

        let groups = {
            let mut session = self.inner.session.write();
            let Some(accessory) = session.devices.get_mut(&instance_id) else {
                debug!("state change for unknown device {}", instance_id);
                return;
            };
            if let Some(value) = &change.value {
                apply_device_state(accessory, attribute, value);
            }
            session.groups_containing(instance_id)
        };

        for key in groups {
            self.update_group_states(key, Some(attribute));
        }
    }

    /// Recompute every attribute of every known group
    pub fn update_all(&self) {
        let groups = self.inner.session.read().all_groups();
        for key in groups {
            self.update_group_states(key, None);
        }
    }

    /// Consume state changes until the sender side is closed
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<StateChange>) {
        info!("Group aggregator started");
        while let Some(change) = events.recv().await {
            self.on_state_change(&change);
        }
        info!("Event source closed, group aggregator stopped");
    }

    // ========================================================================
    // Group definitions
    // ========================================================================

    /// Create or update the objects of a gateway group
    pub async fn extend_group(&self, group: Group) -> Result<()> {
        let key = GroupKey::Gateway(group.instance_id());
        let object_id = key.object_id();
        let existing = self.inner.store.get_object(&object_id).await?;

        self.inner
            .session
            .write()
            .groups
            .insert(group.instance_id(), group.clone());

        match existing {
            Some(existing) => {
                self.patch_channel(&existing, key, &group.header.name, group.device_ids())
                    .await?;
                self.refresh_states(&object_id, &group).await?;
            }
            None => {
                info!("Creating objects for group {} ({})", object_id, group.header.name);
                self.create_objects(key, &group.header.name, group.device_ids(), &GroupState::GATEWAY, |path| {
                    dig_group(&group, path)
                })
                .await?;
            }
        }

        self.update_group_states(key, None);
        Ok(())
    }

    /// Create or update the objects of a virtual group
    pub async fn extend_virtual_group(&self, group: VirtualGroup) -> Result<()> {
        let key = GroupKey::Virtual(group.instance_id);
        let object_id = key.object_id();
        let existing = self.inner.store.get_object(&object_id).await?;

        self.inner
            .session
            .write()
            .virtual_groups
            .insert(group.instance_id, group.clone());

        match existing {
            Some(existing) => {
                self.patch_channel(&existing, key, &group.name, &group.device_ids).await?;
            }
            None => {
                info!("Creating objects for virtual group {} ({})", object_id, group.name);
                self.create_objects(key, &group.name, &group.device_ids, &GroupState::VIRTUAL, |path| {
                    group.dig(path)
                })
                .await?;
            }
        }

        self.update_group_states(key, None);
        Ok(())
    }

    /// Forget a gateway group. Its objects stay in the store.
    pub fn remove_group(&self, instance_id: i64) -> Option<Group> {
        self.inner.session.write().groups.remove(&instance_id)
    }

    pub fn remove_virtual_group(&self, instance_id: i64) -> Option<VirtualGroup> {
        self.inner.session.write().virtual_groups.remove(&instance_id)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn group(&self, instance_id: i64) -> Option<Group> {
        self.inner.session.read().groups.get(&instance_id).cloned()
    }

    pub fn virtual_group(&self, instance_id: i64) -> Option<VirtualGroup> {
        self.inner.session.read().virtual_groups.get(&instance_id).cloned()
    }

    pub fn device(&self, instance_id: i64) -> Option<Accessory> {
        self.inner.session.read().devices.get(&instance_id).cloned()
    }

    /// Current consensus of a group attribute, without scheduling anything
    pub fn consensus(&self, key: GroupKey, attribute: GroupAttribute) -> Consensus<Value> {
        self.inner.consensus(key, attribute)
    }

    /// Number of group state writes waiting for their debounce window
    pub fn pending_writes(&self) -> usize {
        self.inner.debouncer.pending()
    }

    /// Wait until every scheduled group state write has been carried out
    pub async fn flushed(&self) {
        self.inner.debouncer.wait_idle().await;
    }

    /// Drop every pending write
    pub fn shutdown(&self) {
        self.inner.debouncer.cancel_all();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Recompute `only` (or every attribute) of a group and schedule writes
    /// for the ones that differ from what is persisted
    fn update_group_states(&self, key: GroupKey, only: Option<GroupAttribute>) {
        let session = self.inner.session.read();
        let lights = session.member_lights(key);
        if lights.is_empty() {
            trace!("{} has no lightbulbs", key.object_id());
            return;
        }

        for attribute in GroupAttribute::ALL {
            if only.is_some_and(|only| only != attribute) {
                continue;
            }
            let consensus = consensus_of(&lights, attribute);
            let state_id = key.state_id(attribute.state_name());
            if self.inner.is_persisted(&state_id, &consensus) {
                continue;
            }
            self.schedule_write(key, attribute, state_id);
        }
    }

    fn schedule_write(&self, key: GroupKey, attribute: GroupAttribute, state_id: String) {
        let inner = Arc::clone(&self.inner);
        let task_id = state_id.clone();
        self.inner
            .debouncer
            .schedule(state_id, self.inner.config.debounce(), async move {
                inner.flush(key, attribute, task_id).await;
            });
    }

    /// Bring an existing channel's metadata in line with the group definition.
    /// A name already stored is kept.
    async fn patch_channel(
        &self,
        existing: &StoredObject,
        key: GroupKey,
        name: &str,
        device_ids: &[i64],
    ) -> Result<()> {
        let mut common = group_common(name);
        if !existing.common.name.is_empty() {
            common.name = existing.common.name.clone();
        }
        let native = group_native(key, device_ids);

        let patch = ObjectPatch {
            common: (common != existing.common).then_some(common),
            native: (native != existing.native).then_some(native),
        };
        if patch.common.is_some() || patch.native.is_some() {
            debug!("Updating object {}", existing.id);
            self.inner.store.extend_object(&existing.id, patch).await?;
        }
        Ok(())
    }

    /// Copy the group definition into every state below the channel that mirrors a property
    async fn refresh_states(&self, object_id: &str, group: &Group) -> Result<()> {
        let prefix = format!("{}.", object_id);
        let states = self
            .inner
            .store
            .list_objects(&|obj: &StoredObject| obj.id.starts_with(&prefix) && obj.native.path.is_some())
            .await?;

        for state in states {
            let Some(value) = state.native.path.as_deref().and_then(|path| dig_group(group, path)) else {
                continue;
            };
            let value = match (self.inner.config.round_to_digits, value) {
                (Some(digits), Value::Float(f)) => Value::Float(round_to(f, digits)),
                (_, value) => value,
            };

            match self.inner.store.set_state(&state.id, value.clone(), true).await {
                Ok(()) => {
                    self.inner.persisted.insert(state.id, Some(value));
                }
                Err(e) => warn!("Failed to refresh {}: {}", state.id, e),
            }
        }
        Ok(())
    }

    /// Create the channel and its state objects, seeding states from the definition
    async fn create_objects<F>(
        &self,
        key: GroupKey,
        name: &str,
        device_ids: &[i64],
        states: &[GroupState],
        dig: F,
    ) -> Result<()>
    where
        F: Fn(&str) -> Option<Value>,
    {
        let object_id = key.object_id();
        self.inner
            .store
            .create_if_absent(group_channel(key, name, device_ids), None)
            .await?;

        let creations = states.iter().map(|state| {
            let definition = state.definition(&object_id, key.kind());
            let initial = dig(state.path());
            let store = Arc::clone(&self.inner.store);
            async move {
                let id = definition.id.clone();
                let created = store.create_if_absent(definition, initial.clone()).await;
                (id, initial, created)
            }
        });

        for (id, initial, created) in join_all(creations).await {
            match created {
                Ok(true) => {
                    self.inner.persisted.insert(id, initial);
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to create {}: {}", id, e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradfri_devices::device::DeviceHeader;
    use tradfri_devices::{AccessoryType, DeviceInfo, Light};

    fn bulb(instance_id: i64, model: &str, dimmer: i64) -> Accessory {
        let mut light = Light::with_model(model);
        light.dimmer = dimmer;
        Accessory {
            header: DeviceHeader::new(instance_id, "bulb"),
            accessory_type: AccessoryType::Lightbulb,
            device_info: Some(DeviceInfo {
                model_number: model.to_string(),
                ..Default::default()
            }),
            light_list: Some(vec![light]),
            ..Accessory::default()
        }
    }

    fn session_with(bulbs: Vec<Accessory>) -> Session {
        let mut session = Session::default();
        let ids = bulbs.iter().map(Accessory::instance_id).collect();
        for bulb in bulbs {
            session.devices.insert(bulb.instance_id(), bulb);
        }
        session
            .groups
            .insert(1, Group::new(1, "Group").with_device_ids(ids));
        session
    }

    #[test]
    fn test_brightness_disagreement() {
        let session = session_with(vec![
            bulb(10, "TRADFRI bulb E27 opal 1000lm", 100),
            bulb(11, "TRADFRI bulb E27 opal 1000lm", 100),
            bulb(12, "TRADFRI bulb E27 opal 1000lm", 80),
        ]);
        let lights = session.member_lights(GroupKey::Gateway(1));
        assert_eq!(consensus_of(&lights, GroupAttribute::Brightness), Consensus::Disagreement);
        assert_eq!(
            consensus_of(&lights, GroupAttribute::State),
            Consensus::Agreed(Value::Bool(false))
        );
    }

    #[test]
    fn test_capability_specific_contributors() {
        let session = session_with(vec![
            bulb(10, "TRADFRI bulb E27 WS opal 980lm", 50),
            bulb(11, "TRADFRI bulb E27 opal 1000lm", 50),
        ]);
        let lights = session.member_lights(GroupKey::Gateway(1));

        // only the white spectrum bulb reports a temperature
        assert_eq!(
            consensus_of(&lights, GroupAttribute::ColorTemperature),
            Consensus::Agreed(Value::Float(0.0))
        );
        assert_eq!(consensus_of(&lights, GroupAttribute::Color), Consensus::NoContributors);
        assert_eq!(consensus_of(&lights, GroupAttribute::Hue), Consensus::NoContributors);
    }

    #[test]
    fn test_non_lightbulbs_do_not_contribute() {
        let mut remote = bulb(12, "TRADFRI remote control", 0);
        remote.accessory_type = AccessoryType::Remote;
        let session = session_with(vec![bulb(10, "TRADFRI bulb E27 opal 1000lm", 30), remote]);

        let lights = session.member_lights(GroupKey::Gateway(1));
        assert_eq!(lights.len(), 1);
        assert_eq!(session.groups_containing(12), vec![GroupKey::Gateway(1)]);
    }

    #[test]
    fn test_apply_device_state() {
        let mut accessory = bulb(10, "TRADFRI bulb E27 WS opal 980lm", 0);
        apply_device_state(&mut accessory, GroupAttribute::Brightness, &Value::Int(200));
        apply_device_state(&mut accessory, GroupAttribute::ColorTemperature, &Value::Float(100.0));
        apply_device_state(&mut accessory, GroupAttribute::State, &Value::from("nonsense"));

        let light = accessory.first_light().unwrap();
        assert_eq!(light.dimmer, 200);
        assert_eq!(light.color_x, 33135);
        assert!(!light.on_off);
        assert_eq!(light.model_name(), Some("TRADFRI bulb E27 WS opal 980lm"));
    }
}
