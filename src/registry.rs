//! Device registry — owns every live device.
//!
//! Lookup is by id (primary) or by unique name (secondary index). The
//! registry mints ids and keeps the name index consistent through
//! rename and removal; name *validity* (duplicates, existence) is the
//! dispatcher's concern, so the mutating methods here assume their
//! preconditions hold and return `Option` for the caller to act on.

use std::collections::BTreeMap;

use crate::device::{Device, DeviceId, DeviceIdGen, DeviceKind};

/// Creates, stores, finds, renames, and removes devices.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, Device>,
    names: BTreeMap<String, DeviceId>,
    id_gen: DeviceIdGen,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry {
            devices: BTreeMap::new(),
            names: BTreeMap::new(),
            id_gen: DeviceIdGen::new(),
        }
    }

    /// Create and store a device, returning its freshly minted id.
    ///
    /// The name must already be known to be free.
    pub fn create(&mut self, name: &str, kind: DeviceKind) -> DeviceId {
        let id = self.id_gen.next_id();
        let device = Device::new(id, name.to_string(), kind);
        self.names.insert(name.to_string(), id);
        self.devices.insert(id, device);
        id
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn id_by_name(&self, name: &str) -> Option<DeviceId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Device> {
        self.devices.get(&self.id_by_name(name)?)
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Device> {
        let id = self.id_by_name(name)?;
        self.devices.get_mut(&id)
    }

    /// Rename a device, keeping the name index in step.
    ///
    /// Returns `None` (and changes nothing) if `old` is unknown.
    pub fn rename(&mut self, old: &str, new: &str) -> Option<DeviceId> {
        let id = self.names.remove(old)?;
        self.names.insert(new.to_string(), id);
        if let Some(device) = self.devices.get_mut(&id) {
            device.name = new.to_string();
        }
        Some(id)
    }

    /// Remove a device by name, returning the owned device.
    pub fn remove_by_name(&mut self, name: &str) -> Option<Device> {
        let id = self.names.remove(name)?;
        self.devices.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// All live ids, ascending. Used for invariant checks, not reports —
    /// report order is the ledger's business.
    pub fn ids(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }
}
