//! Report ordering ledger.
//!
//! Three ordered, disjoint sequences of live device ids, used only to
//! decide report enumeration order:
//!
//! - **Scheduled** — devices with a pending switch, ascending by its
//!   firing time; equal times keep arrival order.
//! - **RecentlyFired** — devices whose switch fired, most recent first.
//! - **NeverScheduled** — everything else, in arrival order.
//!
//! Every insert first removes the id from whichever sequence holds it,
//! so the three always partition the live device set exactly.

use crate::device::DeviceId;
use crate::time::Timestamp;

/// Which ledger sequence a device sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Scheduled,
    RecentlyFired,
    NeverScheduled,
}

/// A Scheduled member together with its sort key (the firing time of its
/// pending workload at insertion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledEntry {
    device: DeviceId,
    fire_at: Timestamp,
}

/// The three report partitions.
#[derive(Debug, Clone, Default)]
pub struct ReportLedger {
    scheduled: Vec<ScheduledEntry>,
    recently_fired: Vec<DeviceId>,
    never_scheduled: Vec<DeviceId>,
}

impl ReportLedger {
    pub fn new() -> Self {
        ReportLedger::default()
    }

    /// Drop a device from whichever partition holds it. No-op for
    /// unknown ids, so removal after partial setup is always safe.
    pub fn remove(&mut self, device: DeviceId) {
        self.scheduled.retain(|entry| entry.device != device);
        self.recently_fired.retain(|id| *id != device);
        self.never_scheduled.retain(|id| *id != device);
    }

    /// Place a device into Scheduled at its firing-time position.
    ///
    /// Ties are stable: a new entry lands after existing entries with
    /// the same firing time.
    pub fn add_scheduled(&mut self, device: DeviceId, fire_at: Timestamp) {
        self.remove(device);
        let pos = self
            .scheduled
            .partition_point(|entry| entry.fire_at <= fire_at);
        self.scheduled.insert(pos, ScheduledEntry { device, fire_at });
    }

    /// Place a device at the front of RecentlyFired: the last device to
    /// fire is reported first.
    pub fn add_recently_fired(&mut self, device: DeviceId) {
        self.remove(device);
        self.recently_fired.insert(0, device);
    }

    /// Append a device to NeverScheduled (arrival order).
    pub fn add_never_scheduled(&mut self, device: DeviceId) {
        self.remove(device);
        self.never_scheduled.push(device);
    }

    /// The partition currently holding a device, if any.
    pub fn partition_of(&self, device: DeviceId) -> Option<Partition> {
        if self.scheduled.iter().any(|entry| entry.device == device) {
            Some(Partition::Scheduled)
        } else if self.recently_fired.contains(&device) {
            Some(Partition::RecentlyFired)
        } else if self.never_scheduled.contains(&device) {
            Some(Partition::NeverScheduled)
        } else {
            None
        }
    }

    /// Canonical report order: Scheduled, then RecentlyFired, then
    /// NeverScheduled.
    pub fn ordered_ids(&self) -> Vec<DeviceId> {
        let mut ids = Vec::with_capacity(self.len());
        ids.extend(self.scheduled.iter().map(|entry| entry.device));
        ids.extend(self.recently_fired.iter().copied());
        ids.extend(self.never_scheduled.iter().copied());
        ids
    }

    pub fn len(&self) -> usize {
        self.scheduled.len() + self.recently_fired.len() + self.never_scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    fn ids(raw: &[u64]) -> Vec<DeviceId> {
        raw.iter().map(|r| DeviceId::new(*r)).collect()
    }

    #[test]
    fn test_never_scheduled_keeps_arrival_order() {
        let mut ledger = ReportLedger::new();
        ledger.add_never_scheduled(DeviceId::new(2));
        ledger.add_never_scheduled(DeviceId::new(0));
        ledger.add_never_scheduled(DeviceId::new(1));
        assert_eq!(ledger.ordered_ids(), ids(&[2, 0, 1]));
    }

    #[test]
    fn test_scheduled_sorted_by_firing_time() {
        let mut ledger = ReportLedger::new();
        ledger.add_scheduled(DeviceId::new(0), ts("2022-3-10_12:0:0"));
        ledger.add_scheduled(DeviceId::new(1), ts("2022-3-10_10:0:0"));
        ledger.add_scheduled(DeviceId::new(2), ts("2022-3-10_11:0:0"));
        assert_eq!(ledger.ordered_ids(), ids(&[1, 2, 0]));
    }

    #[test]
    fn test_scheduled_ties_are_stable() {
        let mut ledger = ReportLedger::new();
        let at = ts("2022-3-10_10:0:0");
        ledger.add_scheduled(DeviceId::new(5), at);
        ledger.add_scheduled(DeviceId::new(3), at);
        ledger.add_scheduled(DeviceId::new(4), at);
        // Equal keys: arrival order, not id order.
        assert_eq!(ledger.ordered_ids(), ids(&[5, 3, 4]));
    }

    #[test]
    fn test_recently_fired_front_insertion() {
        let mut ledger = ReportLedger::new();
        ledger.add_recently_fired(DeviceId::new(0));
        ledger.add_recently_fired(DeviceId::new(1));
        ledger.add_recently_fired(DeviceId::new(2));
        // Last fired first.
        assert_eq!(ledger.ordered_ids(), ids(&[2, 1, 0]));
    }

    #[test]
    fn test_moves_preserve_partitioning() {
        let mut ledger = ReportLedger::new();
        let device = DeviceId::new(7);
        ledger.add_never_scheduled(device);
        assert_eq!(ledger.partition_of(device), Some(Partition::NeverScheduled));

        ledger.add_scheduled(device, ts("2022-3-10_10:0:0"));
        assert_eq!(ledger.partition_of(device), Some(Partition::Scheduled));
        assert_eq!(ledger.len(), 1);

        ledger.add_recently_fired(device);
        assert_eq!(ledger.partition_of(device), Some(Partition::RecentlyFired));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_concatenation_order() {
        let mut ledger = ReportLedger::new();
        ledger.add_never_scheduled(DeviceId::new(0));
        ledger.add_recently_fired(DeviceId::new(1));
        ledger.add_scheduled(DeviceId::new(2), ts("2022-3-10_10:0:0"));
        assert_eq!(ledger.ordered_ids(), ids(&[2, 1, 0]));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut ledger = ReportLedger::new();
        ledger.add_never_scheduled(DeviceId::new(0));
        ledger.remove(DeviceId::new(9));
        assert_eq!(ledger.len(), 1);
        ledger.remove(DeviceId::new(0));
        assert!(ledger.is_empty());
    }
}
