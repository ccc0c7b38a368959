//! Deferred status switches and the queue that holds them.
//!
//! A [`Workload`] is a one-shot toggle bound to a firing time. The
//! [`WorkloadQueue`] buckets workloads by exact firing time; buckets
//! fire in ascending time order and preserve insertion order inside, so
//! two runs of the same script always toggle devices identically.

use std::collections::BTreeMap;

use crate::device::{DeviceId, Status};
use crate::time::Timestamp;

// ── Workload ID ───────────────────────────────────────────────────────

/// A unique, strictly increasing workload identifier.
///
/// Ids double as creation order: within one bucket, lower id means
/// scheduled earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkloadId(u64);

impl WorkloadId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        WorkloadId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "W#{}", self.0)
    }
}

/// Monotonic workload-ID generator.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkloadIdGen {
    next: u64,
}

impl WorkloadIdGen {
    pub fn new() -> Self {
        WorkloadIdGen { next: 0 }
    }

    pub fn next_id(&mut self) -> WorkloadId {
        let id = WorkloadId(self.next);
        self.next += 1;
        id
    }
}

// ── Workload ──────────────────────────────────────────────────────────

/// A deferred one-shot device status toggle.
///
/// Created by the schedule operation; consumed by firing or canceled by
/// reschedule/removal — never both, never neither.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Workload {
    pub id: WorkloadId,
    pub device: DeviceId,
    pub fire_at: Timestamp,
    pub target: Status,
}

// ── WorkloadQueue ─────────────────────────────────────────────────────

/// Time-bucketed queue of pending workloads.
///
/// Each bucket holds the workloads due at that exact instant, in
/// insertion order. An id index makes cancel and firing-time lookup
/// cheap without scanning buckets.
#[derive(Debug, Clone, Default)]
pub struct WorkloadQueue {
    buckets: BTreeMap<Timestamp, Vec<Workload>>,
    index: BTreeMap<WorkloadId, Timestamp>,
    id_gen: WorkloadIdGen,
}

impl WorkloadQueue {
    pub fn new() -> Self {
        WorkloadQueue {
            buckets: BTreeMap::new(),
            index: BTreeMap::new(),
            id_gen: WorkloadIdGen::new(),
        }
    }

    /// Enqueue a toggle for `device` at `fire_at`, appending to that
    /// instant's bucket.
    pub fn schedule(&mut self, device: DeviceId, fire_at: Timestamp, target: Status) -> WorkloadId {
        let id = self.id_gen.next_id();
        self.buckets.entry(fire_at).or_default().push(Workload {
            id,
            device,
            fire_at,
            target,
        });
        self.index.insert(id, fire_at);
        id
    }

    /// Remove a pending workload. Dropping the last entry of a bucket
    /// drops the bucket. Returns the canceled workload, or `None` if the
    /// id is not pending (already fired or canceled).
    pub fn cancel(&mut self, id: WorkloadId) -> Option<Workload> {
        let fire_at = self.index.remove(&id)?;
        let bucket = self.buckets.get_mut(&fire_at)?;
        let pos = bucket.iter().position(|w| w.id == id)?;
        let workload = bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&fire_at);
        }
        Some(workload)
    }

    /// The firing time of a pending workload.
    pub fn firing_time(&self, id: WorkloadId) -> Option<Timestamp> {
        self.index.get(&id).copied()
    }

    /// All bucket keys at or before `now`, ascending — one clock advance
    /// can make several buckets due at once.
    pub fn due_times(&self, now: Timestamp) -> Vec<Timestamp> {
        self.buckets.range(..=now).map(|(t, _)| *t).collect()
    }

    /// Detach a whole bucket for firing, in insertion order.
    pub fn take_bucket(&mut self, at: Timestamp) -> Vec<Workload> {
        let bucket = self.buckets.remove(&at).unwrap_or_default();
        for workload in &bucket {
            self.index.remove(&workload.id);
        }
        bucket
    }

    /// The most imminent firing time, or `None` when nothing is pending.
    pub fn earliest(&self) -> Option<Timestamp> {
        self.buckets.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total pending workloads across all buckets.
    pub fn len(&self) -> usize {
        self.index.len()
    }
}
