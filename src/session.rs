//! Session state and the workload firing engine.
//!
//! A [`Session`] is the whole simulated world for one run: device
//! registry, virtual clock, workload queue, and report ledger, owned
//! together and passed explicitly wherever commands execute. There is no
//! global state; a run constructs a session, drives it, and drops it.
//!
//! Everything here is strictly sequential. "Due" workloads fire only as
//! the synchronous consequence of a clock-advancing command, and a
//! command's entire cascade completes before the next line is read.

use tracing::debug;

use crate::device::{DeviceId, Status};
use crate::ledger::ReportLedger;
use crate::registry::DeviceRegistry;
use crate::time::{Timestamp, VirtualClock};
use crate::workload::WorkloadQueue;

/// The complete mutable state of one simulation run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub registry: DeviceRegistry,
    pub clock: VirtualClock,
    pub queue: WorkloadQueue,
    pub ledger: ReportLedger,
}

impl Session {
    pub fn new() -> Self {
        Session {
            registry: DeviceRegistry::new(),
            clock: VirtualClock::new(),
            queue: WorkloadQueue::new(),
            ledger: ReportLedger::new(),
        }
    }

    /// Schedule a deferred switch for a device, canceling and replacing
    /// any switch it already has pending. The device moves into the
    /// Scheduled partition at its firing-time position.
    pub fn schedule_switch(&mut self, device: DeviceId, fire_at: Timestamp, target: Status) {
        let previous = self.registry.get(device).and_then(|d| d.pending_workload);
        if let Some(old) = previous {
            self.queue.cancel(old);
            debug!(device = %device, workload = %old, "canceled pending switch on reschedule");
        }
        let id = self.queue.schedule(device, fire_at, target);
        if let Some(device_state) = self.registry.get_mut(device) {
            device_state.pending_workload = Some(id);
        }
        self.ledger.add_scheduled(device, fire_at);
        debug!(device = %device, workload = %id, fire_at = %fire_at, "scheduled switch");
    }

    /// Fire every workload whose time is at or before the clock, bucket
    /// by bucket in ascending time order.
    ///
    /// Firing never schedules: the sweep over the due keys collected up
    /// front is complete.
    pub fn run_due_workloads(&mut self) {
        let now = match self.clock.now() {
            Some(now) => now,
            None => return,
        };
        for at in self.queue.due_times(now) {
            self.fire_bucket(at);
        }
    }

    /// Fire one bucket in insertion order. Each fired device moves to
    /// the front of RecentlyFired, so the last to fire reports first.
    fn fire_bucket(&mut self, at: Timestamp) {
        for workload in self.queue.take_bucket(at) {
            let device = match self.registry.get_mut(workload.device) {
                Some(device) => device,
                None => continue,
            };
            // Only clear the back-reference if it still points at this
            // workload; an orphaned switch must not clobber a newer one.
            if device.pending_workload == Some(workload.id) {
                device.pending_workload = None;
            }
            device.apply_status(at, workload.target);
            self.ledger.add_recently_fired(workload.device);
            debug!(
                device = %workload.device,
                workload = %workload.id,
                fire_at = %at,
                status = workload.target.label(),
                "workload fired"
            );
        }
    }

    /// The report body: the current time line followed by one line per
    /// device in canonical ledger order.
    pub fn report(&self) -> String {
        let now = match self.clock.now() {
            Some(now) => now,
            None => return String::new(),
        };
        let mut text = format!("Time is:\t{}\n", now.canonical());
        for id in self.ledger.ordered_ids() {
            if let Some(device) = self.registry.get(id) {
                let switch_time = device
                    .pending_workload
                    .and_then(|w| self.queue.firing_time(w));
                text.push_str(&device.report_line(now, switch_time));
                text.push('\n');
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceKind, LampState};
    use std::collections::BTreeSet;

    fn ts(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    fn session_at(start: &str) -> Session {
        let mut session = Session::new();
        session.clock.init(ts(start)).unwrap();
        session
    }

    fn add_lamp(session: &mut Session, name: &str) -> DeviceId {
        let id = session
            .registry
            .create(name, DeviceKind::Lamp(LampState::new(4000, 100)));
        session.ledger.add_never_scheduled(id);
        id
    }

    /// The three partitions must always cover the live set exactly.
    fn assert_partitions(session: &Session) {
        let live: BTreeSet<_> = session.registry.ids().into_iter().collect();
        let ledger: Vec<_> = session.ledger.ordered_ids();
        let ledger_set: BTreeSet<_> = ledger.iter().copied().collect();
        assert_eq!(ledger.len(), ledger_set.len(), "duplicate ledger entry");
        assert_eq!(ledger_set, live, "ledger does not partition live set");
    }

    #[test]
    fn test_reschedule_replaces_pending() {
        let mut session = session_at("2022-3-10_10:0:0");
        let lamp = add_lamp(&mut session, "Bedroom");

        session.schedule_switch(lamp, ts("2022-3-10_12:0:0"), Status::On);
        let first = session.registry.get(lamp).unwrap().pending_workload.unwrap();
        session.schedule_switch(lamp, ts("2022-3-10_13:0:0"), Status::On);
        let second = session.registry.get(lamp).unwrap().pending_workload.unwrap();

        assert_ne!(first, second);
        assert_eq!(session.queue.len(), 1);
        assert_eq!(session.queue.firing_time(first), None);
        assert_eq!(
            session.queue.firing_time(second),
            Some(ts("2022-3-10_13:0:0"))
        );
        assert_partitions(&session);
    }

    #[test]
    fn test_firing_clears_reference_and_moves_device() {
        let mut session = session_at("2022-3-10_10:0:0");
        let lamp = add_lamp(&mut session, "Bedroom");
        session.schedule_switch(lamp, ts("2022-3-10_11:0:0"), Status::On);

        session.clock.skip(60).unwrap();
        session.run_due_workloads();

        let device = session.registry.get(lamp).unwrap();
        assert_eq!(device.status, Status::On);
        assert_eq!(device.pending_workload, None);
        assert!(session.queue.is_empty());
        assert_eq!(
            session.ledger.partition_of(lamp),
            Some(crate::ledger::Partition::RecentlyFired)
        );
        assert_partitions(&session);
    }

    #[test]
    fn test_multi_bucket_sweep_fires_in_time_order() {
        let mut session = session_at("2022-3-10_10:0:0");
        let a = add_lamp(&mut session, "A");
        let b = add_lamp(&mut session, "B");
        let c = add_lamp(&mut session, "C");

        session.schedule_switch(c, ts("2022-3-10_12:0:0"), Status::On);
        session.schedule_switch(a, ts("2022-3-10_10:30:0"), Status::On);
        session.schedule_switch(b, ts("2022-3-10_11:0:0"), Status::On);

        // One large skip makes all three buckets due at once.
        session.clock.skip(180).unwrap();
        session.run_due_workloads();

        // Most recently fired (latest bucket) first.
        assert_eq!(session.ledger.ordered_ids(), vec![c, b, a]);
        assert_partitions(&session);
    }

    #[test]
    fn test_same_bucket_fires_in_scheduling_order() {
        let mut session = session_at("2022-3-10_10:0:0");
        let a = add_lamp(&mut session, "A");
        let b = add_lamp(&mut session, "B");
        let at = ts("2022-3-10_11:0:0");

        session.schedule_switch(a, at, Status::On);
        session.schedule_switch(b, at, Status::On);

        session.clock.skip(60).unwrap();
        session.run_due_workloads();

        // B fired last within the bucket, so it reports first.
        assert_eq!(session.ledger.ordered_ids(), vec![b, a]);
        assert_partitions(&session);
    }

    #[test]
    fn test_orphan_firing_does_not_clobber_newer_reservation() {
        let mut session = session_at("2022-3-10_10:0:0");
        let lamp = add_lamp(&mut session, "Bedroom");

        session.schedule_switch(lamp, ts("2022-3-10_11:0:0"), Status::On);
        // A user switch forgets the reference but leaves the queue entry.
        session
            .registry
            .get_mut(lamp)
            .unwrap()
            .switch_status(ts("2022-3-10_10:5:0"), Status::On);
        // A fresh reservation for later.
        session.schedule_switch(lamp, ts("2022-3-10_12:0:0"), Status::Off);
        let fresh = session.registry.get(lamp).unwrap().pending_workload.unwrap();

        // The orphan fires; the fresh reservation must survive it.
        session.clock.skip(60).unwrap();
        session.run_due_workloads();
        assert_eq!(
            session.registry.get(lamp).unwrap().pending_workload,
            Some(fresh)
        );
        assert_eq!(session.queue.firing_time(fresh), Some(ts("2022-3-10_12:0:0")));
        assert_partitions(&session);
    }

    #[test]
    fn test_report_lists_time_then_devices() {
        let mut session = session_at("2022-3-10_10:0:0");
        add_lamp(&mut session, "Bedroom");
        let report = session.report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Time is:\t2022-03-10_10:00:00");
        assert_eq!(
            lines[1],
            "Smart Lamp Bedroom is off and its kelvin value is 4000K with 100% brightness, \
             and its time to switch its status is null."
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_report_shows_pending_switch_time() {
        let mut session = session_at("2022-3-10_10:0:0");
        let lamp = add_lamp(&mut session, "Bedroom");
        session.schedule_switch(lamp, ts("2022-3-10_12:0:0"), Status::On);
        let report = session.report();
        assert!(report.contains("its time to switch its status is 2022-03-10_12:00:00."));
    }
}
