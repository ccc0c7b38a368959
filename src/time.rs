//! Simulated calendar time.
//!
//! Time in Hestia is purely virtual: it moves only when a command moves
//! it, never from wall-clock observation. [`Timestamp`] wraps a naive
//! calendar datetime; [`VirtualClock`] is the single owner of "now" and
//! enforces that it only ever moves forward.

use chrono::{Duration, NaiveDateTime};

use crate::error::{HestiaError, HestiaResult};

/// Input format: year-month-day_hour:minute:second, fields not
/// necessarily zero-padded (`2022-3-10_10:0:0`).
const PARSE_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Canonical output format, always zero-padded.
const DISPLAY_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// A point in simulated calendar time.
///
/// A newtype rather than a bare `NaiveDateTime` so that command-stream
/// time never mixes with any other datetime floating around, and so the
/// parse/render contract lives in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Parse a command-stream time token.
    ///
    /// Accepts non-zero-padded fields; rejects structurally broken input
    /// and impossible calendar dates.
    pub fn parse(text: &str) -> Option<Timestamp> {
        NaiveDateTime::parse_from_str(text, PARSE_FORMAT)
            .ok()
            .map(Timestamp)
    }

    /// Render in the canonical zero-padded form.
    pub fn canonical(&self) -> String {
        self.0.format(DISPLAY_FORMAT).to_string()
    }

    /// The timestamp `minutes` later (or earlier, for negative input).
    pub fn plus_minutes(self, minutes: i64) -> Timestamp {
        Timestamp(self.0 + Duration::minutes(minutes))
    }

    /// Fractional minutes elapsed from `earlier` to `self`.
    pub fn minutes_since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).num_seconds() as f64 / 60.0
    }

    /// Fractional hours elapsed from `earlier` to `self`.
    pub fn hours_since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).num_seconds() as f64 / 3600.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

// ── Virtual clock ─────────────────────────────────────────────────────

/// The simulation's notion of "now".
///
/// Starts uninitialized; the initializing command moves it to the
/// `Initialized` state exactly once. From then on the clock is strictly
/// non-decreasing: `set` rejects the current value and anything earlier,
/// `skip` rejects non-positive minute counts.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualClock {
    now: Option<Timestamp>,
}

impl VirtualClock {
    /// A fresh, uninitialized clock.
    pub fn new() -> Self {
        VirtualClock { now: None }
    }

    /// Current time, or `None` before initialization.
    pub fn now(&self) -> Option<Timestamp> {
        self.now
    }

    pub fn is_initialized(&self) -> bool {
        self.now.is_some()
    }

    /// One-shot initialization. Any later call is an erroneous command.
    pub fn init(&mut self, at: Timestamp) -> HestiaResult<()> {
        if self.now.is_some() {
            return Err(HestiaError::Erroneous);
        }
        self.now = Some(at);
        Ok(())
    }

    /// Move the clock to an absolute time.
    ///
    /// The current value is rejected as a no-op; earlier values are a
    /// reversal.
    pub fn set(&mut self, at: Timestamp) -> HestiaResult<()> {
        let now = self.now.ok_or(HestiaError::Erroneous)?;
        if at == now {
            return Err(HestiaError::NothingToChange);
        }
        if at < now {
            return Err(HestiaError::TimeReversed);
        }
        self.now = Some(at);
        Ok(())
    }

    /// Advance the clock by a positive number of minutes.
    pub fn skip(&mut self, minutes: i64) -> HestiaResult<()> {
        let now = self.now.ok_or(HestiaError::Erroneous)?;
        if minutes < 0 {
            return Err(HestiaError::TimeReversed);
        }
        if minutes == 0 {
            return Err(HestiaError::NothingToSkip);
        }
        self.now = Some(now.plus_minutes(minutes));
        Ok(())
    }

    /// Forward assignment used by the jump-to-next-event command.
    ///
    /// The target comes from the workload queue, which never holds a
    /// time in the past, so no reversal check is needed here.
    pub(crate) fn jump_to(&mut self, at: Timestamp) {
        debug_assert!(self.now.map_or(true, |now| at >= now), "clock reversal");
        self.now = Some(at);
    }
}
