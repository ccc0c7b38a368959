//! # Hestia — Deterministic Smart-Home Simulator
//!
//! A scripted command stream drives a house of virtual devices: lamps,
//! color lamps, plugs, cameras. Time is purely virtual — it moves only
//! when a command moves it, and advancing it fires every deferred status
//! switch now due, in a fully deterministic order. No async, no threads,
//! no wall clock.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │        Dispatcher          │ ← keyword table → typed handlers
//! │  ┌──────────────────────┐  │
//! │  │       Session        │  │ ← the whole world, passed explicitly
//! │  │ ┌──────────────────┐ │  │
//! │  │ │  DeviceRegistry  │ │  │ ← devices by id and unique name
//! │  │ ├──────────────────┤ │  │
//! │  │ │  VirtualClock    │ │  │ ← "now", forward-only
//! │  │ ├──────────────────┤ │  │
//! │  │ │  WorkloadQueue   │ │  │ ← deferred switches, time buckets
//! │  │ ├──────────────────┤ │  │
//! │  │ │  ReportLedger    │ │  │ ← report enumeration order
//! │  │ └──────────────────┘ │  │
//! │  └──────────────────────┘  │
//! └────────────────────────────┘
//! ```
//!
//! Processing is strictly sequential: one command — including any
//! cascade of workload firings it triggers — completes before the next
//! line is read.

pub mod command;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod session;
pub mod time;
pub mod workload;

// Re-exports for convenience.
pub use command::Command;
pub use device::{Device, DeviceId, DeviceKind, Status};
pub use dispatch::{dispatch, run_script};
pub use error::{ErrorKind, HestiaError, HestiaResult};
pub use ledger::{Partition, ReportLedger};
pub use registry::DeviceRegistry;
pub use session::Session;
pub use time::{Timestamp, VirtualClock};
pub use workload::{Workload, WorkloadId, WorkloadQueue};
