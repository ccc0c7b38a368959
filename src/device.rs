//! Smart devices and their state machines.
//!
//! A [`Device`] is the common chassis (identity, name, on/off status,
//! time marks, pending-switch back-reference) plus a [`DeviceKind`]
//! variant carrying kind-specific accumulators. Behavior that differs by
//! kind — what happens on power-off, what the report line says — is
//! dispatched over the variant tag in one place each.

use crate::time::Timestamp;
use crate::workload::WorkloadId;

/// Mains voltage used for plug energy accounting, in volts.
const VOLTAGE: f64 = 220.0;

// ── Device ID ─────────────────────────────────────────────────────────

/// A unique device identifier.
///
/// Minted monotonically and never reused, so removing a device can never
/// make a stale id point at a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceId(u64);

impl DeviceId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        DeviceId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// Monotonic device-ID generator. Each registry owns exactly one.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceIdGen {
    next: u64,
}

impl DeviceIdGen {
    pub fn new() -> Self {
        DeviceIdGen { next: 0 }
    }

    pub fn next_id(&mut self) -> DeviceId {
        let id = DeviceId(self.next);
        self.next += 1;
        id
    }
}

// ── Status ────────────────────────────────────────────────────────────

/// On/off status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    On,
    Off,
}

impl Status {
    /// Parse a command token. Only the exact forms `On` and `Off` are
    /// accepted.
    pub fn from_token(token: &str) -> Option<Status> {
        match token {
            "On" => Some(Status::On),
            "Off" => Some(Status::Off),
            _ => None,
        }
    }

    /// Lowercase form used in report and error text.
    pub fn label(self) -> &'static str {
        match self {
            Status::On => "on",
            Status::Off => "off",
        }
    }

    pub fn toggled(self) -> Status {
        match self {
            Status::On => Status::Off,
            Status::Off => Status::On,
        }
    }
}

// ── Kind-specific state ───────────────────────────────────────────────

/// A color lamp shows either a white tone (kelvin) or an RGB code,
/// never both; setting one clears the other.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorMode {
    Kelvin(u32),
    Code(String),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LampState {
    pub kelvin: u32,
    pub brightness: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorLampState {
    pub color: ColorMode,
    pub brightness: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PlugState {
    /// Draw of the plugged appliance, amperes. Zero while unplugged.
    pub ampere: f64,
    /// Whether an appliance occupies the socket.
    pub plugged: bool,
    /// Finalized energy, watt-hours.
    pub total_energy: f64,
    /// When the current draw interval started. Re-stamped at power
    /// transitions while plugged; cleared on plug-out.
    pub plug_in_time: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraState {
    /// Storage fill rate while recording, megabytes per minute.
    pub megabytes_per_minute: f64,
    /// Finalized storage use, megabytes.
    pub used_storage: f64,
}

/// The device variant tag plus its kind-specific state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    Lamp(LampState),
    ColorLamp(ColorLampState),
    Plug(PlugState),
    Camera(CameraState),
}

impl DeviceKind {
    /// Human-readable kind label used in report lines.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Lamp(_) => "Smart Lamp",
            DeviceKind::ColorLamp(_) => "Smart Color Lamp",
            DeviceKind::Plug(_) => "Smart Plug",
            DeviceKind::Camera(_) => "Smart Camera",
        }
    }
}

// ── Device ────────────────────────────────────────────────────────────

/// A live smart-home device.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    id: DeviceId,
    pub name: String,
    pub status: Status,
    /// When the device last turned on.
    pub start_time: Option<Timestamp>,
    /// When the device last turned off.
    pub stop_time: Option<Timestamp>,
    /// The single deferred switch targeting this device, if any.
    pub pending_workload: Option<WorkloadId>,
    pub kind: DeviceKind,
}

impl Device {
    /// A new device starts off, with no time marks and nothing pending.
    pub fn new(id: DeviceId, name: String, kind: DeviceKind) -> Self {
        Device {
            id,
            name,
            status: Status::Off,
            start_time: None,
            stop_time: None,
            pending_workload: None,
            kind,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Turn the device on, stamping the start mark.
    ///
    /// A plug with an occupied socket also re-stamps the plug-in mark:
    /// the appliance only draws current while the plug itself is on.
    pub fn power_on(&mut self, at: Timestamp) {
        self.status = Status::On;
        self.start_time = Some(at);
        if let DeviceKind::Plug(plug) = &mut self.kind {
            if plug.plugged {
                plug.plug_in_time = Some(at);
            }
        }
    }

    /// Turn the device off, stamping the stop mark and applying the
    /// kind-specific accumulation for the interval just ended.
    pub fn power_off(&mut self, at: Timestamp) {
        self.status = Status::Off;
        self.stop_time = Some(at);
        match &mut self.kind {
            DeviceKind::Camera(camera) => {
                if let Some(start) = self.start_time {
                    camera.used_storage += at.minutes_since(start) * camera.megabytes_per_minute;
                }
                self.start_time = None;
                self.stop_time = None;
            }
            DeviceKind::Plug(plug) => {
                if let Some(plugged_at) = plug.plug_in_time {
                    plug.total_energy += VOLTAGE * plug.ampere * at.hours_since(plugged_at);
                }
                if plug.plugged {
                    plug.plug_in_time = Some(at);
                }
                self.start_time = None;
            }
            DeviceKind::Lamp(_) | DeviceKind::ColorLamp(_) => {}
        }
    }

    /// Apply a target status without touching the pending reference —
    /// the firing path, which manages the reference itself.
    pub fn apply_status(&mut self, at: Timestamp, status: Status) {
        match status {
            Status::On => self.power_on(at),
            Status::Off => self.power_off(at),
        }
    }

    /// User-issued status switch: forgets the pending switch reference,
    /// then toggles. The queue entry, if any, is left to its fate.
    pub fn switch_status(&mut self, at: Timestamp, status: Status) {
        self.pending_workload = None;
        self.apply_status(at, status);
    }

    /// Occupy the plug socket. The caller has already verified this
    /// device is an unoccupied plug.
    pub fn plug_in(&mut self, ampere: f64, at: Timestamp) {
        if let DeviceKind::Plug(plug) = &mut self.kind {
            plug.plug_in_time = Some(at);
            plug.plugged = true;
            plug.ampere = ampere;
        }
    }

    /// Free the plug socket, finalizing energy if the plug is powered.
    pub fn plug_out(&mut self, at: Timestamp) {
        if let DeviceKind::Plug(plug) = &mut self.kind {
            if self.status == Status::On {
                if let Some(plugged_at) = plug.plug_in_time {
                    plug.total_energy += VOLTAGE * plug.ampere * at.hours_since(plugged_at);
                }
            }
            plug.plugged = false;
            plug.ampere = 0.0;
            plug.plug_in_time = None;
        }
    }

    /// The device's report line.
    ///
    /// `switch_time` is the firing time of the pending workload resolved
    /// by the caller; `now` lets a powered, occupied plug include the
    /// draw interval still in progress.
    pub fn report_line(&self, now: Timestamp, switch_time: Option<Timestamp>) -> String {
        let switch_text = match switch_time {
            Some(t) => t.canonical(),
            None => "null".to_string(),
        };
        match &self.kind {
            DeviceKind::Lamp(lamp) => format!(
                "Smart Lamp {} is {} and its kelvin value is {}K with {}% brightness, \
                 and its time to switch its status is {}.",
                self.name,
                self.status.label(),
                lamp.kelvin,
                lamp.brightness,
                switch_text
            ),
            DeviceKind::ColorLamp(lamp) => {
                let color_text = match &lamp.color {
                    ColorMode::Kelvin(kelvin) => format!("{}K", kelvin),
                    ColorMode::Code(code) => code.clone(),
                };
                format!(
                    "Smart Color Lamp {} is {} and its color value is {} with {}% brightness, \
                     and its time to switch its status is {}.",
                    self.name,
                    self.status.label(),
                    color_text,
                    lamp.brightness,
                    switch_text
                )
            }
            DeviceKind::Plug(plug) => {
                let mut energy = plug.total_energy;
                if self.status == Status::On && plug.plugged {
                    if let Some(plugged_at) = plug.plug_in_time {
                        energy += VOLTAGE * plug.ampere * now.hours_since(plugged_at);
                    }
                }
                format!(
                    "Smart Plug {} is {} and consumed {:.2}W so far (excluding current device), \
                     and its time to switch its status is {}.",
                    self.name,
                    self.status.label(),
                    energy,
                    switch_text
                )
            }
            DeviceKind::Camera(camera) => format!(
                "Smart Camera {} is {} and used {:.2} MB of storage so far \
                 (excluding current status), and its time to switch its status is {}.",
                self.name,
                self.status.label(),
                camera.used_storage,
                switch_text
            ),
        }
    }
}

// ── Constructors for each kind's default state ───────────────────────

impl LampState {
    pub const DEFAULT_KELVIN: u32 = 4000;
    pub const DEFAULT_BRIGHTNESS: u32 = 100;

    pub fn new(kelvin: u32, brightness: u32) -> Self {
        LampState { kelvin, brightness }
    }
}

impl ColorLampState {
    pub fn new(color: ColorMode, brightness: u32) -> Self {
        ColorLampState { color, brightness }
    }
}

impl PlugState {
    pub fn new() -> Self {
        PlugState {
            ampere: 0.0,
            plugged: false,
            total_energy: 0.0,
            plug_in_time: None,
        }
    }
}

impl Default for PlugState {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraState {
    pub fn new(megabytes_per_minute: f64) -> Self {
        CameraState {
            megabytes_per_minute,
            used_storage: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    fn lamp(name: &str) -> Device {
        Device::new(
            DeviceId::new(0),
            name.into(),
            DeviceKind::Lamp(LampState::new(
                LampState::DEFAULT_KELVIN,
                LampState::DEFAULT_BRIGHTNESS,
            )),
        )
    }

    #[test]
    fn test_id_gen_monotonic() {
        let mut id_gen = DeviceIdGen::new();
        assert_eq!(id_gen.next_id().raw(), 0);
        assert_eq!(id_gen.next_id().raw(), 1);
        assert_eq!(id_gen.next_id().raw(), 2);
    }

    #[test]
    fn test_status_tokens() {
        assert_eq!(Status::from_token("On"), Some(Status::On));
        assert_eq!(Status::from_token("Off"), Some(Status::Off));
        assert_eq!(Status::from_token("on"), None);
        assert_eq!(Status::from_token("OFF"), None);
        assert_eq!(Status::On.toggled(), Status::Off);
    }

    #[test]
    fn test_power_toggle_stamps_marks() {
        let mut device = lamp("Bedroom");
        device.power_on(ts("2022-3-10_10:0:0"));
        assert_eq!(device.status, Status::On);
        assert_eq!(device.start_time, Some(ts("2022-3-10_10:0:0")));
        device.power_off(ts("2022-3-10_11:0:0"));
        assert_eq!(device.status, Status::Off);
        assert_eq!(device.stop_time, Some(ts("2022-3-10_11:0:0")));
    }

    #[test]
    fn test_camera_accumulates_on_power_off() {
        let mut device = Device::new(
            DeviceId::new(1),
            "Porch".into(),
            DeviceKind::Camera(CameraState::new(1.5)),
        );
        device.power_on(ts("2022-3-10_10:0:0"));
        device.power_off(ts("2022-3-10_10:40:0"));
        match &device.kind {
            DeviceKind::Camera(camera) => assert_eq!(camera.used_storage, 60.0),
            _ => unreachable!(),
        }
        // Marks are consumed by the accumulation.
        assert_eq!(device.start_time, None);
        assert_eq!(device.stop_time, None);
    }

    #[test]
    fn test_plug_round_trip_energy() {
        let mut device = Device::new(
            DeviceId::new(2),
            "Socket".into(),
            DeviceKind::Plug(PlugState::new()),
        );
        device.plug_in(2.0, ts("2022-3-10_10:0:0"));
        device.power_on(ts("2022-3-10_10:0:0"));
        device.power_off(ts("2022-3-10_11:0:0"));
        match &device.kind {
            // 220 V × 2 A × 1 h
            DeviceKind::Plug(plug) => assert_eq!(plug.total_energy, 440.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_plug_mark_survives_off_on_while_plugged() {
        let mut device = Device::new(
            DeviceId::new(3),
            "Socket".into(),
            DeviceKind::Plug(PlugState::new()),
        );
        device.plug_in(1.0, ts("2022-3-10_10:0:0"));
        device.power_on(ts("2022-3-10_10:0:0"));
        device.power_off(ts("2022-3-10_10:30:0"));
        // Off for an hour: no draw.
        device.power_on(ts("2022-3-10_11:30:0"));
        device.power_off(ts("2022-3-10_12:0:0"));
        match &device.kind {
            // Two powered half-hours: 220 × 1 × 1.0
            DeviceKind::Plug(plug) => assert_eq!(plug.total_energy, 220.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_plug_out_while_powered_finalizes() {
        let mut device = Device::new(
            DeviceId::new(4),
            "Socket".into(),
            DeviceKind::Plug(PlugState::new()),
        );
        device.plug_in(3.0, ts("2022-3-10_10:0:0"));
        device.power_on(ts("2022-3-10_10:0:0"));
        device.plug_out(ts("2022-3-10_10:20:0"));
        match &device.kind {
            DeviceKind::Plug(plug) => {
                assert!((plug.total_energy - 220.0).abs() < 1e-9);
                assert!(!plug.plugged);
                assert_eq!(plug.ampere, 0.0);
                assert_eq!(plug.plug_in_time, None);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_plug_report_includes_running_interval() {
        let mut device = Device::new(
            DeviceId::new(5),
            "Socket".into(),
            DeviceKind::Plug(PlugState::new()),
        );
        device.power_on(ts("2022-3-10_10:0:0"));
        device.plug_in(2.0, ts("2022-3-10_10:0:0"));
        let line = device.report_line(ts("2022-3-10_11:0:0"), None);
        assert_eq!(
            line,
            "Smart Plug Socket is on and consumed 440.00W so far (excluding current device), \
             and its time to switch its status is null."
        );
    }

    #[test]
    fn test_lamp_report_line() {
        let mut device = lamp("Bedroom");
        device.power_on(ts("2022-3-10_10:0:0"));
        let line = device.report_line(ts("2022-3-10_10:0:0"), None);
        assert_eq!(
            line,
            "Smart Lamp Bedroom is on and its kelvin value is 4000K with 100% brightness, \
             and its time to switch its status is null."
        );
    }

    #[test]
    fn test_color_lamp_report_switches_between_modes() {
        let mut device = Device::new(
            DeviceId::new(6),
            "Hall".into(),
            DeviceKind::ColorLamp(ColorLampState::new(ColorMode::Kelvin(3500), 80)),
        );
        let now = ts("2022-3-10_10:0:0");
        assert_eq!(
            device.report_line(now, None),
            "Smart Color Lamp Hall is off and its color value is 3500K with 80% brightness, \
             and its time to switch its status is null."
        );
        if let DeviceKind::ColorLamp(lamp) = &mut device.kind {
            lamp.color = ColorMode::Code("0x00FF00".into());
        }
        assert_eq!(
            device.report_line(now, None),
            "Smart Color Lamp Hall is off and its color value is 0x00FF00 with 80% brightness, \
             and its time to switch its status is null."
        );
    }

    #[test]
    fn test_camera_report_excludes_running_interval() {
        let mut device = Device::new(
            DeviceId::new(7),
            "Porch".into(),
            DeviceKind::Camera(CameraState::new(2.0)),
        );
        device.power_on(ts("2022-3-10_10:0:0"));
        let line = device.report_line(ts("2022-3-10_11:0:0"), None);
        assert_eq!(
            line,
            "Smart Camera Porch is on and used 0.00 MB of storage so far \
             (excluding current status), and its time to switch its status is null."
        );
    }

    #[test]
    fn test_report_line_switch_clause() {
        let device = lamp("Bedroom");
        let line = device.report_line(
            ts("2022-3-10_10:0:0"),
            Some(ts("2022-3-10_12:30:0")),
        );
        assert!(line.ends_with("its time to switch its status is 2022-03-10_12:30:00."));
    }

    #[test]
    fn test_switch_status_forgets_pending_reference() {
        let mut device = lamp("Bedroom");
        device.pending_workload = Some(WorkloadId::new(7));
        device.switch_status(ts("2022-3-10_10:0:0"), Status::On);
        assert_eq!(device.pending_workload, None);
        assert_eq!(device.status, Status::On);
    }
}
