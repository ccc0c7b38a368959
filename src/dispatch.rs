//! Command dispatch: keyword table, per-command handlers, run loop.
//!
//! Each keyword maps to a typed handler through a static table — no
//! reflection, no dynamic lookup. A handler validates its arguments,
//! mutates the session, and returns an optional success message; every
//! failure is a [`HestiaError`] carrying its exact surface text.
//!
//! Success and error bodies are returned newline-terminated, ready to be
//! appended verbatim after the `COMMAND:` echo.

use tracing::debug;

use crate::command::Command;
use crate::device::{ColorMode, DeviceId, DeviceKind, LampState, Status};
use crate::device::{CameraState, ColorLampState, PlugState};
use crate::error::{HestiaError, HestiaResult};
use crate::session::Session;
use crate::time::Timestamp;

type Handler = fn(&mut Session, &[String]) -> HestiaResult<Option<String>>;

/// One entry of the static command table.
struct Operation {
    keyword: &'static str,
    min_args: usize,
    /// `None` means unbounded (the handler checks the tail itself).
    max_args: Option<usize>,
    handler: Handler,
}

/// The complete keyword → operation table.
const OPERATIONS: &[Operation] = &[
    Operation { keyword: "SetInitialTime", min_args: 1, max_args: Some(1), handler: set_initial_time },
    Operation { keyword: "SetTime", min_args: 1, max_args: Some(1), handler: set_time },
    Operation { keyword: "SkipMinutes", min_args: 1, max_args: Some(1), handler: skip_minutes },
    Operation { keyword: "Nop", min_args: 0, max_args: Some(0), handler: nop },
    Operation { keyword: "Add", min_args: 0, max_args: None, handler: add },
    Operation { keyword: "Remove", min_args: 1, max_args: Some(1), handler: remove },
    Operation { keyword: "Switch", min_args: 2, max_args: Some(2), handler: switch },
    Operation { keyword: "SetSwitchTime", min_args: 2, max_args: Some(2), handler: set_switch_time },
    Operation { keyword: "ChangeName", min_args: 2, max_args: Some(2), handler: change_name },
    Operation { keyword: "SetKelvin", min_args: 2, max_args: Some(2), handler: set_kelvin },
    Operation { keyword: "SetBrightness", min_args: 2, max_args: Some(2), handler: set_brightness },
    Operation { keyword: "SetWhite", min_args: 3, max_args: Some(3), handler: set_white },
    Operation { keyword: "SetColorCode", min_args: 2, max_args: Some(2), handler: set_color_code },
    Operation { keyword: "SetColor", min_args: 3, max_args: Some(3), handler: set_color },
    Operation { keyword: "PlugIn", min_args: 2, max_args: Some(2), handler: plug_in },
    Operation { keyword: "PlugOut", min_args: 1, max_args: Some(1), handler: plug_out },
    Operation { keyword: "ZReport", min_args: 0, max_args: Some(0), handler: z_report },
];

fn lookup(keyword: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.keyword == keyword)
}

/// Resolve and execute one command against the session.
///
/// The first-command invariant is enforced here: until the clock is
/// initialized, only `SetInitialTime` with at least one argument may
/// run; anything else is fatal.
pub fn dispatch(session: &mut Session, command: &Command) -> HestiaResult<Option<String>> {
    if !session.clock.is_initialized()
        && (command.keyword != "SetInitialTime" || command.args.is_empty())
    {
        return Err(HestiaError::FirstCommandNotInitialTime);
    }
    let operation = lookup(&command.keyword).ok_or(HestiaError::Erroneous)?;
    let count = command.args.len();
    if count < operation.min_args || operation.max_args.is_some_and(|max| count > max) {
        return Err(HestiaError::Erroneous);
    }
    (operation.handler)(session, &command.args)
}

/// Process a whole command script and return the produced output text.
///
/// Per non-blank line: the `COMMAND:` echo, then the success or error
/// body. A fatal error stops the run immediately. If the last processed
/// command was not `ZReport`, a final automatic report is appended.
pub fn run_script(input: &str) -> String {
    let mut session = Session::new();
    let mut output = String::new();
    let mut last_keyword: Option<String> = None;

    for line in input.lines() {
        let command = match Command::parse(line) {
            Some(command) => command,
            None => continue,
        };
        output.push_str("COMMAND: ");
        output.push_str(&command.raw);
        output.push('\n');
        last_keyword = Some(command.keyword.clone());

        match dispatch(&mut session, &command) {
            Ok(Some(body)) => output.push_str(&body),
            Ok(None) => {}
            Err(error) => {
                debug!(keyword = %command.keyword, error = %error, "command failed");
                output.push_str(&error.to_string());
                output.push('\n');
                if error.is_fatal() {
                    return output;
                }
            }
        }
    }

    // The clock can only be uninitialized here through an over-arity
    // SetInitialTime; with no time there is no report to give.
    if session.clock.is_initialized() && last_keyword.as_deref().is_some_and(|k| k != "ZReport") {
        output.push_str("ZReport:\n");
        output.push_str(&session.report());
    }
    output
}

// ── Token validation ──────────────────────────────────────────────────

/// Integer token: optional sign, then digits only.
fn int_token(token: &str) -> HestiaResult<i64> {
    let digits = token
        .strip_prefix(|c| c == '+' || c == '-')
        .unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HestiaError::Erroneous);
    }
    token.parse().map_err(|_| HestiaError::Erroneous)
}

/// Decimal token: optional sign, digits with at most one dot, ending in
/// a digit.
fn float_token(token: &str) -> HestiaResult<f64> {
    let body = token
        .strip_prefix(|c| c == '+' || c == '-')
        .unwrap_or(token);
    let mut parts = body.splitn(2, '.');
    let int_part = parts.next().unwrap_or_default();
    let shape_ok = match parts.next() {
        None => !int_part.is_empty() && int_part.bytes().all(|b| b.is_ascii_digit()),
        Some(frac) => {
            int_part.bytes().all(|b| b.is_ascii_digit())
                && !frac.is_empty()
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
    };
    if !shape_ok {
        return Err(HestiaError::Erroneous);
    }
    token.parse().map_err(|_| HestiaError::Erroneous)
}

fn status_token(token: &str) -> HestiaResult<Status> {
    Status::from_token(token).ok_or(HestiaError::Erroneous)
}

fn kelvin_token(token: &str) -> HestiaResult<u32> {
    let kelvin = int_token(token)?;
    if !(2000..=6500).contains(&kelvin) {
        return Err(HestiaError::KelvinOutOfRange);
    }
    Ok(kelvin as u32)
}

fn brightness_token(token: &str) -> HestiaResult<u32> {
    let brightness = int_token(token)?;
    if !(0..=100).contains(&brightness) {
        return Err(HestiaError::BrightnessOutOfRange);
    }
    Ok(brightness as u32)
}

fn ampere_token(token: &str) -> HestiaResult<f64> {
    let ampere = float_token(token)?;
    if ampere <= 0.0 {
        return Err(HestiaError::NonPositiveAmpere);
    }
    Ok(ampere)
}

fn megabyte_token(token: &str) -> HestiaResult<f64> {
    let megabytes = float_token(token)?;
    if megabytes <= 0.0 {
        return Err(HestiaError::NonPositiveMegabyte);
    }
    Ok(megabytes)
}

/// Hex color: `0x` + uppercase hex digits; exactly six of them to be in
/// range.
fn color_code_token(token: &str) -> HestiaResult<String> {
    let digits = token.strip_prefix("0x").ok_or(HestiaError::Erroneous)?;
    if digits.is_empty()
        || !digits
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'))
    {
        return Err(HestiaError::Erroneous);
    }
    if digits.len() != 6 {
        return Err(HestiaError::ColorCodeOutOfRange);
    }
    Ok(token.to_string())
}

// ── Shared handler plumbing ───────────────────────────────────────────

fn now(session: &Session) -> HestiaResult<Timestamp> {
    session.clock.now().ok_or(HestiaError::Erroneous)
}

fn device_by_name(session: &Session, name: &str) -> HestiaResult<DeviceId> {
    session
        .registry
        .id_by_name(name)
        .ok_or(HestiaError::NoSuchDevice)
}

// ── Clock commands ────────────────────────────────────────────────────

fn set_initial_time(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    if session.clock.is_initialized() {
        return Err(HestiaError::Erroneous);
    }
    let at = Timestamp::parse(&args[0]).ok_or(HestiaError::MalformedInitialTime)?;
    session.clock.init(at)?;
    Ok(Some(format!(
        "SUCCESS: Time has been set to {}!\n",
        at.canonical()
    )))
}

fn set_time(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let at = Timestamp::parse(&args[0]).ok_or(HestiaError::BadTimeFormat)?;
    session.clock.set(at)?;
    session.run_due_workloads();
    Ok(None)
}

fn skip_minutes(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let minutes = int_token(&args[0])?;
    session.clock.skip(minutes)?;
    session.run_due_workloads();
    Ok(None)
}

/// Jump the clock to the most imminent pending switch.
fn nop(session: &mut Session, _args: &[String]) -> HestiaResult<Option<String>> {
    let at = session.queue.earliest().ok_or(HestiaError::NothingToSwitch)?;
    session.clock.jump_to(at);
    session.run_due_workloads();
    Ok(None)
}

// ── Device lifecycle ──────────────────────────────────────────────────

fn add(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let kind = args.first().ok_or(HestiaError::MissingArgument)?;
    let rest = &args[1..];
    match kind.as_str() {
        "SmartLamp" => add_lamp(session, rest),
        "SmartColorLamp" => add_color_lamp(session, rest),
        "SmartPlug" => add_plug(session, rest),
        "SmartCamera" => add_camera(session, rest),
        _ => Err(HestiaError::Erroneous),
    }
}

/// Register a freshly validated device: stamp its start mark when it
/// begins powered, and record its arrival in the ledger.
fn finish_add(session: &mut Session, name: &str, kind: DeviceKind, status: Status) -> HestiaResult<Option<String>> {
    let at = now(session)?;
    let id = session.registry.create(name, kind);
    if status == Status::On {
        if let Some(device) = session.registry.get_mut(id) {
            device.power_on(at);
        }
    }
    session.ledger.add_never_scheduled(id);
    debug!(device = %id, name = %name, "device added");
    Ok(None)
}

fn add_lamp(session: &mut Session, rest: &[String]) -> HestiaResult<Option<String>> {
    if rest.is_empty() || rest.len() > 4 {
        return Err(HestiaError::Erroneous);
    }
    let name = &rest[0];
    let status = match rest.get(1) {
        Some(token) => status_token(token)?,
        None => Status::Off,
    };
    let kelvin = match rest.get(2) {
        Some(token) => kelvin_token(token)?,
        None => LampState::DEFAULT_KELVIN,
    };
    let brightness = match rest.get(3) {
        Some(token) => brightness_token(token)?,
        None => LampState::DEFAULT_BRIGHTNESS,
    };
    if session.registry.contains_name(name) {
        return Err(HestiaError::DuplicateName);
    }
    finish_add(
        session,
        name,
        DeviceKind::Lamp(LampState::new(kelvin, brightness)),
        status,
    )
}

fn add_color_lamp(session: &mut Session, rest: &[String]) -> HestiaResult<Option<String>> {
    if rest.is_empty() || rest.len() > 4 {
        return Err(HestiaError::Erroneous);
    }
    let name = &rest[0];
    let status = match rest.get(1) {
        Some(token) => status_token(token)?,
        None => Status::Off,
    };
    // The third slot is a kelvin value when it reads as an integer,
    // otherwise a color code.
    let color = match rest.get(2) {
        None => ColorMode::Kelvin(LampState::DEFAULT_KELVIN),
        Some(token) if int_token(token).is_ok() => ColorMode::Kelvin(kelvin_token(token)?),
        Some(token) => ColorMode::Code(color_code_token(token)?),
    };
    let brightness = match rest.get(3) {
        Some(token) => brightness_token(token)?,
        None => LampState::DEFAULT_BRIGHTNESS,
    };
    if session.registry.contains_name(name) {
        return Err(HestiaError::DuplicateName);
    }
    finish_add(
        session,
        name,
        DeviceKind::ColorLamp(ColorLampState::new(color, brightness)),
        status,
    )
}

fn add_plug(session: &mut Session, rest: &[String]) -> HestiaResult<Option<String>> {
    if rest.is_empty() || rest.len() > 3 {
        return Err(HestiaError::Erroneous);
    }
    let name = &rest[0];
    let status = match rest.get(1) {
        Some(token) => status_token(token)?,
        None => Status::Off,
    };
    let ampere = match rest.get(2) {
        Some(token) => Some(ampere_token(token)?),
        None => None,
    };
    if session.registry.contains_name(name) {
        return Err(HestiaError::DuplicateName);
    }
    let at = now(session)?;
    let id = session.registry.create(name, DeviceKind::Plug(PlugState::new()));
    if let Some(device) = session.registry.get_mut(id) {
        if status == Status::On {
            device.power_on(at);
        }
        // A positive ampere means an appliance occupies the socket from
        // the start.
        if let Some(ampere) = ampere {
            device.plug_in(ampere, at);
        }
    }
    session.ledger.add_never_scheduled(id);
    debug!(device = %id, name = %name, "device added");
    Ok(None)
}

fn add_camera(session: &mut Session, rest: &[String]) -> HestiaResult<Option<String>> {
    if rest.is_empty() || rest.len() > 3 {
        return Err(HestiaError::Erroneous);
    }
    let name = &rest[0];
    let rate_token = rest.get(1).ok_or(HestiaError::Erroneous)?;
    let megabytes_per_minute = megabyte_token(rate_token)?;
    let status = match rest.get(2) {
        Some(token) => status_token(token)?,
        None => Status::Off,
    };
    if session.registry.contains_name(name) {
        return Err(HestiaError::DuplicateName);
    }
    finish_add(
        session,
        name,
        DeviceKind::Camera(CameraState::new(megabytes_per_minute)),
        status,
    )
}

fn remove(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let name = &args[0];
    if !session.registry.contains_name(name) {
        return Err(HestiaError::Erroneous);
    }
    let at = now(session)?;
    let mut device = session
        .registry
        .remove_by_name(name)
        .ok_or(HestiaError::Erroneous)?;
    session.ledger.remove(device.id());
    if device.status == Status::On {
        device.power_off(at);
    }
    // Render before canceling so the line still shows the pending time.
    let switch_time = device
        .pending_workload
        .and_then(|w| session.queue.firing_time(w));
    let line = device.report_line(at, switch_time);
    if let Some(workload) = device.pending_workload {
        session.queue.cancel(workload);
    }
    debug!(device = %device.id(), name = %name, "device removed");
    Ok(Some(format!(
        "SUCCESS: Information about removed smart device is as follows:\n{}\n",
        line
    )))
}

fn change_name(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let (old, new) = (&args[0], &args[1]);
    if old == new {
        return Err(HestiaError::SameName);
    }
    if !session.registry.contains_name(old) {
        return Err(HestiaError::NoSuchDevice);
    }
    if session.registry.contains_name(new) {
        return Err(HestiaError::DuplicateName);
    }
    session.registry.rename(old, new);
    Ok(None)
}

// ── Status commands ───────────────────────────────────────────────────

fn switch(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    let status = status_token(&args[1])?;
    let at = now(session)?;
    let device = session.registry.get_mut(id).ok_or(HestiaError::NoSuchDevice)?;
    if device.status == status {
        return Err(HestiaError::AlreadySwitched(status));
    }
    device.switch_status(at, status);
    Ok(None)
}

fn set_switch_time(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    let fire_at = Timestamp::parse(&args[1]).ok_or(HestiaError::BadTimeFormat)?;
    let at = now(session)?;
    if fire_at < at {
        return Err(HestiaError::SwitchTimeInPast);
    }
    let target = session
        .registry
        .get(id)
        .ok_or(HestiaError::NoSuchDevice)?
        .status
        .toggled();
    session.schedule_switch(id, fire_at, target);
    // A switch time equal to the clock is legal and fires right away.
    session.run_due_workloads();
    Ok(None)
}

// ── Lamp commands ─────────────────────────────────────────────────────

fn lamp_check(session: &Session, id: DeviceId) -> HestiaResult<()> {
    match session.registry.get(id).map(|d| &d.kind) {
        Some(DeviceKind::Lamp(_)) | Some(DeviceKind::ColorLamp(_)) => Ok(()),
        _ => Err(HestiaError::NotALamp),
    }
}

fn apply_kelvin(session: &mut Session, id: DeviceId, kelvin: u32) {
    if let Some(device) = session.registry.get_mut(id) {
        match &mut device.kind {
            DeviceKind::Lamp(lamp) => lamp.kelvin = kelvin,
            // Setting a white tone clears any color code.
            DeviceKind::ColorLamp(lamp) => lamp.color = ColorMode::Kelvin(kelvin),
            _ => {}
        }
    }
}

fn apply_brightness(session: &mut Session, id: DeviceId, brightness: u32) {
    if let Some(device) = session.registry.get_mut(id) {
        match &mut device.kind {
            DeviceKind::Lamp(lamp) => lamp.brightness = brightness,
            DeviceKind::ColorLamp(lamp) => lamp.brightness = brightness,
            _ => {}
        }
    }
}

fn set_kelvin(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    lamp_check(session, id)?;
    let kelvin = kelvin_token(&args[1])?;
    apply_kelvin(session, id, kelvin);
    Ok(None)
}

fn set_brightness(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    lamp_check(session, id)?;
    let brightness = brightness_token(&args[1])?;
    apply_brightness(session, id, brightness);
    Ok(None)
}

fn set_white(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    lamp_check(session, id)?;
    let kelvin = kelvin_token(&args[1])?;
    let brightness = brightness_token(&args[2])?;
    apply_kelvin(session, id, kelvin);
    apply_brightness(session, id, brightness);
    Ok(None)
}

fn color_lamp_check(session: &Session, id: DeviceId) -> HestiaResult<()> {
    match session.registry.get(id).map(|d| &d.kind) {
        Some(DeviceKind::ColorLamp(_)) => Ok(()),
        _ => Err(HestiaError::NotAColorLamp),
    }
}

fn apply_color_code(session: &mut Session, id: DeviceId, code: String) {
    if let Some(device) = session.registry.get_mut(id) {
        if let DeviceKind::ColorLamp(lamp) = &mut device.kind {
            // Setting a color code clears any white tone.
            lamp.color = ColorMode::Code(code);
        }
    }
}

fn set_color_code(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    color_lamp_check(session, id)?;
    let code = color_code_token(&args[1])?;
    apply_color_code(session, id, code);
    Ok(None)
}

fn set_color(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    color_lamp_check(session, id)?;
    let code = color_code_token(&args[1])?;
    let brightness = brightness_token(&args[2])?;
    apply_color_code(session, id, code);
    apply_brightness(session, id, brightness);
    Ok(None)
}

// ── Plug commands ─────────────────────────────────────────────────────

fn plug_in(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    let at = now(session)?;
    let device = session.registry.get_mut(id).ok_or(HestiaError::NoSuchDevice)?;
    let plug = match &device.kind {
        DeviceKind::Plug(plug) => plug,
        _ => return Err(HestiaError::NotAPlug),
    };
    let occupied = plug.plugged;
    let ampere = ampere_token(&args[1])?;
    if occupied {
        return Err(HestiaError::AlreadyPluggedIn);
    }
    device.plug_in(ampere, at);
    Ok(None)
}

fn plug_out(session: &mut Session, args: &[String]) -> HestiaResult<Option<String>> {
    let id = device_by_name(session, &args[0])?;
    let at = now(session)?;
    let device = session.registry.get_mut(id).ok_or(HestiaError::NoSuchDevice)?;
    let plug = match &device.kind {
        DeviceKind::Plug(plug) => plug,
        _ => return Err(HestiaError::NotAPlug),
    };
    if !plug.plugged {
        return Err(HestiaError::NothingPluggedIn);
    }
    device.plug_out(at);
    Ok(None)
}

// ── Report ────────────────────────────────────────────────────────────

fn z_report(session: &mut Session, _args: &[String]) -> HestiaResult<Option<String>> {
    Ok(Some(session.report()))
}
