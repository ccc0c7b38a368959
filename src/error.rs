//! Structured error types for Hestia.
//!
//! All fallible command paths return `Result<T, HestiaError>`. The enum
//! carries the exact user-facing message for every failure the command
//! stream can produce, so formatting a response is just `Display`. Two
//! variants are fatal: they terminate the run instead of being recovered
//! at single-command granularity.

use thiserror::Error;

use crate::device::Status;

/// Classification of a command failure.
///
/// `InvalidCommand` and `MissingArgument` share the same surface message
/// but are distinct kinds; `InitialTimeFatal` halts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown keyword or wrong argument count.
    InvalidCommand,
    /// A value failed a domain constraint.
    IllegalArgument,
    /// A required positional slot is absent.
    MissingArgument,
    /// The run never got a valid clock initialization.
    InitialTimeFatal,
}

/// The top-level error type for the command engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum HestiaError {
    // ── Command shape ─────────────────────────────────────

    /// Unknown keyword, wrong argument count, or an unparsable token.
    #[error("ERROR: Erroneous command!")]
    Erroneous,

    /// A required positional argument is missing. Same surface text as
    /// [`HestiaError::Erroneous`], different [`ErrorKind`].
    #[error("ERROR: Erroneous command!")]
    MissingArgument,

    // ── Clock ─────────────────────────────────────────────

    /// The first processed command was not a valid clock initialization.
    #[error("ERROR: First command must be set initial time! Program is going to terminate!")]
    FirstCommandNotInitialTime,

    /// The initializing command carried a malformed time.
    #[error("ERROR: Format of the initial date is wrong! Program is going to terminate!")]
    MalformedInitialTime,

    /// A non-initializing time argument failed to parse.
    #[error("ERROR: Time format is not correct!")]
    BadTimeFormat,

    /// Setting the clock to its current value.
    #[error("ERROR: There is nothing to change!")]
    NothingToChange,

    /// Moving the clock backward.
    #[error("ERROR: Time cannot be reversed!")]
    TimeReversed,

    /// Skipping zero minutes.
    #[error("ERROR: There is nothing to skip!")]
    NothingToSkip,

    /// Jump-to-next-event with an empty workload queue.
    #[error("ERROR: There is nothing to switch!")]
    NothingToSwitch,

    // ── Registry ──────────────────────────────────────────

    #[error("ERROR: There is not such a device!")]
    NoSuchDevice,

    #[error("ERROR: There is already a smart device with same name!")]
    DuplicateName,

    #[error("ERROR: Both of the names are the same, nothing changed!")]
    SameName,

    // ── Device state ──────────────────────────────────────

    /// Switching a device to the status it already has.
    #[error("ERROR: This device is already switched {}!", .0.label())]
    AlreadySwitched(Status),

    #[error("ERROR: Switch time cannot be in the past!")]
    SwitchTimeInPast,

    // ── Kind mismatches ───────────────────────────────────

    #[error("ERROR: This device is not a smart plug!")]
    NotAPlug,

    #[error("ERROR: This device is not a smart lamp!")]
    NotALamp,

    #[error("ERROR: This device is not a smart color lamp!")]
    NotAColorLamp,

    // ── Value ranges ──────────────────────────────────────

    #[error("ERROR: Kelvin value must be in range of 2000K-6500K!")]
    KelvinOutOfRange,

    #[error("ERROR: Brightness must be in range of 0%-100%!")]
    BrightnessOutOfRange,

    #[error("ERROR: Color code value must be in range of 0x0-0xFFFFFF!")]
    ColorCodeOutOfRange,

    #[error("ERROR: Ampere value must be a positive number!")]
    NonPositiveAmpere,

    #[error("ERROR: Megabyte value must be a positive number!")]
    NonPositiveMegabyte,

    // ── Plug occupancy ────────────────────────────────────

    #[error("ERROR: There is already an item plugged in to that plug!")]
    AlreadyPluggedIn,

    #[error("ERROR: This plug has no item to plug out from that plug!")]
    NothingPluggedIn,
}

impl HestiaError {
    /// Classify this error per the recovery taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HestiaError::Erroneous => ErrorKind::InvalidCommand,
            HestiaError::MissingArgument => ErrorKind::MissingArgument,
            HestiaError::FirstCommandNotInitialTime | HestiaError::MalformedInitialTime => {
                ErrorKind::InitialTimeFatal
            }
            _ => ErrorKind::IllegalArgument,
        }
    }

    /// Fatal errors terminate the run; everything else is recovered at
    /// single-command granularity.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::InitialTimeFatal
    }
}

/// Convenience alias for `Result<T, HestiaError>`.
pub type HestiaResult<T> = Result<T, HestiaError>;
