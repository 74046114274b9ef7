//! Metric mode selection and the control table derived from it.
//!
//! The plugin reports exactly one of two CPU metrics at a time. Everything
//! that depends on the choice (metric id and label, which iostat field to
//! read, which control the collector may invoke) is derived from the single
//! mapping on [`Mode`] so naming and control liveness cannot drift apart.

use crate::sampler::CpuField;

/// Control id offered to the collector while iowait is active.
pub const SWITCH_TO_IDLE: &str = "switchToIdle";
/// Control id offered to the collector while idle is active.
pub const SWITCH_TO_IOWAIT: &str = "switchToIOWait";

/// The currently reported CPU metric.
///
/// Starts as [`Mode::Idle`] and only changes when the collector invokes the
/// live control. In-memory only; a restart goes back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Iowait,
}

/// One row of the control table: a collector-invocable action and whether it
/// is currently offerable.
#[derive(Debug, Clone, Copy)]
pub struct ControlDetails {
    pub id: &'static str,
    pub human: &'static str,
    pub icon: &'static str,
    pub dead: bool,
}

impl Mode {
    /// Flips to the other mode, unconditionally. Request validation happens
    /// upstream in the control handler.
    pub fn toggle(&mut self) {
        *self = match self {
            Mode::Idle => Mode::Iowait,
            Mode::Iowait => Mode::Idle,
        };
    }

    /// Metric id and human label for the active metric.
    pub fn metric(self) -> (&'static str, &'static str) {
        match self {
            Mode::Iowait => ("iowait", "IO Wait"),
            Mode::Idle => ("idle", "Idle"),
        }
    }

    /// The iostat field the active metric is read from.
    pub fn field(self) -> CpuField {
        match self {
            Mode::Iowait => CpuField::Iowait,
            Mode::Idle => CpuField::Idle,
        }
    }

    /// Both control descriptors with their liveness under this mode.
    ///
    /// The control that would select the current mode is dead, the other is
    /// live. This complement encoding is only valid while exactly two
    /// mutually exclusive modes exist.
    pub fn controls(self) -> [ControlDetails; 2] {
        [
            ControlDetails {
                id: SWITCH_TO_IDLE,
                human: "Switch to idle",
                icon: "fa-gears",
                dead: self != Mode::Iowait,
            },
            ControlDetails {
                id: SWITCH_TO_IOWAIT,
                human: "Switch to IO wait",
                icon: "fa-clock-o",
                dead: self == Mode::Iowait,
            },
        ]
    }

    /// Id of the single control the collector may invoke right now.
    pub fn live_control(self) -> &'static str {
        match self {
            Mode::Iowait => SWITCH_TO_IDLE,
            Mode::Idle => SWITCH_TO_IOWAIT,
        }
    }
}
