//! Data models for positions, machine state and status snapshots
//!
//! This module provides:
//! - Unit management (MM, INCH)
//! - 3-axis positions tagged with their unit
//! - The normalized machine state derived from GRBL state labels
//! - Override percentages, enabled pins and accessory states
//! - The immutable `ControllerStatus` snapshot produced for every report

pub mod status;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine coordinate units (millimeters or inches)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    /// Millimeters (metric)
    MM,
    /// Inches (imperial)
    INCH,
    /// Unknown or uninitialized
    Unknown,
}

impl Units {
    /// Convert a value from one unit to another
    ///
    /// Returns the original value if the units match or either is unknown.
    pub fn convert(value: f64, from: Units, to: Units) -> f64 {
        match (from, to) {
            (Units::MM, Units::INCH) => value / 25.4,
            (Units::INCH, Units::MM) => value * 25.4,
            _ => value,
        }
    }
}

impl Default for Units {
    fn default() -> Self {
        Self::MM
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::MM => write!(f, "mm"),
            Units::INCH => write!(f, "in"),
            Units::Unknown => write!(f, "unknown"),
        }
    }
}

/// A 3-axis coordinate tagged with the unit it was reported in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
    /// Coordinate unit
    pub unit: Units,
}

impl Position {
    /// Create a position from its components
    pub fn new(x: f64, y: f64, z: f64, unit: Units) -> Self {
        debug_assert!(
            x.is_finite() && y.is_finite() && z.is_finite(),
            "Position axes must be finite: x={x}, y={y}, z={z}"
        );
        Self { x, y, z, unit }
    }

    /// The origin in the given unit
    pub fn zero(unit: Units) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            unit,
        }
    }

    /// Convert this position to a different unit
    pub fn convert_to(&self, target_unit: Units) -> Self {
        Self {
            x: Units::convert(self.x, self.unit, target_unit),
            y: Units::convert(self.y, self.unit, target_unit),
            z: Units::convert(self.z, self.unit, target_unit),
            unit: if self.unit == Units::Unknown {
                self.unit
            } else {
                target_unit
            },
        }
    }

    /// Component-wise sum; `other` is converted into this position's unit first
    pub fn add(&self, other: &Position) -> Self {
        let other = other.convert_to(self.unit);
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            unit: self.unit,
        }
    }

    /// Component-wise difference; `other` is converted into this position's unit first
    pub fn sub(&self, other: &Position) -> Self {
        let other = other.convert_to(self.unit);
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
            unit: self.unit,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::zero(Units::MM)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X:{:.3} Y:{:.3} Z:{:.3} ({})",
            self.x, self.y, self.z, self.unit
        )
    }
}

/// Normalized machine state
///
/// Derived from the raw GRBL state label of a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineState {
    /// Connected and idle, ready for commands
    Idle,
    /// Executing a G-code program
    Run,
    /// Feed hold, awaiting resume
    Hold,
    /// Manual jog in progress
    Jog,
    /// Alarm state (requires manual intervention)
    Alarm,
    /// Check mode (dry-run without machine movement)
    Check,
    /// Safety door interlock triggered
    Door,
    /// Homing cycle in progress
    Home,
    /// Low-power sleep state
    Sleep,
    /// Label missing or not recognized
    Unknown,
}

impl MachineState {
    /// Map a raw GRBL state label onto a normalized state.
    ///
    /// Matching is case-insensitive. GRBL 1.1 appends a sub-state code
    /// (`Hold:0`, `Door:1`); only the part before the colon is matched.
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Unknown;
        };
        let primary = label.split(':').next().unwrap_or_default().trim();
        match primary.to_ascii_lowercase().as_str() {
            "jog" => Self::Jog,
            "run" => Self::Run,
            "hold" => Self::Hold,
            "door" => Self::Door,
            "home" => Self::Home,
            "idle" => Self::Idle,
            "alarm" => Self::Alarm,
            "check" => Self::Check,
            "sleep" => Self::Sleep,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Run => write!(f, "Run"),
            Self::Hold => write!(f, "Hold"),
            Self::Jog => write!(f, "Jog"),
            Self::Alarm => write!(f, "Alarm"),
            Self::Check => write!(f, "Check"),
            Self::Door => write!(f, "Door"),
            Self::Home => write!(f, "Home"),
            Self::Sleep => write!(f, "Sleep"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Override percentages (Feed, Rapid, Spindle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridePercents {
    /// Feed override percentage
    pub feed: u16,
    /// Rapid override percentage
    pub rapid: u16,
    /// Spindle override percentage
    pub spindle: u16,
}

impl OverridePercents {
    /// Parse override state from string (format: "feed,rapid,spindle")
    pub fn parse(ov_str: &str) -> Option<Self> {
        let mut parts = ov_str.split(',').map(|p| p.trim().parse::<u16>());
        let feed = parts.next()?.ok()?;
        let rapid = parts.next()?.ok()?;
        let spindle = parts.next()?.ok()?;

        Some(Self {
            feed,
            rapid,
            spindle,
        })
    }
}

impl Default for OverridePercents {
    fn default() -> Self {
        Self {
            feed: 100,
            rapid: 100,
            spindle: 100,
        }
    }
}

/// Input pins reported active in a `Pn:` field
///
/// Built from the pin descriptor letters; an empty descriptor means every
/// pin is inactive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledPins {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub probe: bool,
    pub door: bool,
    pub hold: bool,
    pub soft_reset: bool,
    pub cycle_start: bool,
}

impl EnabledPins {
    /// Build from a GRBL pin descriptor such as `"XZP"`
    pub fn from_descriptor(descriptor: &str) -> Self {
        let has = |c: char| descriptor.contains(c);
        Self {
            x: has('X'),
            y: has('Y'),
            z: has('Z'),
            probe: has('P'),
            door: has('D'),
            hold: has('H'),
            soft_reset: has('R'),
            cycle_start: has('S'),
        }
    }

    /// True when no pin is active
    pub fn none_active(&self) -> bool {
        *self == Self::default()
    }
}

/// Accessory outputs reported in an `A:` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryStates {
    pub spindle_cw: bool,
    pub spindle_ccw: bool,
    pub flood: bool,
    pub mist: bool,
}

impl AccessoryStates {
    /// Build from a GRBL accessory descriptor such as `"SF"`
    pub fn from_descriptor(descriptor: &str) -> Self {
        let has = |c: char| descriptor.contains(c);
        Self {
            spindle_cw: has('S'),
            spindle_ccw: has('C'),
            flood: has('F'),
            mist: has('M'),
        }
    }
}

/// Complete machine status snapshot
///
/// Built once per device status report by
/// [`StatusBuilder`](status::StatusBuilder) and never mutated afterwards.
/// Once both coordinates are known they satisfy
/// `machine_coord = work_coord + work_coordinate_offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    /// Raw state label as reported by the device
    pub state_string: Option<String>,
    /// Normalized machine state
    pub state: MachineState,
    /// Position in machine coordinates
    pub machine_coord: Option<Position>,
    /// Position in work coordinates
    pub work_coord: Option<Position>,
    /// Offset between machine and work coordinates
    pub work_coordinate_offset: Position,
    /// Current feed rate
    pub feed_speed: f64,
    /// Unit of `feed_speed` (per minute)
    pub feed_speed_units: Units,
    /// Current spindle speed (RPM)
    pub spindle_speed: f64,
    /// Override percentages, if the device has reported any
    pub overrides: Option<OverridePercents>,
    /// Active input pins
    pub enabled_pins: Option<EnabledPins>,
    /// Active accessory outputs
    pub accessory_states: Option<AccessoryStates>,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        if let Some(mpos) = &self.machine_coord {
            write!(f, " MPos[{}]", mpos)?;
        }
        if let Some(wpos) = &self.work_coord {
            write!(f, " WPos[{}]", wpos)?;
        }
        write!(
            f,
            " F:{} {}/min S:{}",
            self.feed_speed, self.feed_speed_units, self.spindle_speed
        )
    }
}
