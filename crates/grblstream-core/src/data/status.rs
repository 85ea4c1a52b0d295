//! Status reconciliation
//!
//! A device status report rarely carries every field. GRBL 1.1 sends the
//! work coordinate offset only every few reports, override percentages only
//! when they change, and older firmware sends just a state and a position.
//! [`StatusBuilder`] turns such a sparse [`StatusPatch`] into a complete
//! [`ControllerStatus`] by consulting the previous snapshot.
//!
//! Resolution happens in two steps. [`StatusBuilder::resolve`] produces a
//! [`ResolvedStatus`] whose fields remember where each value came from
//! ([`Field`]), which keeps the carry-forward rules auditable.
//! [`ResolvedStatus::into_status`] then collapses the tags into the plain
//! immutable snapshot handed to listeners.

use super::{
    AccessoryStates, ControllerStatus, EnabledPins, MachineState, OverridePercents, Position,
    Units,
};

/// A snapshot field together with its provenance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<T> {
    /// Present in the current report
    Reported(T),
    /// Copied from the previous snapshot
    CarriedForward(T),
    /// Neither reported nor carried; a fixed fallback
    Default(T),
    /// Computed from other fields of the current resolution
    Derived(T),
}

impl<T> Field<T> {
    /// The wrapped value, whatever its origin
    pub fn value(&self) -> &T {
        match self {
            Field::Reported(v) | Field::CarriedForward(v) | Field::Default(v) | Field::Derived(v) => {
                v
            }
        }
    }

    /// Unwrap into the plain value
    pub fn into_value(self) -> T {
        match self {
            Field::Reported(v) | Field::CarriedForward(v) | Field::Default(v) | Field::Derived(v) => {
                v
            }
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Field::Reported(_))
    }

    pub fn is_carried_forward(&self) -> bool {
        matches!(self, Field::CarriedForward(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Field::Default(_))
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Field::Derived(_))
    }
}

/// How a report carried its feed rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedSpeed {
    /// Feed rate mentioned in passing (`F:` field, legacy reports). Subject
    /// to carry-forward when a previous snapshot exists.
    Incidental(f64),
    /// Feed rate telemetry (`FS:` field). Always taken as reported.
    Telemetry(f64),
}

impl FeedSpeed {
    pub fn value(&self) -> f64 {
        match self {
            FeedSpeed::Incidental(v) | FeedSpeed::Telemetry(v) => *v,
        }
    }
}

/// A sparse update parsed from one device report
///
/// Every field is optional. Absent fields are filled in by
/// [`StatusBuilder`] from the previous snapshot or a default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusPatch {
    pub state_string: Option<String>,
    pub state: Option<MachineState>,
    pub machine_coord: Option<Position>,
    pub work_coord: Option<Position>,
    pub work_coordinate_offset: Option<Position>,
    pub feed_speed: Option<FeedSpeed>,
    pub feed_speed_units: Option<Units>,
    pub spindle_speed: Option<f64>,
    pub overrides: Option<OverridePercents>,
    pub enabled_pins: Option<EnabledPins>,
    pub accessory_states: Option<AccessoryStates>,
    /// Unit the device reports positions in; used for the zero offset default
    pub reporting_units: Option<Units>,
}

impl StatusPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_string(mut self, label: impl Into<String>) -> Self {
        self.state_string = Some(label.into());
        self
    }

    /// Set the normalized state explicitly, bypassing label mapping
    pub fn with_state(mut self, state: MachineState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_machine_coord(mut self, pos: Position) -> Self {
        self.machine_coord = Some(pos);
        self
    }

    pub fn with_work_coord(mut self, pos: Position) -> Self {
        self.work_coord = Some(pos);
        self
    }

    pub fn with_work_coordinate_offset(mut self, pos: Position) -> Self {
        self.work_coordinate_offset = Some(pos);
        self
    }

    pub fn with_feed_speed(mut self, feed: f64) -> Self {
        self.feed_speed = Some(FeedSpeed::Incidental(feed));
        self
    }

    /// Feed rate from a telemetry field; never replaced by carry-forward
    pub fn with_telemetry_feed_speed(mut self, feed: f64) -> Self {
        self.feed_speed = Some(FeedSpeed::Telemetry(feed));
        self
    }

    pub fn with_feed_speed_units(mut self, units: Units) -> Self {
        self.feed_speed_units = Some(units);
        self
    }

    pub fn with_spindle_speed(mut self, speed: f64) -> Self {
        self.spindle_speed = Some(speed);
        self
    }

    pub fn with_overrides(mut self, overrides: OverridePercents) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn with_enabled_pins(mut self, pins: EnabledPins) -> Self {
        self.enabled_pins = Some(pins);
        self
    }

    pub fn with_accessory_states(mut self, states: AccessoryStates) -> Self {
        self.accessory_states = Some(states);
        self
    }

    pub fn with_reporting_units(mut self, units: Units) -> Self {
        self.reporting_units = Some(units);
        self
    }
}

/// A fully resolved status whose fields remember their provenance
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStatus {
    pub state_string: Option<String>,
    pub state: Field<MachineState>,
    pub machine_coord: Option<Field<Position>>,
    pub work_coord: Option<Field<Position>>,
    pub work_coordinate_offset: Field<Position>,
    pub feed_speed: Field<f64>,
    pub feed_speed_units: Units,
    pub spindle_speed: Field<f64>,
    pub overrides: Option<Field<OverridePercents>>,
    pub enabled_pins: Option<Field<EnabledPins>>,
    pub accessory_states: Option<Field<AccessoryStates>>,
}

impl ResolvedStatus {
    /// Collapse the provenance tags into an immutable snapshot
    pub fn into_status(self) -> ControllerStatus {
        ControllerStatus {
            state_string: self.state_string,
            state: self.state.into_value(),
            machine_coord: self.machine_coord.map(Field::into_value),
            work_coord: self.work_coord.map(Field::into_value),
            work_coordinate_offset: self.work_coordinate_offset.into_value(),
            feed_speed: self.feed_speed.into_value(),
            feed_speed_units: self.feed_speed_units,
            spindle_speed: self.spindle_speed.into_value(),
            overrides: self.overrides.map(Field::into_value),
            enabled_pins: self.enabled_pins.map(Field::into_value),
            accessory_states: self.accessory_states.map(Field::into_value),
        }
    }
}

/// Stateless transform from (previous snapshot, patch) to a new snapshot
pub struct StatusBuilder;

impl StatusBuilder {
    /// Build a new snapshot from a report and the snapshot before it
    pub fn build(previous: Option<&ControllerStatus>, patch: StatusPatch) -> ControllerStatus {
        Self::resolve(previous, patch).into_status()
    }

    /// Resolve every field of a patch, keeping provenance
    pub fn resolve(previous: Option<&ControllerStatus>, patch: StatusPatch) -> ResolvedStatus {
        let StatusPatch {
            state_string,
            state,
            machine_coord,
            work_coord,
            work_coordinate_offset,
            feed_speed,
            feed_speed_units,
            spindle_speed,
            overrides,
            enabled_pins,
            accessory_states,
            reporting_units,
        } = patch;

        // Offset
        let wco = match (work_coordinate_offset, previous) {
            (Some(wco), _) => Field::Reported(wco),
            (None, Some(prev)) => Field::CarriedForward(prev.work_coordinate_offset),
            (None, None) => Field::Default(Position::zero(reporting_units.unwrap_or_default())),
        };

        // Coordinates
        let (machine_coord, work_coord) = match (machine_coord, work_coord) {
            (Some(m), None) => (
                Some(Field::Reported(m)),
                Some(Field::Derived(m.sub(wco.value()))),
            ),
            (None, Some(w)) => (
                Some(Field::Derived(w.add(wco.value()))),
                Some(Field::Reported(w)),
            ),
            (m, w) => (m.map(Field::Reported), w.map(Field::Reported)),
        };

        // Feed and spindle
        let (feed_speed, spindle_speed) = match (feed_speed, previous) {
            (Some(FeedSpeed::Telemetry(feed)), _) => (
                Field::Reported(feed),
                match (spindle_speed, previous) {
                    (Some(s), _) => Field::Reported(s),
                    (None, Some(prev)) => Field::CarriedForward(prev.spindle_speed),
                    (None, None) => Field::Default(0.0),
                },
            ),
            (_, Some(prev)) => (
                Field::CarriedForward(prev.feed_speed),
                Field::CarriedForward(prev.spindle_speed),
            ),
            (feed, None) => (
                feed.map_or(Field::Default(0.0), |f| Field::Reported(f.value())),
                spindle_speed.map_or(Field::Default(0.0), Field::Reported),
            ),
        };

        // Overrides, pins, accessories
        let (overrides, enabled_pins, accessory_states) = match (overrides, previous) {
            (Some(ov), _) => (
                Some(Field::Reported(ov)),
                Some(enabled_pins.map_or_else(
                    || Field::Default(EnabledPins::from_descriptor("")),
                    Field::Reported,
                )),
                Some(accessory_states.map_or_else(
                    || Field::Default(AccessoryStates::from_descriptor("")),
                    Field::Reported,
                )),
            ),
            (None, Some(prev)) => (
                prev.overrides.map(Field::CarriedForward),
                prev.enabled_pins.map(Field::CarriedForward),
                prev.accessory_states.map(Field::CarriedForward),
            ),
            (None, None) => (
                None,
                enabled_pins.map(Field::Reported),
                accessory_states.map(Field::Reported),
            ),
        };

        let state = match state {
            Some(s) => Field::Reported(s),
            None => Field::Derived(MachineState::from_label(state_string.as_deref())),
        };

        ResolvedStatus {
            state_string,
            state,
            machine_coord,
            work_coord,
            work_coordinate_offset: wco,
            feed_speed,
            feed_speed_units: feed_speed_units.unwrap_or_default(),
            spindle_speed,
            overrides,
            enabled_pins,
            accessory_states,
        }
    }
}
