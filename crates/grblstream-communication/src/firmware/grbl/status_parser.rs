//! GRBL Status Report Parsing
//!
//! Turns a `<...>` status report into a [`StatusPatch`]. Two layouts exist:
//!
//! - GRBL 1.1: `<Idle|MPos:1.000,2.000,0.000|FS:500,8000|WCO:0.000,0.000,0.000>`
//! - GRBL 0.8c/0.9: `<Idle,MPos:1.000,2.000,0.000,WPos:1.000,2.000,0.000>`
//!
//! The patch holds only what the report carried; reconciliation against the
//! previous snapshot is left to [`StatusBuilder`](grblstream_core::StatusBuilder).

use grblstream_core::{
    AccessoryStates, EnabledPins, FirmwareError, OverridePercents, Position, StatusPatch, Units,
};

fn parse_error(reason: impl Into<String>) -> FirmwareError {
    FirmwareError::ResponseParseError {
        reason: reason.into(),
    }
}

/// Parse `x,y,z[,a,...]`; extra axes are ignored
fn parse_position(field: &str, unit: Units) -> Result<Position, FirmwareError> {
    let mut axes = field.split(',').map(|s| s.trim().parse::<f64>());
    let mut next = || {
        axes.next()
            .and_then(|r| r.ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| parse_error(format!("bad position '{}'", field)))
    };
    let x = next()?;
    let y = next()?;
    let z = next()?;
    Ok(Position::new(x, y, z, unit))
}

fn parse_number(field: &str) -> Result<f64, FirmwareError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| parse_error(format!("bad number '{}'", field)))
}

/// Parse one status report line, brackets included
pub fn parse_status_report(line: &str, unit: Units) -> Result<StatusPatch, FirmwareError> {
    let body = line
        .trim()
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .ok_or_else(|| parse_error(format!("not a status report: {}", line)))?;

    let patch = if body.contains('|') {
        parse_v11(body, unit)?
    } else {
        parse_legacy(body, unit)?
    };
    Ok(patch.with_reporting_units(unit))
}

fn parse_v11(body: &str, unit: Units) -> Result<StatusPatch, FirmwareError> {
    let mut parts = body.split('|');
    let mut patch = StatusPatch::new();
    if let Some(state) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        patch = patch.with_state_string(state);
    }

    for part in parts {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        patch = match key {
            "MPos" => patch.with_machine_coord(parse_position(value, unit)?),
            "WPos" => patch.with_work_coord(parse_position(value, unit)?),
            "WCO" => patch.with_work_coordinate_offset(parse_position(value, unit)?),
            "FS" => {
                let (feed, spindle) = value.split_once(',').unwrap_or((value, ""));
                let mut patch = patch
                    .with_telemetry_feed_speed(parse_number(feed)?)
                    .with_feed_speed_units(unit);
                if !spindle.is_empty() {
                    patch = patch.with_spindle_speed(parse_number(spindle)?);
                }
                patch
            }
            "F" => patch
                .with_feed_speed(parse_number(value)?)
                .with_feed_speed_units(unit),
            "Ov" => patch.with_overrides(
                OverridePercents::parse(value)
                    .ok_or_else(|| parse_error(format!("bad overrides '{}'", value)))?,
            ),
            "Pn" => patch.with_enabled_pins(EnabledPins::from_descriptor(value)),
            "A" => patch.with_accessory_states(AccessoryStates::from_descriptor(value)),
            _ => patch,
        };
    }
    Ok(patch)
}

/// Three comma-separated numbers following `key` anywhere in the body
fn legacy_field(body: &str, key: &str, unit: Units) -> Result<Option<Position>, FirmwareError> {
    let Some(start) = body.find(key) else {
        return Ok(None);
    };
    let rest = &body[start + key.len()..];
    let numbers: Vec<&str> = rest.splitn(4, ',').take(3).collect();
    parse_position(&numbers.join(","), unit).map(Some)
}

fn parse_legacy(body: &str, unit: Units) -> Result<StatusPatch, FirmwareError> {
    let mut patch = StatusPatch::new();
    let state = body.split(',').next().unwrap_or_default().trim();
    if !state.is_empty() && !state.contains(':') {
        patch = patch.with_state_string(state);
    }
    if let Some(mpos) = legacy_field(body, "MPos:", unit)? {
        patch = patch.with_machine_coord(mpos);
    }
    if let Some(wpos) = legacy_field(body, "WPos:", unit)? {
        patch = patch.with_work_coord(wpos);
    }
    Ok(patch)
}
