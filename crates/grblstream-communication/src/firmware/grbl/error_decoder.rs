//! GRBL error and alarm descriptions
//!
//! Codes follow the GRBL 1.1 tables. Pre-1.1 firmware reports errors as
//! free text (`error: Bad number format`), which needs no decoding.

const ERRORS: &[(u8, &str)] = &[
    (1, "Expected command letter"),
    (2, "Bad number format"),
    (3, "Invalid statement"),
    (4, "Value < 0"),
    (5, "Setting disabled"),
    (6, "Value < 3 usec"),
    (7, "EEPROM read fail. Using defaults"),
    (8, "Not idle"),
    (9, "G-code lock"),
    (10, "Homing not enabled"),
    (11, "Line overflow"),
    (12, "Step rate > 30kHz"),
    (13, "Check Door"),
    (14, "Line length exceeded"),
    (15, "Travel exceeded"),
    (16, "Invalid jog command"),
    (17, "Setting disabled"),
    (20, "Unsupported command"),
    (21, "Modal group violation"),
    (22, "Undefined feed rate"),
    (23, "Invalid gcode ID:23"),
    (24, "Invalid gcode ID:24"),
    (25, "Invalid gcode ID:25"),
    (26, "Invalid gcode ID:26"),
    (27, "Invalid gcode ID:27"),
    (28, "Invalid gcode ID:28"),
    (29, "Invalid gcode ID:29"),
    (30, "Invalid gcode ID:30"),
    (31, "Invalid gcode ID:31"),
    (32, "Invalid gcode ID:32"),
    (33, "Invalid gcode ID:33"),
    (34, "Invalid gcode ID:34"),
    (35, "Invalid gcode ID:35"),
    (36, "Invalid gcode ID:36"),
    (37, "Invalid gcode ID:37"),
    (38, "Invalid gcode ID:38"),
];

const ALARMS: &[(u8, &str)] = &[
    (1, "Hard limit"),
    (2, "Soft limit"),
    (3, "Abort during cycle"),
    (4, "Probe fail"),
    (5, "Probe fail"),
    (6, "Homing fail"),
    (7, "Homing fail"),
    (8, "Homing fail"),
    (9, "Homing fail"),
];

fn lookup(table: &[(u8, &'static str)], code: u8) -> Option<&'static str> {
    table
        .binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|i| table[i].1)
}

/// Short description of an `error:<code>` response
pub fn decode_error(code: u8) -> String {
    lookup(ERRORS, code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown error code: {}", code))
}

/// Short description of an `ALARM:<code>` message
pub fn decode_alarm(code: u8) -> String {
    lookup(ALARMS, code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown alarm code: {}", code))
}

/// `error:<code> - <description>`
pub fn format_error(code: u8) -> String {
    format!("error:{} - {}", code, decode_error(code))
}

/// `ALARM:<code> - <description>`
pub fn format_alarm(code: u8) -> String {
    format!("ALARM:{} - {}", code, decode_alarm(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sorted() {
        assert!(ERRORS.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(ALARMS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_error(20), "Unsupported command");
        assert_eq!(decode_alarm(1), "Hard limit");
        assert_eq!(decode_error(200), "Unknown error code: 200");
        assert_eq!(format_error(22), "error:22 - Undefined feed rate");
        assert_eq!(format_alarm(2), "ALARM:2 - Soft limit");
    }
}
