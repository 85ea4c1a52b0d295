//! GRBL boot banner parsing
//!
//! `Grbl 0.8c ['$' for help]` carries a numeric version (0.8) and an
//! optional letter (c). Both the real-time and the status report
//! capabilities follow from that pair alone.

use crate::firmware::capabilities::{Capability, CapabilityState};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Firmware version from a boot banner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrblVersion {
    /// The 0.8 in `Grbl 0.8c`
    pub version: f64,
    /// The c in `Grbl 0.8c`
    pub letter: Option<char>,
}

fn banner_regex() -> &'static Regex {
    static BANNER_REGEX: OnceLock<Regex> = OnceLock::new();
    BANNER_REGEX.get_or_init(|| {
        Regex::new(r"^Grbl\s+(\d+\.\d+)([a-zA-Z])?").expect("invalid regex pattern")
    })
}

impl GrblVersion {
    /// Parse a boot banner. Returns None for anything else.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = banner_regex().captures(line.trim())?;
        let version = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let letter = caps.get(2).and_then(|m| m.as_str().chars().next());
        Some(Self { version, letter })
    }

    /// Real-time commands arrived in 0.8
    pub fn is_real_time_capable(&self) -> bool {
        self.version >= 0.8
    }

    /// Status report format this firmware uses
    pub fn position_capability(&self) -> Option<Capability> {
        if self.version >= 1.1 {
            Some(Capability::StatusV11)
        } else if self.version > 0.8
            || (self.version == 0.8 && self.letter.is_some_and(|l| l.to_ascii_lowercase() >= 'c'))
        {
            Some(Capability::PositionC)
        } else {
            None
        }
    }

    /// Capability set implied by this version
    pub fn capabilities(&self) -> CapabilityState {
        CapabilityState::new(self.is_real_time_capable(), self.position_capability())
    }
}

impl fmt::Display for GrblVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.version)?;
        if let Some(letter) = self.letter {
            write!(f, "{}", letter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_banner() {
        let v = GrblVersion::parse("Grbl 0.8c ['$' for help]").unwrap();
        assert_eq!(v.version, 0.8);
        assert_eq!(v.letter, Some('c'));
        assert_eq!(v.to_string(), "0.8c");

        let v = GrblVersion::parse("Grbl 1.1h ['$' for help]").unwrap();
        assert_eq!(v.version, 1.1);
        assert_eq!(v.letter, Some('h'));

        let v = GrblVersion::parse("Grbl 0.9").unwrap();
        assert_eq!(v.letter, None);
    }

    #[test]
    fn test_not_a_banner() {
        assert!(GrblVersion::parse("ok").is_none());
        assert!(GrblVersion::parse("[MSG:Grbl 1.1]").is_none());
        assert!(GrblVersion::parse("Grbl").is_none());
    }

    #[test]
    fn test_real_time_threshold() {
        assert!(!GrblVersion::parse("Grbl 0.7d").unwrap().is_real_time_capable());
        assert!(GrblVersion::parse("Grbl 0.8a").unwrap().is_real_time_capable());
        assert!(GrblVersion::parse("Grbl 1.1f").unwrap().is_real_time_capable());
    }

    #[test]
    fn test_position_capability() {
        let cap = |banner: &str| GrblVersion::parse(banner).unwrap().position_capability();
        assert_eq!(cap("Grbl 0.7d"), None);
        assert_eq!(cap("Grbl 0.8a"), None);
        assert_eq!(cap("Grbl 0.8"), None);
        assert_eq!(cap("Grbl 0.8c"), Some(Capability::PositionC));
        assert_eq!(cap("Grbl 0.9j"), Some(Capability::PositionC));
        assert_eq!(cap("Grbl 1.1h"), Some(Capability::StatusV11));
    }
}
