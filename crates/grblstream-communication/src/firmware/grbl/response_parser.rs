//! GRBL response classification
//!
//! Sorts each line the device sends into the handful of kinds the
//! controller reacts to.

use super::error_decoder::{format_alarm, format_error};
use super::version::GrblVersion;
use std::fmt;

/// Kinds of line a GRBL device sends
#[derive(Debug, Clone, PartialEq)]
pub enum GrblResponse {
    /// Command acknowledged
    Ok,
    /// Command rejected. 1.1 sends a numeric code, older firmware free text.
    Error {
        /// Numeric code (`error:20`), if any
        code: Option<u8>,
        /// Text after the `error:` prefix
        text: String,
    },
    /// `ALARM:<code>`
    Alarm(u8),
    /// `<...>` status report, with the angle brackets
    Status(String),
    /// Boot banner
    Version(GrblVersion),
    /// Anything else (`[MSG:..]`, settings dumps, ...)
    Message(String),
}

impl GrblResponse {
    /// Classify one line. Returns None for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line == "ok" {
            return Some(Self::Ok);
        }

        if let Some(rest) = line.strip_prefix("error:") {
            let text = rest.trim().to_string();
            return Some(Self::Error {
                code: text.parse::<u8>().ok(),
                text,
            });
        }

        if let Some(rest) = line
            .strip_prefix("ALARM:")
            .or_else(|| line.strip_prefix("alarm:"))
        {
            if let Ok(code) = rest.trim().parse::<u8>() {
                return Some(Self::Alarm(code));
            }
        }

        if line.starts_with('<') && line.ends_with('>') {
            return Some(Self::Status(line.to_string()));
        }

        if let Some(version) = GrblVersion::parse(line) {
            return Some(Self::Version(version));
        }

        Some(Self::Message(line.to_string()))
    }

    /// Human-readable description for the console
    pub fn describe(&self) -> String {
        match self {
            Self::Error {
                code: Some(code), ..
            } => format_error(*code),
            Self::Alarm(code) => format_alarm(*code),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for GrblResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error { text, .. } => write!(f, "error:{}", text),
            Self::Alarm(code) => write!(f, "ALARM:{}", code),
            Self::Status(report) => write!(f, "{}", report),
            Self::Version(version) => write!(f, "Grbl {}", version),
            Self::Message(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_and_blank() {
        assert_eq!(GrblResponse::parse("ok\r\n"), Some(GrblResponse::Ok));
        assert_eq!(GrblResponse::parse("   "), None);
    }

    #[test]
    fn test_errors() {
        let resp = GrblResponse::parse("error:20").unwrap();
        assert_eq!(
            resp,
            GrblResponse::Error {
                code: Some(20),
                text: "20".to_string()
            }
        );
        assert_eq!(resp.describe(), "error:20 - Unsupported command");

        let legacy = GrblResponse::parse("error: Bad number format").unwrap();
        assert_eq!(
            legacy,
            GrblResponse::Error {
                code: None,
                text: "Bad number format".to_string()
            }
        );
        assert_eq!(legacy.describe(), "error:Bad number format");
    }

    #[test]
    fn test_alarm() {
        let resp = GrblResponse::parse("ALARM:1").unwrap();
        assert_eq!(resp, GrblResponse::Alarm(1));
        assert_eq!(resp.describe(), "ALARM:1 - Hard limit");
    }

    #[test]
    fn test_status_version_message() {
        assert!(matches!(
            GrblResponse::parse("<Idle|MPos:0.000,0.000,0.000|FS:0,0>"),
            Some(GrblResponse::Status(_))
        ));
        assert!(matches!(
            GrblResponse::parse("Grbl 1.1h ['$' for help]"),
            Some(GrblResponse::Version(_))
        ));
        assert_eq!(
            GrblResponse::parse("[MSG:'$H'|'$X' to unlock]"),
            Some(GrblResponse::Message("[MSG:'$H'|'$X' to unlock]".to_string()))
        );
    }
}
