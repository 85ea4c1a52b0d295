//! Line preprocessing before transmission
//!
//! The only g-code semantics the streamer interprets: comments are removed
//! (GRBL's line buffer is small and comments waste it) and the feed word
//! may be rewritten when a speed override is active.

use regex::Regex;
use std::sync::OnceLock;

fn paren_comment_regex() -> &'static Regex {
    static PAREN_COMMENT: OnceLock<Regex> = OnceLock::new();
    PAREN_COMMENT.get_or_init(|| Regex::new(r"\([^(]*\)").expect("invalid regex pattern"))
}

fn line_comment_regex() -> &'static Regex {
    static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
    LINE_COMMENT.get_or_init(|| Regex::new(r";.*").expect("invalid regex pattern"))
}

fn comment_body_regex() -> &'static Regex {
    static COMMENT_BODY: OnceLock<Regex> = OnceLock::new();
    COMMENT_BODY
        .get_or_init(|| Regex::new(r"\(([^()]*)\)|;([^;]*)").expect("invalid regex pattern"))
}

fn feed_regex() -> &'static Regex {
    static FEED: OnceLock<Regex> = OnceLock::new();
    FEED.get_or_init(|| Regex::new(r"[Ff]([0-9.]+)").expect("invalid regex pattern"))
}

/// Strip `( ... )` and `; ...` comments and surrounding whitespace
pub fn remove_comment(line: &str) -> String {
    let without_parens = paren_comment_regex().replace_all(line, "");
    line_comment_regex()
        .replace_all(&without_parens, "")
        .trim()
        .to_string()
}

/// Text of the first comment on a line, without its delimiters
pub fn parse_comment(line: &str) -> Option<String> {
    let caps = comment_body_regex().captures(line)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
}

/// Replace every feed word with `F<speed>`
pub fn override_speed(line: &str, speed: i32) -> String {
    feed_regex()
        .replace_all(line, format!("F{}", speed).as_str())
        .into_owned()
}

/// Result of preprocessing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    /// Text to transmit; blank means the line should be skipped
    pub text: String,
    /// Comment removed from the line, if any
    pub comment: Option<String>,
}

impl Preprocessed {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Strip comments, then apply the speed override when it is positive
pub fn preprocess(line: &str, speed_override: i32) -> Preprocessed {
    let mut text = remove_comment(line);
    let comment = if text.len() != line.len() {
        parse_comment(line)
    } else {
        None
    };
    if speed_override > 0 {
        text = override_speed(&text, speed_override);
    }
    Preprocessed { text, comment }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_comment() {
        assert_eq!(remove_comment("G0 X1 (rapid)"), "G0 X1");
        assert_eq!(remove_comment("G1 X2 ; feed move"), "G1 X2");
        assert_eq!(remove_comment("(only a comment)"), "");
        assert_eq!(remove_comment("G0 (a) X1 (b)"), "G0  X1");
        assert_eq!(remove_comment("M3 S1000"), "M3 S1000");
    }

    #[test]
    fn test_parse_comment() {
        assert_eq!(parse_comment("G0 X1 (rapid)"), Some("rapid".to_string()));
        assert_eq!(parse_comment("; header"), Some("header".to_string()));
        assert_eq!(parse_comment("G0 X1"), None);
    }

    #[test]
    fn test_override_speed() {
        assert_eq!(override_speed("G1 X10 F100", 250), "G1 X10 F250");
        assert_eq!(override_speed("G1 X10 f12.5", 250), "G1 X10 F250");
        assert_eq!(override_speed("G1 X10", 250), "G1 X10");
    }

    #[test]
    fn test_preprocess() {
        let out = preprocess("G1 X10 F100 (cut)", -1);
        assert_eq!(out.text, "G1 X10 F100");
        assert_eq!(out.comment.as_deref(), Some("cut"));

        let out = preprocess("G1 X10 F100 (cut)", 300);
        assert_eq!(out.text, "G1 X10 F300");

        let out = preprocess("G1 X10 F100", 0);
        assert_eq!(out.text, "G1 X10 F100");
        assert_eq!(out.comment, None);

        let out = preprocess("; nothing but a note", 300);
        assert!(out.is_blank());
        assert_eq!(out.comment.as_deref(), Some("nothing but a note"));

        assert!(preprocess("   ", -1).is_blank());
    }
}
