//! Response classification for the CAT protocol.
//!
//! Each inbound line is checked against the known response prefixes in
//! priority order; the first match wins:
//! 1. `AG?<n>[;]` - AF gain (volume)
//! 2. `ML1<n>[;]` - monitor level, accepted only in 0..=100
//! 3. `BI<c>` - break-in, `c == '1'` means on
//!
//! Classification is total: malformed or truncated lines are an expected
//! occurrence on a noisy link and come back as [`Response::Ignored`].

use crate::commands::MONITOR_LEVEL_MAX;
use crate::error::{CatError, CatResult};

/// Prefix of an AF gain report.
pub const VOLUME_PREFIX: &str = "AG?";

/// Prefix of a monitor level report.
pub const MONITOR_PREFIX: &str = "ML1";

/// Prefix of a break-in report.
pub const BREAK_IN_PREFIX: &str = "BI";

/// Classified response line from the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// AF gain report.
    Volume(u8),

    /// Monitor level report, always within 0..=100.
    MonitorLevel(u8),

    /// Break-in report.
    BreakIn(bool),

    /// A known prefix whose value could not be used.
    Ignored {
        /// The raw line.
        line: String,
        /// Why the value was dropped.
        reason: CatError,
    },

    /// Unknown/unrecognized traffic.
    Unrecognized(String),
}

impl Response {
    /// Classify a single response line.
    ///
    /// The input should already be stripped of line terminators.
    pub fn classify(line: &str) -> Response {
        let result = if let Some(rest) = line.strip_prefix(VOLUME_PREFIX) {
            parse_volume(rest).map(Response::Volume)
        } else if let Some(rest) = line.strip_prefix(MONITOR_PREFIX) {
            parse_monitor_level(rest).map(Response::MonitorLevel)
        } else if let Some(rest) = line.strip_prefix(BREAK_IN_PREFIX) {
            parse_break_in(line, rest).map(Response::BreakIn)
        } else {
            return Response::Unrecognized(line.to_string());
        };

        result.unwrap_or_else(|reason| {
            log::debug!("ignoring {:?}: {}", line, reason);
            Response::Ignored {
                line: line.to_string(),
                reason,
            }
        })
    }
}

/// `AG?` tolerates `;` on either side of the number.
fn parse_volume(rest: &str) -> CatResult<u8> {
    let digits = rest.trim_matches(';');
    parse_number("volume", digits).and_then(|value| {
        u8::try_from(value).map_err(|_| CatError::OutOfRange {
            field: "volume",
            value,
            max: i64::from(u8::MAX),
        })
    })
}

/// `ML1` only tolerates a trailing `;`.
fn parse_monitor_level(rest: &str) -> CatResult<u8> {
    let digits = rest.strip_suffix(';').unwrap_or(rest);
    let value = parse_number("monitor level", digits)?;
    if !(0..=i64::from(MONITOR_LEVEL_MAX)).contains(&value) {
        return Err(CatError::OutOfRange {
            field: "monitor level",
            value,
            max: i64::from(MONITOR_LEVEL_MAX),
        });
    }
    Ok(value as u8)
}

fn parse_break_in(line: &str, rest: &str) -> CatResult<bool> {
    match rest.chars().next() {
        Some(flag) => Ok(flag == '1'),
        None => Err(CatError::Truncated(line.to_string())),
    }
}

fn parse_number(field: &'static str, text: &str) -> CatResult<i64> {
    text.trim().parse::<i64>().map_err(|_| CatError::ParseError {
        field,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume() {
        assert_eq!(Response::classify("AG?255;"), Response::Volume(255));
        assert_eq!(Response::classify("AG?0"), Response::Volume(0));
        assert_eq!(Response::classify("AG?042;"), Response::Volume(42));
    }

    #[test]
    fn test_volume_not_a_number() {
        let response = Response::classify("AG?abc;");
        assert!(matches!(
            response,
            Response::Ignored { reason: CatError::ParseError { field: "volume", .. }, .. }
        ));
    }

    #[test]
    fn test_volume_empty_value() {
        assert!(matches!(Response::classify("AG?;"), Response::Ignored { .. }));
    }

    #[test]
    fn test_volume_too_large_for_field() {
        assert!(matches!(
            Response::classify("AG?300;"),
            Response::Ignored { reason: CatError::OutOfRange { value: 300, .. }, .. }
        ));
    }

    #[test]
    fn test_monitor_level() {
        assert_eq!(Response::classify("ML1025"), Response::MonitorLevel(25));
        assert_eq!(Response::classify("ML1050"), Response::MonitorLevel(50));
        assert_eq!(Response::classify("ML1100"), Response::MonitorLevel(100));
        assert_eq!(Response::classify("ML1000;"), Response::MonitorLevel(0));
    }

    #[test]
    fn test_monitor_level_out_of_range() {
        assert!(matches!(
            Response::classify("ML1101"),
            Response::Ignored { reason: CatError::OutOfRange { value: 101, max: 100, .. }, .. }
        ));
        assert!(matches!(Response::classify("ML1-5"), Response::Ignored { .. }));
    }

    #[test]
    fn test_monitor_level_garbage() {
        assert!(matches!(Response::classify("ML1x"), Response::Ignored { .. }));
        assert!(matches!(Response::classify("ML1"), Response::Ignored { .. }));
    }

    #[test]
    fn test_break_in() {
        assert_eq!(Response::classify("BI1"), Response::BreakIn(true));
        assert_eq!(Response::classify("BI1;"), Response::BreakIn(true));
        assert_eq!(Response::classify("BI0"), Response::BreakIn(false));
        assert_eq!(Response::classify("BIX"), Response::BreakIn(false));
    }

    #[test]
    fn test_break_in_truncated() {
        assert!(matches!(
            Response::classify("BI"),
            Response::Ignored { reason: CatError::Truncated(_), .. }
        ));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(
            Response::classify("garbage"),
            Response::Unrecognized("garbage".to_string())
        );
        assert_eq!(
            Response::classify("FA014074000;"),
            Response::Unrecognized("FA014074000;".to_string())
        );
        // Only `ML1` is a monitor report; `ML0` is other traffic.
        assert!(matches!(Response::classify("ML0025"), Response::Unrecognized(_)));
    }
}
