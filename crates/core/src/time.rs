use thiserror::Error;

/// Errors raised while parsing a `HH:MM:SS` trigger offset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OffsetParseError {
    #[error("expected HH:MM:SS, got {0:?}")]
    Shape(String),
    #[error("invalid {field} component in {raw:?}")]
    Component { field: &'static str, raw: String },
    #[error("{field} must be below 60 in {raw:?}")]
    OutOfRange { field: &'static str, raw: String },
}

/// Parses a time-of-day formatted offset (`HH:MM:SS`) into seconds.
///
/// Hours and minutes must be whole numbers; seconds may carry a fraction
/// (`00:01:30.5`). Minutes and seconds must be below 60, hours are unbounded.
///
/// # Errors
///
/// Returns `OffsetParseError` if the input does not have exactly three
/// numeric components or a component is out of range.
///
/// # Examples
///
/// ```
/// # use lms_core::time::parse_offset;
/// assert_eq!(parse_offset("01:02:03")?, 3723.0);
/// # Ok::<(), lms_core::time::OffsetParseError>(())
/// ```
pub fn parse_offset(raw: &str) -> Result<f64, OffsetParseError> {
    let trimmed = raw.trim();
    let mut parts = trimmed.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(OffsetParseError::Shape(trimmed.to_owned()));
    };

    let component = |field: &'static str| OffsetParseError::Component {
        field,
        raw: trimmed.to_owned(),
    };

    let hours: u32 = h.parse().map_err(|_| component("hours"))?;
    let minutes: u32 = m.parse().map_err(|_| component("minutes"))?;
    let seconds: f64 = if s.chars().all(|c| c.is_ascii_digit() || c == '.') && !s.is_empty() {
        s.parse().map_err(|_| component("seconds"))?
    } else {
        return Err(component("seconds"));
    };

    if minutes >= 60 {
        return Err(OffsetParseError::OutOfRange {
            field: "minutes",
            raw: trimmed.to_owned(),
        });
    }
    if seconds >= 60.0 {
        return Err(OffsetParseError::OutOfRange {
            field: "seconds",
            raw: trimmed.to_owned(),
        });
    }

    Ok(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}

/// Formats a playback position as `MM:SS`, truncating fractions.
///
/// Minutes are not wrapped into hours, so an hour-long video reads `60:00`.
/// Negative or non-finite positions render as `00:00`.
#[must_use]
pub fn format_offset(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_owned();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = seconds.floor() as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_offsets() {
        assert_eq!(parse_offset("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_offset("00:01:30").unwrap(), 90.0);
        assert_eq!(parse_offset(" 02:00:05 ").unwrap(), 7205.0);
    }

    #[test]
    fn parses_fractional_seconds() {
        assert_eq!(parse_offset("00:00:12.5").unwrap(), 12.5);
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(matches!(parse_offset("01:30"), Err(OffsetParseError::Shape(_))));
        assert!(matches!(parse_offset("1:2:3:4"), Err(OffsetParseError::Shape(_))));
        assert!(matches!(parse_offset(""), Err(OffsetParseError::Shape(_))));
    }

    #[test]
    fn rejects_bad_components() {
        assert!(matches!(
            parse_offset("aa:00:00"),
            Err(OffsetParseError::Component { field: "hours", .. })
        ));
        assert!(matches!(
            parse_offset("00:00:-1"),
            Err(OffsetParseError::Component { field: "seconds", .. })
        ));
        assert!(matches!(
            parse_offset("00:61:00"),
            Err(OffsetParseError::OutOfRange { field: "minutes", .. })
        ));
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_offset(0.0), "00:00");
        assert_eq!(format_offset(75.9), "01:15");
        assert_eq!(format_offset(3600.0), "60:00");
        assert_eq!(format_offset(f64::NAN), "00:00");
    }
}
