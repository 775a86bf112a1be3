use crate::error::{Result, SubburnError};

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_HOUR: u64 = 3_600_000;

/// Format a media offset in seconds as a subtitle timecode (`H:MM:SS,mmm`).
///
/// Hours are not padded. The offset is rounded to the nearest millisecond
/// before it is split up, so `1.5` becomes `0:00:01,500`. Negative offsets
/// saturate to zero.
pub fn format_timecode(seconds: f64) -> String {
    let mut millis = (seconds * 1000.0).round() as u64;

    let hours = millis / MILLIS_PER_HOUR;
    millis -= hours * MILLIS_PER_HOUR;

    let minutes = millis / MILLIS_PER_MINUTE;
    millis -= minutes * MILLIS_PER_MINUTE;

    let secs = millis / MILLIS_PER_SECOND;
    millis -= secs * MILLIS_PER_SECOND;

    format!("{}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Parse a subtitle timecode back into seconds.
///
/// Accepts both `,` and `.` before the fraction and any hour width, which
/// covers files written by this crate as well as the usual `HH:MM:SS,mmm`.
pub fn parse_timecode(timecode: &str) -> Result<f64> {
    let invalid = || SubburnError::Subtitle(format!("Invalid timecode: '{}'", timecode));

    let (clock, fraction) = timecode
        .trim()
        .split_once([',', '.'])
        .ok_or_else(invalid)?;

    let mut parts = clock.split(':');
    let (Some(hours), Some(minutes), Some(secs), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    if minutes.len() != 2 || secs.len() != 2 || fraction.len() != 3 {
        return Err(invalid());
    }

    let hours: u64 = hours.parse().map_err(|_| invalid())?;
    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    let secs: u64 = secs.parse().map_err(|_| invalid())?;
    let millis: u64 = fraction.parse().map_err(|_| invalid())?;

    if minutes >= 60 || secs >= 60 {
        return Err(invalid());
    }

    let total = hours * MILLIS_PER_HOUR + minutes * MILLIS_PER_MINUTE + secs * MILLIS_PER_SECOND + millis;
    Ok(total as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "0:00:00,000");
        assert_eq!(format_timecode(1.5), "0:00:01,500");
        assert_eq!(format_timecode(3.25), "0:00:03,250");
        assert_eq!(format_timecode(65.123), "0:01:05,123");
        assert_eq!(format_timecode(3661.5), "1:01:01,500");
        assert_eq!(format_timecode(36_000.0), "10:00:00,000");
    }

    #[test]
    fn test_format_rounds_to_nearest_millisecond() {
        assert_eq!(format_timecode(0.0004), "0:00:00,000");
        assert_eq!(format_timecode(0.0006), "0:00:00,001");
        assert_eq!(format_timecode(59.9996), "0:01:00,000");
    }

    #[test]
    fn test_format_is_monotonic_within_an_hour() {
        let mut previous = format_timecode(0.0);
        let mut seconds = 0.0;
        while seconds < 3600.0 {
            seconds += 0.37;
            let current = format_timecode(seconds);
            if seconds < 3600.0 {
                assert!(current >= previous, "{} < {}", current, previous);
            }
            previous = current;
        }
    }

    #[test]
    fn test_parse_timecode() {
        assert_eq!(parse_timecode("0:00:01,500").unwrap(), 1.5);
        assert_eq!(parse_timecode("01:01:01,500").unwrap(), 3661.5);
        assert_eq!(parse_timecode("00:00:03.250").unwrap(), 3.25);
    }

    #[test]
    fn test_parse_inverts_format() {
        for seconds in [0.0, 0.001, 1.5, 59.999, 754.321, 7322.04] {
            let parsed = parse_timecode(&format_timecode(seconds)).unwrap();
            assert!((parsed - seconds).abs() < 0.0005, "{} vs {}", parsed, seconds);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_timecodes() {
        for bad in ["", "1:00", "0:0:01,500", "0:00:01", "0:61:00,000", "a:00:00,000", "0:00:00,5"] {
            assert!(parse_timecode(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
