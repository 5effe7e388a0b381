//! `Dd H:MM:SS` duration formatting

use std::fmt;

use crate::error::{CalcError, Result};

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// Whole seconds rendered as `{days}d {hours}:{minutes:02}:{seconds:02}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DurationDisplay(pub u64);

impl fmt::Display for DurationDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0;
        let days = secs / SECS_PER_DAY;
        let hours = (secs % SECS_PER_DAY) / SECS_PER_HOUR;
        let minutes = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
        let seconds = secs % SECS_PER_MINUTE;
        write!(f, "{}d {}:{:02}:{:02}", days, hours, minutes, seconds)
    }
}

/// Format a possibly fractional number of seconds.
///
/// Fractions are truncated. Negative, NaN and infinite inputs are rejected.
pub fn format_duration(seconds: f64) -> Result<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(CalcError::InvalidDuration(seconds));
    }
    Ok(DurationDisplay(seconds.trunc() as u64).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(format_duration(0.0).unwrap(), "0d 0:00:00");
    }

    #[test]
    fn test_fields() {
        assert_eq!(format_duration(90061.0).unwrap(), "1d 1:01:01");
        assert_eq!(format_duration(59.0).unwrap(), "0d 0:00:59");
        assert_eq!(format_duration(86399.0).unwrap(), "0d 23:59:59");
        assert_eq!(DurationDisplay(400 * SECS_PER_DAY + 5).to_string(), "400d 0:00:05");
    }

    #[test]
    fn test_reconstructs_literal_fields() {
        for d in [0u64, 1, 12] {
            for h in [0u64, 9, 23] {
                for m in [0u64, 7, 59] {
                    for s in [0u64, 30, 59] {
                        let secs = d * SECS_PER_DAY + h * SECS_PER_HOUR + m * SECS_PER_MINUTE + s;
                        let expected = format!("{}d {}:{:02}:{:02}", d, h, m, s);
                        assert_eq!(format_duration(secs as f64).unwrap(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_fraction_truncated() {
        assert_eq!(format_duration(59.999).unwrap(), "0d 0:00:59");
        assert_eq!(format_duration(434782.6).unwrap(), "5d 0:46:22");
    }

    fn fields(formatted: &str) -> (u64, u64, u64, u64) {
        let (days, clock) = formatted.split_once("d ").unwrap();
        let parts: Vec<u64> = clock.split(':').map(|p| p.parse().unwrap()).collect();
        (days.parse().unwrap(), parts[0], parts[1], parts[2])
    }

    #[test]
    fn test_monotonic() {
        let mut prev = fields(&format_duration(0.0).unwrap());
        for secs in (0..400_000u64).step_by(997) {
            let next = fields(&format_duration(secs as f64 + 0.5).unwrap());
            assert!(next >= prev, "{} went backwards", secs);
            prev = next;
        }
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(format_duration(-1.0), Err(CalcError::InvalidDuration(_))));
        assert!(matches!(format_duration(f64::NAN), Err(CalcError::InvalidDuration(_))));
        assert!(matches!(format_duration(f64::INFINITY), Err(CalcError::InvalidDuration(_))));
    }
}
