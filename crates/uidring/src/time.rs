use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, Result};

/// Default epoch date: 2023-05-20 00:00:00 UTC (Unix second 1684540800).
pub const DEFAULT_EPOCH: &str = "2023-05-20";

/// A source of wall-clock time in whole Unix seconds.
///
/// The issuance paths only ever read whole seconds, so this is the entire
/// clock surface. Injecting a mock source drives the clock deterministically
/// in tests.
///
/// # Example
///
/// ```
/// use uidring::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn unix_seconds(&self) -> i64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.unix_seconds(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current Unix timestamp in whole seconds.
    fn unix_seconds(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn unix_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_secs() as i64
    }
}

/// Parses a `YYYY-MM-DD` epoch date into the Unix second of its UTC midnight.
pub fn parse_epoch(epoch: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(epoch, "%Y-%m-%d").map_err(|_| Error::EpochInvalid {
        epoch: epoch.to_owned(),
    })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time of day");
    Ok(midnight.and_utc().timestamp())
}

/// Renders a Unix second as `YYYY-MM-DD HH:MM:SS` in UTC.
///
/// Values outside chrono's representable range fall back to the raw second.
pub(crate) fn format_seconds(unix_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| unix_seconds.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_epoch_seconds() {
        assert_eq!(parse_epoch(DEFAULT_EPOCH).unwrap(), 1_684_540_800);
    }

    #[test]
    fn epoch_rejects_garbage() {
        for bad in ["2023-13-40", "20230520", "yesterday", ""] {
            assert_eq!(
                parse_epoch(bad),
                Err(Error::EpochInvalid {
                    epoch: bad.to_owned()
                })
            );
        }
    }

    #[test]
    fn formats_utc_calendar_time() {
        assert_eq!(format_seconds(1_684_540_800), "2023-05-20 00:00:00");
        assert_eq!(format_seconds(1_684_540_801), "2023-05-20 00:00:01");
    }

    #[test]
    fn system_clock_is_past_default_epoch() {
        assert!(SystemClock.unix_seconds() > parse_epoch(DEFAULT_EPOCH).unwrap());
    }
}
