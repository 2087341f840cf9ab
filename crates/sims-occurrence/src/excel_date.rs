//! Decoding of spreadsheet serial date cells.
//!
//! Serials count days from the 1900 epoch (serial `1` is 1900-01-01) with
//! the fractional part holding the time of day. The 1900 system carries the
//! historical leap-year bug: serial `60` is the nonexistent 1900-02-29 and
//! every later serial is shifted one day. Submissions already stored were
//! decoded with that rule, so it is preserved here.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta};

/// Largest serial the 1900 date system can express (9999-12-31).
pub const MAX_SERIAL: f64 = 2_958_465.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Calendar fields decoded from a serial.
///
/// Fields are kept exactly as the spreadsheet rule yields them, so
/// `(1900, 2, 29)` and `(1900, 1, 0)` are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl SerialDateTime {
    /// Converts the fields to a real timestamp, letting overflowing fields
    /// roll forward the way a calendar constructor does: 1900-02-29 becomes
    /// 1900-03-01 and 1900-01-00 becomes 1899-12-31.
    #[must_use]
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.year, 1, 1)?
            .checked_add_months(Months::new(self.month.checked_sub(1)?))?
            .checked_add_signed(TimeDelta::days(i64::from(self.day) - 1))?;
        date.and_hms_opt(self.hour, self.minute, self.second)
    }

    /// Formats as an ISO-8601 UTC timestamp with millisecond precision,
    /// e.g. `"2020-06-18T00:00:00.000Z"`.
    #[must_use]
    pub fn to_iso8601(&self) -> Option<String> {
        self.to_naive_datetime()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }
}

/// Decodes a spreadsheet serial into calendar fields.
///
/// Returns `None` for non-finite or negative input and for serials past
/// [`MAX_SERIAL`]. Out-of-range values inside that window are not rejected;
/// serial `0` decodes to the spreadsheet's "1900-01-00".
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn decode_serial(serial: f64) -> Option<SerialDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }

    let whole = serial.trunc();
    let mut date = whole as i64;
    let day_seconds = SECONDS_PER_DAY * (serial - whole);
    let mut time = day_seconds.floor() as i64;

    // Fractions that land a hair below a whole second round up, carrying
    // into the next day at midnight.
    if day_seconds - time as f64 > 0.9999 {
        time += 1;
        if time == 86_400 {
            time = 0;
            date += 1;
        }
    }

    let (year, month, day) = match date {
        0 => (1900, 1, 0),
        60 => (1900, 2, 29),
        _ => {
            let offset = if date > 60 { date - 1 } else { date };
            let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)?;
            let d = epoch.checked_add_signed(TimeDelta::days(offset - 1))?;
            (d.year(), d.month(), d.day())
        }
    };

    let time = u32::try_from(time).ok()?;
    Some(SerialDateTime {
        year,
        month,
        day,
        hour: time / 3600,
        minute: (time / 60) % 60,
        second: time % 60,
    })
}
