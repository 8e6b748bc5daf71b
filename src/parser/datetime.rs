//! Parsers for dates, times, durations and timezones.
//!
//! Everything is stored as an integer count of a [`Resolution`] and then
//! compressed through an [`IntParser`]. Seconds are the default resolution,
//! which is precise enough for most components and keeps custom ids short.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Timelike, Utc,
};

use super::builtins::IntParser;
use super::registry::ParserClass;
use super::{AnyParser, Parser};
use crate::error::ParserError;
use crate::value::{TypeKey, Value};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The unit temporal values are counted in, stored as whole microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    micros: i64,
}

impl Resolution {
    pub const MICROS: Resolution = Resolution { micros: 1 };
    pub const MILLIS: Resolution = Resolution { micros: 1_000 };
    pub const SECONDS: Resolution = Resolution {
        micros: MICROS_PER_SECOND,
    };
    pub const MINUTES: Resolution = Resolution {
        micros: 60 * MICROS_PER_SECOND,
    };
    pub const HOURS: Resolution = Resolution {
        micros: 3_600 * MICROS_PER_SECOND,
    };
    pub const DAYS: Resolution = Resolution {
        micros: MICROS_PER_DAY,
    };

    /// A resolution of `seconds`.
    ///
    /// Must be at least `1e-6`. Below one second it must be an exact power of
    /// ten; above, fractional seconds are truncated.
    pub fn from_seconds(seconds: f64) -> Result<Self, ParserError> {
        if !(seconds >= 1e-6) {
            return Err(ParserError::InvalidConfig(format!(
                "resolution must be at least 1e-6, got {seconds}"
            )));
        }

        if seconds < 1.0 {
            let exponent = (-seconds.log10()).round() as i32;
            let expected = 10f64.powi(-exponent);
            if (expected - seconds).abs() > expected * 1e-9 {
                return Err(ParserError::InvalidConfig(format!(
                    "resolutions smaller than 1 must be a power of 10, got {seconds}"
                )));
            }
            return Ok(Resolution {
                micros: (expected * MICROS_PER_SECOND as f64).round() as i64,
            });
        }

        let whole = seconds.trunc();
        let micros = (whole < i64::MAX as f64)
            .then_some(whole as i64)
            .and_then(|secs| secs.checked_mul(MICROS_PER_SECOND))
            .ok_or_else(|| {
                ParserError::InvalidConfig(format!("resolution {seconds} is out of range"))
            })?;
        Ok(Resolution { micros })
    }

    pub fn micros(&self) -> i64 {
        self.micros
    }

    pub fn as_seconds(&self) -> f64 {
        self.micros as f64 / MICROS_PER_SECOND as f64
    }

    fn to_micros(self, count: i64) -> Result<i64, ParserError> {
        count.checked_mul(self.micros).ok_or_else(|| {
            ParserError::InvalidArgument {
                argument: count.to_string(),
                reason: "value out of range".to_string(),
            }
        })
    }

    fn count(self, micros: i64) -> i64 {
        micros.div_euclid(self.micros)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::SECONDS
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn mismatch(expected: &FixedOffset, got: impl std::fmt::Display) -> ParserError {
    ParserError::InvalidValue {
        value: got.to_string(),
        reason: format!("timezone mismatch, expected {expected}"),
    }
}

// ---------------------------------------------------------------------------
// Datetime
// ---------------------------------------------------------------------------

/// Parser for datetimes, stored as a timestamp.
///
/// Loaded datetimes always carry [`timezone`](DatetimeParser::timezone).
/// Strict parsers refuse to dump naive datetimes and datetimes in another
/// timezone; lenient parsers assign the configured timezone to naive values
/// and convert aware ones.
#[derive(Debug, Clone, PartialEq)]
pub struct DatetimeParser {
    pub resolution: Resolution,
    pub timezone: FixedOffset,
    pub strict: bool,
    pub int_parser: IntParser,
}

impl Default for DatetimeParser {
    fn default() -> Self {
        DatetimeParser {
            resolution: Resolution::SECONDS,
            timezone: utc(),
            strict: true,
            int_parser: IntParser::default(),
        }
    }
}

impl DatetimeParser {
    pub const CLASS: ParserClass = ParserClass::new("DatetimeParser", |_, _| {
        Ok(AnyParser::plain(DatetimeParser::default()))
    });

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    fn aware(&self, value: &Value) -> Result<DateTime<FixedOffset>, ParserError> {
        match value {
            Value::DateTime(dt) if dt.offset() == &self.timezone => Ok(*dt),
            Value::DateTime(dt) if self.strict => Err(mismatch(&self.timezone, dt.offset())),
            Value::DateTime(dt) => Ok(dt.with_timezone(&self.timezone)),
            Value::NaiveDateTime(_) if self.strict => Err(ParserError::invalid_value(
                value,
                "strict datetime parsers only dump timezone-aware datetimes",
            )),
            Value::NaiveDateTime(naive) => naive
                .and_local_timezone(self.timezone)
                .single()
                .ok_or_else(|| ParserError::invalid_value(naive, "ambiguous local datetime")),
            other => Err(ParserError::invalid_value(other, "expected a datetime")),
        }
    }
}

impl Parser for DatetimeParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        let micros = self.resolution.to_micros(self.int_parser.parse(argument)?)?;
        let dt = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| ParserError::invalid_argument(argument, "timestamp out of range"))?;
        Ok(Value::DateTime(dt.with_timezone(&self.timezone)))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        let dt = self.aware(value)?;
        self.int_parser
            .encode(self.resolution.count(dt.timestamp_micros()))
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::DATETIME]
    }
}

// ---------------------------------------------------------------------------
// Date
// ---------------------------------------------------------------------------

/// Parser for dates, stored as the proleptic Gregorian ordinal
/// (0001-01-01 is day 1).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateParser {
    pub int_parser: IntParser,
}

impl DateParser {
    pub const CLASS: ParserClass = ParserClass::new("DateParser", |_, _| {
        Ok(AnyParser::plain(DateParser::default()))
    });
}

impl Parser for DateParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        let ordinal = self.int_parser.parse(argument)?;
        i32::try_from(ordinal)
            .ok()
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date)
            .ok_or_else(|| ParserError::invalid_argument(argument, "date out of range"))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        match value {
            Value::Date(date) => self.int_parser.encode(i64::from(date.num_days_from_ce())),
            other => Err(ParserError::invalid_value(other, "expected a date")),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::DATE]
    }
}

// ---------------------------------------------------------------------------
// Timedelta
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimedeltaParser {
    pub resolution: Resolution,
    pub int_parser: IntParser,
}

impl TimedeltaParser {
    pub const CLASS: ParserClass = ParserClass::new("TimedeltaParser", |_, _| {
        Ok(AnyParser::plain(TimedeltaParser::default()))
    });

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    fn parse(&self, argument: &str) -> Result<TimeDelta, ParserError> {
        let micros = self.resolution.to_micros(self.int_parser.parse(argument)?)?;
        Ok(TimeDelta::microseconds(micros))
    }

    fn encode(&self, delta: TimeDelta) -> Result<String, ParserError> {
        let micros = delta
            .num_microseconds()
            .ok_or_else(|| ParserError::invalid_value(delta, "duration out of range"))?;
        self.int_parser.encode(self.resolution.count(micros))
    }
}

impl Parser for TimedeltaParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        self.parse(argument).map(Value::Duration)
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        match value {
            Value::Duration(delta) => self.encode(*delta),
            other => Err(ParserError::invalid_value(other, "expected a timedelta")),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::TIMEDELTA]
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Parser for times of day, stored as the duration since midnight.
///
/// The timezone policy matches [`DatetimeParser`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeParser {
    pub timezone: FixedOffset,
    pub strict: bool,
    pub timedelta_parser: TimedeltaParser,
}

impl Default for TimeParser {
    fn default() -> Self {
        TimeParser {
            timezone: utc(),
            strict: true,
            timedelta_parser: TimedeltaParser::default(),
        }
    }
}

impl TimeParser {
    pub const CLASS: ParserClass = ParserClass::new("TimeParser", |_, _| {
        Ok(AnyParser::plain(TimeParser::default()))
    });

    pub fn resolution(&self) -> Resolution {
        self.timedelta_parser.resolution
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.timedelta_parser.resolution = resolution;
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    fn local_time(&self, time: NaiveTime, offset: Option<FixedOffset>) -> Result<NaiveTime, ParserError> {
        match offset {
            Some(offset) if offset == self.timezone => Ok(time),
            Some(offset) if self.strict => Err(mismatch(&self.timezone, offset)),
            Some(offset) => {
                let shift = self.timezone.local_minus_utc() - offset.local_minus_utc();
                Ok(time
                    .overflowing_add_signed(TimeDelta::seconds(i64::from(shift)))
                    .0)
            }
            None if self.strict => Err(ParserError::invalid_value(
                time,
                "strict time parsers only dump timezone-aware times",
            )),
            None => Ok(time),
        }
    }
}

impl Parser for TimeParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        let micros = self
            .timedelta_parser
            .parse(argument)?
            .num_microseconds()
            .ok_or_else(|| ParserError::invalid_argument(argument, "time out of range"))?
            .rem_euclid(MICROS_PER_DAY);

        let seconds = (micros / MICROS_PER_SECOND) as u32;
        let nanos = (micros % MICROS_PER_SECOND) as u32 * 1_000;
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
            .ok_or_else(|| ParserError::invalid_argument(argument, "time out of range"))?;

        Ok(Value::Time {
            time,
            offset: Some(self.timezone),
        })
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        let Value::Time { time, offset } = value else {
            return Err(ParserError::invalid_value(value, "expected a time"));
        };

        let time = self.local_time(*time, *offset)?;
        let since_midnight = TimeDelta::seconds(i64::from(time.num_seconds_from_midnight()))
            + TimeDelta::microseconds(i64::from(time.nanosecond() / 1_000));
        self.timedelta_parser.encode(since_midnight)
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::TIME]
    }
}

// ---------------------------------------------------------------------------
// Timezone
// ---------------------------------------------------------------------------

/// Parser for fixed UTC offsets, stored through a [`TimedeltaParser`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimezoneParser {
    pub timedelta_parser: TimedeltaParser,
}

impl TimezoneParser {
    pub const CLASS: ParserClass = ParserClass::new("TimezoneParser", |_, _| {
        Ok(AnyParser::plain(TimezoneParser::default()))
    });

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.timedelta_parser.resolution = resolution;
        self
    }
}

impl Parser for TimezoneParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        let offset = self.timedelta_parser.parse(argument)?.num_seconds();
        i32::try_from(offset)
            .ok()
            .and_then(FixedOffset::east_opt)
            .map(Value::Timezone)
            .ok_or_else(|| ParserError::invalid_argument(argument, "offset out of range"))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        match value {
            Value::Timezone(offset) => self
                .timedelta_parser
                .encode(TimeDelta::seconds(i64::from(offset.local_minus_utc()))),
            other => Err(ParserError::invalid_value(other, "expected a timezone")),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::TIMEZONE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn cet() -> FixedOffset {
        FixedOffset::east_opt(3_600).unwrap()
    }

    #[test]
    fn resolution_validation() {
        assert_eq!(Resolution::from_seconds(1e-3).unwrap(), Resolution::MILLIS);
        assert_eq!(Resolution::from_seconds(1e-6).unwrap(), Resolution::MICROS);
        assert_eq!(Resolution::from_seconds(60.0).unwrap(), Resolution::MINUTES);
        assert_eq!(Resolution::from_seconds(90.7).unwrap().micros(), 90_000_000);
        assert!(Resolution::from_seconds(1e-7).is_err());
        assert!(Resolution::from_seconds(0.5).is_err());
        assert!(Resolution::from_seconds(f64::NAN).is_err());
    }

    #[test]
    fn oversized_resolution_is_rejected() {
        assert!(matches!(
            Resolution::from_seconds(1e13),
            Err(ParserError::InvalidConfig(_))
        ));
        assert!(matches!(
            Resolution::from_seconds(f64::INFINITY),
            Err(ParserError::InvalidConfig(_))
        ));
        let largest = (i64::MAX / MICROS_PER_SECOND) as f64;
        assert_eq!(
            Resolution::from_seconds(largest).unwrap().micros(),
            (i64::MAX / MICROS_PER_SECOND) * MICROS_PER_SECOND
        );
    }

    #[test]
    fn datetime_round_trip() {
        let parser = DatetimeParser::default();
        let dt = utc().with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap();
        let dumped = parser.dumps(&Value::DateTime(dt)).unwrap();
        assert_eq!(parser.loads(&dumped), Ok(Value::DateTime(dt)));
    }

    #[test]
    fn datetime_resolution_truncates() {
        let parser = DatetimeParser::default().with_resolution(Resolution::HOURS);
        let dt = utc().with_ymd_and_hms(2023, 4, 5, 6, 59, 59).unwrap();
        let dumped = parser.dumps(&Value::DateTime(dt)).unwrap();
        let expected = utc().with_ymd_and_hms(2023, 4, 5, 6, 0, 0).unwrap();
        assert_eq!(parser.loads(&dumped), Ok(Value::DateTime(expected)));
    }

    #[test]
    fn strict_datetime_rejects_naive_and_mismatched() {
        let parser = DatetimeParser::default();
        let naive = NaiveDateTime::parse_from_str("2023-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert!(parser.dumps(&Value::NaiveDateTime(naive)).is_err());

        let other = cet().with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert!(parser.dumps(&Value::DateTime(other)).is_err());
    }

    #[test]
    fn lenient_datetime_coerces() {
        let parser = DatetimeParser::default().lenient();
        let naive = NaiveDateTime::parse_from_str("2023-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let dumped = parser.dumps(&Value::NaiveDateTime(naive)).unwrap();
        let expected = utc().with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parser.loads(&dumped), Ok(Value::DateTime(expected)));

        // Aware values keep their instant.
        let other = cet().with_ymd_and_hms(2023, 1, 1, 1, 0, 0).unwrap();
        assert_eq!(parser.dumps(&Value::DateTime(other)).unwrap(), dumped);
    }

    #[test]
    fn date_uses_ordinal() {
        let parser = DateParser::default();
        let first = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
        assert_eq!(parser.dumps(&Value::Date(first)).unwrap(), "1");

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let dumped = parser.dumps(&Value::Date(date)).unwrap();
        assert_eq!(parser.loads(&dumped), Ok(Value::Date(date)));
    }

    #[test]
    fn timedelta_round_trip_and_negative() {
        let parser = TimedeltaParser::default().with_resolution(Resolution::MILLIS);
        for delta in [TimeDelta::milliseconds(1_500), TimeDelta::milliseconds(-250)] {
            let dumped = parser.dumps(&Value::Duration(delta)).unwrap();
            assert_eq!(parser.loads(&dumped), Ok(Value::Duration(delta)));
        }
    }

    #[test]
    fn time_policy() {
        let parser = TimeParser::default();
        let time = NaiveTime::from_hms_opt(13, 37, 0).unwrap();
        let aware = Value::Time {
            time,
            offset: Some(utc()),
        };
        let dumped = parser.dumps(&aware).unwrap();
        assert_eq!(parser.loads(&dumped), Ok(aware));

        let naive = Value::Time { time, offset: None };
        assert!(parser.dumps(&naive).is_err());
        assert_eq!(parser.clone().lenient().dumps(&naive).unwrap(), dumped);

        let shifted = Value::Time {
            time: NaiveTime::from_hms_opt(14, 37, 0).unwrap(),
            offset: Some(cet()),
        };
        assert!(parser.dumps(&shifted).is_err());
        assert_eq!(parser.lenient().dumps(&shifted).unwrap(), dumped);
    }

    #[test]
    fn timezone_round_trip() {
        let parser = TimezoneParser::default().with_resolution(Resolution::MINUTES);
        let value = Value::Timezone(FixedOffset::west_opt(5 * 3_600 + 1_800).unwrap());
        let dumped = parser.dumps(&value).unwrap();
        assert_eq!(dumped, "-96");
        assert_eq!(parser.loads(&dumped), Ok(value));
    }
}
