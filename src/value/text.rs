//! Canonical text forms of well-known values.
//!
//! - UUID: lowercase hyphenated (`67e55044-10b1-426f-9247-bb680e5fe0c8`)
//! - Duration: `[-][d.]hh:mm:ss[.fffffffff]`
//! - Timestamp: ISO 8601 without offset (`2024-05-01T12:30:00.123456789`),
//!   with a sign on years outside `0..=9999`
//!
//! Formatting then parsing any value yields the same value.

use chrono::{NaiveDateTime, TimeDelta};
use uuid::Uuid;

const SECONDS_PER_DAY: i64 = 86_400;
const NANOS_PER_SECOND: u32 = 1_000_000_000;

pub fn format_uuid(value: &Uuid) -> String {
    value.hyphenated().to_string()
}

pub fn parse_uuid(text: &str) -> Option<Uuid> {
    Uuid::parse_str(text.trim()).ok()
}

/// Format a duration, e.g. `1.02:03:04.5` or `-00:00:00.000000001`.
pub fn format_duration(value: &TimeDelta) -> String {
    let negative = *value < TimeDelta::zero();
    // TimeDelta's range is symmetric, so negation cannot overflow.
    let magnitude = if negative { -*value } else { *value };

    let total_seconds = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos();
    let days = total_seconds / SECONDS_PER_DAY;
    let hours = (total_seconds % SECONDS_PER_DAY) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

/// Parse a duration written by [`format_duration`].
pub fn parse_duration(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut parts = body.split(':');
    let (first, minutes, last) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let (days, hours) = match first.split_once('.') {
        Some((days, hours)) => (parse_digits(days)?, parse_digits(hours)?),
        None => (0, parse_digits(first)?),
    };
    let minutes = parse_digits(minutes)?;
    let (seconds, nanos) = match last.split_once('.') {
        Some((seconds, fraction)) => (parse_digits(seconds)?, parse_fraction(fraction)?),
        None => (parse_digits(last)?, 0),
    };
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let total_seconds = days
        .checked_mul(SECONDS_PER_DAY)?
        .checked_add(hours * 3600 + minutes * 60 + seconds)?;
    let magnitude = TimeDelta::new(total_seconds, nanos)?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_digits(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_fraction(text: &str) -> Option<u32> {
    if text.is_empty() || text.len() > 9 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: u32 = text.parse().ok()?;
    let scale = 10u32.pow(9 - text.len() as u32);
    let nanos = digits * scale;
    (nanos < NANOS_PER_SECOND).then_some(nanos)
}

/// Format a timestamp in round-trip ISO 8601 form.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    format!("{:?}", value)
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    text.trim().parse().ok()
}

/// Serde adapter that writes a `TimeDelta` in its canonical text form.
pub(crate) mod duration_serde {
    use chrono::TimeDelta;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_duration(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid duration '{}'", text)))
    }
}

/// Serde adapter that writes a `Uuid` as text in every format.
pub(crate) mod uuid_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(value: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_uuid(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_uuid(&text).ok_or_else(|| de::Error::custom(format!("invalid uuid '{}'", text)))
    }
}

/// Serde adapter that writes a `NaiveDateTime` in its canonical text form.
pub(crate) mod timestamp_serde {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_timestamp(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", text)))
    }
}

/// Serde adapter for `f64` that keeps non-finite values in text formats.
///
/// Human-readable formats write `NaN`, `Infinity` and `-Infinity` as strings;
/// binary formats keep the native float.
pub(crate) mod float_serde {
    use std::fmt;

    use serde::{de, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() || !serializer.is_human_readable() {
            return serializer.serialize_f64(*value);
        }
        let text = if value.is_nan() {
            NAN
        } else if value.is_sign_positive() {
            INFINITY
        } else {
            NEG_INFINITY
        };
        serializer.serialize_str(text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl<'de> de::Visitor<'de> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, \"NaN\", \"Infinity\" or \"-Infinity\"")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            match value {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}
