//! Snowflake identifiers.
//!
//! Every message, user, channel and guild on the platform carries a 64-bit id
//! whose bits above position 22 hold the milliseconds elapsed since the
//! platform epoch. That makes ids unique, monotonically increasing, and a
//! free source of the creation timestamp.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Platform epoch (2015-01-01T00:00:00Z) in Unix milliseconds.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Number of low bits that do not encode time (worker, process, increment).
const TIMESTAMP_SHIFT: u32 = 22;

/// Messages at or beyond this age can no longer be bulk deleted.
pub fn bulk_delete_max_age() -> Duration {
    Duration::days(14)
}

/// A platform identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Build the smallest id that could have been minted at `at`.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let ms = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        Self(ms.saturating_sub(DISCORD_EPOCH_MS) << TIMESTAMP_SHIFT)
    }

    /// Creation time in Unix milliseconds.
    pub fn timestamp_ms(self) -> u64 {
        (self.0 >> TIMESTAMP_SHIFT) + DISCORD_EPOCH_MS
    }

    /// Creation time.
    pub fn created_at(self) -> DateTime<Utc> {
        // The shifted value is at most 2^42 ms past the epoch, well inside chrono's range.
        Utc.timestamp_millis_opt(self.timestamp_ms() as i64)
            .single()
            .unwrap_or_default()
    }

    /// Time elapsed between creation and `now`. Negative for ids from the future.
    pub fn age_at(self, now: DateTime<Utc>) -> Duration {
        now - self.created_at()
    }

    /// Whether the platform still accepts this id in a bulk delete at `now`.
    pub fn is_bulk_deletable_at(self, now: DateTime<Utc>) -> bool {
        self.age_at(now) < bulk_delete_max_age()
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// The REST API sends ids as JSON strings so they survive 53-bit float parsers.
impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnowflakeVisitor;

        impl de::Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snowflake id as a string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Snowflake, E> {
                Ok(Snowflake(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Snowflake, E> {
                u64::try_from(v)
                    .map(Snowflake)
                    .map_err(|_| E::custom(format!("negative snowflake: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Snowflake, E> {
                v.parse()
                    .map_err(|e| E::custom(format!("invalid snowflake {v:?}: {e}")))
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_from_known_id() {
        // 175928847299117063 was minted at 2016-04-30T11:18:25.796Z.
        let id = Snowflake(175_928_847_299_117_063);
        assert_eq!(id.timestamp_ms(), 1_462_015_105_796);
    }

    #[test]
    fn test_from_datetime_round_trips_to_the_millisecond() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(Snowflake::from_datetime(at).created_at(), at);
    }

    #[test]
    fn test_bulk_delete_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        let exactly_14_days = Snowflake::from_datetime(now - Duration::days(14));
        let one_second_younger =
            Snowflake::from_datetime(now - Duration::days(14) + Duration::seconds(1));
        assert!(!exactly_14_days.is_bulk_deletable_at(now));
        assert!(one_second_younger.is_bulk_deletable_at(now));
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let a: Snowflake = serde_json::from_str(r#""81384788765712384""#).unwrap();
        let b: Snowflake = serde_json::from_str("81384788765712384").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), r#""81384788765712384""#);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(serde_json::from_str::<Snowflake>(r#""abc""#).is_err());
        assert!(serde_json::from_str::<Snowflake>("-5").is_err());
    }
}
