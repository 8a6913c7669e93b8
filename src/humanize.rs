//! Byte sizes that read and print the way operators write them ("10MB", "512KiB")

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty size string")]
    Empty,

    #[error("invalid number in size '{0}'")]
    InvalidNumber(String),

    #[error("unknown size unit '{0}'")]
    UnknownUnit(String),

    #[error("size '{0}' overflows u64")]
    Overflow(String),
}

/// Byte count. All units are binary: `1MB` is `1024 * 1024` bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn mib(n: u64) -> Self {
        ByteSize(n * MIB)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Render with the largest unit that keeps one decimal of precision.
    pub fn to_human_readable(&self) -> String {
        let (divisor, unit) = match self.0 {
            n if n >= GIB => (GIB, "GB"),
            n if n >= MIB => (MIB, "MB"),
            n if n >= KIB => (KIB, "KB"),
            n => return format!("{n}B"),
        };

        let whole = self.0 / divisor;
        let tenths = (self.0 % divisor) * 10 / divisor;
        if tenths == 0 {
            format!("{whole}{unit}")
        } else {
            format!("{whole}.{tenths}{unit}")
        }
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    match unit.to_ascii_uppercase().as_str() {
        "" | "B" => Some(1),
        "K" | "KB" | "KIB" => Some(KIB),
        "M" | "MB" | "MIB" => Some(MIB),
        "G" | "GB" | "GIB" => Some(GIB),
        _ => None,
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        if digits.is_empty() {
            return Err(ParseError::InvalidNumber(trimmed.to_string()));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| ParseError::InvalidNumber(trimmed.to_string()))?;
        let multiplier = unit_multiplier(unit.trim())
            .ok_or_else(|| ParseError::UnknownUnit(unit.trim().to_string()))?;

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ParseError::Overflow(trimmed.to_string()))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human_readable())
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = ByteSize;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte count or a size string such as \"10MB\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ByteSize, E> {
                Ok(ByteSize(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ByteSize, E> {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom(format!("byte size cannot be negative: {v}")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ByteSize, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binary_units() {
        assert_eq!("10MB".parse::<ByteSize>().unwrap(), ByteSize::mib(10));
        assert_eq!("10MiB".parse::<ByteSize>().unwrap(), ByteSize::mib(10));
        assert_eq!("512k".parse::<ByteSize>().unwrap(), ByteSize(512 * 1024));
        assert_eq!("2 GB".parse::<ByteSize>().unwrap(), ByteSize(2 * GIB));
        assert_eq!("4096".parse::<ByteSize>().unwrap(), ByteSize(4096));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<ByteSize>(), Err(ParseError::Empty));
        assert!(matches!(
            "MB".parse::<ByteSize>(),
            Err(ParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "10TB".parse::<ByteSize>(),
            Err(ParseError::UnknownUnit(_))
        ));
        assert!(matches!(
            "99999999999999999GB".parse::<ByteSize>(),
            Err(ParseError::Overflow(_))
        ));
    }

    #[test]
    fn human_readable_output() {
        assert_eq!(ByteSize(512).to_human_readable(), "512B");
        assert_eq!(ByteSize::mib(10).to_human_readable(), "10MB");
        assert_eq!(ByteSize(MIB + MIB / 2).to_human_readable(), "1.5MB");
        assert_eq!(ByteSize(3 * GIB).to_string(), "3GB");
    }

    #[test]
    fn deserializes_strings_and_numbers() {
        #[derive(Deserialize)]
        struct Holder {
            size: ByteSize,
        }

        let from_str: Holder = serde_json::from_str(r#"{"size": "10MB"}"#).unwrap();
        assert_eq!(from_str.size, ByteSize::mib(10));

        let from_num: Holder = serde_json::from_str(r#"{"size": 8192}"#).unwrap();
        assert_eq!(from_num.size, ByteSize(8192));

        assert!(serde_json::from_str::<Holder>(r#"{"size": -1}"#).is_err());
    }
}
