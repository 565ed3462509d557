use super::domain::DataIntegrityError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const KEY_DIGITS: usize = 8;
const MAX_DIGITS: usize = 32;

/// Opaque lottery token used only as a ranking key.
///
/// The token is a 128-bit value written as hex, optionally hyphenated
/// (`3a4bdc7f-8e91-0c2a-6f5d-1b9e6a38d047`). Ordering follows the normalized
/// digit string; [`LotteryNumber::to_ordered_key`] exposes the leading 32 bits
/// for numeric comparisons. Equality, ordering and hashing ignore hyphenation.
#[derive(Debug, Clone)]
pub struct LotteryNumber {
    digits: String,
    raw: String,
}

impl LotteryNumber {
    pub fn parse(raw: &str) -> Result<Self, DataIntegrityError> {
        let trimmed = raw.trim();
        let malformed = || DataIntegrityError::MalformedLottery(raw.to_string());

        let mut digits = String::with_capacity(MAX_DIGITS);
        for ch in trimmed.chars() {
            match ch {
                '-' => continue,
                c if c.is_ascii_hexdigit() => digits.push(c.to_ascii_lowercase()),
                _ => return Err(malformed()),
            }
        }

        if digits.len() < KEY_DIGITS || digits.len() > MAX_DIGITS {
            return Err(malformed());
        }
        if trimmed.starts_with('-') || trimmed.ends_with('-') || trimmed.contains("--") {
            return Err(malformed());
        }

        Ok(Self {
            digits,
            raw: trimmed.to_ascii_lowercase(),
        })
    }

    /// First eight hex digits decoded as an unsigned 32-bit value.
    pub fn to_ordered_key(&self) -> u32 {
        // Parse cannot fail: digits are validated hex and at least KEY_DIGITS long.
        u32::from_str_radix(&self.digits[..KEY_DIGITS], 16).unwrap_or(u32::MAX)
    }

    pub fn leading_digit(&self) -> char {
        self.digits.chars().next().unwrap_or('0')
    }

    pub fn prefix(&self, len: usize) -> &str {
        &self.digits[..len.min(self.digits.len())]
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for LotteryNumber {
    fn eq(&self, other: &Self) -> bool {
        self.digits == other.digits
    }
}

impl Eq for LotteryNumber {}

impl PartialOrd for LotteryNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LotteryNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits.cmp(&other.digits)
    }
}

impl Hash for LotteryNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digits.hash(state);
    }
}

impl FromStr for LotteryNumber {
    type Err = DataIntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LotteryNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for LotteryNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for LotteryNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Formats an ordered key the way narratives quote lottery numbers.
pub fn format_key(key: u32) -> String {
    format!("{key:08x}")
}
