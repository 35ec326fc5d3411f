//! Canonical `place|verb|scenario` combination keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HfbpoError, Result};

/// Component separator in the serialized key
pub const KEY_SEPARATOR: char = '|';

/// Whether `text` can appear as one component of a key
pub fn is_key_component(text: &str) -> bool {
    !text.is_empty() && !text.contains(KEY_SEPARATOR)
}

/// Identity of one arm: an ordered (place, verb, scenario) triple.
///
/// Selection and reward attribution both go through this key; the component
/// texts are never rewarded on their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombinationKey {
    encoded: String,
    verb_at: usize,
    scenario_at: usize,
}

impl CombinationKey {
    /// Build a key from its components.
    ///
    /// Components must be non-empty and free of the separator.
    pub fn new(place: &str, verb: &str, scenario: &str) -> Result<Self> {
        for part in [place, verb, scenario] {
            if !is_key_component(part) {
                return Err(HfbpoError::InvalidKey(format!("{place}|{verb}|{scenario}")));
            }
        }
        Ok(Self {
            encoded: format!("{place}{KEY_SEPARATOR}{verb}{KEY_SEPARATOR}{scenario}"),
            verb_at: place.len() + 1,
            scenario_at: place.len() + verb.len() + 2,
        })
    }

    /// Parse a serialized key
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(place), Some(verb), Some(scenario), None) => Self::new(place, verb, scenario),
            _ => Err(HfbpoError::InvalidKey(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn place(&self) -> &str {
        &self.encoded[..self.verb_at - 1]
    }

    pub fn verb(&self) -> &str {
        &self.encoded[self.verb_at..self.scenario_at - 1]
    }

    pub fn scenario(&self) -> &str {
        &self.encoded[self.scenario_at..]
    }

    pub fn parts(&self) -> (&str, &str, &str) {
        (self.place(), self.verb(), self.scenario())
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for CombinationKey {
    type Err = HfbpoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for CombinationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded)
    }
}

impl<'de> Deserialize<'de> for CombinationKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
