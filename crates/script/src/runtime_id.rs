use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EncodeError;

/// Stable identity of a live element: its UI Automation runtime id joined with `.`.
///
/// The id is the only handle that survives a round trip to the remote host;
/// it keys the host's element table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId(String);

impl RuntimeId {
    pub fn parse(text: &str) -> Result<Self, EncodeError> {
        let text = text.trim();
        let valid = !text.is_empty() && text.split('.').all(|part| part.parse::<i32>().is_ok());
        if valid { Ok(Self(text.to_owned())) } else { Err(EncodeError::RuntimeId(text.to_owned())) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The integer components, as compared by a `RuntimeId` search condition.
    pub fn parts(&self) -> Vec<i32> {
        // validated in `parse`
        self.0.split('.').filter_map(|part| part.parse().ok()).collect()
    }
}

impl FromStr for RuntimeId {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RuntimeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RuntimeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42")]
    #[case("12.34.56")]
    #[case("-1.2.3")]
    #[case(" 7.8 ")]
    fn accepts_dotted_integers(#[case] text: &str) {
        assert!(RuntimeId::parse(text).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("1..2")]
    #[case("1.a")]
    #[case("1.2.")]
    #[case("99999999999")]
    #[case("'); Remove-Item")]
    fn rejects_everything_else(#[case] text: &str) {
        assert_eq!(RuntimeId::parse(text), Err(EncodeError::RuntimeId(text.trim().to_owned())));
    }

    #[rstest]
    fn exposes_integer_parts() {
        let id = RuntimeId::parse("42.-7.3").expect("id");
        assert_eq!(id.parts(), vec![42, -7, 3]);
        assert_eq!(id.to_string(), "42.-7.3");
    }
}
