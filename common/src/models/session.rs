// common/src/models/session.rs
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LocalValidityError;

/// Session start time supplied by the token issuer, in Unix epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueTimestamp(i64);

impl IssueTimestamp {
    pub fn new(secs: i64) -> Self {
        Self(secs)
    }

    /// Parse the raw `timestamp` page parameter.
    ///
    /// Zero counts as missing, the same way an unset parameter does.
    pub fn parse(raw: Option<&str>) -> Result<Self, LocalValidityError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(LocalValidityError::MissingTimestamp);
        }

        let secs: i64 = raw
            .parse()
            .map_err(|_| LocalValidityError::InvalidTimestamp(raw.to_string()))?;

        match secs {
            0 => Err(LocalValidityError::MissingTimestamp),
            s if s < 0 => Err(LocalValidityError::InvalidTimestamp(raw.to_string())),
            s => Ok(Self(s)),
        }
    }

    pub fn as_secs(self) -> i64 {
        self.0
    }
}

/// Body of the session store's upsert call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub psid: String,
    pub timestamp: i64,
}

/// Session store answer for both upsert and check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVerdict {
    pub is_expired: bool,
    /// Server-confirmed expiry, Unix epoch seconds
    #[serde(default, deserialize_with = "deserialize_epoch_opt")]
    pub timestamp: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EpochRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accept an epoch second count sent as a number or as a numeric string.
pub fn deserialize_epoch_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<EpochRepr>::deserialize(deserializer)?;
    let value = match repr {
        None => None,
        Some(EpochRepr::Int(v)) => Some(v),
        Some(EpochRepr::Float(v)) if v.is_finite() => Some(v.trunc() as i64),
        Some(EpochRepr::Float(_)) => None,
        Some(EpochRepr::Text(s)) => s.trim().parse::<i64>().ok(),
    };
    // a zero expiry is the store's way of saying "nothing confirmed"
    Ok(value.filter(|v| *v > 0))
}
