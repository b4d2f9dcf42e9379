use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// A row of the `log` table as returned by storage.
///
/// `count` is the unpaged match total the storage layer attaches to every row;
/// it is read but never written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub code: String,
    #[serde(deserialize_with = "level_from_number_or_string")]
    pub level: i64,
    pub ts: String,
    #[serde(default)]
    pub log: serde_json::Value,
    #[serde(default, skip_serializing)]
    pub count: Option<i64>,
}

// Some storage backends hand numeric columns back as text
fn level_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Level {
        Number(i64),
        Text(String),
    }

    match Level::deserialize(deserializer)? {
        Level::Number(level) => Ok(level),
        Level::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid level '{}'", text))),
    }
}
