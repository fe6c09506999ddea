use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// One alert as reported by the upstream source.
///
/// Fields the agent does not interpret (zones, storm polygons, issue dates)
/// travel untouched in `extra` so downstream consumers see the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_type: String,
    pub description: String,
    #[serde(default)]
    pub message: String,
    #[serde(
        rename = "expires_epoch",
        serialize_with = "serialize_epoch",
        deserialize_with = "deserialize_epoch"
    )]
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AlertRecord {
    pub fn new(
        alert_type: impl Into<String>,
        description: impl Into<String>,
        message: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alert_type: alert_type.into(),
            description: description.into(),
            message: message.into(),
            expires_at,
            extra: Map::new(),
        }
    }

    /// Condensed message for SMS-sized consumers: upstream line breaks and
    /// `...` separators are flattened and the result is cut at `limit` chars.
    pub fn short_message(&self, limit: usize) -> String {
        static SPACES: OnceLock<regex::Regex> = OnceLock::new();
        let spaces = SPACES.get_or_init(|| regex::Regex::new(r"[ \t]+").unwrap());

        let text = html_escape::decode_html_entities(&self.message)
            .replace("\n...", "")
            .replace('\n', " ")
            .replace("...", "\n");

        let text = spaces.replace_all(&text, " ");
        let text = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        text.chars().take(limit).collect()
    }
}

fn serialize_epoch<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.timestamp().to_string())
}

// Upstream sends the epoch as a string; accept plain numbers too.
fn deserialize_epoch<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    use serde::de::Error;

    let raw = Value::deserialize(deserializer)?;
    let secs = match &raw {
        Value::String(s) => s.trim().parse::<i64>().map_err(D::Error::custom)?,
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("invalid epoch: {}", n)))?,
        other => return Err(D::Error::custom(format!("invalid epoch: {}", other))),
    };

    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| D::Error::custom(format!("epoch out of range: {}", secs)))
}
