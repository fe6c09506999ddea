use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A forecast pushed in by an upstream agent. Consumed once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundSignal {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub conditions: Option<String>,
}

impl InboundSignal {
    pub fn new(location: Option<String>, conditions: Option<String>) -> Self {
        Self {
            location: non_blank(location),
            conditions: non_blank(conditions),
        }
    }

    /// Builds a signal from an upstream event payload. Keys other than
    /// `location` and `conditions` are ignored; numeric locations (zip codes
    /// sent as numbers) are accepted.
    pub fn from_payload(payload: &Value) -> Self {
        let field = |key: &str| match payload.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self::new(field("location"), field("conditions"))
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.trim().is_empty())
    }

    pub fn conditions(&self) -> Option<&str> {
        self.conditions.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.location().is_none() && self.conditions().is_none()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
