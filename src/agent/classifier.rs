use regex::Regex;
use std::sync::OnceLock;

/// Forecast terms that warrant closer attention, in evaluation order.
pub const WATCH_TERMS: [&str; 7] = [
    "Thunderstorm",
    "Squalls",
    "Sandstorm",
    "Dust",
    "Sand",
    "Smoke",
    "Hail",
];

fn watch_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        WATCH_TERMS
            .iter()
            .map(|term| (*term, Regex::new(&format!("(?i){}", term)).unwrap()))
            .collect()
    })
}

/// First watch term found in `conditions`, if any.
pub fn matching_term(conditions: Option<&str>) -> Option<&'static str> {
    let conditions = conditions.filter(|c| !c.is_empty())?;
    watch_patterns()
        .iter()
        .find(|(_, pattern)| pattern.is_match(conditions))
        .map(|(term, _)| *term)
}

pub fn classify(conditions: Option<&str>) -> bool {
    matching_term(conditions).is_some()
}
