use anyhow::{anyhow, bail, Result};
use std::time::Duration;

use super::AgentConfig;

/// Longest schedule accepted from an options file.
pub const MAX_SCHEDULE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

pub fn select_interval(watch_alerts: bool, have_alerts: bool, config: &AgentConfig) -> Duration {
    if watch_alerts || have_alerts {
        config.alerted_interval
    } else {
        config.default_interval
    }
}

/// Parses schedule names of the form `every_<n><unit>`, unit one of `m`, `h`, `d`.
pub fn parse_schedule(schedule: &str) -> Result<Duration> {
    let body = schedule
        .trim()
        .strip_prefix("every_")
        .ok_or_else(|| anyhow!("Unknown schedule '{}'", schedule))?;

    if body.len() < 2 || !body.is_ascii() {
        bail!("Unknown schedule '{}'", schedule);
    }

    let (count, unit) = body.split_at(body.len() - 1);
    let count: u64 = count
        .parse()
        .map_err(|_| anyhow!("Unknown schedule '{}'", schedule))?;

    if count == 0 {
        bail!("Schedule '{}' must be at least one unit", schedule);
    }

    let unit_secs = match unit {
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => bail!("Unknown schedule '{}'", schedule),
    };

    let secs = count
        .checked_mul(unit_secs)
        .filter(|secs| *secs <= MAX_SCHEDULE.as_secs())
        .ok_or_else(|| {
            anyhow!(
                "Schedule '{}' is longer than {}",
                schedule,
                format_schedule(MAX_SCHEDULE)
            )
        })?;

    Ok(Duration::from_secs(secs))
}

/// Inverse of [`parse_schedule`], picking the largest whole unit.
pub fn format_schedule(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 86_400 && secs % 86_400 == 0 {
        format!("every_{}d", secs / 86_400)
    } else if secs >= 3_600 && secs % 3_600 == 0 {
        format!("every_{}h", secs / 3_600)
    } else {
        format!("every_{}m", (secs / 60).max(1))
    }
}
