pub mod wunderground;

pub use wunderground::WundergroundProvider;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::types::AlertRecord;

#[async_trait]
pub trait AlertSource: Send + Sync {
    async fn fetch_alerts(&self, api_key: &str, location: &str) -> Result<Vec<AlertRecord>>;
}

/// Serves a fixed alert list. Used for offline runs and tests.
pub struct StaticAlertSource {
    alerts: Mutex<Vec<AlertRecord>>,
}

impl Default for StaticAlertSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl StaticAlertSource {
    pub fn new(alerts: Vec<AlertRecord>) -> Self {
        Self {
            alerts: Mutex::new(alerts),
        }
    }

    pub fn set_alerts(&self, alerts: Vec<AlertRecord>) {
        *self.alerts.lock().unwrap() = alerts;
    }
}

#[async_trait]
impl AlertSource for StaticAlertSource {
    async fn fetch_alerts(&self, _api_key: &str, _location: &str) -> Result<Vec<AlertRecord>> {
        Ok(self.alerts.lock().unwrap().clone())
    }
}
