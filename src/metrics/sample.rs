// Metric sample model

use crate::systemd::ServiceName;
use chrono::{DateTime, Utc};

/// Plugin name every sample is reported under
pub const PLUGIN_NAME: &str = "collectd-systemd";

/// Type category of every sample produced here
pub const GAUGE: &str = "gauge";

/// Dimension key identifying the originating service
pub const SERVICE_DIMENSION: &str = "systemd_service";

/// One boolean gauge reading for one service
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub plugin: String,
    pub kind: &'static str,
    /// `<axis>.<enumerant>`, e.g. `active_state.failed`
    pub type_instance: String,
    pub service: ServiceName,
    pub value: u8,
    pub time: DateTime<Utc>,
}

impl Sample {
    pub fn gauge(plugin: &str, type_instance: String, service: &ServiceName, value: bool) -> Self {
        Self {
            plugin: plugin.to_string(),
            kind: GAUGE,
            type_instance,
            service: service.clone(),
            value: u8::from(value),
            time: Utc::now(),
        }
    }

    /// Dimension block carried in the plugin instance, e.g. `[systemd_service=web]`
    pub fn plugin_instance(&self) -> String {
        format!("[{}={}]", SERVICE_DIMENSION, self.service)
    }
}
