use serde::Serialize;

use crate::config::{ConfigPresence, GatewayConfig};

/// Liveness and configuration-presence report served on `/health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub config: ConfigReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReport {
    #[serde(flatten)]
    pub presence: ConfigPresence,
    pub frontend_url: String,
}

impl HealthReport {
    /// Build a report for the given configuration. Secret values never appear,
    /// only whether they are set.
    pub fn for_config(config: &GatewayConfig) -> Self {
        Self {
            status: "ok",
            timestamp: chrono::Utc::now().to_rfc3339(),
            config: ConfigReport {
                presence: config.presence(),
                frontend_url: config.frontend_url.clone(),
            },
        }
    }
}
