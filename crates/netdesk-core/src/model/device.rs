// ── Device / IP registration domain type ──

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// A registered device (IP / MAC binding) on the campus network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub ip: Option<IpAddr>,
    pub mac: String,
    #[serde(default)]
    pub hostname: Option<String>,
    /// Username of the registering owner.
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub registered_at: Option<DateTime<Utc>>,
}

impl Entity for Device {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn active(&self) -> Option<bool> {
        Some(self.active)
    }

    fn set_active(&mut self, active: bool) -> bool {
        self.active = active;
        true
    }
}
