// ── User domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum UserRole {
    Student,
    Teacher,
    Staff,
    Admin,
    #[serde(other)]
    Unknown,
}

/// A portal account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: UserRole,
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for User {
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_does_not_fail_decoding() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"username":"kim","role":"janitor","active":true}"#,
        )
        .unwrap();
        assert_eq!(user.role, UserRole::Unknown);
    }
}
