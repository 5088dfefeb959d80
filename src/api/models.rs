use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_language() -> String {
    "en".to_string()
}

/// A panel user as returned by the application API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub uuid: Uuid,
    #[serde(default)]
    pub external_id: Option<String>,
    pub username: String,
    pub email: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub root_admin: bool,
    #[serde(rename = "2fa", default)]
    pub use_totp: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role_label(&self) -> &'static str {
        if self.root_admin { "Admin" } else { "User" }
    }

    pub fn totp_label(&self) -> &'static str {
        if self.use_totp {
            "2FA Enabled"
        } else {
            "2FA Disabled"
        }
    }
}
