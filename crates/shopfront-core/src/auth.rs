//! Authentication probe result.

use serde::{Deserialize, Serialize};

/// The signed-in user, as returned by the current-user probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}
