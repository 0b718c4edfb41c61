/**
 * Authenticated Session
 *
 * Identity of a client as resolved from its session token. Realtime code
 * treats it as read-only; only the delivery filter looks inside.
 */
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Auth {
    /// Tenant the user belongs to
    pub account_id: String,
    pub user_id: String,
    pub email: String,
    /// Role level inside the account (0 = regular user)
    #[serde(default)]
    pub role: i32,
}

impl Auth {
    pub fn new(account_id: impl Into<String>, user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            user_id: user_id.into(),
            email: email.into(),
            role: 0,
        }
    }

    pub fn with_role(mut self, role: i32) -> Self {
        self.role = role;
        self
    }
}
