//! Device attributes a session is bound to.

use serde::{Deserialize, Serialize};

/// Attributes reported by the client on every issuance, refresh, and logout.
///
/// Values are compared verbatim. No trimming or case folding is applied, so
/// binding is an exact match on `id` and `user_agent`. `ip` is recorded for
/// audit but is not part of the binding because it changes between networks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub user_agent: String,
    pub ip: String,
}

impl DeviceInfo {
    pub fn new(
        id: impl Into<String>,
        user_agent: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_agent: user_agent.into(),
            ip: ip.into(),
        }
    }

    /// Whether this device is the one a session was issued to.
    pub fn matches(&self, device_id: &str, device_ua: &str) -> bool {
        self.id == device_id && self.user_agent == device_ua
    }

    /// Both binding attributes must be present to issue a session.
    pub fn is_bindable(&self) -> bool {
        !self.id.is_empty() && !self.user_agent.is_empty()
    }
}
