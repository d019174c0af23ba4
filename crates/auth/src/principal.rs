use serde::{Deserialize, Serialize};

use ledgerly_core::ClientId;

use crate::Role;

/// Display identity of a principal. Both fields are optional because
/// persisted session state is frequently partial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: Option<String>,
    pub contact: Option<String>,
}

/// The authenticated actor for whom visibility decisions are made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub role: Role,
    pub identity: Identity,

    /// Owning client organization, if the session names one.
    pub tenant: Option<ClientId>,
}

impl Principal {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            identity: Identity::default(),
            tenant: None,
        }
    }

    /// Customer-class principals are the only ones with a capability set.
    pub fn needs_capabilities(&self) -> bool {
        self.role.is_customer_class()
    }
}

/// Bearer token issued by the external login flow.
///
/// `Debug` is redacted so tokens never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Returns `None` for blank tokens.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// A resolved session: who is acting, and the credential to act with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: BearerToken,
    pub principal: Principal,
}
