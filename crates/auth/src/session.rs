//! Session resolution from persisted key/value state.
//!
//! The login flow (outside this crate) writes a handful of string keys; this
//! module reads them back into a [`Session`]. Resolution is a pure read: it
//! never writes, never touches the network, and never fails loudly. Partial
//! or stale state simply resolves to `None`.

use std::collections::HashMap;
use std::sync::RwLock;

use ledgerly_core::ClientId;
use thiserror::Error;

use crate::{BearerToken, Identity, Principal, Role, Session};

/// Storage keys written by the login flow.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const ROLE: &str = "role";
    pub const USERNAME: &str = "username";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const CLIENT_ID: &str = "clientId";
    pub const CLIENT_ID_LEGACY: &str = "client_id";
}

/// A write that could not be made durable. The storage still holds the
/// state it had before the write.
#[derive(Debug, Error)]
#[error("failed to persist session state at {location}: {source}")]
pub struct PersistError {
    pub location: String,
    #[source]
    pub source: std::io::Error,
}

/// Persisted key/value session state.
///
/// Passed explicitly to whoever needs it so tests can inject fixtures instead
/// of mutating process-wide state.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&self, key: &str) -> Result<(), PersistError>;

    /// Logout teardown: drop every key.
    fn clear(&self) -> Result<(), PersistError>;
}

/// In-process storage (fixtures, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a storage pre-populated with `pairs`.
    pub fn with_entries<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            inner: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A poisoned lock only means a writer panicked mid-insert; the map itself is
// still usable, so recover the guard instead of propagating the panic.
impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.clear();
        Ok(())
    }
}

/// Resolve the current session from persisted state.
///
/// Returns `None` when the token is missing or blank, or when the role
/// marker is missing or does not normalize to a canonical role.
pub fn resolve_session(storage: &dyn SessionStorage) -> Option<Session> {
    let Some(token) = storage.get(keys::TOKEN).and_then(BearerToken::new) else {
        tracing::debug!("no session token present");
        return None;
    };

    let raw_role = non_blank(storage.get(keys::ROLE));
    let Some(role) = raw_role.as_deref().and_then(Role::normalize) else {
        tracing::debug!(raw_role = ?raw_role, "session role missing or unrecognized");
        return None;
    };

    let identity = Identity {
        display_name: first_present(storage, &[keys::USERNAME, keys::NAME]),
        contact: first_present(storage, &[keys::EMAIL]),
    };
    let tenant = first_present(storage, &[keys::CLIENT_ID, keys::CLIENT_ID_LEGACY])
        .and_then(|raw| ClientId::parse(raw).ok());

    tracing::debug!(role = %role, has_tenant = tenant.is_some(), "session resolved");

    Some(Session {
        token,
        principal: Principal {
            role,
            identity,
            tenant,
        },
    })
}

/// Same as [`resolve_session`], without the credential.
pub fn resolve_principal(storage: &dyn SessionStorage) -> Option<Principal> {
    resolve_session(storage).map(|s| s.principal)
}

fn first_present(storage: &dyn SessionStorage, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| non_blank(storage.get(key)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
