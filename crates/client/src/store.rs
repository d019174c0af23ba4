//! Per-session capability store.
//!
//! One store is mounted per authenticated session. It holds the capability
//! set exclusively; readers get copies through [`CapabilityStore::snapshot`]
//! and the only mutation path is a fetch, which replaces the whole set.
//!
//! Fail-closed everywhere: no token, a failed fetch, a fetch still in flight,
//! or an unmounted store all read as "no capabilities".

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use ledgerly_auth::{Capabilities, Feature, Role, Session, can_show, visible_features};
use ledgerly_core::MountId;

use crate::error::{ConfigError, FetchError};
use crate::notify::{Notification, Notifier};
use crate::source::{CapabilityOrigin, CapabilitySource};

/// How overlapping fetches on the same store are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefetchOrdering {
    /// A response is applied only if it was issued after the last applied one.
    #[default]
    Fenced,
    /// Whichever response lands last wins, even if it was issued first.
    LastResponseWins,
}

impl FromStr for RefetchOrdering {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fenced" => Ok(RefetchOrdering::Fenced),
            "last-response-wins" | "last_response_wins" => Ok(RefetchOrdering::LastResponseWins),
            other => Err(ConfigError::Invalid {
                key: "LEDGERLY_REFETCH_ORDERING",
                message: format!("expected 'fenced' or 'last-response-wins', got '{other}'"),
            }),
        }
    }
}

/// Point-in-time view of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySnapshot {
    pub capabilities: Option<Capabilities>,
    pub is_loading: bool,
    pub origin: Option<CapabilityOrigin>,
    pub fetched_at: Option<DateTime<Utc>>,

    /// Bumped every time a capability set is applied.
    pub generation: u64,
}

impl CapabilitySnapshot {
    /// The set gated surfaces may use: `None` while loading.
    pub fn effective(&self) -> Option<&Capabilities> {
        if self.is_loading {
            None
        } else {
            self.capabilities.as_ref()
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    capabilities: Option<Capabilities>,
    origin: Option<CapabilityOrigin>,
    fetched_at: Option<DateTime<Utc>>,
    in_flight: usize,
    issued: u64,
    applied: u64,
    generation: u64,
    unmounted: bool,
}

pub struct CapabilityStore {
    mount_id: MountId,
    source: Arc<dyn CapabilitySource>,
    notifier: Arc<dyn Notifier>,
    ordering: RefetchOrdering,
    state: Mutex<StoreState>,
}

impl core::fmt::Debug for CapabilityStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CapabilityStore")
            .field("mount_id", &self.mount_id)
            .field("ordering", &self.ordering)
            .finish_non_exhaustive()
    }
}

impl CapabilityStore {
    pub fn new(
        source: Arc<dyn CapabilitySource>,
        notifier: Arc<dyn Notifier>,
        ordering: RefetchOrdering,
    ) -> Self {
        Self {
            mount_id: MountId::new(),
            source,
            notifier,
            ordering,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Mount-time load for a resolved session.
    ///
    /// Only customer-class principals are fetched for. Everyone else (and a
    /// missing session) settles immediately with no capability set and no
    /// network call.
    pub async fn load(&self, session: Option<&Session>) -> Result<(), FetchError> {
        let Some(session) = session else {
            tracing::debug!(mount = %self.mount_id, "no session; capabilities fail closed");
            self.reset();
            return Ok(());
        };

        let role = session.principal.role;
        if !role.is_customer_class() {
            tracing::debug!(mount = %self.mount_id, role = %role, "role has no capability set; skipping fetch");
            self.reset();
            return Ok(());
        }

        self.refetch(session).await
    }

    /// Fetch and atomically replace the capability set.
    ///
    /// A failure is reported once through the notifier and leaves the
    /// current set in place (`None` if nothing was ever loaded).
    pub async fn refetch(&self, session: &Session) -> Result<(), FetchError> {
        let seq = {
            let mut state = self.lock();
            if state.unmounted {
                tracing::debug!(mount = %self.mount_id, "refetch on unmounted store ignored");
                return Ok(());
            }
            state.issued += 1;
            state.in_flight += 1;
            state.issued
        };

        tracing::debug!(mount = %self.mount_id, seq, "fetching capabilities");
        let result = self.source.fetch(&session.token).await;

        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        if state.unmounted {
            tracing::debug!(mount = %self.mount_id, seq, "response landed after unmount; dropped");
            return Ok(());
        }

        match result {
            Ok(fetched) => {
                let apply = match self.ordering {
                    RefetchOrdering::Fenced => seq > state.applied,
                    RefetchOrdering::LastResponseWins => true,
                };
                if apply {
                    state.capabilities = Some(fetched.capabilities);
                    state.origin = Some(fetched.origin);
                    state.fetched_at = Some(fetched.fetched_at);
                    state.applied = seq;
                    state.generation += 1;
                    tracing::info!(
                        mount = %self.mount_id,
                        seq,
                        origin = ?fetched.origin,
                        granted = fetched.capabilities.granted_flags().count(),
                        "capabilities applied"
                    );
                } else {
                    tracing::debug!(
                        mount = %self.mount_id,
                        seq,
                        applied = state.applied,
                        "stale capability response discarded"
                    );
                }
                Ok(())
            }
            Err(err) => {
                drop(state);
                tracing::warn!(mount = %self.mount_id, seq, error = %err, "capability fetch failed");
                self.notifier
                    .notify(Notification::error(format!("Failed to load permissions: {err}")));
                Err(err)
            }
        }
    }

    /// Lifecycle guard: after this, landing responses are dropped and the
    /// capability set is gone.
    pub fn unmount(&self) {
        let mut state = self.lock();
        state.unmounted = true;
        state.capabilities = None;
        state.origin = None;
        state.fetched_at = None;
        tracing::debug!(mount = %self.mount_id, "capability store unmounted");
    }

    pub fn is_unmounted(&self) -> bool {
        self.lock().unmounted
    }

    pub fn snapshot(&self) -> CapabilitySnapshot {
        let state = self.lock();
        CapabilitySnapshot {
            capabilities: state.capabilities,
            is_loading: !state.unmounted && state.in_flight > 0,
            origin: state.origin,
            fetched_at: state.fetched_at,
            generation: state.generation,
        }
    }

    /// Evaluate a gate against the current snapshot. Loading denies.
    pub fn can_show(&self, role: Option<Role>, feature: Feature) -> bool {
        let snapshot = self.snapshot();
        can_show(role, snapshot.effective(), feature)
    }

    pub fn visible_features(&self, role: Option<Role>) -> Vec<Feature> {
        let snapshot = self.snapshot();
        visible_features(role, snapshot.effective())
    }

    /// Drop the set and fence off every fetch issued so far.
    fn reset(&self) {
        let mut state = self.lock();
        state.applied = state.issued;
        state.capabilities = None;
        state.origin = None;
        state.fetched_at = None;
    }

    // A poisoned lock means a panic elsewhere mid-update; the state is plain
    // data, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
