//! Access provider: owns one authenticated session's lifetime.
//!
//! Ordering guarantee: the session is resolved (or fails to resolve) before
//! any capability fetch starts, since the fetch needs the resolved role and
//! token. Logout clears the persisted session and unmounts the store; a new
//! login mounts a new provider.

use std::sync::{Arc, Mutex, MutexGuard};

use ledgerly_auth::{
    Feature, Principal, Role, Session, SessionEvent, SessionPhase, SessionStorage,
    VisibilityExplanation, explain, resolve_session,
};
use ledgerly_core::DomainError;

use crate::error::{AccessError, StorageError};
use crate::notify::Notifier;
use crate::source::CapabilitySource;
use crate::store::{CapabilitySnapshot, CapabilityStore, RefetchOrdering};

#[derive(Debug, Default)]
struct ProviderState {
    phase: SessionPhase,
    session: Option<Session>,
}

pub struct AccessProvider {
    storage: Arc<dyn SessionStorage>,
    store: CapabilityStore,
    state: Mutex<ProviderState>,
}

impl core::fmt::Debug for AccessProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessProvider")
            .field("store", &self.store)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl AccessProvider {
    pub fn mount(
        storage: Arc<dyn SessionStorage>,
        source: Arc<dyn CapabilitySource>,
        notifier: Arc<dyn Notifier>,
        ordering: RefetchOrdering,
    ) -> Self {
        Self {
            storage,
            store: CapabilityStore::new(source, notifier, ordering),
            state: Mutex::new(ProviderState::default()),
        }
    }

    /// Resolve the session and, for customer-class principals, load
    /// capabilities. Returns the phase reached.
    ///
    /// A failed capability fetch still ends in `Ready`; the failure has
    /// already been reported through the notifier.
    pub async fn start(&self) -> Result<SessionPhase, AccessError> {
        if self.store.is_unmounted() {
            return Err(DomainError::invalid_transition(
                "provider was logged out; mount a new one for the next session",
            )
            .into());
        }

        self.advance(SessionEvent::LoginDetected)?;

        let Some(session) = resolve_session(self.storage.as_ref()) else {
            self.advance(SessionEvent::ResolutionFailed)?;
            tracing::info!("no valid session; staying unauthenticated");
            return Ok(self.phase());
        };

        let needs_capabilities = session.principal.needs_capabilities();
        {
            let mut state = self.lock();
            state.session = Some(session.clone());
        }
        self.advance(SessionEvent::Resolved { needs_capabilities })?;
        tracing::info!(role = %session.principal.role, "session resolved");

        if needs_capabilities {
            // Errors were already surfaced as a notification.
            let _ = self.store.load(Some(&session)).await;
            self.settle();
        }

        Ok(self.phase())
    }

    /// Manually reload capabilities. A no-op for principals without a
    /// capability set.
    pub async fn refetch(&self) -> Result<(), AccessError> {
        let session = {
            let mut state = self.lock();
            let Some(session) = state.session.clone() else {
                return Err(DomainError::Unauthorized.into());
            };
            if !session.principal.needs_capabilities() {
                return Ok(());
            }
            match state.phase {
                SessionPhase::Ready => {
                    state.phase = state.phase.advance(SessionEvent::RefetchStarted)?;
                }
                // Overlapping refetch: the store reconciles the responses.
                SessionPhase::CapabilitiesLoading => {}
                other => {
                    return Err(DomainError::invalid_transition(format!(
                        "cannot refetch capabilities in phase {other:?}"
                    ))
                    .into());
                }
            }
            session
        };

        let result = self.store.refetch(&session).await;
        self.settle();
        result.map_err(AccessError::from)
    }

    /// Tear the session down: clear persisted state, drop capabilities.
    ///
    /// The in-process session ends even if the persisted state could not be
    /// cleared; that failure is returned so the caller can surface it.
    pub fn logout(&self) -> Result<(), AccessError> {
        let cleared = self.storage.clear();
        self.store.unmount();

        {
            let mut state = self.lock();
            state.session = None;
            if state.phase.is_authenticated() {
                state.phase = SessionPhase::Unauthenticated;
            }
        }

        match cleared {
            Ok(()) => {
                tracing::info!("logged out");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "logged out, but the persisted session is still on disk");
                Err(StorageError::from(err).into())
            }
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn principal(&self) -> Option<Principal> {
        self.lock().session.as_ref().map(|s| s.principal.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.lock().session.as_ref().map(|s| s.principal.role)
    }

    pub fn capabilities(&self) -> CapabilitySnapshot {
        self.store.snapshot()
    }

    /// Gate check for the current principal.
    ///
    /// Role-only gates pass as soon as the session is resolved; capability
    /// gates deny while a fetch is pending.
    pub fn can_show(&self, feature: Feature) -> bool {
        match self.active_role() {
            Some(role) => self.store.can_show(Some(role), feature),
            None => false,
        }
    }

    pub fn visible_features(&self) -> Vec<Feature> {
        match self.active_role() {
            Some(role) => self.store.visible_features(Some(role)),
            None => Vec::new(),
        }
    }

    pub fn explain(&self, feature: Feature) -> VisibilityExplanation {
        let snapshot = self.store.snapshot();
        explain(self.active_role(), snapshot.effective(), feature)
    }

    fn active_role(&self) -> Option<Role> {
        let state = self.lock();
        if state.phase.is_authenticated() {
            state.session.as_ref().map(|s| s.principal.role)
        } else {
            None
        }
    }

    fn advance(&self, event: SessionEvent) -> Result<SessionPhase, DomainError> {
        let mut state = self.lock();
        let next = state.phase.advance(event).inspect_err(|err| {
            tracing::error!(phase = ?state.phase, error = %err, "rejected session transition");
        })?;
        state.phase = next;
        Ok(next)
    }

    /// Leave `CapabilitiesLoading` once no fetch is outstanding. A logout
    /// that raced the fetch has already moved the phase on.
    fn settle(&self) {
        let loading = self.store.snapshot().is_loading;
        let mut state = self.lock();
        if state.phase == SessionPhase::CapabilitiesLoading && !loading {
            state.phase = SessionPhase::Ready;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
