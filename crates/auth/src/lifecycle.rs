//! Per-session lifecycle state machine.
//!
//! ```text
//! Unauthenticated -> Resolving -> CapabilitiesLoading -> Ready -> Unauthenticated
//!                              \________________________/
//! ```
//!
//! A failed capability fetch still settles into `Ready` (with no capability
//! set, so everything gated on capabilities stays hidden). It never goes back
//! to `Resolving`.

use serde::{Deserialize, Serialize};

use ledgerly_core::{DomainError, DomainResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    Resolving,
    CapabilitiesLoading,
    Ready,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session state is about to be read.
    LoginDetected,
    /// A principal was resolved.
    Resolved { needs_capabilities: bool },
    /// Persisted state did not yield a principal.
    ResolutionFailed,
    /// The capability fetch finished, successfully or not.
    CapabilitiesSettled,
    /// A manual refetch was started.
    RefetchStarted,
    LoggedOut,
}

impl SessionPhase {
    pub fn advance(self, event: SessionEvent) -> DomainResult<SessionPhase> {
        use SessionEvent as E;
        use SessionPhase as P;

        let next = match (self, event) {
            (P::Unauthenticated, E::LoginDetected) => P::Resolving,
            (P::Resolving, E::Resolved { needs_capabilities: true }) => P::CapabilitiesLoading,
            (P::Resolving, E::Resolved { needs_capabilities: false }) => P::Ready,
            (P::Resolving, E::ResolutionFailed) => P::Unauthenticated,
            (P::CapabilitiesLoading, E::CapabilitiesSettled) => P::Ready,
            (P::Ready, E::RefetchStarted) => P::CapabilitiesLoading,
            (P::Resolving | P::CapabilitiesLoading | P::Ready, E::LoggedOut) => P::Unauthenticated,
            (from, event) => {
                return Err(DomainError::invalid_transition(format!(
                    "{event:?} is not valid in phase {from:?}"
                )));
            }
        };
        Ok(next)
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SessionPhase::Unauthenticated)
    }
}
