//! `ledgerly-auth` — pure access-control boundary for the Ledgerly frontend.
//!
//! This crate is intentionally decoupled from HTTP and persistent storage:
//! it resolves sessions from an injected key/value store, models roles and
//! tenant capabilities, and answers "may this principal see that feature?".

pub mod capabilities;
pub mod explain;
pub mod lifecycle;
pub mod principal;
pub mod roles;
pub mod session;
pub mod visibility;

pub use capabilities::{Capabilities, Capability, Limit};
pub use explain::{Denial, DenialKind, VisibilityExplanation, explain};
pub use lifecycle::{SessionEvent, SessionPhase};
pub use principal::{BearerToken, Identity, Principal, Session};
pub use roles::{Role, RoleSet};
pub use session::{MemoryStorage, PersistError, SessionStorage, resolve_principal, resolve_session};
pub use visibility::{
    Feature, Gate, can_create_within_limit, can_show, can_show_key, visible_features,
};
