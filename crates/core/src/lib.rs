//! `ledgerly-core` — shared building blocks for the access-control layer.
//!
//! This crate contains **pure** primitives (no I/O, no transport concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ClientId, MountId};
