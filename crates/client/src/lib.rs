//! `ledgerly-client`
//!
//! **Responsibility:** the I/O side of access control for the Ledgerly
//! frontend.
//!
//! This crate provides:
//! - Capability fetching over the REST API (with tenant-default fallback)
//! - A per-session capability store with request fencing
//! - The access provider that drives the session lifecycle
//! - File-backed session storage and environment configuration
//!
//! Decisions themselves are made by the pure `ledgerly-auth` crate.

pub mod config;
pub mod error;
pub mod notify;
pub mod provider;
pub mod source;
pub mod storage;
pub mod store;

pub use config::ClientConfig;
pub use error::{AccessError, ConfigError, FetchError, StorageError};
pub use notify::{Notification, NotificationLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use provider::AccessProvider;
pub use source::{CapabilityOrigin, CapabilitySource, FetchedCapabilities, HttpCapabilitySource};
pub use storage::FileStorage;
pub use store::{CapabilitySnapshot, CapabilityStore, RefetchOrdering};
