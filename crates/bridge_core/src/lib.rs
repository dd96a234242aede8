//! FilerBridge core
//!
//! This crate contains:
//! - Signal channels and the host object surface
//! - Channel completion for partial hosts
//! - Readiness handshake and session state
//! - The request/response client with timeouts
//! - Directory listing fallbacks
//! - Code executor requests
//! - Drag-and-drop upload batches
//! - Navigation history and breadcrumbs
//! - Configuration
//! - Error types

pub mod adapter;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod host;
pub mod listing;
pub mod navigation;
pub mod pending;
pub mod session;
pub mod signal;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::SignalAdapter;
pub use client::BridgeClient;
pub use config::{
    BridgeConfig, DegradePolicy, ListingConfig, ListingStrategy, SignalConfig, TimeoutConfig,
};
pub use connection::HostReadiness;
pub use error::{BridgeError, Result};
pub use host::{HostCallError, HostObject, ObjectRegistry};
pub use listing::{ListingOutcome, ListingSource};
pub use navigation::{breadcrumbs, parent_path, Crumb, NavigationHistory, SidebarPlace};
pub use pending::PendingOperation;
pub use session::Session;
pub use signal::{ChannelOrigin, Listener, ListenerId, SignalChannel};
pub use upload::{sanitize_file_name, DroppedFile, UploadBatch, UploadProgress, UploadReport};

pub use bridge_proto as proto;
