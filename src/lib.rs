//! GridSync - delivery status and suppression sync for a vendor
//! email provider.
//!
//! This library provides shared modules for the two GridSync binaries:
//! - `gridsync-web`: webhook receiver that maps vendor delivery events
//!   onto local message records
//! - `gridsync-suppression`: scheduled job that drains the vendor's
//!   suppression lists into the local global-unsubscribe table
//!
//! ## Architecture
//!
//! ```text
//! Vendor events → Web Server → Status Updater → Store
//! Scheduler     → Suppression Sync → Vendor API + Store
//! ```

pub mod cache;
pub mod config;
pub mod events;
pub mod provision;
pub mod status;
pub mod store;
pub mod suppression;
pub mod vendor;
pub mod web;

// Re-export commonly used types
pub use cache::CredentialCache;
pub use config::Config;
pub use events::{DeliveryStatus, WebhookEvent};
pub use store::{Account, MessageRecord, Store};
pub use vendor::{VendorApi, VendorClient, VendorError, WebhookSettings};
pub use web::AppState;
