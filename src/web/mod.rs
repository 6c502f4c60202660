//! Web server module for the inbound event webhook.
//!
//! A thin server that authenticates the vendor's Basic credentials,
//! applies each event in the posted batch to the local store, and
//! exposes an operator endpoint for webhook provisioning.

pub mod auth;
pub mod handlers;

pub use auth::authenticate_header;
pub use handlers::{
    event_webhook, health, provision_account, AppState, HealthResponse, ProvisionResponse,
    WebhookResponse,
};
