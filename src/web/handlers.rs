//! Webhook and provisioning endpoint handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cache::CredentialCache;
use crate::config::Config;
use crate::events::WebhookEvent;
use crate::provision::{self, ProvisionOutcome};
use crate::status;
use crate::store::Store;
use crate::vendor::VendorClient;
use crate::web::auth::authenticate_header;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub cache: CredentialCache,
    pub vendor: VendorClient,
}

impl AppState {
    pub fn new(config: Config, store: Store, cache: CredentialCache, vendor: VendorClient) -> Self {
        Self {
            config: Arc::new(config),
            store,
            cache,
            vendor,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Vendor Event Webhook
// =============================================================================

/// Webhook response.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<usize>,
}

/// Vendor event webhook endpoint.
///
/// The body is taken as raw bytes rather than through the JSON
/// extractor: malformed bodies, invalid UTF-8 included, are logged
/// and acknowledged with 200 so the vendor does not retry-storm a
/// deployment with a transient bug. Only authentication failures are
/// surfaced as errors.
pub async fn event_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let credentials = match state.cache.get().await {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(error = %e, "credential_cache_load_failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse {
                    status: "error",
                    applied: None,
                }),
            );
        }
    };

    if !authenticate_header(auth_header, &credentials) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse {
                status: "unauthorized",
                applied: None,
            }),
        );
    }

    let events: Vec<WebhookEvent> = match serde_json::from_slice(&body) {
        Ok(events) => events,
        Err(e) => {
            warn!(
                error = %e,
                body_length = body.len(),
                "webhook_body_invalid"
            );
            return (
                StatusCode::OK,
                Json(WebhookResponse {
                    status: "ignored",
                    applied: None,
                }),
            );
        }
    };

    info!(events = events.len(), "webhook_batch_received");

    let applied = status::apply_batch(&state.store, &state.config.site, &events).await;

    info!(
        events = events.len(),
        applied = applied,
        "webhook_batch_processed"
    );

    (
        StatusCode::OK,
        Json(WebhookResponse {
            status: "ok",
            applied: Some(applied),
        }),
    )
}

// =============================================================================
// Webhook Provisioning
// =============================================================================

/// Provisioning response.
#[derive(Serialize)]
pub struct ProvisionResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'static str>,
}

/// Provision the vendor event webhook for one account.
///
/// Invoked by the operator (or automation) whenever the account's
/// configuration changes.
pub async fn provision_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let account = match state.store.get_account(&name).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ProvisionResponse {
                    status: "not_found",
                    detail: None,
                }),
            );
        }
        Err(e) => {
            error!(account = %name, error = %e, "account_load_failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProvisionResponse {
                    status: "error",
                    detail: None,
                }),
            );
        }
    };

    match provision::sync_webhook(
        &state.store,
        &state.vendor,
        &state.cache,
        &state.config,
        &account,
    )
    .await
    {
        Ok(outcome) => {
            let detail = match outcome {
                ProvisionOutcome::Skipped(reason) => Some(reason),
                _ => None,
            };
            (
                StatusCode::OK,
                Json(ProvisionResponse {
                    status: outcome.as_str(),
                    detail,
                }),
            )
        }
        Err(e) => {
            error!(account = %name, error = %e, "webhook_provision_failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProvisionResponse {
                    status: "error",
                    detail: None,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    use crate::store::memory_store;

    async fn test_state() -> AppState {
        let store = memory_store().await;
        let cache = CredentialCache::new(store.clone(), Some("ops:secret".to_string()));
        let vendor =
            VendorClient::new("https://api.example.com/v3/", Duration::from_secs(1)).unwrap();

        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            port: 8080,
            base_url: "https://erp.example.com".to_string(),
            site: "site1".to_string(),
            credentials_override: Some("ops:secret".to_string()),
            vendor_api_base: "https://api.example.com/v3/".to_string(),
            request_timeout_ms: 1000,
            sync_interval_secs: 0,
        };

        AppState::new(config, store, cache, vendor)
    }

    fn authorized_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", BASE64.encode("ops:secret"));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_event_webhook_rejects_missing_auth() {
        let state = test_state().await;

        let response = event_webhook(State(state), HeaderMap::new(), Bytes::from_static(b"[]"))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_event_webhook_acknowledges_invalid_utf8_body() {
        let state = test_state().await;

        // Not valid UTF-8, let alone JSON; still acknowledged with 200
        // so the vendor does not keep retrying it
        let response = event_webhook(
            State(state),
            authorized_headers(),
            Bytes::from_static(&[0xff, 0xfe, 0xfd]),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_event_webhook_acknowledges_invalid_json_body() {
        let state = test_state().await;

        let response = event_webhook(
            State(state),
            authorized_headers(),
            Bytes::from_static(b"{not json"),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_event_webhook_applies_valid_batch() {
        let state = test_state().await;
        state
            .store
            .create_message("m1", &["user@example.com".to_string()])
            .await
            .unwrap();

        let body = r#"[{"event": "delivered", "email": "user@example.com",
                        "message_id": "m1@site1"}]"#;
        let response = event_webhook(
            State(state.clone()),
            authorized_headers(),
            Bytes::from(body.to_string()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let record = state.store.get_message("m1").await.unwrap().unwrap();
        assert_eq!(record.delivery_status.as_deref(), Some("Sent"));
    }
}
