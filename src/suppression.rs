//! Suppression-list synchronization.
//!
//! Periodic job: for each enabled, webhook-configured vendor account,
//! pull the vendor's suppression lists, mark every listed email as
//! globally unsubscribed locally, and delete the entries from the
//! vendor side so they stop accumulating.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::store::Store;
use crate::vendor::VendorApi;

/// One vendor suppression list and how to clean it.
#[derive(Debug, Clone, Copy)]
pub struct SuppressionCategory {
    pub name: &'static str,
    /// Endpoint to fetch the list from
    pub endpoint: &'static str,
    /// JSON key for batch deletion; None means the category only
    /// supports per-email removal
    pub batch_key: Option<&'static str>,
    /// Removal endpoint when it differs from the listing endpoint
    pub remove_endpoint: Option<&'static str>,
}

/// The five suppression categories, in processing order.
///
/// Global unsubscribes are removed one at a time against the asm
/// endpoint; everything else supports one batch delete per run.
pub const SUPPRESSION_CATEGORIES: [SuppressionCategory; 5] = [
    SuppressionCategory {
        name: "blocked",
        endpoint: "/suppression/blocks",
        batch_key: Some("emails"),
        remove_endpoint: None,
    },
    SuppressionCategory {
        name: "bounced",
        endpoint: "/suppression/bounces",
        batch_key: Some("emails"),
        remove_endpoint: None,
    },
    SuppressionCategory {
        name: "spam",
        endpoint: "/suppression/spam_reports",
        batch_key: Some("emails"),
        remove_endpoint: None,
    },
    SuppressionCategory {
        name: "invalid",
        endpoint: "/suppression/invalid_emails",
        batch_key: Some("emails"),
        remove_endpoint: None,
    },
    SuppressionCategory {
        name: "unsubscribed",
        endpoint: "/suppression/unsubscribes",
        batch_key: None,
        remove_endpoint: Some("/asm/suppressions/global"),
    },
];

/// What one category sync did, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CategoryOutcome {
    pub listed: usize,
    pub unsubscribed_locally: usize,
    pub removed: usize,
    pub rate_limited: bool,
}

/// Sync one suppression category for one account.
///
/// Vendor errors are logged and degrade to "nothing happened"; a 429
/// on per-email removal aborts the rest of the category for this run.
/// Whatever was already unsubscribed locally stays unsubscribed, and
/// the next run picks up anything left un-removed.
pub async fn sync_category<A: VendorApi + Sync>(
    store: &Store,
    api: &A,
    api_key: &str,
    category: &SuppressionCategory,
) -> CategoryOutcome {
    let mut outcome = CategoryOutcome::default();

    let emails = match api.list_suppressions(api_key, category.endpoint).await {
        Ok(emails) => emails,
        Err(e) => {
            warn!(
                category = category.name,
                error = %e,
                "suppression_list_failed"
            );
            return outcome;
        }
    };

    if emails.is_empty() {
        debug!(category = category.name, "suppression_list_empty");
        return outcome;
    }

    outcome.listed = emails.len();

    if let Some(batch_key) = category.batch_key {
        if let Err(e) = api
            .delete_suppressions(api_key, category.endpoint, batch_key, &emails)
            .await
        {
            warn!(
                category = category.name,
                error = %e,
                "suppression_batch_delete_failed"
            );
            return outcome;
        }
        outcome.removed = emails.len();

        for email in &emails {
            match store.add_global_unsubscribe(email).await {
                Ok(_) => outcome.unsubscribed_locally += 1,
                Err(e) => warn!(email = %email, error = %e, "unsubscribe_write_failed"),
            }
        }
    } else {
        let remove_endpoint = category.remove_endpoint.unwrap_or(category.endpoint);

        for email in &emails {
            // Local unsubscribe first: it must hold even when the
            // vendor-side removal fails or gets rate limited.
            match store.add_global_unsubscribe(email).await {
                Ok(_) => outcome.unsubscribed_locally += 1,
                Err(e) => warn!(email = %email, error = %e, "unsubscribe_write_failed"),
            }

            match api.delete_suppression(api_key, remove_endpoint, email).await {
                Ok(()) => outcome.removed += 1,
                Err(e) if e.is_rate_limited() => {
                    warn!(
                        category = category.name,
                        endpoint = remove_endpoint,
                        "suppression_removal_rate_limited"
                    );
                    outcome.rate_limited = true;
                    break;
                }
                Err(e) => {
                    warn!(email = %email, error = %e, "suppression_removal_failed");
                }
            }
        }
    }

    outcome
}

/// Run one full sync pass over all enabled vendor accounts.
pub async fn run_sync<A: VendorApi + Sync>(store: &Store, api: &A) -> Result<()> {
    let accounts = store.list_enabled_vendor_accounts().await?;
    info!(accounts = accounts.len(), "suppression_sync_start");

    for account in accounts {
        // Skip accounts where the integration is inactive
        let api_key = match (&account.api_key, &account.webhook_credentials) {
            (Some(key), Some(_)) => key.clone(),
            _ => {
                debug!(account = %account.name, "suppression_account_inactive");
                continue;
            }
        };

        for category in &SUPPRESSION_CATEGORIES {
            let outcome = sync_category(store, api, &api_key, category).await;
            info!(
                account = %account.name,
                category = category.name,
                listed = outcome.listed,
                removed = outcome.removed,
                unsubscribed = outcome.unsubscribed_locally,
                rate_limited = outcome.rate_limited,
                "suppression_category_synced"
            );
        }
    }

    info!("suppression_sync_complete");
    Ok(())
}
