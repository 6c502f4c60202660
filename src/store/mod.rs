//! Local persistence for accounts, message records, and unsubscribe
//! entries.
//!
//! The store owns three small tables and exposes only the operations
//! the sync flows need: account lookup, field-level status writes on
//! message records, and idempotent global-unsubscribe inserts.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

/// Vendor service name stored on accounts managed by this service.
pub const VENDOR_SERVICE: &str = "SendGrid";

/// An outbound email account configured against the vendor.
#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
    pub service: String,
    pub api_key: Option<String>,
    pub smtp_server: Option<String>,
    pub email_id: Option<String>,
    pub smtp_password: Option<String>,
    pub enable_outgoing: bool,
    /// `username:password` for the vendor event webhook, written back
    /// by the provisioner
    pub webhook_credentials: Option<String>,
}

/// A previously sent message, keyed by its locally generated id.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub recipients: Vec<String>,
    pub delivery_status: Option<String>,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // Account operations

    pub async fn create_account(&self, account: &Account) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO accounts (name, service, api_key, smtp_server, email_id,
                                   smtp_password, enable_outgoing, webhook_credentials)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.name)
        .bind(&account.service)
        .bind(&account.api_key)
        .bind(&account.smtp_server)
        .bind(&account.email_id)
        .bind(&account.smtp_password)
        .bind(account.enable_outgoing)
        .bind(&account.webhook_credentials)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_account(&self, name: &str) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT name, service, api_key, smtp_server, email_id,
                    smtp_password, enable_outgoing, webhook_credentials
             FROM accounts
             WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    /// All enabled outgoing accounts configured for the vendor.
    pub async fn list_enabled_vendor_accounts(&self) -> Result<Vec<Account>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT name, service, api_key, smtp_server, email_id,
                    smtp_password, enable_outgoing, webhook_credentials
             FROM accounts
             WHERE service = ? AND enable_outgoing = 1
             ORDER BY name",
        )
        .bind(VENDOR_SERVICE)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    pub async fn set_webhook_credentials(
        &self,
        name: &str,
        credentials: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET webhook_credentials = ? WHERE name = ?")
            .bind(credentials)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Message record operations

    pub async fn create_message(
        &self,
        id: &str,
        recipients: &[String],
    ) -> Result<(), sqlx::Error> {
        let recipients_json =
            serde_json::to_string(recipients).unwrap_or_else(|_| "[]".to_string());

        sqlx::query("INSERT INTO messages (id, recipients) VALUES (?, ?)")
            .bind(id)
            .bind(recipients_json)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<MessageRecord>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, recipients, delivery_status
             FROM messages
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let recipients_json: String = row.try_get("recipients")?;
            let recipients: Vec<String> =
                serde_json::from_str(&recipients_json).unwrap_or_default();

            Ok(Some(MessageRecord {
                id: row.try_get("id")?,
                recipients,
                delivery_status: row.try_get::<Option<String>, _>("delivery_status")?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Durable single-field status write, applied immediately.
    pub async fn set_delivery_status(
        &self,
        id: &str,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE messages SET delivery_status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Unsubscribe operations

    /// Mark an email as globally unsubscribed.
    ///
    /// Idempotent: a duplicate entry is a no-op, not an error. Returns
    /// whether a new entry was created.
    pub async fn add_global_unsubscribe(&self, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO unsubscribes (email, global_unsubscribe) VALUES (?, 1)",
        )
        .bind(email)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("UNIQUE") => {
                debug!(email = %email, "unsubscribe_already_present");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn is_unsubscribed(&self, email: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM unsubscribes
             WHERE email = ? AND global_unsubscribe = 1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    pub async fn count_unsubscribes(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM unsubscribes")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }
}

fn account_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        name: row.try_get("name")?,
        service: row.try_get("service")?,
        api_key: row.try_get::<Option<String>, _>("api_key")?,
        smtp_server: row.try_get::<Option<String>, _>("smtp_server")?,
        email_id: row.try_get::<Option<String>, _>("email_id")?,
        smtp_password: row.try_get::<Option<String>, _>("smtp_password")?,
        enable_outgoing: row.try_get("enable_outgoing")?,
        webhook_credentials: row.try_get::<Option<String>, _>("webhook_credentials")?,
    })
}

#[cfg(test)]
pub(crate) async fn memory_store() -> Store {
    let store = Store::connect("sqlite::memory:").await.unwrap();
    store.run_migrations().await.unwrap();
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> Account {
        Account {
            name: name.to_string(),
            service: VENDOR_SERVICE.to_string(),
            api_key: Some("SG.key".to_string()),
            smtp_server: Some("smtp.sendgrid.net".to_string()),
            email_id: Some("notify@example.com".to_string()),
            smtp_password: Some("hunter2".to_string()),
            enable_outgoing: true,
            webhook_credentials: Some("user:pass".to_string()),
        }
    }

    #[tokio::test]
    async fn test_account_round_trip() {
        let store = memory_store().await;
        store.create_account(&account("main")).await.unwrap();

        let loaded = store.get_account("main").await.unwrap().unwrap();
        assert_eq!(loaded.service, VENDOR_SERVICE);
        assert_eq!(loaded.api_key.as_deref(), Some("SG.key"));
        assert!(loaded.enable_outgoing);

        assert!(store.get_account("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_account_null_fields_read_as_none() {
        let store = memory_store().await;

        let mut bare = account("bare");
        bare.api_key = None;
        bare.smtp_server = None;
        bare.email_id = None;
        bare.smtp_password = None;
        bare.webhook_credentials = None;
        store.create_account(&bare).await.unwrap();

        let loaded = store.get_account("bare").await.unwrap().unwrap();
        assert!(loaded.api_key.is_none());
        assert!(loaded.smtp_server.is_none());
        assert!(loaded.email_id.is_none());
        assert!(loaded.smtp_password.is_none());
        assert!(loaded.webhook_credentials.is_none());
    }

    #[tokio::test]
    async fn test_list_enabled_vendor_accounts_filters() {
        let store = memory_store().await;
        store.create_account(&account("enabled")).await.unwrap();

        let mut disabled = account("disabled");
        disabled.enable_outgoing = false;
        store.create_account(&disabled).await.unwrap();

        let mut other_service = account("other");
        other_service.service = "Mailgun".to_string();
        store.create_account(&other_service).await.unwrap();

        let accounts = store.list_enabled_vendor_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "enabled");
    }

    #[tokio::test]
    async fn test_set_webhook_credentials() {
        let store = memory_store().await;
        store.create_account(&account("main")).await.unwrap();

        store
            .set_webhook_credentials("main", "fresh:creds")
            .await
            .unwrap();

        let loaded = store.get_account("main").await.unwrap().unwrap();
        assert_eq!(loaded.webhook_credentials.as_deref(), Some("fresh:creds"));
    }

    #[tokio::test]
    async fn test_message_status_write() {
        let store = memory_store().await;
        store
            .create_message("msg-1", &["a@example.com".to_string()])
            .await
            .unwrap();

        // A never-updated message reads as None, not an empty string
        let record = store.get_message("msg-1").await.unwrap().unwrap();
        assert_eq!(record.recipients, vec!["a@example.com".to_string()]);
        assert_eq!(record.delivery_status, None);

        store.set_delivery_status("msg-1", "Sent").await.unwrap();
        let record = store.get_message("msg-1").await.unwrap().unwrap();
        assert_eq!(record.delivery_status.as_deref(), Some("Sent"));
    }

    #[tokio::test]
    async fn test_unsubscribe_idempotent() {
        let store = memory_store().await;

        assert!(store.add_global_unsubscribe("x@example.com").await.unwrap());
        // Duplicate insert is swallowed, not an error
        assert!(!store.add_global_unsubscribe("x@example.com").await.unwrap());

        assert_eq!(store.count_unsubscribes().await.unwrap(), 1);
        assert!(store.is_unsubscribed("x@example.com").await.unwrap());
        assert!(!store.is_unsubscribed("y@example.com").await.unwrap());
    }
}
