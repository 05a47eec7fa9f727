//! Configuration types.
//!
//! Every config is built from environment variables at startup. Each
//! `from_env()` delegates to a `from_vars()` that takes a lookup function, so
//! tests can supply variables without touching the process environment.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Graph API root.
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Default OAuth authority.
pub const DEFAULT_GRAPH_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Default Airtable API root.
pub const DEFAULT_AIRTABLE_API_BASE: &str = "https://api.airtable.com";

/// Default Airtable table for sort decisions.
pub const DEFAULT_AIRTABLE_TABLE: &str = "CSR_Log";

/// Default number of unread messages handled per run.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Read a variable, treating empty values as unset.
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ── Graph ───────────────────────────────────────────────────────────

/// Credentials and mailbox for the Microsoft Graph mail transport.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Shared mailbox address (`/users/{mailbox}/...`).
    pub mailbox: String,
    pub api_base: String,
    pub authority: String,
}

impl GraphConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env_lookup)
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// All missing required variables are reported together.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = ["TENANT_ID", "CLIENT_ID", "CLIENT_SECRET", "SHARED_MAILBOX_ADDRESS"];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| non_empty(&lookup, key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvVar(missing.join(", ")));
        }

        let get = |key: &str| non_empty(&lookup, key).unwrap_or_default();

        Ok(Self {
            tenant_id: get("TENANT_ID"),
            client_id: get("CLIENT_ID"),
            client_secret: SecretString::from(get("CLIENT_SECRET")),
            mailbox: get("SHARED_MAILBOX_ADDRESS"),
            api_base: non_empty(&lookup, "GRAPH_API_BASE")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            authority: non_empty(&lookup, "GRAPH_AUTHORITY")
                .unwrap_or_else(|| DEFAULT_GRAPH_AUTHORITY.to_string()),
        })
    }
}

// ── Airtable ────────────────────────────────────────────────────────

/// Airtable sink configuration.
#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub base_id: String,
    pub table_name: String,
    pub token: SecretString,
    pub api_base: String,
}

impl AirtableConfig {
    /// Returns `None` if the base ID or token is not set (logging disabled).
    pub fn from_env() -> Option<Self> {
        Self::from_vars(env_lookup)
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_id = non_empty(&lookup, "AIRTABLE_BASE_ID")?;
        let token = non_empty(&lookup, "AIRTABLE_PERSONAL_TOKEN")?;

        Some(Self {
            base_id,
            table_name: non_empty(&lookup, "AIRTABLE_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_AIRTABLE_TABLE.to_string()),
            token: SecretString::from(token),
            api_base: non_empty(&lookup, "AIRTABLE_API_BASE")
                .unwrap_or_else(|| DEFAULT_AIRTABLE_API_BASE.to_string()),
        })
    }
}

// ── SMTP ────────────────────────────────────────────────────────────

/// Outbound SMTP configuration for real reply delivery.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl SmtpConfig {
    /// Returns `None` if `EMAIL_SMTP_HOST` is not set (simulated sending).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_vars(env_lookup)
    }

    pub fn from_vars(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(host) = non_empty(&lookup, "EMAIL_SMTP_HOST") else {
            return Ok(None);
        };

        let port = match non_empty(&lookup, "EMAIL_SMTP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "EMAIL_SMTP_PORT".into(),
                message: e.to_string(),
            })?,
            None => 587,
        };

        let username = non_empty(&lookup, "EMAIL_USERNAME").unwrap_or_default();
        let password = non_empty(&lookup, "EMAIL_PASSWORD").unwrap_or_default();
        let from_address =
            non_empty(&lookup, "EMAIL_FROM_ADDRESS").unwrap_or_else(|| username.clone());

        if from_address.is_empty() {
            return Err(ConfigError::MissingEnvVar(
                "EMAIL_FROM_ADDRESS (or EMAIL_USERNAME)".into(),
            ));
        }

        Ok(Some(Self {
            host,
            port,
            username,
            password: SecretString::from(password),
            from_address,
        }))
    }
}

// ── Sorter ──────────────────────────────────────────────────────────

/// Batch driver settings.
#[derive(Debug, Clone)]
pub struct SorterConfig {
    /// Folder the unread batch is read from; category folders are its children.
    pub inbox_id: String,
    /// Maximum unread messages handled per run.
    pub batch_size: usize,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            inbox_id: "inbox".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SorterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env_lookup)
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let batch_size = match non_empty(&lookup, "SORTER_BATCH_SIZE") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "SORTER_BATCH_SIZE".into(),
                        message: "must be at least 1".into(),
                    });
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: "SORTER_BATCH_SIZE".into(),
                        message: e.to_string(),
                    });
                }
            },
            None => defaults.batch_size,
        };

        Ok(Self {
            inbox_id: non_empty(&lookup, "SORTER_INBOX_ID").unwrap_or(defaults.inbox_id),
            batch_size,
        })
    }
}
