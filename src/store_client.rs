use std::{future::Future, time::Duration};

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};

use crate::{config::BackendConfig, domain::SubscriberEmail, util::error_chain_fmt};

const UNIQUE_VIOLATION: &str = "23505";
// insufficient_privilege, raised by row level security
const INSUFFICIENT_PRIVILEGE: &str = "42501";

pub trait SubscriberStore {
    fn is_configured(&self) -> bool;

    fn insert_email(
        &self,
        email: &SubscriberEmail,
    ) -> impl Future<Output = Result<Record, InsertError>> + Send;
}

impl<T: SubscriberStore + ?Sized> SubscriberStore for &T {
    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }

    fn insert_email(
        &self,
        email: &SubscriberEmail,
    ) -> impl Future<Output = Result<Record, InsertError>> + Send {
        (**self).insert_email(email)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Record {
    fn from_email(email: &SubscriberEmail) -> Self {
        Self {
            id: None,
            email: email.as_ref().to_owned(),
            created_at: None,
        }
    }
}

#[derive(thiserror::Error)]
pub enum InsertError {
    #[error("the email is already in the subscriber table.")]
    Duplicate,
    #[error("the subscriber store rejected the write: {0}")]
    Permission(String),
    #[error("the subscriber store is not configured.")]
    NotConfigured,
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

impl std::fmt::Debug for InsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct BackendStatus {
    pub configured: bool,
    pub connected: bool,
    pub message: String,
}

/// Client for a PostgREST-style hosted table (`{url}/rest/v1/{table}`).
pub struct StoreClient {
    connection: Option<Connection>,
    table: String,
    write_created_at: bool,
    write_subscribed: bool,
}

struct Connection {
    client: reqwest::Client,
    base_url: Url,
    access_token: SecretString,
}

impl Connection {
    fn new(base_url: &str, access_token: SecretString, timeout: Duration) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(base_url.trim())
            .with_context(|| format!("`{base_url}` is not a valid subscriber store url."))?;
        if base_url.cannot_be_a_base() {
            bail!("`{base_url}` cannot be used as a subscriber store url.");
        }
        // keep the last path segment when joining the table path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build subscriber store client.")?;

        Ok(Self {
            client,
            base_url,
            access_token,
        })
    }

    fn table_url(&self, table: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(&format!("rest/v1/{table}"))
            .with_context(|| format!("failed to build the url of table `{table}`."))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let token = self.access_token.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", token)
            .bearer_auth(token)
    }
}

impl StoreClient {
    /// Missing or unusable credentials degrade to an unconfigured client.
    pub fn from_config(config: &BackendConfig) -> Self {
        let url = config.url.as_deref().filter(|u| !u.trim().is_empty());
        let token = config
            .access_token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty());

        let connection = match (url, token) {
            (Some(url), Some(token)) => {
                match Connection::new(url, token.clone(), config.timeout()) {
                    Ok(connection) => Some(connection),
                    Err(e) => {
                        tracing::warn!(
                            error.cause_chain = ?e,
                            "subscriber store disabled, newsletter signup is unavailable."
                        );
                        None
                    }
                }
            }
            _ => {
                tracing::warn!(
                    "no subscriber store url or access token supplied, newsletter signup is unavailable."
                );
                None
            }
        };

        Self {
            connection,
            table: config.table.clone(),
            write_created_at: config.write_created_at,
            write_subscribed: config.write_subscribed,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    #[tracing::instrument(name = "checking subscriber store connection", skip(self), fields(table = %self.table))]
    pub async fn check_connection(&self) -> BackendStatus {
        let Some(connection) = &self.connection else {
            return BackendStatus {
                configured: false,
                connected: false,
                message: InsertError::NotConfigured.to_string(),
            };
        };

        let result = async {
            let mut url = connection.table_url(&self.table)?;
            url.query_pairs_mut().append_pair("select", "count");
            let response = connection
                .request(reqwest::Method::HEAD, url)
                .header("Prefer", "count=exact")
                .send()
                .await
                .context("failed to reach the subscriber store.")?;
            let status = response.status();
            if !status.is_success() {
                bail!("the subscriber store responded with {status}.");
            }
            Ok::<_, anyhow::Error>(())
        }
        .await;

        match result {
            Ok(()) => BackendStatus {
                configured: true,
                connected: true,
                message: format!("connected to table `{}`.", self.table),
            },
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "subscriber store connection check failed.");
                BackendStatus {
                    configured: true,
                    connected: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

impl SubscriberStore for StoreClient {
    fn is_configured(&self) -> bool {
        self.connection.is_some()
    }

    #[tracing::instrument(
        name = "inserting subscriber email",
        skip_all,
        fields(subscriber_email = %email, table = %self.table)
    )]
    async fn insert_email(&self, email: &SubscriberEmail) -> Result<Record, InsertError> {
        let Some(connection) = &self.connection else {
            return Err(InsertError::NotConfigured);
        };

        let url = connection.table_url(&self.table)?;
        let row = InsertRow {
            email: email.as_ref(),
            created_at: self.write_created_at.then(Utc::now),
            subscribed: self.write_subscribed.then_some(true),
        };
        let response = connection
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .context("failed to reach the subscriber store.")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        // the row is stored at this point, an unexpected body is not a failure
        let records = match response.json::<Vec<Record>>().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "unexpected insert response body.");
                Vec::new()
            }
        };
        Ok(records
            .into_iter()
            .next()
            .unwrap_or_else(|| Record::from_email(email)))
    }
}

#[derive(serde::Serialize)]
struct InsertRow<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscribed: Option<bool>,
}

#[derive(serde::Deserialize, Default)]
struct StoreErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn classify_failure(status: StatusCode, body: &str) -> InsertError {
    let error: StoreErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = error.message.unwrap_or_else(|| status.to_string());

    match error.code.as_deref() {
        Some(UNIQUE_VIOLATION) => InsertError::Duplicate,
        Some(INSUFFICIENT_PRIVILEGE) => InsertError::Permission(message),
        _ if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            InsertError::Permission(message)
        }
        code => InsertError::Transient(anyhow!(
            "the subscriber store responded with {status} (code {}): {message}",
            code.unwrap_or("none")
        )),
    }
}
