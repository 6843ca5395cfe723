//! Atlas Admin API contract and thin HTTP client.
//!
//! The Atlas control plane is an external collaborator; tools depend only
//! on the [`AtlasApi`] trait. The bundled client covers the endpoints the
//! tool catalog needs, authenticating with a service-account token.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServerError;

pub const ATLAS_API_BASE_URL: &str = "https://cloud.mongodb.com";
const ATLAS_API_VERSION_ACCEPT: &str = "application/vnd.atlas.2023-02-01+json";

#[derive(Clone, Debug, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccessListEntry {
    /// Single address to allow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// CIDR block to allow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DatabaseRole {
    pub role_name: String,
    pub database_name: String,
}

#[derive(Clone, Debug)]
pub struct DbUserSpec {
    pub username: String,
    pub password: String,
    pub roles: Vec<DatabaseRole>,
    pub delete_after: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait AtlasApi: Send + Sync {
    async fn list_orgs(&self) -> Result<Vec<Value>, ServerError>;
    async fn list_projects(&self) -> Result<Vec<Value>, ServerError>;
    async fn inspect_cluster(&self, project_id: &str, cluster: &str) -> Result<Value, ServerError>;
    async fn create_access_list(
        &self,
        project_id: &str,
        entries: &[AccessListEntry],
    ) -> Result<(), ServerError>;
    async fn create_db_user(&self, project_id: &str, user: DbUserSpec) -> Result<Value, ServerError>;
}

/// Expiry timestamp for a temporary database user.
pub fn temporary_user_expiry(lifetime_ms: u64) -> DateTime<Utc> {
    Utc::now() + ChronoDuration::milliseconds(lifetime_ms as i64)
}

pub struct AtlasClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PagedResponse {
    #[serde(default)]
    results: Vec<Value>,
}

impl AtlasClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_base_url(client_id, client_secret, ATLAS_API_BASE_URL.to_string())
    }

    pub fn with_base_url(client_id: String, client_secret: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            client_id,
            client_secret,
        }
    }

    async fn token(&self) -> Result<String, ServerError> {
        let response = self
            .http
            .post(format!("{}/api/oauth/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|err| ServerError::unexpected(format!("Atlas token request: {err}")))?;
        if !response.status().is_success() {
            return Err(ServerError::unexpected(format!(
                "Atlas token request failed with status {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| ServerError::unexpected(format!("Atlas token response: {err}")))?;
        Ok(token.access_token)
    }

    async fn get(&self, path: &str) -> Result<Value, ServerError> {
        let token = self.token().await?;
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ATLAS_API_VERSION_ACCEPT)
            .send()
            .await
            .map_err(|err| ServerError::unexpected(format!("Atlas request: {err}")))?;
        Self::parse(response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ServerError> {
        let token = self.token().await?;
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ATLAS_API_VERSION_ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(|err| ServerError::unexpected(format!("Atlas request: {err}")))?;
        Self::parse(response).await
    }

    async fn parse(response: reqwest::Response) -> Result<Value, ServerError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ServerError::unexpected(format!(
                "Atlas API returned status {status}: {body}"
            )));
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|err| ServerError::unexpected(format!("Atlas API response: {err}")))
    }

    fn results(value: Value) -> Vec<Value> {
        serde_json::from_value::<PagedResponse>(value)
            .map(|page| page.results)
            .unwrap_or_default()
    }
}

#[async_trait]
impl AtlasApi for AtlasClient {
    async fn list_orgs(&self) -> Result<Vec<Value>, ServerError> {
        Ok(Self::results(self.get("/api/atlas/v2/orgs").await?))
    }

    async fn list_projects(&self) -> Result<Vec<Value>, ServerError> {
        Ok(Self::results(self.get("/api/atlas/v2/groups").await?))
    }

    async fn inspect_cluster(&self, project_id: &str, cluster: &str) -> Result<Value, ServerError> {
        self.get(&format!("/api/atlas/v2/groups/{project_id}/clusters/{cluster}"))
            .await
    }

    async fn create_access_list(
        &self,
        project_id: &str,
        entries: &[AccessListEntry],
    ) -> Result<(), ServerError> {
        let body = serde_json::to_value(entries)
            .map_err(|err| ServerError::unexpected(err.to_string()))?;
        self.post(&format!("/api/atlas/v2/groups/{project_id}/accessList"), body)
            .await?;
        Ok(())
    }

    async fn create_db_user(&self, project_id: &str, user: DbUserSpec) -> Result<Value, ServerError> {
        let mut body = serde_json::json!({
            "databaseName": "admin",
            "username": user.username,
            "password": user.password,
            "roles": user.roles,
        });
        if let Some(delete_after) = user.delete_after {
            body["deleteAfterDate"] = Value::String(delete_after.to_rfc3339());
        }
        self.post(
            &format!("/api/atlas/v2/groups/{project_id}/databaseUsers"),
            body,
        )
        .await
    }
}
