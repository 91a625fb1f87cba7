//! Hosted-store adapter.
//!
//! [`RestStore`] speaks the PostgREST-style row API of the hosted relational
//! service: rows live under `/rest/v1/<table>`, filters are query
//! parameters (`owner_id=eq.…`), and writes ask for the stored row back
//! with `Prefer: return=representation`.  Row-level security on the server
//! is the authority on ownership; this adapter still scopes every request
//! by owner so a misconfigured table never leaks rows.

use async_trait::async_trait;

use crate::config::StoreConfig;

use super::record::{NewPitch, PitchStore, SavedPitch, StoreError};

// ---------------------------------------------------------------------------
// RestStore
// ---------------------------------------------------------------------------

/// [`PitchStore`] backed by a PostgREST-compatible endpoint.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    table: String,
    api_key: Option<String>,
}

impl RestStore {
    /// Build a store from application config.
    ///
    /// Returns `None` when no store endpoint is configured (offline runs use
    /// the in-memory store instead).
    pub fn from_config(config: &StoreConfig) -> Option<Self> {
        let base_url = config.base_url.clone()?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Some(Self {
            client,
            base_url,
            table: config.table.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), self.table)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.api_key.as_deref().unwrap_or("");
        if key.is_empty() {
            req
        } else {
            req.bearer_auth(key).header("apikey", key)
        }
    }

    async fn into_store_error(response: reqwest::Response) -> StoreError {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        StoreError::PersistenceFailed(format!("store returned {status}: {detail}"))
    }
}

#[async_trait]
impl PitchStore for RestStore {
    async fn save(&self, pitch: NewPitch) -> Result<SavedPitch, StoreError> {
        let req = self
            .client
            .post(self.rows_url())
            .header("Prefer", "return=representation")
            .json(&pitch);

        let response = self.with_auth(req).send().await?;
        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }

        // PostgREST returns the inserted rows as an array.
        let mut rows: Vec<SavedPitch> = response
            .json()
            .await
            .map_err(|e| StoreError::PersistenceFailed(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| StoreError::PersistenceFailed("write returned no row".into()))
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<SavedPitch>, StoreError> {
        let req = self.client.get(self.rows_url()).query(&[
            ("owner_id", format!("eq.{owner_id}")),
            ("order", "created_at.desc".to_string()),
            ("select", "*".to_string()),
        ]);

        let response = self.with_auth(req).send().await?;
        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::PersistenceFailed(e.to_string()))
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), StoreError> {
        let req = self
            .client
            .delete(self.rows_url())
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{id}")),
                ("owner_id", format!("eq.{owner_id}")),
            ]);

        let response = self.with_auth(req).send().await?;
        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }

        // With return=representation an empty array means nothing matched
        // both filters — surface that instead of a silent no-op.
        let rows: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| StoreError::PersistenceFailed(e.to_string()))?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
