//! Per-client session and connection lifecycle.
//!
//! Each transport connection owns one `Session`. The connection state is
//! mutated only while holding the session's state lock, which serializes
//! transitions: two tool calls can never race into `Connecting` for the
//! same session.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mongo_mcp_config::{connection_string_auth_type, AuthType, Config};
use mongo_mcp_embeddings::{EmbeddingService, VoyageClient};

use crate::atlas::AtlasApi;
use crate::error::ServerError;
use crate::provider::{MongoDbProvider, Provider};

pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected {
        provider: Arc<dyn Provider>,
        auth_type: AuthType,
    },
    Errored(String),
}

impl ConnectionState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected { .. } => "connected",
            Self::Errored(_) => "errored",
        }
    }
}

/// Seam for opening providers, so tests connect to in-memory fakes.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<Arc<dyn Provider>, ServerError>;
}

pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self, uri: &str) -> Result<Arc<dyn Provider>, ServerError> {
        Ok(Arc::new(MongoDbProvider::connect(uri).await?))
    }
}

pub struct Session {
    state: Mutex<ConnectionState>,
    config: Arc<Config>,
    connector: Arc<dyn Connector>,
    embedding_service: Option<Arc<dyn EmbeddingService>>,
    atlas: Option<Arc<dyn AtlasApi>>,
}

impl Session {
    pub fn new(
        config: Arc<Config>,
        connector: Arc<dyn Connector>,
        atlas: Option<Arc<dyn AtlasApi>>,
    ) -> Self {
        let embedding_service: Option<Arc<dyn EmbeddingService>> = config
            .voyage_api_key
            .as_ref()
            .map(|key| Arc::new(VoyageClient::new(key.clone())) as Arc<dyn EmbeddingService>);
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            config,
            connector,
            embedding_service,
            atlas,
        }
    }

    /// Session with an explicit embedding service (tests).
    pub fn with_embedding_service(
        config: Arc<Config>,
        connector: Arc<dyn Connector>,
        atlas: Option<Arc<dyn AtlasApi>>,
        embedding_service: Option<Arc<dyn EmbeddingService>>,
    ) -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            config,
            connector,
            embedding_service,
            atlas,
        }
    }

    pub fn embedding_service(&self) -> Option<Arc<dyn EmbeddingService>> {
        self.embedding_service.clone()
    }

    pub fn atlas(&self) -> Option<Arc<dyn AtlasApi>> {
        self.atlas.clone()
    }

    /// Return the connected provider, auto-connecting with the configured
    /// connection string when necessary.
    pub async fn ensure_connected(&self) -> Result<Arc<dyn Provider>, ServerError> {
        let mut state = self.state.lock().await;
        if let ConnectionState::Connected { provider, .. } = &*state {
            return Ok(provider.clone());
        }

        let Some(uri) = self.config.connection_string.clone() else {
            return Err(ServerError::not_connected());
        };
        Self::transition_connect(&mut state, self.connector.as_ref(), &uri)
            .await
            .map(|(provider, _)| provider)
    }

    /// Connect (or reconnect) using an explicit connection string.
    pub async fn connect_with(&self, uri: &str) -> Result<AuthType, ServerError> {
        let mut state = self.state.lock().await;
        if let ConnectionState::Connected { provider, .. } = &*state {
            provider.close().await;
        }
        Self::transition_connect(&mut state, self.connector.as_ref(), uri)
            .await
            .map(|(_, auth_type)| auth_type)
    }

    async fn transition_connect(
        state: &mut ConnectionState,
        connector: &dyn Connector,
        uri: &str,
    ) -> Result<(Arc<dyn Provider>, AuthType), ServerError> {
        *state = ConnectionState::Connecting;
        match connector.connect(uri).await {
            Ok(provider) => {
                let auth_type = connection_string_auth_type(uri);
                *state = ConnectionState::Connected {
                    provider: provider.clone(),
                    auth_type,
                };
                Ok((provider, auth_type))
            }
            Err(err) => {
                *state = ConnectionState::Errored(err.message.clone());
                Err(err)
            }
        }
    }

    /// Close the provider if any. Closing errors are logged, never raised.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if let ConnectionState::Connected { provider, .. } = &*state {
            provider.close().await;
        }
        *state = ConnectionState::Disconnected;
    }

    pub async fn auth_type(&self) -> Option<AuthType> {
        match &*self.state.lock().await {
            ConnectionState::Connected { auth_type, .. } => Some(*auth_type),
            _ => None,
        }
    }

    pub async fn state_name(&self) -> &'static str {
        self.state.lock().await.name()
    }
}
