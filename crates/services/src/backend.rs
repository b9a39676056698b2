//! The bundle of Domain Services the store talks to.

use crate::config::{BackendKind, ClientConfig};
use crate::http::{
    HttpAuthService, HttpCommentService, HttpFileService, HttpFolderService,
    HttpNotificationService, HttpProjectService,
};
use crate::mock::MockBackend;
use crate::session::SessionContext;
use crate::traits::{
    AuthService, CommentService, FileService, FolderService, NotificationService, ProjectService,
};
use crate::transport::HttpTransport;
use gradtrack_core::ApiResult;
use std::sync::Arc;
use tracing::info;

/// One service per entity family. Which implementation sits behind them is
/// decided once, when the bundle is built.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthService>,
    pub projects: Arc<dyn ProjectService>,
    pub folders: Arc<dyn FolderService>,
    pub files: Arc<dyn FileService>,
    pub comments: Arc<dyn CommentService>,
    pub notifications: Arc<dyn NotificationService>,
}

impl Backend {
    /// Every family answered by the same mock.
    pub fn mock(mock: Arc<MockBackend>) -> Self {
        Self {
            auth: mock.clone(),
            projects: mock.clone(),
            folders: mock.clone(),
            files: mock.clone(),
            comments: mock.clone(),
            notifications: mock,
        }
    }

    /// Every family answered over HTTP through one transport.
    pub fn http(transport: Arc<HttpTransport>) -> Self {
        Self {
            auth: Arc::new(HttpAuthService::new(transport.clone())),
            projects: Arc::new(HttpProjectService::new(transport.clone())),
            folders: Arc::new(HttpFolderService::new(transport.clone())),
            files: Arc::new(HttpFileService::new(transport.clone())),
            comments: Arc::new(HttpCommentService::new(transport.clone())),
            notifications: Arc::new(HttpNotificationService::new(transport)),
        }
    }

    /// Build the backend the configuration selects.
    pub fn from_config(config: &ClientConfig, session: SessionContext) -> ApiResult<Self> {
        match config.backend {
            BackendKind::Mock => {
                info!("Using mock backend");
                let mock = MockBackend::new(session).with_latency(config.mock_latency());
                Ok(Self::mock(Arc::new(mock)))
            }
            BackendKind::Http => {
                info!("Using HTTP backend at {}", config.api_url);
                let transport =
                    HttpTransport::new(&config.api_url, config.request_timeout(), session)?;
                Ok(Self::http(Arc::new(transport)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradtrack_core::Credentials;
    use gradtrack_storage::MemorySessionStore;

    #[tokio::test]
    async fn test_default_config_builds_mock() {
        let session = SessionContext::new(Arc::new(MemorySessionStore::new()));
        let backend = Backend::from_config(&ClientConfig::default(), session).unwrap();
        let session = backend
            .auth
            .login(Credentials {
                email: "supervisor@test.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.token, "mock-supervisor-token-456");
    }

    #[test]
    fn test_http_config_builds() {
        let session = SessionContext::new(Arc::new(MemorySessionStore::new()));
        let config = ClientConfig {
            backend: BackendKind::Http,
            ..Default::default()
        };
        assert!(Backend::from_config(&config, session).is_ok());
    }
}
