use std::sync::Arc;
use std::time::Duration;

use crate::backend::gotrue::GoTrueAuth;
use crate::backend::memory::MemoryBackend;
use crate::backend::rest::RestTables;
use crate::backend::{AuthApi, TableApi};
use crate::config::AppConfig;
use crate::media::cloudinary::CloudinaryHost;
use crate::media::MediaHost;
use crate::session::SessionContext;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tables: Arc<dyn TableApi>,
    pub auth: Arc<dyn AuthApi>,
    pub media: Arc<dyn MediaHost>,
    pub sessions: Arc<SessionContext>,
    pub hosted: bool,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        tables: Arc<dyn TableApi>,
        auth: Arc<dyn AuthApi>,
        media: Arc<dyn MediaHost>,
    ) -> Self {
        let sessions = Arc::new(SessionContext::new(tables.clone(), auth.clone()));
        Self {
            config: Arc::new(config),
            tables,
            auth,
            media,
            sessions,
            hosted: false,
        }
    }

    /// Wire the hosted clients, or the in-memory backend when no project URL is set.
    pub fn from_config(config: AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.request_timeout_secs))
            .build()?;
        let media: Arc<dyn MediaHost> =
            Arc::new(CloudinaryHost::new(client.clone(), config.media.clone()));
        if !media.is_configured() {
            tracing::warn!("Cloudinary credentials not set. Image uploads will fail.");
        }

        let state = match config.backend.url.clone() {
            Some(url) => {
                let tables = Arc::new(RestTables::new(client.clone(), &url, &config.backend));
                let auth = Arc::new(GoTrueAuth::new(client, &url, &config.backend));
                tracing::info!(backend = %url, "using hosted backend");
                let mut state = Self::new(config, tables, auth, media);
                state.hosted = true;
                state
            }
            None => {
                tracing::warn!(
                    "SUPABASE_URL not set. Running against the in-memory backend; data is lost on exit."
                );
                let backend = Arc::new(MemoryBackend::new());
                Self::new(config, backend.clone(), backend, media)
            }
        };
        Ok(state)
    }
}
