//! Application state shared across handlers.

use std::sync::Arc;

use crate::academy::AcademyClient;
use crate::config::PortalConfig;
use crate::session::SessionStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// academy API client, the process-scoped session store, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PortalConfig,
    academy: AcademyClient,
    session: SessionStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the academy HTTP client cannot be built.
    pub fn new(config: PortalConfig) -> Result<Self, reqwest::Error> {
        let academy = AcademyClient::new(
            config.academy_api_url.clone(),
            config.academy_api_timeout,
        )?;
        let session = SessionStore::open(academy.clone(), &config.state_dir);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                academy,
                session,
            }),
        })
    }

    /// Get a reference to the portal configuration.
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Get a reference to the academy API client.
    #[must_use]
    pub fn academy(&self) -> &AcademyClient {
        &self.inner.academy
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }
}
