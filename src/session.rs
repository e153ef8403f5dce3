use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::RoundtripConfig;
use crate::error::SetupError;
use crate::remote::RestClient;

/// An authenticated connection to the service, created once per run.
///
/// Nothing in it changes after [`open`](Session::open). Use
/// [`scoped`](Session::scoped) so that logout happens whatever the body
/// returns.
pub struct Session {
    client: RestClient,
    username: String,
}

impl Session {
    pub async fn open(config: &RoundtripConfig) -> Result<Self> {
        let client = RestClient::new(&config.server_url, &config.resource_type)?;
        client
            .login(&config.username, &config.password)
            .await
            .map_err(|e| SetupError::Login(e.to_string()))?;
        info!(server = %client.base_url(), user = %config.username, "session opened");
        Ok(Self {
            client,
            username: config.username.clone(),
        })
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Run `body` with this session, then log out regardless of the result.
    pub async fn scoped<T>(self, body: impl AsyncFnOnce(&Session) -> Result<T>) -> Result<T> {
        let result = body(&self).await;
        self.close().await;
        result
    }

    pub async fn close(self) {
        match self.client.logout().await {
            Ok(()) => debug!(user = %self.username, "logged out"),
            Err(err) => warn!(user = %self.username, error = %err, "logout failed"),
        }
    }
}
