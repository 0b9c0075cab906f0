//! REST control-plane client.
//!
//! Thin bearer-token client for the three calls this subsystem needs from
//! the control plane: password-grant login, roster fetch, and the PATCH
//! command call. Everything else the dashboard's REST API offers (user
//! CRUD, audit logs, reports) is out of scope and has no client here.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use gridlight_core::{Cluster, CommandBody, GridlightError, Result, UnitId};

use crate::dispatcher::ControlPlane;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Bearer-token REST client for the control plane.
pub struct RestControlPlane {
    http: Client,
    api_base: String,
    token: String,
}

impl RestControlPlane {
    /// Build a client around an already-issued session token.
    #[must_use]
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: trim_base(api_base.into()),
            token: token.into(),
        }
    }

    /// Password-grant login against `{api_base}/auth/token`.
    ///
    /// Token issuance itself is the server's business; this only exchanges
    /// credentials for a session token to hang on subsequent calls.
    ///
    /// # Errors
    ///
    /// [`GridlightError::ControlPlane`] on transport failure or rejection.
    pub async fn login(api_base: &str, username: &str, password: &str) -> Result<Self> {
        let api_base = trim_base(api_base.to_string());
        let http = Client::new();
        let url = format!("{api_base}/auth/token");

        let response = http
            .post(&url)
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| GridlightError::ControlPlane(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GridlightError::ControlPlane(format!(
                "login rejected: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GridlightError::ControlPlane(format!("bad token response: {e}")))?;

        debug!("control-plane session established");
        Ok(Self {
            http,
            api_base,
            token: token.access_token,
        })
    }

    /// The session token, for channels that authenticate by query parameter.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

#[async_trait]
impl ControlPlane for RestControlPlane {
    async fn fetch_roster(&self) -> Result<Vec<Cluster>> {
        let url = format!("{}/clusters/my-clusters", self.api_base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GridlightError::ControlPlane(format!("roster fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GridlightError::ControlPlane(format!(
                "roster fetch rejected: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GridlightError::ControlPlane(format!("bad roster response: {e}")))
    }

    async fn send_command(&self, unit_id: UnitId, body: &CommandBody) -> Result<()> {
        let url = format!("{}/unit/{}/command", self.api_base, unit_id);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| GridlightError::ControlPlane(format!("command call failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GridlightError::ControlPlane(format!(
                "command rejected for unit {unit_id}: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RestControlPlane::new("http://host:8000/", "t0ken");
        assert_eq!(client.api_base, "http://host:8000");
        assert_eq!(client.token(), "t0ken");
    }
}
