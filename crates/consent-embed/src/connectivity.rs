//! Diagnostic probe of the consent API's client endpoint.

use consent_common::EmbedError;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// What came back from `GET {endpoint}/{clientId}/client`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityReport {
    pub url: String,
    pub status: u16,
    pub body_len: usize,
    /// The body, when it parsed as JSON.
    pub body: Option<Value>,
}

impl ConnectivityReport {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub fn probe_url(endpoint: &str, client_id: &str) -> String {
    format!(
        "{}/{}/client",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(client_id)
    )
}

pub async fn probe(endpoint: &str, client_id: &str) -> Result<ConnectivityReport, EmbedError> {
    let url = probe_url(endpoint, client_id);
    info!(url = %url, "testing API connection");

    let response = reqwest::Client::new()
        .get(&url)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            error!(url = %url, error = %e, "API connection test failed");
            EmbedError::Network(e.to_string())
        })?;

    let status = response.status().as_u16();
    debug!(status, "API test response status");

    let text = response
        .text()
        .await
        .map_err(|e| EmbedError::Network(format!("failed to read response body: {e}")))?;
    debug!(body_len = text.len(), "API test response received");

    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            info!(status, "API test response is valid JSON");
            Some(json)
        }
        Err(e) => {
            warn!(status, error = %e, "API test response is not valid JSON");
            None
        }
    };

    Ok(ConnectivityReport {
        url,
        status,
        body_len: text.len(),
        body,
    })
}
