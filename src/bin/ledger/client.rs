//! Bounty Ledger HTTP client

use anyhow::{anyhow, Context, Result};
use bounty_ledger::server::{
    BalanceResponse, EventsResponse, ReporterResponse, StateResponse, TxResponse,
};
use bounty_ledger::{Appeal, Report, SignedCall};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LedgerClient {
    client: Client,
    base_url: String,
}

impl LedgerClient {
    pub fn new(url: &str) -> Self {
        // Build HTTP client with timeout, falling back to default client if builder fails
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON resource; `None` on 404
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .context("Failed to connect to server")?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_success() {
            Ok(Some(resp.json().await?))
        } else {
            let error_text = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
            Err(anyhow!("Request to {} failed ({}): {}", path, status, error_text))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_optional(path)
            .await?
            .ok_or_else(|| anyhow!("{} not found", path))
    }

    /// Submit a signed call. Ledger rejections come back as a `TxResponse`
    /// with `ok = false`, not as an error.
    pub async fn send_tx(&self, call: &SignedCall) -> Result<TxResponse> {
        let resp = self
            .client
            .post(self.url("tx"))
            .json(call)
            .send()
            .await
            .context("Failed to connect to server")?;

        let status = resp.status();
        let body = resp.text().await?;
        serde_json::from_str(&body)
            .with_context(|| format!("Unexpected response ({}): {}", status, body))
    }

    pub async fn get_state(&self) -> Result<StateResponse> {
        self.get("state").await
    }

    pub async fn get_report(&self, id: u64) -> Result<Option<Report>> {
        self.get_optional(&format!("reports/{}", id)).await
    }

    pub async fn get_appeal(&self, id: u64) -> Result<Option<Appeal>> {
        self.get_optional(&format!("appeals/{}", id)).await
    }

    pub async fn get_reporter(&self, address: &str) -> Result<Option<ReporterResponse>> {
        self.get_optional(&format!("reporters/{}", address)).await
    }

    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let body: BalanceResponse = self.get(&format!("balances/{}", address)).await?;
        Ok(body.balance)
    }

    pub async fn get_events(&self, since: u64, limit: usize) -> Result<EventsResponse> {
        self.get(&format!("events?since={}&limit={}", since, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = LedgerClient::new("http://127.0.0.1:8080/");
        assert_eq!(client.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_url() {
        let client = LedgerClient::new("http://127.0.0.1:8080");
        assert_eq!(client.url("/reports/3"), "http://127.0.0.1:8080/reports/3");
        assert_eq!(client.url("tx"), "http://127.0.0.1:8080/tx");
    }
}
