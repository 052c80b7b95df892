//! Typed HTTP client for the Parigo user and admin APIs.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::{BalanceResponse, BetResponse, MonitorStatsView, PlaceBetRequest};
use crate::optimistic::{BetWriteApi, MutationError};

/// Typed HTTP client for the bet write API and read endpoints.
///
/// Implements [`BetWriteApi`], so it can be plugged directly into an
/// [`OptimisticBetClient`](crate::optimistic::OptimisticBetClient).
#[derive(Debug, Clone)]
pub struct UserClient {
    http: Client,
    base_url: Url,
}

impl UserClient {
    /// Create a new `UserClient` for the given server root URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (timeouts,
    /// proxies, …).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /api/v1/bets` – place a bet.
    pub async fn place_bet(&self, request: &PlaceBetRequest) -> Result<BetResponse, ClientError> {
        let url = self.base_url.join("/api/v1/bets")?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/users/{user_id}/balance` – fetch the durable balance.
    pub async fn balance(&self, user_id: &str) -> Result<BalanceResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/users/{user_id}/balance"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/admin/monitor/stats` – fetch reconciler stats.
    pub async fn monitor_stats(&self) -> Result<MonitorStatsView, ClientError> {
        let url = self.base_url.join("/api/v1/admin/monitor/stats")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/admin/monitor/stats/reset` – reset reconciler stats.
    pub async fn reset_monitor_stats(&self) -> Result<(), ClientError> {
        let url = self.base_url.join("/api/v1/admin/monitor/stats/reset")?;
        let resp = self.http.post(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status,
                body: resp.text().await.unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl BetWriteApi for UserClient {
    async fn place_bet(&self, request: &PlaceBetRequest) -> Result<BetResponse, MutationError> {
        UserClient::place_bet(self, request)
            .await
            .map_err(MutationError::from)
    }
}

/// Deserialize a 2xx response body, or capture the error body.
async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp.json().await?)
    } else {
        Err(ClientError::Api {
            status,
            body: resp.text().await.unwrap_or_default(),
        })
    }
}
