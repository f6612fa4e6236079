//! Blocking HTTP clients for Azure Resource Manager and dataset downloads

use super::credentials::{resolve_access_token, resource_for_endpoint};
use super::error::{AzureApiError, Result};
use super::traits::{ResourceQuery, SubscriptionSource, TextFetcher};
use super::types::{
    QueryRequestOptions, ResourceGraphRequest, ResourceGraphResponse, ResourceRecord,
    SubscriptionListResponse,
};
use crate::config::types::AzureConfig;
use log::{debug, info};
use once_cell::sync::OnceCell;
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Resource Graph API version
const RESOURCE_GRAPH_API_VERSION: &str = "2022-10-01";
/// Subscriptions API version
const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

/// User agent for API requests
const USER_AGENT: &str = concat!("azgov-audit/", env!("CARGO_PKG_VERSION"));

/// Client for Azure Resource Manager
pub struct AzureClient {
    /// HTTP client with configured timeout and headers
    http_client: Client,
    /// Management endpoint, without trailing slash
    endpoint: String,
    /// Resource Graph page size (`$top`)
    page_size: u32,
    /// Bearer token, resolved on first use
    token: OnceCell<String>,
}

impl AzureClient {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(AzureApiError::HttpError)?;

        Ok(Self {
            http_client,
            endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            token: OnceCell::new(),
        })
    }

    /// Client that uses a fixed bearer token instead of resolving one
    pub fn with_token(config: &AzureConfig, token: impl Into<String>) -> Result<Self> {
        let client = Self::new(config)?;
        let _ = client.token.set(token.into());
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn access_token(&self) -> Result<&str> {
        self.token
            .get_or_try_init(|| resolve_access_token(&resource_for_endpoint(&self.endpoint)))
            .map(String::as_str)
    }

    fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(self.access_token()?)
            .send()?;
        handle_response(response)
    }

    fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(self.access_token()?)
            .json(body)
            .send()?;
        handle_response(response)
    }

    /// Run a Resource Graph query, following `$skipToken` pages.
    ///
    /// Rows that do not deserialize as a [`ResourceRecord`] (no `id`) are skipped.
    ///
    /// Endpoint: POST /providers/Microsoft.ResourceGraph/resources
    pub fn query_resources(
        &self,
        subscriptions: &[String],
        query: &str,
    ) -> Result<Vec<ResourceRecord>> {
        let url = resource_graph_url(&self.endpoint);
        let mut records = Vec::new();
        let mut skip_token: Option<String> = None;

        loop {
            let request = ResourceGraphRequest {
                subscriptions,
                query,
                options: QueryRequestOptions {
                    top: self.page_size,
                    skip_token: skip_token.take(),
                    result_format: "objectArray",
                },
            };
            let page: ResourceGraphResponse = self.post(&url, &request)?;
            debug!(
                "Resource Graph page: {} row(s) of {} total",
                page.count, page.total_records
            );

            for row in page.data {
                match serde_json::from_value::<ResourceRecord>(row) {
                    Ok(record) => records.push(record),
                    Err(e) => debug!("Skipping unreadable Resource Graph row: {}", e),
                }
            }

            match page.skip_token {
                Some(token) if !token.is_empty() => skip_token = Some(token),
                _ => break,
            }
        }

        info!("Resource Graph returned {} resource(s)", records.len());
        Ok(records)
    }

    /// List every subscription visible to the caller, following `nextLink`.
    ///
    /// Endpoint: GET /subscriptions
    pub fn list_subscriptions(&self) -> Result<Vec<super::types::Subscription>> {
        let mut url = subscriptions_url(&self.endpoint);
        let mut subscriptions = Vec::new();

        loop {
            let page: SubscriptionListResponse = self.get(&url)?;
            subscriptions.extend(page.value);
            match page.next_link {
                Some(next) if !next.is_empty() => url = next,
                _ => break,
            }
        }

        Ok(subscriptions)
    }
}

impl ResourceQuery for AzureClient {
    fn query(&self, subscriptions: &[String], query: &str) -> Result<Vec<ResourceRecord>> {
        self.query_resources(subscriptions, query)
    }
}

impl SubscriptionSource for AzureClient {
    fn subscription_ids(&self) -> Result<Vec<String>> {
        let subscriptions = self.list_subscriptions()?;
        let total = subscriptions.len();
        let enabled: Vec<String> = subscriptions
            .into_iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.subscription_id)
            .collect();
        debug!("{} of {} subscription(s) are enabled", enabled.len(), total);
        Ok(enabled)
    }
}

/// Unauthenticated downloader for public datasets
pub struct HttpTextFetcher {
    http_client: Client,
}

impl HttpTextFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(AzureApiError::HttpError)?;
        Ok(Self { http_client })
    }
}

impl TextFetcher for HttpTextFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("Downloading {}", url);
        let response = self.http_client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(AzureApiError::from_status(status.as_u16(), &body))
        }
    }
}

/// Convert a response into `T` or the matching error variant
fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .map_err(|e| AzureApiError::ParseError(e.to_string()))
    } else {
        let body = response.text().unwrap_or_default();
        Err(AzureApiError::from_status(status.as_u16(), &body))
    }
}

fn resource_graph_url(endpoint: &str) -> String {
    format!(
        "{}/providers/Microsoft.ResourceGraph/resources?api-version={}",
        endpoint, RESOURCE_GRAPH_API_VERSION
    )
}

fn subscriptions_url(endpoint: &str) -> String {
    format!(
        "{}/subscriptions?api-version={}",
        endpoint, SUBSCRIPTIONS_API_VERSION
    )
}
