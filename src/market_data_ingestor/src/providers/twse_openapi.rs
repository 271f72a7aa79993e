//! Exchange daily reports from the TWSE OpenAPI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared_utils::env::env_var_or;
use snafu::ResultExt;

use crate::{
    models::report::ReportKind,
    providers::{
        ApiSnafu, ClientBuildSnafu, PayloadSnafu, ProviderError, ProviderInitError, RateLimitedSnafu,
        ReportProvider, ReqwestSnafu,
    },
};

const BASE_URL: &str = "https://openapi.twse.com.tw/v1";
/// Overrides [`BASE_URL`].
const BASE_URL_ENV: &str = "TWSE_OPENAPI_BASE_URL";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TwseOpenApiProvider {
    client: Client,
    base_url: String,
}

impl TwseOpenApiProvider {
    /// Creates a provider against the public OpenAPI, or the one named by
    /// `TWSE_OPENAPI_BASE_URL`.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_base_url(env_var_or(BASE_URL_ENV, BASE_URL))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(ClientBuildSnafu)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, kind: ReportKind) -> String {
        format!("{}/exchangeReport/{}", self.base_url, kind.endpoint())
    }
}

#[async_trait]
impl ReportProvider for TwseOpenApiProvider {
    async fn fetch_report(&self, kind: ReportKind) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .client
            .get(self.url(kind))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return RateLimitedSnafu {
                message: format!("{kind} answered 429"),
            }
            .fail();
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        let body = response.text().await.context(ReqwestSnafu)?;
        let payload: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            PayloadSnafu {
                message: format!("{kind}: {e}"),
            }
            .build()
        })?;
        if !payload.is_array() {
            return PayloadSnafu {
                message: format!("{kind} did not return a list"),
            }
            .fail();
        }
        Ok(payload)
    }
}
