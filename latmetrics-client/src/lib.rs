use latmetrics_common::{ErrorResponse, HealthResponse, LatMetricsError, MetricsRequest, MetricsResult, Result};

/// LatMetrics client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:8000`. A trailing slash is ignored.
    pub base_url: String,
}

/// LatMetrics Client
pub struct MetricsClient {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl MetricsClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self { config, http_client: reqwest::Client::new() }
    }

    /// Build the URL for `path` (which must start with `/`) against the configured server.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Request metrics for `regions`. Regions the server has no data for are absent
    /// from the returned map.
    pub async fn fetch_metrics(&self, regions: &[&str], threshold_ms: i64) -> Result<MetricsResult> {
        let request = MetricsRequest {
            regions: regions.iter().map(|r| r.to_string()).collect(),
            threshold_ms,
        };

        let response = self
            .http_client
            .post(self.build_url("/"))
            .json(&request)
            .send()
            .await
            .map_err(|e| LatMetricsError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        response
            .json::<MetricsResult>()
            .await
            .map_err(|e| LatMetricsError::NetworkError(e.to_string()))
    }

    /// Query `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http_client
            .get(self.build_url("/health"))
            .send()
            .await
            .map_err(|e| LatMetricsError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        response
            .json::<HealthResponse>()
            .await
            .map_err(|e| LatMetricsError::NetworkError(e.to_string()))
    }
}

async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> LatMetricsError {
    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .map(|r| r.error)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    LatMetricsError::HttpError(status.as_u16(), error_msg)
}
