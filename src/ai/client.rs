use super::auth;
use crate::models::Config;
use crate::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

const API_VERSION: &str = "v1";

/// Regional Vertex AI host for `region`.
pub fn default_base_url(region: &str) -> String {
    format!("https://{}-aiplatform.googleapis.com", region)
}

/// Resource path of a publisher model, e.g.
/// `projects/p/locations/us-central1/publishers/google/models/text-bison`.
pub fn publisher_model_path(project: &str, region: &str, publisher: &str, model: &str) -> String {
    format!(
        "projects/{}/locations/{}/publishers/{}/models/{}",
        project, region, publisher, model
    )
}

/// Resource path of the OpenAI-compatible endpoint used for partner models.
pub fn openapi_endpoint_path(project: &str, region: &str) -> String {
    format!("projects/{}/locations/{}/endpoints/openapi", project, region)
}

/// Thin Vertex AI REST client used by every model adapter.
///
/// One instance is built per prediction call and dropped when the call returns.
pub struct VertexHttpClient {
    client: Client,
    token: String,
    base_url: String,
    project_id: String,
    region_id: String,
    provider: &'static str,
}

impl VertexHttpClient {
    /// Resolve credentials and build a client for `provider` (used in error text).
    pub async fn connect(config: &Config, provider: &'static str) -> Result<Self> {
        let token = auth::access_token(config).await?;
        Ok(Self::new_with_token(config, provider, token))
    }

    pub fn new_with_token(config: &Config, provider: &'static str, token: String) -> Self {
        let base_url = config
            .api_endpoint()
            .map(|e| e.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_base_url(config.region_id()));

        Self {
            client: Client::new(),
            token,
            base_url,
            project_id: config.project_id().to_string(),
            region_id: config.region_id().to_string(),
            provider,
        }
    }

    pub fn model_path(&self, publisher: &str, model: &str) -> String {
        publisher_model_path(&self.project_id, &self.region_id, publisher, model)
    }

    pub fn openapi_path(&self) -> String {
        openapi_endpoint_path(&self.project_id, &self.region_id)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION, path)
    }

    async fn send<Req: Serialize>(&self, path: &str, request: &Req) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("url: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to {}: {}", self.provider, e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::debug!("{} API error (status {}): {}", self.provider, status, error_text);
            return Err(Error::Remote(format!(
                "{} API error (status {}): {}",
                self.provider, status, error_text
            )));
        }

        Ok(response)
    }

    /// POST a JSON body and return the raw JSON response.
    ///
    /// Returns [`Error::Cancelled`] if `ctx` is cancelled before the body arrives.
    pub async fn post_json<Req: Serialize>(
        &self,
        ctx: &CancellationToken,
        path: &str,
        request: &Req,
    ) -> Result<Value> {
        let call = async {
            let response = self.send(path, request).await?;
            let body = response.text().await?;
            serde_json::from_str::<Value>(&body).map_err(|e| {
                tracing::debug!("Failed to parse {} response: {}\nBody: {}", self.provider, e, body);
                Error::Remote(format!("Failed to parse {} response: {}", self.provider, e))
            })
        };

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            result = call => result,
        }
    }

    /// POST a JSON body and hand back the live response for chunked reading.
    pub async fn post_stream<Req: Serialize>(
        &self,
        ctx: &CancellationToken,
        path: &str,
        request: &Req,
    ) -> Result<reqwest::Response> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            result = self.send(path, request) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> Config {
        Config::builder()
            .project_id("proj")
            .region_id("us-east4")
            .api_endpoint(endpoint)
            .access_token("tok")
            .build()
            .unwrap()
    }

    #[test]
    fn test_publisher_model_path() {
        assert_eq!(
            publisher_model_path("proj", "us-central1", "anthropic", "claude-3-haiku@20240307"),
            "projects/proj/locations/us-central1/publishers/anthropic/models/claude-3-haiku@20240307"
        );
    }

    #[test]
    fn test_default_base_url_uses_region() {
        let cfg = Config::builder().project_id("p").region_id("europe-west4").build().unwrap();
        let client = VertexHttpClient::new_with_token(&cfg, "Test", "t".to_string());
        assert_eq!(
            client.url(&client.model_path("google", "text-bison")),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/p/locations/europe-west4/publishers/google/models/text-bison"
        );
    }

    #[tokio::test]
    async fn test_post_json_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/proj/locations/us-east4/publishers/google/models/m:predict"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = VertexHttpClient::connect(&config(&server.uri()), "Test").await.unwrap();
        let path = format!("{}:predict", client.model_path("google", "m"));
        let value = client
            .post_json(&CancellationToken::new(), &path, &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_error_status_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = VertexHttpClient::connect(&config(&server.uri()), "Test").await.unwrap();
        let err = client
            .post_json(&CancellationToken::new(), "x", &serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            Error::Remote(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = CancellationToken::new();
        ctx.cancel();

        let client = VertexHttpClient::connect(&config(&server.uri()), "Test").await.unwrap();
        let err = client.post_json(&ctx, "x", &serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
