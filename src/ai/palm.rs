//! PaLM 2 text models (text-bison, text-unicorn) and MedLM via `:predict`.

use crate::ai::client::VertexHttpClient;
use crate::ai::{render, resolve_parameters, ModelAdapter, Output};
use crate::models::{Config, ModelParameters};
use crate::prompt::{self, PromptPart};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const FAMILY: &str = "PaLM 2";
const PUBLISHER: &str = "google";

#[derive(Debug, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<TextInstance>,
    pub parameters: ModelParameters,
}

#[derive(Debug, Serialize)]
pub struct TextInstance {
    pub prompt: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub content: String,
    pub safety_attributes: Option<Value>,
    pub citation_metadata: Option<Value>,
}

/// Default PaLM 2 parameters; a parameter file overrides them key by key.
pub fn default_parameters() -> Value {
    json!({
        "temperature": 0.6,
        "maxOutputTokens": 256,
        "topP": 0.4,
        "topK": 40,
    })
}

#[derive(Debug, Default, Clone)]
pub struct PaLMAdapter;

impl PaLMAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn build_request(prompt: String, parameters: ModelParameters) -> PredictRequest {
        PredictRequest {
            instances: vec![TextInstance { prompt }],
            parameters,
        }
    }
}

#[async_trait]
impl ModelAdapter for PaLMAdapter {
    fn family(&self) -> &'static str {
        FAMILY
    }

    async fn generate_content(
        &self,
        ctx: &CancellationToken,
        model: &str,
        config: &Config,
        parts: &[PromptPart],
        out: Output<'_>,
    ) -> Result<()> {
        tracing::info!("{} [{}]", FAMILY, model);

        let text = prompt::joined_text(parts, FAMILY)?;
        let parameters = resolve_parameters(config, default_parameters())?;
        let request = Self::build_request(text, parameters);

        let http = VertexHttpClient::connect(config, FAMILY).await?;
        let path = format!("{}:predict", http.model_path(PUBLISHER, model));
        let raw = http.post_json(ctx, &path, &request).await?;
        let response: PredictResponse = serde_json::from_value(raw.clone())?;

        let text = response.predictions.first().map(|p| p.content.clone());
        render(out, config, FAMILY, &raw, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputFormat;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str =
        "/v1/projects/proj/locations/us-central1/publishers/google/models/text-bison@002:predict";

    fn builder(server: &MockServer) -> crate::models::ConfigBuilder {
        Config::builder()
            .project_id("proj")
            .api_endpoint(server.uri())
            .access_token("tok")
    }

    async fn run(cfg: &Config, parts: &[PromptPart]) -> Result<String> {
        let mut out = Vec::new();
        PaLMAdapter::new()
            .generate_content(&CancellationToken::new(), "text-bison@002", cfg, parts, &mut out)
            .await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parameter_file_values_reach_request_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"temperature":0.2,"maxOutputTokens":128}}"#).unwrap();
        let cfg = Config::builder()
            .project_id("p")
            .config_file(file.path())
            .build()
            .unwrap();

        let params = resolve_parameters(&cfg, default_parameters()).unwrap();
        let request = PaLMAdapter::build_request("hello".to_string(), params);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["instances"], json!([{"prompt": "hello"}]));
        assert_eq!(body["parameters"]["temperature"], json!(0.2));
        assert_eq!(body["parameters"]["maxOutputTokens"], json!(128));
        assert_eq!(body["parameters"]["topP"], json!(0.4));
        assert_eq!(body["parameters"]["topK"], json!(40));
    }

    #[tokio::test]
    async fn test_predict_prints_first_prediction() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(body_json(json!({
                "instances": [{"prompt": "name a color"}],
                "parameters": {"temperature": 0.6, "maxOutputTokens": 256, "topP": 0.4, "topK": 40}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [
                    {"content": "Blue", "safetyAttributes": {"blocked": false}},
                    {"content": "Red"}
                ],
                "metadata": {"tokenMetadata": {}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = builder(&server).build().unwrap();
        let output = run(&cfg, &[PromptPart::text("name a color")]).await.unwrap();
        assert_eq!(output, "Blue\n");
    }

    #[tokio::test]
    async fn test_zero_predictions_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
            .mount(&server)
            .await;

        let cfg = builder(&server).build().unwrap();
        assert_eq!(run(&cfg, &[PromptPart::text("x")]).await.unwrap(), "\n");
    }

    #[tokio::test]
    async fn test_json_output() {
        let server = MockServer::start().await;
        let body = json!({"predictions": [{"content": "Blue"}]});

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let cfg = builder(&server).output_format(OutputFormat::Json).build().unwrap();
        let output = run(&cfg, &[PromptPart::text("x")]).await.unwrap();
        assert_eq!(serde_json::from_str::<Value>(&output).unwrap(), body);
    }

    #[tokio::test]
    async fn test_unreadable_parameter_file_fails_before_remote_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let cfg = builder(&server).config_file("/missing/params.json").build().unwrap();
        let err = run(&cfg, &[PromptPart::text("x")]).await.unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
