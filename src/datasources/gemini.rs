use super::{AiAdvisor, PlotContext};
use crate::config::GeminiConfig;
use crate::error::{AgroError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: API_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn model_url(&self, suffix: &str) -> Result<reqwest::Url> {
        reqwest::Url::parse_with_params(
            &format!("{}/models/{}{}", self.base_url, self.config.model, suffix),
            &[("key", self.config.api_key.as_str())],
        )
        .map_err(|e| AgroError::Config(format!("Invalid Gemini URL: {}", e)))
    }

    fn build_prompt(question: &str, context: &PlotContext) -> String {
        let fmt_coord = |c: Option<f64>| c.map(|v| v.to_string()).unwrap_or_else(|| "unknown".into());
        format!(
            "{}\nContext: plot={}, lat={}, lon={}",
            question.trim(),
            context.name,
            fmt_coord(context.latitude),
            fmt_coord(context.longitude)
        )
    }

    fn extract_answer(response: GenerateResponse) -> Result<String> {
        let answer: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(AgroError::DataSourceUnavailable(
                "Gemini returned no answer".into(),
            ));
        }
        Ok(answer)
    }

    /// Test connection to the Gemini API
    pub async fn test_connection(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.model_url("")?)
            .send()
            .await
            .map_err(|e| AgroError::DataSourceUnavailable(format!("Gemini: {}", e)))?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl AiAdvisor for GeminiClient {
    async fn ask(&self, question: &str, context: &PlotContext) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: Self::build_prompt(question, context),
                }],
            }],
        };

        let response = self
            .client
            .post(self.model_url(":generateContent")?)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgroError::DataSourceUnavailable(format!("Gemini: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgroError::DataSourceUnavailable(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            AgroError::DataSourceUnavailable(format!("Failed to parse Gemini response: {}", e))
        })?;

        Self::extract_answer(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> GeminiConfig {
        GeminiConfig {
            api_key: "test_key".into(),
            model: "gemini-2.5-pro".into(),
            enabled: true,
            timeout_secs: 8,
        }
    }

    #[test]
    fn prompt_appends_plot_context() {
        let ctx = PlotContext {
            name: "Maize".into(),
            latitude: Some(13.4333),
            longitude: None,
        };
        let prompt = GeminiClient::build_prompt("  Should I alert?  ", &ctx);
        assert_eq!(
            prompt,
            "Should I alert?\nContext: plot=Maize, lat=13.4333, lon=unknown"
        );
    }

    #[test]
    fn generate_url_targets_model() {
        let client = GeminiClient::new(sample_config()).unwrap();
        let url = client.model_url(":generateContent").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent?key=test_key"
        );
    }

    #[test]
    fn extracts_first_candidate_text() {
        let json = r#"{"candidates": [
            {"content": {"parts": [{"text": "Yes, "}, {"text": "the plot is dry."}]}},
            {"content": {"parts": [{"text": "ignored"}]}}
        ]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            GeminiClient::extract_answer(response).unwrap(),
            "Yes, the plot is dry."
        );
    }

    #[test]
    fn empty_answer_is_unavailable() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            GeminiClient::extract_answer(response),
            Err(AgroError::DataSourceUnavailable(_))
        ));
    }
}
