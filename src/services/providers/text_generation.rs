//! Hugging Face style text-generation endpoint
//!
//! Request:  POST {api_url} {"inputs": prompt, "parameters": {...}}
//! Response: [{"generated_text": "..."}] or {"generated_text": "..."}
//!
//! Works with the hosted Inference API and with self-hosted
//! text-generation-inference servers.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    services::providers::SummaryProvider,
};

/// Decoding parameters sent with every request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub num_beams: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub no_repeat_ngram_size: u32,
    /// Return only the continuation, not the prompt
    pub return_full_text: bool,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 150,
            num_beams: 2,
            temperature: 0.7,
            top_p: 0.9,
            no_repeat_ngram_size: 2,
            return_full_text: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParameters,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

impl GenerationResponse {
    fn into_text(self) -> Option<String> {
        match self {
            GenerationResponse::Batch(items) => items.into_iter().next(),
            GenerationResponse::Single(item) => Some(item),
        }
        .map(|item| item.generated_text.trim().to_string())
        .filter(|text| !text.is_empty())
    }
}

#[derive(Clone)]
pub struct TextGenerationProvider {
    http_client: HttpClient,
    api_url: String,
    api_token: Option<String>,
    parameters: GenerationParameters,
}

impl TextGenerationProvider {
    pub fn new(api_url: String, api_token: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            api_token,
            parameters: GenerationParameters::default(),
        }
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.parameters.max_new_tokens = max_new_tokens;
        self
    }
}

#[async_trait::async_trait]
impl SummaryProvider for TextGenerationProvider {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let body = GenerationRequest {
            inputs: prompt,
            parameters: &self.parameters,
        };

        let mut request = self.http_client.post(&self.api_url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Text generation API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        let parsed: GenerationResponse = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize text generation response"
            );
            AppError::ExternalApi(format!("Failed to parse text generation response: {}", e))
        })?;

        let text = parsed.into_text().ok_or_else(|| {
            AppError::ExternalApi("Text generation API returned no text".to_string())
        })?;

        tracing::info!(
            chars = text.len(),
            provider = self.name(),
            "Summary generated"
        );

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "text-generation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let parameters = GenerationParameters::default();
        let request = GenerationRequest {
            inputs: "The book Emma by Jane Austen",
            parameters: &parameters,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"], "The book Emma by Jane Austen");
        assert_eq!(json["parameters"]["max_new_tokens"], 150);
        assert_eq!(json["parameters"]["num_beams"], 2);
        assert_eq!(json["parameters"]["no_repeat_ngram_size"], 2);
        assert_eq!(json["parameters"]["return_full_text"], false);
    }

    #[test]
    fn test_batch_response_takes_first_item() {
        let json = r#"[{"generated_text": " A comedy of matchmaking. "}, {"generated_text": "ignored"}]"#;
        let response: GenerationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.into_text(),
            Some("A comedy of matchmaking.".to_string())
        );
    }

    #[test]
    fn test_single_response() {
        let json = r#"{"generated_text": "A comedy of matchmaking."}"#;
        let response: GenerationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.into_text(),
            Some("A comedy of matchmaking.".to_string())
        );
    }

    #[test]
    fn test_blank_generation_yields_nothing() {
        let response: GenerationResponse = serde_json::from_str("[]").unwrap();
        assert_eq!(response.into_text(), None);

        let response: GenerationResponse =
            serde_json::from_str(r#"{"generated_text": "   "}"#).unwrap();
        assert_eq!(response.into_text(), None);
    }

    #[test]
    fn test_max_new_tokens_override() {
        let provider =
            TextGenerationProvider::new("http://test.local".to_string(), None).with_max_new_tokens(64);
        assert_eq!(provider.parameters.max_new_tokens, 64);
        assert_eq!(provider.name(), "text-generation");
    }
}
