use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatResponseFormat};
use tracing::debug;

use super::config::JudgeConfig;
use super::error::JudgeError;
use super::parse::parse_verdicts;
use super::prompt;
use super::types::{ItemContext, JudgeVerdict, QueryContext};
use super::LlmJudge;

/// [`LlmJudge`] backed by a `genai` chat client.
///
/// The provider is inferred by `genai` from the model name; credentials come from the
/// provider's usual API key variable.
#[derive(Clone)]
pub struct GenaiJudge {
    client: Client,
    model: String,
    temperature: f64,
}

impl std::fmt::Debug for GenaiJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiJudge")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GenaiJudge {
    pub fn new(model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            temperature,
        }
    }

    /// Builds a judge for whichever provider has credentials in the environment.
    pub fn from_config(config: &JudgeConfig) -> Result<Self, JudgeError> {
        if !config.enabled {
            return Err(JudgeError::NotConfigured {
                reason: "judge disabled".to_string(),
            });
        }
        let model = config
            .select_model_from_env()
            .ok_or_else(|| JudgeError::NotConfigured {
                reason: format!(
                    "provider {} selected but no GEMINI_API_KEY or OPENAI_API_KEY is set",
                    config.provider
                ),
            })?;
        Ok(Self::new(model, config.temperature))
    }
}

#[async_trait]
impl LlmJudge for GenaiJudge {
    async fn score_batch(
        &self,
        query: &QueryContext,
        items: &[ItemContext],
    ) -> Result<Vec<JudgeVerdict>, JudgeError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let (system, user) = prompt::compose(query, items)?;
        let request = ChatRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)]);
        let options = ChatOptions::default()
            .with_temperature(self.temperature)
            .with_response_format(ChatResponseFormat::JsonMode);

        debug!(model = %self.model, items = items.len(), "Sending judge request");

        let response = self
            .client
            .exec_chat(&self.model, request, Some(&options))
            .await
            .map_err(|e| JudgeError::Provider {
                model: self.model.clone(),
                message: e.to_string(),
            })?;

        let text = response.first_text().ok_or(JudgeError::EmptyResponse)?;
        parse_verdicts(text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
