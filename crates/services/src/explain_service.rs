use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use math_core::model::{Question, QuestionData};

use crate::error::ExplainError;

pub const NOT_CONFIGURED: &str = "AI Tutor is not configured.";
pub const APOLOGY: &str = "Sorry, I can't explain this one right now. Ask your teacher for help!";

const SYSTEM_PROMPT: &str =
    "You are a friendly and encouraging primary school math teacher. Keep answers short.";

/// Source of help text for the question on screen.
///
/// Implementations never fail: problems turn into a message for the learner.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, question: &Question) -> String;
}

#[derive(Clone, Debug)]
pub struct ExplainConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ExplainConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("MATH_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("MATH_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("MATH_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Explanation collaborator backed by an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct ExplanationService {
    client: Client,
    config: Option<ExplainConfig>,
}

impl ExplanationService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ExplainConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ExplainConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Ask the model for an explanation of `question`.
    ///
    /// # Errors
    ///
    /// Returns `ExplainError` when the service is disabled, the request fails,
    /// or the response is empty.
    pub async fn request(&self, question: &Question) -> Result<String, ExplainError> {
        let config = self.config.as_ref().ok_or(ExplainError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: explanation_prompt(question),
                },
            ],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExplainError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ExplainError::EmptyResponse)?;

        Ok(content)
    }
}

#[async_trait]
impl Explainer for ExplanationService {
    async fn explain(&self, question: &Question) -> String {
        match self.request(question).await {
            Ok(text) => text,
            Err(ExplainError::Disabled) => NOT_CONFIGURED.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, question = question.text(), "explanation failed");
                APOLOGY.to_string()
            }
        }
    }
}

/// Child-friendly prompt for one question.
#[must_use]
pub fn explanation_prompt(question: &Question) -> String {
    match question.data() {
        QuestionData::TimesTables { table, multiplier } => format!(
            "Explain how to work out {table} times {multiplier} to a 7-year-old, \
             using repeated addition or a simple trick. Use at most 2 sentences."
        ),
        QuestionData::FractionsOps { left, op, right } => format!(
            "Explain step by step how to {} the fractions {left} and {right} to a child. \
             Use at most 3 sentences.",
            op.verb()
        ),
        QuestionData::MixedToImproper { mixed } => format!(
            "Explain how to turn the mixed number {mixed} into an improper fraction \
             using the \"multiply then add\" method. Keep it short and encouraging."
        ),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use math_core::model::FractionOp;

    #[test]
    fn prompts_follow_the_mode() {
        let times = explanation_prompt(&Question::times_table(6, 7));
        assert!(times.contains("6 times 7"));
        assert!(times.contains("repeated addition"));

        let q = Question::fraction_op(3, 1, 8, FractionOp::Subtract).unwrap();
        let fractions = explanation_prompt(&q);
        assert!(fractions.contains("subtract the fractions 3/8 and 1/8"));

        let mixed = explanation_prompt(&Question::mixed_to_improper(2, 1, 3).unwrap());
        assert!(mixed.contains("2 1/3"));
        assert!(mixed.contains("multiply then add"));
    }

    #[tokio::test]
    async fn disabled_service_says_so() {
        let service = ExplanationService::disabled();
        assert!(!service.enabled());
        let text = service.explain(&Question::times_table(2, 3)).await;
        assert_eq!(text, NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn unreachable_endpoint_apologises() {
        let service = ExplanationService::new(Some(ExplainConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "test".into(),
            model: "test".into(),
        }));
        let text = service.explain(&Question::times_table(2, 3)).await;
        assert_eq!(text, APOLOGY);
    }
}
