//! Content sources: where scripts come from.
//!
//! The renderer only needs a [`Script`]. A [`ContentSource`] produces one for
//! an optional topic request. Two sources ship with the crate:
//!
//! * [`JsonContentSource`]: a script already on disk or in memory
//! * [`LlmContentSource`]: one chat completion per request through
//!   `edgequake-llm`, parsed as JSON. Failures surface immediately; there
//!   is no retry loop.
//!
//! [`TopicHistory`] builds the "surprise me" request and remembers which
//! themes it has already produced so the next random request avoids them.

use crate::error::DeckError;
use crate::prompts::{user_message, DEFAULT_SYSTEM_PROMPT};
use crate::script::Script;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Sampling temperature for script generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.9;

/// Anything that can produce a script for a topic request.
pub trait ContentSource: Send + Sync {
    /// Produce a script. `topic` is free text appended to the request; `None`
    /// lets the source pick.
    fn fetch<'a>(&'a self, topic: Option<&'a str>) -> BoxFuture<'a, Result<Script, DeckError>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

// ── JSON ─────────────────────────────────────────────────────────────────

/// A fixed script; the topic request is ignored.
#[derive(Debug, Clone)]
pub struct JsonContentSource {
    script: Script,
}

impl JsonContentSource {
    pub fn new(script: Script) -> Self {
        Self { script }
    }

    pub fn from_json(raw: &str) -> Result<Self, DeckError> {
        Script::from_json(raw).map(Self::new)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        Script::from_file(path).await.map(Self::new)
    }
}

impl ContentSource for JsonContentSource {
    fn fetch<'a>(&'a self, _topic: Option<&'a str>) -> BoxFuture<'a, Result<Script, DeckError>> {
        Box::pin(async move { Ok(self.script.clone()) })
    }

    fn name(&self) -> &str {
        "json"
    }
}

// ── LLM ──────────────────────────────────────────────────────────────────

/// Generates scripts with a chat model.
pub struct LlmContentSource {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    temperature: f32,
}

impl std::fmt::Debug for LlmContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmContentSource")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl LlmContentSource {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Resolve a provider by name and model, or from the environment.
    pub fn from_env(provider_name: Option<&str>, model: Option<&str>) -> Result<Self, DeckError> {
        resolve_provider(provider_name, model).map(Self::new)
    }

    /// Replace the default system prompt. A blank prompt keeps the default.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if !prompt.trim().is_empty() {
            self.system_prompt = prompt.trim().to_string();
        }
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    async fn generate(&self, topic: Option<&str>) -> Result<Script, DeckError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(user_message(topic)),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            ..Default::default()
        };

        info!(
            "Requesting script from {}/{} (topic: {})",
            self.provider.name(),
            self.provider.model(),
            topic.unwrap_or("<none>")
        );
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| DeckError::ContentSource {
                message: e.to_string(),
            })?;
        debug!(
            "Script response: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Script::from_json(&response.content)
    }
}

impl ContentSource for LlmContentSource {
    fn fetch<'a>(&'a self, topic: Option<&'a str>) -> BoxFuture<'a, Result<Script, DeckError>> {
        Box::pin(self.generate(topic))
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DeckError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DeckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the chat provider, from most-specific to least-specific:
///
/// 1. an explicit provider name (model defaults to [`DEFAULT_MODEL`])
/// 2. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 3. OpenAI, when `OPENAI_API_KEY` is set
/// 4. whatever [`ProviderFactory::from_env`] detects
fn resolve_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, DeckError> {
    if let Some(name) = provider_name {
        return create_provider(name, model.unwrap_or(DEFAULT_MODEL));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, model.unwrap_or(&env_model));
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model.unwrap_or(DEFAULT_MODEL));
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DeckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass a script file instead.\n\
                Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

// ── Random topics ────────────────────────────────────────────────────────

/// Request used for the first random topic.
pub const FIRST_RANDOM_TOPIC: &str = "Любая тема, которая точно удивит";

/// Themes already produced by random requests, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicHistory {
    topics: Vec<String>,
}

impl TopicHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The topic text for the next random request.
    pub fn request(&self) -> String {
        if self.topics.is_empty() {
            FIRST_RANDOM_TOPIC.to_string()
        } else {
            format!("Любая, кроме {}", self.topics.join(", "))
        }
    }

    /// Remember a theme; returns `false` if it was already known.
    pub fn record(&mut self, theme: &str) -> bool {
        if self.topics.iter().any(|t| t == theme) {
            return false;
        }
        self.topics.push(theme.to_string());
        true
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Reply;

    #[test]
    fn first_random_request() {
        assert_eq!(TopicHistory::new().request(), FIRST_RANDOM_TOPIC);
    }

    #[test]
    fn later_requests_exclude_history() {
        let mut history = TopicHistory::new();
        assert!(history.record("Кофе"));
        assert!(history.record("Дедлайн"));
        assert!(!history.record("Кофе"));
        assert_eq!(history.request(), "Любая, кроме Кофе, Дедлайн");
        history.clear();
        assert!(history.topics().is_empty());
    }

    #[test]
    fn json_source_returns_its_script() {
        let script = Script {
            theme: Some("Кот".into()),
            replies: vec![Reply::new("Я", "мяу")],
            ..Default::default()
        };
        let source = JsonContentSource::new(script.clone());
        let fetched = tokio_test::block_on(source.fetch(Some("игнорируется"))).unwrap();
        assert_eq!(fetched, script);
        assert_eq!(source.name(), "json");
    }

    #[test]
    fn json_source_rejects_bad_payload() {
        assert!(JsonContentSource::from_json("[1, 2").is_err());
    }
}
