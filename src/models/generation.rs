use crate::{Error, Result, config::GenerationConfig};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// Deterministic decoding (temperature 0).
    Greedy,
    Temperature(f32),
}

impl Sampling {
    pub fn temperature(&self) -> f32 {
        match self {
            Self::Greedy => 0.0,
            Self::Temperature(t) => *t,
        }
    }
}

/// Parameters applied to every `/chat` generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Cap on generated tokens, bounding both answer length and latency.
    pub max_new_tokens: u32,
    pub sampling: Sampling,
    pub system_prompt: Option<String>,
    /// Prepend the prompt to every generated text.
    pub return_full_text: bool,
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        let sampling = if config.do_sample {
            Sampling::Temperature(config.temperature)
        } else {
            Sampling::Greedy
        };

        Self {
            max_new_tokens: config.max_new_tokens,
            sampling,
            system_prompt: config.system_prompt.clone(),
            return_full_text: config.return_full_text,
        }
    }
}

/// One candidate produced by the generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub generated_text: String,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Vec<Generation>>;
}

/// Generation backed by an OpenAI-compatible chat completions endpoint
/// (llama.cpp server, vLLM, TGI or OpenAI itself).
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());

        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url.clone());
        }

        let client = Client::with_config(openai_config);

        Self {
            client,
            model: config.model.clone(),
        }
    }

    fn build_messages(
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages = Vec::with_capacity(2);

        if let Some(ref system_prompt) = params.system_prompt {
            let msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(ChatCompletionRequestSystemMessageContent::Text(
                    system_prompt.clone(),
                ))
                .build()
                .map_err(|e| Error::inference(format!("Failed to build system message: {}", e)))?;
            messages.push(msg.into());
        }

        let msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                prompt.to_string(),
            ))
            .build()
            .map_err(|e| Error::inference(format!("Failed to build user message: {}", e)))?;
        messages.push(msg.into());

        Ok(messages)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    #[allow(deprecated)]
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Vec<Generation>> {
        debug!(
            "Generating with '{}' (max_new_tokens={}, sampling={:?})",
            self.model, params.max_new_tokens, params.sampling
        );

        let messages = Self::build_messages(prompt, params)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(params.sampling.temperature())
            .max_tokens(params.max_new_tokens)
            .build()?;

        let response = self.client.chat().create(request).await?;

        debug!(
            "Received chat completion response with {} choices",
            response.choices.len()
        );

        if response.choices.is_empty() {
            return Err(Error::inference("generation model returned no choices"));
        }

        Ok(response
            .choices
            .into_iter()
            .map(|choice| {
                let completion = choice.message.content.unwrap_or_default();
                let generated_text = if params.return_full_text {
                    format!("{}{}", prompt, completion)
                } else {
                    completion
                };
                Generation { generated_text }
            })
            .collect())
    }
}
