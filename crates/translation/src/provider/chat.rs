use async_trait::async_trait;
use dubcast_config::TranslationConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, TranslationError, Translator};

const SYSTEM_PROMPT: &str = "You are a professional language translator.";

/// Translator backed by an OpenAI-compatible chat completions API
pub struct ChatTranslator {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    model: String,
    target_language: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| TranslationError::Config("translation.base_url is not set".to_owned()))?;

        Ok(Self {
            client: crate::http_client(config)?,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            target_language: config.target_language.clone(),
        })
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn prompt(&self, text: &str) -> String {
        format!(
            "Translate the transcript below into {}.\n\
             Keep product names, brands, acronyms, programming languages, code, commands \
             and technical terms exactly as written.\n\
             Return only the translated text.\n\n\
             Transcript:\n{text}",
            self.target_language
        )
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let prompt = self.prompt(text);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.0,
        };

        let mut builder = self.client.post(self.completions_url()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| TranslationError::from_send(self.name(), &e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(model = %self.model, status = %status, "chat translation returned error");
            return Err(TranslationError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| TranslationError::from_body(&e))?;
        first_choice(body)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn first_choice(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_owned())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| TranslationError::InvalidResponse("no completion content".to_owned()))
}
