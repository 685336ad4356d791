//! Completion client for a hosted chat model.
//!
//! A single request/response round trip. No retries or extra timeouts are
//! layered on top of reqwest, its errors are passed through to the caller.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Models a user can pick with `/model`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatModel {
  #[default]
  Gpt35Turbo,
  Gpt4,
}

impl ChatModel {
  pub const ALL: [ChatModel; 2] = [ChatModel::Gpt35Turbo, ChatModel::Gpt4];

  /// Identifier sent to the API, also used as the callback key.
  pub fn key(self) -> &'static str {
    match self {
      ChatModel::Gpt35Turbo => "gpt-3.5-turbo",
      ChatModel::Gpt4 => "gpt-4",
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      ChatModel::Gpt35Turbo => "GPT-3.5 Turbo",
      ChatModel::Gpt4 => "GPT-4",
    }
  }

  pub fn from_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|model| model.key() == key)
  }
}

#[async_trait]
pub trait Completion: Send + Sync {
  async fn complete(
    &self,
    model: ChatModel,
    prompt: &str,
  ) -> anyhow::Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
  #[serde(default)]
  content: Option<String>,
}

/// OpenAI-compatible chat completions endpoint.
pub struct OpenAi {
  client: Client,
  api_base: String,
  api_key: String,
}

impl OpenAi {
  pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_base: api_base.into().trim_end_matches('/').to_string(),
      api_key: api_key.into(),
    }
  }
}

#[async_trait]
impl Completion for OpenAi {
  async fn complete(
    &self,
    model: ChatModel,
    prompt: &str,
  ) -> anyhow::Result<String> {
    let request = ChatRequest {
      model: model.key(),
      messages: vec![ChatMessage { role: "user", content: prompt }],
    };

    debug!("Requesting completion from {}", model.key());

    let response: ChatResponse = self
      .client
      .post(format!("{}/chat/completions", self.api_base))
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await
      .context("Invalid completion response")?;

    first_content(response)
  }
}

fn first_content(response: ChatResponse) -> anyhow::Result<String> {
  response
    .choices
    .into_iter()
    .next()
    .and_then(|choice| choice.message.content)
    .filter(|content| !content.trim().is_empty())
    .context("No completions returned")
}
