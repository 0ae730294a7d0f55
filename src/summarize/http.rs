//! HTTP summarizer speaking the chat-completions protocol.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::summarizer::{BatchItem, BatchReply, Summarizer};
use crate::config::SummarizationConfig;
use crate::error::{EchonoteError, Result};

const REORDER_PROMPT: &str = "You receive transcript segments from one recording session, each \
with an id. The segments may be slightly out of order. Respond with a JSON object containing \
\"order\" (the segment ids arranged into the most coherent reading order, using every id \
exactly once) and \"summary\" (a concise summary of the content).";

const CONDENSE_PROMPT: &str = "You merge partial summaries of one recording session into a \
single concise summary. Respond with the merged summary text only.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct PromptItem<'a> {
    id: u64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderedSummary {
    order: Vec<u64>,
    summary: String,
}

pub struct HttpSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpSummarizer {
    pub fn new(config: &SummarizationConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    async fn chat(&self, request: ChatRequest) -> Result<String> {
        let response: ChatResponse = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| EchonoteError::Summarization {
                message: "response contained no choices".to_string(),
            })
    }
}

#[async_trait::async_trait]
impl Summarizer for HttpSummarizer {
    async fn reorder_and_summarize(&self, items: &[BatchItem]) -> Result<BatchReply> {
        let prompt_items: Vec<PromptItem> = items
            .iter()
            .map(|item| PromptItem {
                id: item.id,
                text: &item.text,
            })
            .collect();
        let payload =
            serde_json::to_string(&prompt_items).map_err(|e| EchonoteError::Summarization {
                message: format!("failed to encode batch: {}", e),
            })?;

        debug!("Summarizing batch of {} segments", items.len());
        let content = self
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: REORDER_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: payload,
                    },
                ],
                response_format: Some(ResponseFormat {
                    kind: "json_object".to_string(),
                }),
            })
            .await?;

        parse_reply(&content)
    }

    async fn condense(&self, summaries: &[String]) -> Result<String> {
        let content = self
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: CONDENSE_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: summaries.join("\n- "),
                    },
                ],
                response_format: None,
            })
            .await?;
        Ok(content.trim().to_string())
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn parse_reply(content: &str) -> Result<BatchReply> {
    let parsed: OrderedSummary =
        serde_json::from_str(content).map_err(|e| EchonoteError::Summarization {
            message: format!("malformed reply: {}", e),
        })?;
    Ok(BatchReply {
        order: parsed.order,
        summary: parsed.summary,
    })
}
