//! Anthropic Messages API adapter.
//!
//! System messages do not travel in the message list: they are joined into
//! the top-level `system` field.

use crate::sse::{into_fragments, sse_response_stream};
use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::{from_reqwest, http_client, resolve_api_key, status_error};
use sb_domain::config::ProviderConfig;
use sb_domain::error::{Error, Result};
use sb_domain::message::Role;
use sb_domain::stream::{FragmentStream, StreamEvent};
use serde_json::Value;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?.ok_or_else(|| {
            Error::Config(format!("provider '{}': anthropic requires an API key", cfg.id))
        })?;
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| "claude-sonnet-4-20250514".into());

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            client: http_client(&cfg.id)?,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }

    fn build_messages_body(&self, req: &ChatRequest, stream: bool) -> Value {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut system_parts: Vec<&str> = Vec::new();
        let mut api_messages: Vec<Value> = Vec::new();
        for msg in &req.messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::User | Role::Assistant => {
                    // The Messages API rejects empty turns; dropping one can
                    // leave two same-role turns adjacent, which get merged.
                    if msg.content.trim().is_empty() {
                        continue;
                    }
                    match api_messages.last_mut() {
                        Some(last) if last["role"] == msg.role.as_str() => {
                            let merged = format!(
                                "{}\n\n{}",
                                last["content"].as_str().unwrap_or_default(),
                                msg.content
                            );
                            last["content"] = Value::String(merged);
                        }
                        _ => api_messages.push(serde_json::json!({
                            "role": msg.role.as_str(),
                            "content": msg.content,
                        })),
                    }
                }
            }
        }

        let mut body = serde_json::json!({
            "model": model,
            "messages": api_messages,
            "stream": stream,
            "max_tokens": req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    async fn send(&self, req: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_messages_body(req, stream);

        tracing::debug!(provider = %self.id, url = %url, stream, "anthropic request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| from_reqwest(&self.id, e))?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(|e| from_reqwest(&self.id, e))?;
            return Err(status_error(&self.id, status, &err_text));
        }
        Ok(resp)
    }
}

fn map_stop_reason(s: &str) -> String {
    match s {
        "end_turn" => "stop".to_string(),
        "max_tokens" => "length".to_string(),
        other => other.to_string(),
    }
}

fn parse_anthropic_response(body: &Value) -> Result<ChatResponse> {
    let blocks = body
        .get("content")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::MalformedResponse("no content in response".into()))?;

    let content: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect();

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let finish_reason = body
        .get("stop_reason")
        .and_then(|v| v.as_str())
        .map(map_stop_reason);

    Ok(ChatResponse {
        content,
        model,
        finish_reason,
    })
}

/// Parse one Anthropic SSE payload. `ping`, `message_start` and block
/// boundaries carry no text and are ignored.
fn parse_anthropic_sse(data: &str) -> Vec<Result<StreamEvent>> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(Error::MalformedResponse(e.to_string()))],
    };

    match v.get("type").and_then(|t| t.as_str()).unwrap_or("") {
        "content_block_delta" => {
            let delta = v.get("delta");
            let is_text = delta.and_then(|d| d.get("type")).and_then(|t| t.as_str())
                == Some("text_delta");
            match delta.and_then(|d| d.get("text")).and_then(|t| t.as_str()) {
                Some(text) if is_text && !text.is_empty() => vec![Ok(StreamEvent::Token {
                    text: text.to_string(),
                })],
                _ => Vec::new(),
            }
        }
        "message_delta" => {
            match v
                .get("delta")
                .and_then(|d| d.get("stop_reason"))
                .and_then(|r| r.as_str())
            {
                Some(reason) => vec![Ok(StreamEvent::Done {
                    finish_reason: Some(map_stop_reason(reason)),
                })],
                None => Vec::new(),
            }
        }
        "message_stop" => vec![Ok(StreamEvent::Done {
            finish_reason: None,
        })],
        "error" => {
            let message = v
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            vec![Ok(StreamEvent::Error { message })]
        }
        _ => Vec::new(),
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete_once(&self, req: ChatRequest) -> Result<ChatResponse> {
        let resp = self.send(&req, false).await?;
        let resp_text = resp.text().await.map_err(|e| from_reqwest(&self.id, e))?;
        let resp_json: Value = serde_json::from_str(&resp_text)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        parse_anthropic_response(&resp_json)
    }

    async fn complete_streaming(&self, req: ChatRequest) -> Result<FragmentStream> {
        let resp = self.send(&req, true).await?;
        let events = sse_response_stream(self.id.clone(), resp, parse_anthropic_sse);
        Ok(into_fragments(self.id.clone(), events))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
