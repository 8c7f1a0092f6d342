//! Anthropic Messages API client with tool use, retry, and rate-limit
//! handling.
//!
//! `ureq` is synchronous, so every call is wrapped in
//! `tokio::task::spawn_blocking`. Transient errors (429/500/502/503 and
//! network failures) are retried with exponential backoff.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecognitionError;

/// Anthropic Messages API endpoint.
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Required API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default vision model.
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Default maximum retries for transient errors.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds (doubles each retry).
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Per-request timeout. A hung model call surfaces as `Upstream`, never as
/// an indefinite hang.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(90);

// ── Wire types ───────────────────────────────────────────────────────────────

/// A Messages API content block. Only the variants this pipeline exchanges
/// are modeled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ContentBlock {
    /// A base64 JPEG/PNG image block.
    pub fn base64_image(media_type: &str, data: &str) -> Self {
        ContentBlock::Image {
            source: ImageSource {
                source_type: "base64".to_string(),
                media_type: media_type.to_string(),
                data: data.to_string(),
            },
        }
    }

    pub fn text(text: &str) -> Self {
        ContentBlock::Text {
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

// ── Model seam ───────────────────────────────────────────────────────────────

/// The first half of the round trip: the model has seen the image and
/// invoked the declared tool. Carried forward so the second call can replay
/// the conversation.
#[derive(Debug, Clone)]
pub struct ToolCallTurn {
    /// Id of the `tool_use` block, echoed back in the `tool_result`.
    pub tool_use_id: String,
    /// Raw arguments the model passed to the tool.
    pub tool_input: serde_json::Value,
    /// The user content that opened the conversation.
    pub user_content: Vec<ContentBlock>,
    /// The assistant content blocks of the first response, verbatim.
    pub assistant_content: Vec<ContentBlock>,
}

/// A vision-language model capable of the forced-tool-call round trip.
///
/// The pipeline owns the prompt and the tool declaration; implementations
/// own transport. The scripted fake in the pipeline tests implements this
/// trait too.
#[async_trait]
pub trait VisionModel: Send + Sync + 'static {
    /// Step 1: submit the opening user content with one declared tool and
    /// the tool choice forced. A response without a `tool_use` block is a
    /// `ProtocolViolation`.
    async fn request_tool_call(
        &self,
        system: &str,
        user_content: Vec<ContentBlock>,
        tool: &serde_json::Value,
    ) -> Result<ToolCallTurn, RecognitionError>;

    /// Step 2: replay the conversation with the tool result appended and
    /// return the model's final text.
    async fn request_summary(
        &self,
        system: &str,
        tool: &serde_json::Value,
        turn: ToolCallTurn,
        tool_result_json: String,
    ) -> Result<String, RecognitionError>;
}

// ── Anthropic implementation ─────────────────────────────────────────────────

/// Messages API implementation of [`VisionModel`].
pub struct AnthropicVision {
    api_key: String,
    model: String,
}

impl AnthropicVision {
    pub fn new(api_key: String) -> Self {
        AnthropicVision {
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        AnthropicVision { api_key, model }
    }

    async fn call(&self, request: MessagesRequest) -> Result<MessagesResponse, RecognitionError> {
        let api_key = self.api_key.clone();
        tokio::task::spawn_blocking(move || {
            with_retry(
                || call_messages_once(&api_key, &request),
                DEFAULT_MAX_RETRIES,
            )
        })
        .await
        .map_err(|e| RecognitionError::Upstream(format!("task join error: {}", e)))?
        .map_err(RecognitionError::Upstream)
    }
}

#[async_trait]
impl VisionModel for AnthropicVision {
    async fn request_tool_call(
        &self,
        system: &str,
        user_content: Vec<ContentBlock>,
        tool: &serde_json::Value,
    ) -> Result<ToolCallTurn, RecognitionError> {
        let tool_name = tool
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("search_products");
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: system.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user_content.clone(),
            }],
            tools: Some(vec![tool.clone()]),
            // Forced: the model MUST invoke the tool.
            tool_choice: Some(serde_json::json!({"type": "tool", "name": tool_name})),
        };

        let response = self.call(request).await?;

        let tool_use = response.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { id, input, .. } => Some((id.clone(), input.clone())),
            _ => None,
        });
        let (tool_use_id, tool_input) = tool_use.ok_or_else(|| {
            RecognitionError::ProtocolViolation(
                "model response contained no tool_use block despite forced tool choice"
                    .to_string(),
            )
        })?;

        Ok(ToolCallTurn {
            tool_use_id,
            tool_input,
            user_content,
            assistant_content: response.content,
        })
    }

    async fn request_summary(
        &self,
        system: &str,
        tool: &serde_json::Value,
        turn: ToolCallTurn,
        tool_result_json: String,
    ) -> Result<String, RecognitionError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: system.to_string(),
            messages: vec![
                Message {
                    role: "user".to_string(),
                    content: turn.user_content,
                },
                Message {
                    role: "assistant".to_string(),
                    content: turn.assistant_content,
                },
                Message {
                    role: "user".to_string(),
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: turn.tool_use_id,
                        content: tool_result_json,
                    }],
                },
            ],
            // The API requires the tool declaration whenever the transcript
            // contains tool_use blocks.
            tools: Some(vec![tool.clone()]),
            tool_choice: None,
        };

        let response = self.call(request).await?;

        response
            .content
            .iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                RecognitionError::MalformedOutput(
                    "final model response contained no text content".to_string(),
                )
            })
    }
}

// ── Transport ────────────────────────────────────────────────────────────────

/// Make a single Messages API call (no retry).
fn call_messages_once(api_key: &str, request: &MessagesRequest) -> Result<MessagesResponse, String> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build()
        .into();

    let response = agent
        .post(ANTHROPIC_API_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("content-type", "application/json")
        .send_json(request)
        .map_err(|e| format!("API request failed: {}", e))?;

    response
        .into_body()
        .read_json()
        .map_err(|e| format!("failed to parse API response: {}", e))
}

/// Retry a fallible operation with exponential backoff.
///
/// Retries only on errors deemed retryable (429, 500, 502, 503, network).
fn with_retry<T, F: Fn() -> Result<T, String>>(f: F, max_retries: u32) -> Result<T, String> {
    let mut last_error = String::new();
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    for attempt in 0..=max_retries {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) => {
                if attempt < max_retries && is_retryable(&e) {
                    eprintln!(
                        "retryable vision error (attempt {}/{}): {}. backing off {}ms",
                        attempt + 1,
                        max_retries + 1,
                        e,
                        backoff_ms
                    );
                    std::thread::sleep(std::time::Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                    last_error = e;
                } else {
                    return Err(e);
                }
            }
        }
    }

    Err(format!(
        "all {} retries exhausted, last error: {}",
        max_retries + 1,
        last_error
    ))
}

/// Extract an HTTP status code from an error string.
///
/// ureq v3 formats errors as "http status: NNN ..." which this captures.
fn extract_http_status(error: &str) -> Option<u16> {
    for word in error.split_whitespace() {
        let clean = word.trim_matches(|c: char| !c.is_ascii_digit());
        if clean.len() == 3 {
            if let Ok(code) = clean.parse::<u16>() {
                if (400..=599).contains(&code) {
                    return Some(code);
                }
            }
        }
    }
    None
}

fn is_retryable(error: &str) -> bool {
    if let Some(status) = extract_http_status(error) {
        if matches!(status, 429 | 500 | 502 | 503) {
            return true;
        }
    }
    let lower = error.to_lowercase();
    lower.contains("connection") || lower.contains("timeout")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_blocks_serialize_with_type_tags() {
        let block = ContentBlock::base64_image("image/jpeg", "QUJD");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["source"]["type"], "base64");
        assert_eq!(json["source"]["media_type"], "image/jpeg");

        let tool_result = ContentBlock::ToolResult {
            tool_use_id: "tu_1".to_string(),
            content: "[]".to_string(),
        };
        let json = serde_json::to_value(&tool_result).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "tu_1");
    }

    #[test]
    fn tool_use_blocks_deserialize() {
        let raw = r#"{"type": "tool_use", "id": "tu_9", "name": "search_products",
                      "input": {"queries": ["Coca-Cola"]}}"#;
        let block: ContentBlock = serde_json::from_str(raw).unwrap();
        match block {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "tu_9");
                assert_eq!(name, "search_products");
                assert_eq!(input["queries"][0], "Coca-Cola");
            }
            other => panic!("expected ToolUse, got {:?}", other),
        }
    }

    #[test]
    fn retryable_statuses_detected() {
        assert!(is_retryable("http status: 429 too many requests"));
        assert!(is_retryable("http status: 503"));
        assert!(is_retryable("connection reset by peer"));
        assert!(!is_retryable("http status: 401 unauthorized"));
        assert!(!is_retryable("bad request"));
    }

    #[test]
    fn status_extraction_ignores_non_http_numbers() {
        assert_eq!(extract_http_status("port 8080 refused"), None);
        assert_eq!(extract_http_status("http status: 502 bad gateway"), Some(502));
    }
}
