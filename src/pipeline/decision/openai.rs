use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::prompt::{build_user_message, decision_tool, forced_tool_choice, system_prompt};
use super::types::{DecisionClient, RawModelResponse, ResponseMode};
use super::DecisionError;

/// Groq's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Chat-completions client for any OpenAI-compatible provider.
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    mode: ResponseMode,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        mode: ResponseMode,
        timeout_secs: u64,
    ) -> Result<Self, DecisionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DecisionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            mode,
            client,
            timeout_secs,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Request body for `POST /chat/completions`.
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response body from `POST /chat/completions` (only the fields we read).
#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Pick the response shape actually returned. A tool call wins over text;
/// which one was requested is checked later by the parser.
fn raw_from_completion(
    completion: ChatCompletionResponse,
) -> Result<RawModelResponse, DecisionError> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DecisionError::MalformedProviderResponse("no choices".into()))?;

    let tool_calls = choice.message.tool_calls.unwrap_or_default();
    if !tool_calls.is_empty() {
        let call = tool_calls
            .iter()
            .find(|c| c.function.name == super::prompt::DECISION_TOOL_NAME)
            .unwrap_or(&tool_calls[0]);
        return Ok(RawModelResponse::Structured {
            arguments: call.function.arguments.clone(),
        });
    }

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(RawModelResponse::FreeText { content }),
        _ => Err(DecisionError::EmptyResponse),
    }
}

impl DecisionClient for OpenAiCompatClient {
    fn invoke(
        &self,
        policy: &str,
        redacted_text: &str,
    ) -> Result<RawModelResponse, DecisionError> {
        let user_message = build_user_message(policy, redacted_text);
        let (tools, tool_choice) = match self.mode {
            ResponseMode::Structured => (Some(vec![decision_tool()]), Some(forced_tool_choice())),
            ResponseMode::FreeText => (None, None),
        };
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(self.mode),
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            temperature: 0.0,
            tools,
            tool_choice,
        };

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                DecisionError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                DecisionError::ProviderConnection(self.base_url.clone())
            } else {
                DecisionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DecisionError::Authentication {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DecisionError::provider(status.as_u16(), &body));
        }

        let completion: ChatCompletionResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                DecisionError::Timeout(self.timeout_secs)
            } else {
                DecisionError::MalformedProviderResponse(e.to_string())
            }
        })?;

        raw_from_completion(completion)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn mode(&self) -> ResponseMode {
        self.mode
    }
}

/// What a `MockDecisionClient` hands back on every call.
#[derive(Debug, Clone)]
enum MockReply {
    Respond(RawModelResponse),
    Fail { status: u16, body: String },
}

/// A call observed by `MockDecisionClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub policy: String,
    pub data: String,
}

/// Mock decision client for testing. Returns a configurable response and
/// records what it was sent.
pub struct MockDecisionClient {
    reply: MockReply,
    mode: ResponseMode,
    model: String,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockDecisionClient {
    fn with_reply(reply: MockReply, mode: ResponseMode) -> Self {
        Self {
            reply,
            mode,
            model: "mock-reviewer".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies with tool-call arguments (structured mode).
    pub fn structured(arguments: &str) -> Self {
        Self::with_reply(
            MockReply::Respond(RawModelResponse::Structured {
                arguments: arguments.to_string(),
            }),
            ResponseMode::Structured,
        )
    }

    /// Replies with assistant text (free-text mode).
    pub fn free_text(content: &str) -> Self {
        Self::with_reply(
            MockReply::Respond(RawModelResponse::FreeText {
                content: content.to_string(),
            }),
            ResponseMode::FreeText,
        )
    }

    /// Fails every call with a provider error.
    pub fn failing(status: u16, body: &str) -> Self {
        Self::with_reply(
            MockReply::Fail {
                status,
                body: body.to_string(),
            },
            ResponseMode::Structured,
        )
    }

    /// Override the mode this client claims to request.
    pub fn requesting(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl DecisionClient for MockDecisionClient {
    fn invoke(
        &self,
        policy: &str,
        redacted_text: &str,
    ) -> Result<RawModelResponse, DecisionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                policy: policy.to_string(),
                data: redacted_text.to_string(),
            });
        }
        match &self.reply {
            MockReply::Respond(raw) => Ok(raw.clone()),
            MockReply::Fail { status, body } => Err(DecisionError::provider(*status, body)),
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn mode(&self) -> ResponseMode {
        self.mode
    }
}
