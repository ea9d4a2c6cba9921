//! Gemini `generateContent` client.
//!
//! One request per model step, no streaming, no retries. Tool results are sent
//! back as `functionResponse` parts; consecutive results share one content.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use seatwise_core::config::LlmConfig;

use crate::llm::{LanguageModel, LlmError, Message, ModelTurn, ToolCall, ToolChoice, ToolDeclaration};

pub struct GeminiClient {
    http_client: Client,
    endpoint: Url,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = match &config.api_key {
            Some(key) if config.has_api_key() => key.clone(),
            _ => return Err(LlmError::Unavailable("no api key configured".to_string())),
        };
        let endpoint = generate_url(&config.base_url, &config.model)?;
        let http_client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self { http_client, endpoint, api_key })
    }
}

fn generate_url(base_url: &str, model: &str) -> Result<Url, LlmError> {
    let raw = format!("{}/v1beta/models/{}:generateContent", base_url.trim_end_matches('/'), model);
    Url::parse(&raw).map_err(|error| LlmError::Unavailable(format!("invalid model endpoint `{raw}`: {error}")))
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(
        &self,
        history: &[Message],
        tools: &[ToolDeclaration],
        tool_choice: ToolChoice,
    ) -> Result<ModelTurn, LlmError> {
        let request = GenerateContentRequest::build(history, tools, tool_choice);
        debug!(
            event_name = "agent.llm.request",
            contents = request.contents.len(),
            tool_choice = ?tool_choice,
            "sending generateContent request"
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let decoded = serde_json::from_str::<GenerateContentResponse>(&body)
            .map_err(|error| LlmError::Decode(error.to_string()))?;
        decoded.into_turn()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSet {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct FunctionCallingConfig {
    mode: &'static str,
}

impl GenerateContentRequest {
    fn build(history: &[Message], tools: &[ToolDeclaration], tool_choice: ToolChoice) -> Self {
        let mut system = Vec::new();
        let mut contents: Vec<Content> = Vec::new();

        for message in history {
            match message {
                Message::System(text) => system.push(Part::text(text)),
                Message::User(text) => contents.push(Content::new("user", vec![Part::text(text)])),
                Message::Model { text, tool_calls } => {
                    let mut parts = Vec::with_capacity(tool_calls.len() + 1);
                    if let Some(text) = text.as_deref().filter(|text| !text.is_empty()) {
                        parts.push(Part::text(text));
                    }
                    parts.extend(tool_calls.iter().map(Part::function_call));
                    contents.push(Content::new("model", parts));
                }
                Message::ToolResult { name, payload } => {
                    let part = Part::function_response(name, payload);
                    match contents.last_mut() {
                        Some(last) if last.holds_only_tool_results() => last.parts.push(part),
                        _ => contents.push(Content::new("user", vec![part])),
                    }
                }
            }
        }

        let (tools, tool_config) = if tools.is_empty() {
            (Vec::new(), None)
        } else {
            let declarations = tools
                .iter()
                .map(|tool| FunctionDeclaration {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                })
                .collect();
            let mode = match tool_choice {
                ToolChoice::Auto => "AUTO",
                ToolChoice::None => "NONE",
            };
            (
                vec![ToolSet { function_declarations: declarations }],
                Some(ToolConfig { function_calling_config: FunctionCallingConfig { mode } }),
            )
        };

        Self {
            system_instruction: (!system.is_empty()).then(|| Content { role: None, parts: system }),
            contents,
            tools,
            tool_config,
        }
    }
}

impl Content {
    fn new(role: &str, parts: Vec<Part>) -> Self {
        Self { role: Some(role.to_string()), parts }
    }

    fn holds_only_tool_results(&self) -> bool {
        self.role.as_deref() == Some("user")
            && !self.parts.is_empty()
            && self.parts.iter().all(|part| part.function_response.is_some())
    }
}

impl Part {
    fn text(text: &str) -> Self {
        Self { text: Some(text.to_string()), ..Self::default() }
    }

    fn function_call(call: &ToolCall) -> Self {
        Self {
            function_call: Some(FunctionCall { name: call.name.clone(), args: call.arguments.clone() }),
            ..Self::default()
        }
    }

    fn function_response(name: &str, payload: &Value) -> Self {
        // The API expects an object here.
        let response = match payload {
            Value::Object(_) => payload.clone(),
            other => Value::Object(Map::from_iter([("result".to_string(), other.clone())])),
        };
        Self {
            function_response: Some(FunctionResponse { name: name.to_string(), response }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn into_turn(self) -> Result<ModelTurn, LlmError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Decode("response carried no candidates".to_string()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|content| content.parts).unwrap_or_default() {
            if let Some(fragment) = part.text {
                text.push_str(&fragment);
            }
            if let Some(call) = part.function_call {
                let arguments = match call.args {
                    Value::Null => Value::Object(Map::new()),
                    args => args,
                };
                tool_calls.push(ToolCall { name: call.name, arguments });
            }
        }

        Ok(ModelTurn { text: (!text.trim().is_empty()).then_some(text), tool_calls })
    }
}
