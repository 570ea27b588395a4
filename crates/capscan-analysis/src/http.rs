//! HTTP Analysis Service Implementation
//!
//! Talks to a chat-style task API: a message is posted to
//! `/api/v1/chats/send-message` and answered with a `task_id`, whose progress
//! is read from `/api/v1/chats/status/{task_id}`.
//!
//! # Examples
//!
//! ```no_run
//! use capscan_analysis::{HttpAnalysisConfig, HttpAnalysisService};
//!
//! let config = HttpAnalysisConfig::new("https://analysis.example.com");
//! let service = HttpAnalysisService::new(config).unwrap();
//! ```

use crate::AnalysisError;
use async_trait::async_trait;
use capscan_domain::traits::AnalysisService;
use capscan_domain::{Credentials, TaskHandle, TaskRequest, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Default timeout for a single HTTP request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default model identifier sent with each task
pub const DEFAULT_MODEL_TYPE: &str = "GPT4o_128K";

/// Connection settings for [`HttpAnalysisService`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpAnalysisConfig {
    /// Base URL of the task API
    pub base_url: String,

    /// Model identifier sent with each task
    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// Timeout for one HTTP request (seconds)
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Accept self-signed or otherwise invalid TLS certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_model_type() -> String {
    DEFAULT_MODEL_TYPE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl HttpAnalysisConfig {
    /// Configuration with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model_type: default_model_type(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

/// Analysis service backed by the HTTP task API
pub struct HttpAnalysisService {
    base_url: String,
    model_type: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    user: &'a str,
}

/// Request body for the send-message endpoint
#[derive(Serialize)]
struct SendMessageRequest<'a> {
    username: &'a str,
    apikey: &'a str,
    conv_id: &'a str,
    application: &'a str,
    messages: Vec<ChatMessage<'a>>,
    promptfilename: &'a str,
    promptname: &'a str,
    prompttype: &'a str,
    promptrole: &'a str,
    prompttask: &'a str,
    promptexamples: &'a str,
    promptformat: &'a str,
    promptrestrictions: &'a str,
    promptadditional: &'a str,
    max_tokens: u32,
    model_type: &'a str,
    temperature: f32,
    #[serde(rename = "topKChunks")]
    top_k_chunks: u32,
    read_from_your_data: bool,
    data_filenames: Vec<String>,
    document_groupname: &'a str,
    document_grouptags: Vec<String>,
    find_the_best_response: bool,
    chat_attr: Map<String, Value>,
    additional_attr: Map<String, Value>,
}

/// Response from the send-message endpoint
#[derive(Deserialize)]
struct SendMessageResponse {
    task_id: Option<String>,
    detail: Option<Value>,
    error: Option<String>,
}

/// Response from the status endpoint
#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    result: Option<Value>,
}

impl HttpAnalysisService {
    /// Create a new service client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. TLS backend
    /// initialization fails).
    pub fn new(config: HttpAnalysisConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| AnalysisError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_type: config.model_type,
            client,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/api/v1/chats/send-message", self.base_url)
    }

    fn status_url(&self, handle: &TaskHandle) -> String {
        format!("{}/api/v1/chats/status/{}", self.base_url, handle)
    }

    fn build_body<'a>(
        &'a self,
        request: &'a TaskRequest,
        credentials: &'a Credentials,
    ) -> SendMessageRequest<'a> {
        SendMessageRequest {
            username: &credentials.username,
            apikey: &credentials.api_key,
            conv_id: "",
            application: &request.application,
            messages: vec![ChatMessage { user: &request.message }],
            promptfilename: "",
            promptname: "",
            prompttype: "system",
            promptrole: &request.role,
            prompttask: &request.task,
            promptexamples: "",
            promptformat: &request.format,
            promptrestrictions: &request.restrictions,
            promptadditional: &request.additional,
            max_tokens: request.max_tokens,
            model_type: &self.model_type,
            temperature: request.temperature,
            top_k_chunks: 5,
            read_from_your_data: false,
            data_filenames: Vec::new(),
            document_groupname: "",
            document_grouptags: Vec::new(),
            find_the_best_response: false,
            chat_attr: Map::new(),
            additional_attr: Map::new(),
        }
    }
}

/// Map a status label and payload onto [`TaskStatus`]
fn interpret_status(status: &str, result: Option<Value>) -> TaskStatus {
    let text = result.map(|value| match value {
        Value::String(s) => s,
        other => other.to_string(),
    });

    match status.to_lowercase().as_str() {
        "complete" | "completed" | "success" => TaskStatus::Complete(text.unwrap_or_default()),
        "failed" | "failure" | "error" => {
            TaskStatus::Failed(text.unwrap_or_else(|| "Unknown error".to_string()))
        }
        _ => TaskStatus::Running,
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    type Error = AnalysisError;

    async fn submit(
        &self,
        request: &TaskRequest,
        credentials: &Credentials,
    ) -> Result<TaskHandle, Self::Error> {
        let body = self.build_body(request, credentials);

        let response = self
            .client
            .post(self.send_message_url())
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AnalysisError::Communication(format!("Failed to read response: {}", e)))?;

        let parsed: SendMessageResponse = serde_json::from_str(&text).map_err(|_| {
            if status.is_success() {
                AnalysisError::InvalidResponse(format!("Failed to parse response: {}", text))
            } else {
                AnalysisError::Communication(format!("HTTP {}: {}", status, text))
            }
        })?;

        match parsed.task_id {
            Some(task_id) if !task_id.is_empty() => {
                debug!("Submitted '{}' task as {}", request.application, task_id);
                Ok(TaskHandle::new(task_id))
            }
            _ => {
                let reason = parsed
                    .detail
                    .map(|d| match d {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .or(parsed.error)
                    .unwrap_or_else(|| "No task_id in response".to_string());
                Err(AnalysisError::Rejected(reason))
            }
        }
    }

    async fn get_status(&self, handle: &TaskHandle) -> Result<TaskStatus, Self::Error> {
        let response = self
            .client
            .get(self.status_url(handle))
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| AnalysisError::Communication(format!("Request failed: {}", e)))?;

        let text = response
            .text()
            .await
            .map_err(|e| AnalysisError::Communication(format!("Failed to read response: {}", e)))?;

        let parsed: StatusResponse = serde_json::from_str(&text).map_err(|_| {
            AnalysisError::InvalidResponse(format!("Failed to parse status response: {}", text))
        })?;

        Ok(interpret_status(&parsed.status, parsed.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> TaskRequest {
        TaskRequest {
            application: "capability-extraction".to_string(),
            role: "analyst".to_string(),
            task: "extract".to_string(),
            format: "json".to_string(),
            restrictions: "only json".to_string(),
            additional: String::new(),
            message: "DOCUMENT".to_string(),
            max_tokens: 16000,
            temperature: 0.1,
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let service = HttpAnalysisService::new(HttpAnalysisConfig::new("https://a.example/")).unwrap();
        assert_eq!(service.send_message_url(), "https://a.example/api/v1/chats/send-message");
        assert_eq!(
            service.status_url(&TaskHandle::new("42")),
            "https://a.example/api/v1/chats/status/42"
        );
    }

    #[test]
    fn test_body_wire_format() {
        let service = HttpAnalysisService::new(HttpAnalysisConfig::new("https://a.example")).unwrap();
        let request = request();
        let creds = Credentials::new("k-1", "alice");
        let body = serde_json::to_value(service.build_body(&request, &creds)).unwrap();

        assert_eq!(body["username"], "alice");
        assert_eq!(body["apikey"], "k-1");
        assert_eq!(body["application"], "capability-extraction");
        assert_eq!(body["messages"], json!([{"user": "DOCUMENT"}]));
        assert_eq!(body["prompttype"], "system");
        assert_eq!(body["max_tokens"], 16000);
        assert_eq!(body["model_type"], DEFAULT_MODEL_TYPE);
        assert_eq!(body["topKChunks"], 5);
    }

    #[test]
    fn test_interpret_status() {
        assert_eq!(
            interpret_status("Complete", Some(json!("[]"))),
            TaskStatus::Complete("[]".to_string())
        );
        assert_eq!(
            interpret_status("failed", None),
            TaskStatus::Failed("Unknown error".to_string())
        );
        assert_eq!(
            interpret_status("Failed", Some(json!({"reason": "quota"}))),
            TaskStatus::Failed(r#"{"reason":"quota"}"#.to_string())
        );
        assert_eq!(interpret_status("Processing", None), TaskStatus::Running);
        assert_eq!(interpret_status("pending", None), TaskStatus::Running);
    }

    #[test]
    fn test_config_defaults_from_toml_like_json() {
        let config: HttpAnalysisConfig =
            serde_json::from_value(json!({"base_url": "https://a.example"})).unwrap();
        assert_eq!(config.model_type, DEFAULT_MODEL_TYPE);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_communication_error() {
        let mut config = HttpAnalysisConfig::new("http://127.0.0.1:9");
        config.request_timeout_secs = 2;
        let service = HttpAnalysisService::new(config).unwrap();

        let result = service.submit(&request(), &Credentials::new("k", "u")).await;
        assert!(matches!(result, Err(AnalysisError::Communication(_))));
    }
}
