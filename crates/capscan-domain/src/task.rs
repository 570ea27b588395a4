//! Analysis task primitives
//!
//! A task is one asynchronous invocation of the external capability-analysis
//! service: a [`TaskRequest`] is submitted with [`Credentials`], the service
//! answers with a [`TaskHandle`], and the handle is polled until it reports a
//! terminal [`TaskStatus`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to one submitted analysis task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    /// Wrap a handle returned by the service
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a task as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Still queued or executing
    Running,
    /// Finished; carries the raw textual result
    Complete(String),
    /// The service reported failure; carries its error text
    Failed(String),
}

impl TaskStatus {
    /// Whether the task reached a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

/// Per-call credentials for the analysis service
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// API key
    pub api_key: String,
    /// Account user name
    pub username: String,
}

impl Credentials {
    /// Create a credentials pair
    pub fn new(api_key: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            username: username.into(),
        }
    }

    /// Both parts are present
    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.username.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Instruction submitted to the analysis service
///
/// The fields mirror the structured prompt the service accepts: a system role,
/// the task description, output format and restrictions, and the user message
/// that embeds the document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Application tag identifying the kind of task to the service
    pub application: String,
    /// System role description
    pub role: String,
    /// Task description
    pub task: String,
    /// Required output format
    pub format: String,
    /// Restrictions on the answer
    pub restrictions: String,
    /// Additional guidance
    pub additional: String,
    /// User message (the full prompt, including document content)
    pub message: String,
    /// Response token budget
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}
