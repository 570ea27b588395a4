//! capscan Analysis Service Layer
//!
//! Implementations of the `AnalysisService` trait from `capscan-domain`.
//!
//! # Services
//!
//! - `MockAnalysisService`: Deterministic scripted tasks for testing
//! - `HttpAnalysisService`: Chat-style task API over HTTPS
//!
//! # Examples
//!
//! ```
//! use capscan_analysis::{MockAnalysisService, MockTask};
//!
//! let service = MockAnalysisService::new("[]");
//! service.push_task(MockTask::complete(r#"[{"name": "getOrder"}]"#).after_polls(2));
//! service.push_task(MockTask::failed("quota exceeded"));
//! assert_eq!(service.submit_count(), 0);
//! ```

#![warn(missing_docs)]

pub mod http;

use async_trait::async_trait;
use capscan_domain::traits::AnalysisService;
use capscan_domain::{Credentials, TaskHandle, TaskRequest, TaskStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use http::{HttpAnalysisConfig, HttpAnalysisService};

/// Errors that can occur while talking to the analysis service
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Response could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service refused the submission
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// Status requested for a handle the service does not know
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// Generic error
    #[error("Analysis error: {0}")]
    Other(String),
}

/// Scripted behaviour of one mock task
#[derive(Debug, Clone, PartialEq)]
pub enum MockTask {
    /// Completes with `result` after `polls_before` running polls
    Complete {
        /// Raw result text
        result: String,
        /// Number of polls answered with `Running` first
        polls_before: usize,
    },
    /// Fails with `error` after `polls_before` running polls
    Fail {
        /// Upstream error text
        error: String,
        /// Number of polls answered with `Running` first
        polls_before: usize,
    },
    /// Never leaves the running state
    Hang,
    /// Submission itself is rejected
    Reject(String),
}

impl MockTask {
    /// Task that completes on the first poll
    pub fn complete(result: impl Into<String>) -> Self {
        MockTask::Complete {
            result: result.into(),
            polls_before: 0,
        }
    }

    /// Task that fails on the first poll
    pub fn failed(error: impl Into<String>) -> Self {
        MockTask::Fail {
            error: error.into(),
            polls_before: 0,
        }
    }

    /// Task that keeps running forever
    pub fn hang() -> Self {
        MockTask::Hang
    }

    /// Submission that the service refuses
    pub fn rejected(reason: impl Into<String>) -> Self {
        MockTask::Reject(reason.into())
    }

    /// Report `Running` for `polls` polls before the terminal status
    pub fn after_polls(self, polls: usize) -> Self {
        match self {
            MockTask::Complete { result, .. } => MockTask::Complete {
                result,
                polls_before: polls,
            },
            MockTask::Fail { error, .. } => MockTask::Fail {
                error,
                polls_before: polls,
            },
            other => other,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    scripted: VecDeque<MockTask>,
    tasks: HashMap<String, (MockTask, usize)>,
    submitted: Vec<TaskRequest>,
    status_calls: usize,
    next_id: usize,
}

/// Mock analysis service for deterministic testing
///
/// Submissions consume scripted [`MockTask`]s in order; once the script is
/// exhausted every submission completes immediately with the default result.
/// No network calls are made.
///
/// # Examples
///
/// ```
/// use capscan_analysis::{MockAnalysisService, MockTask};
/// use capscan_domain::traits::AnalysisService;
/// use capscan_domain::{Credentials, TaskRequest, TaskStatus};
///
/// # async fn example() {
/// let service = MockAnalysisService::new("[]");
/// service.push_task(MockTask::complete("[{\"name\": \"a\"}]").after_polls(1));
///
/// let request = TaskRequest {
///     application: "demo".into(), role: String::new(), task: String::new(),
///     format: String::new(), restrictions: String::new(), additional: String::new(),
///     message: "hello".into(), max_tokens: 100, temperature: 0.0,
/// };
/// let handle = service.submit(&request, &Credentials::new("k", "u")).await.unwrap();
/// assert_eq!(service.get_status(&handle).await.unwrap(), TaskStatus::Running);
/// assert!(matches!(service.get_status(&handle).await.unwrap(), TaskStatus::Complete(_)));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockAnalysisService {
    default_result: String,
    state: Arc<Mutex<MockState>>,
}

impl MockAnalysisService {
    /// Create a mock whose unscripted tasks complete with `default_result`
    pub fn new(default_result: impl Into<String>) -> Self {
        Self {
            default_result: default_result.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Script the behaviour of the next unscripted submission
    pub fn push_task(&self, task: MockTask) {
        self.state().scripted.push_back(task);
    }

    /// Number of submissions received so far
    pub fn submit_count(&self) -> usize {
        self.state().submitted.len()
    }

    /// Number of status requests received so far
    pub fn status_count(&self) -> usize {
        self.state().status_calls
    }

    /// Copies of every submitted request, in order
    pub fn submitted(&self) -> Vec<TaskRequest> {
        self.state().submitted.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockAnalysisService {
    fn default() -> Self {
        Self::new("[]")
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisService {
    type Error = AnalysisError;

    async fn submit(
        &self,
        request: &TaskRequest,
        _credentials: &Credentials,
    ) -> Result<TaskHandle, Self::Error> {
        let mut state = self.state();
        state.submitted.push(request.clone());

        let task = state
            .scripted
            .pop_front()
            .unwrap_or_else(|| MockTask::complete(self.default_result.clone()));

        if let MockTask::Reject(reason) = task {
            return Err(AnalysisError::Rejected(reason));
        }

        state.next_id += 1;
        let id = format!("mock-task-{}", state.next_id);
        state.tasks.insert(id.clone(), (task, 0));
        Ok(TaskHandle::new(id))
    }

    async fn get_status(&self, handle: &TaskHandle) -> Result<TaskStatus, Self::Error> {
        let mut state = self.state();
        state.status_calls += 1;

        let (task, polls) = state
            .tasks
            .get_mut(handle.as_str())
            .ok_or_else(|| AnalysisError::UnknownTask(handle.to_string()))?;
        *polls += 1;

        let status = match task {
            MockTask::Complete { result, polls_before } if *polls > *polls_before => {
                TaskStatus::Complete(result.clone())
            }
            MockTask::Fail { error, polls_before } if *polls > *polls_before => {
                TaskStatus::Failed(error.clone())
            }
            _ => TaskStatus::Running,
        };
        Ok(status)
    }
}
