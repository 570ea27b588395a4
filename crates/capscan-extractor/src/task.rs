//! Submit-and-poll client for analysis tasks

use crate::config::PollConfig;
use crate::error::ExtractorError;
use crate::prompt::PromptBuilder;
use crate::types::DocumentContext;
use capscan_domain::traits::AnalysisService;
use capscan_domain::{Credentials, TaskHandle, TaskRequest, TaskStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Drives one analysis task from submission to a terminal status
pub struct TaskClient<A> {
    service: Arc<A>,
    service_guide_markers: Vec<String>,
}

impl<A> Clone for TaskClient<A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            service_guide_markers: self.service_guide_markers.clone(),
        }
    }
}

impl<A: AnalysisService> TaskClient<A> {
    /// Create a new task client
    pub fn new(service: A) -> Self {
        Self::from_arc(Arc::new(service))
    }

    /// Create a task client sharing an existing service
    pub fn from_arc(service: Arc<A>) -> Self {
        Self {
            service,
            service_guide_markers: Vec::new(),
        }
    }

    /// Filename fragments that select the web-service-guide prompt
    pub fn with_service_guide_markers(mut self, markers: Vec<String>) -> Self {
        self.service_guide_markers = markers;
        self
    }

    /// Submit the extraction instruction for one chunk
    pub async fn submit(
        &self,
        chunk_text: &str,
        context: &DocumentContext,
        position: Option<(usize, usize)>,
        credentials: Option<&Credentials>,
    ) -> Result<TaskHandle, ExtractorError> {
        let filename = context.filename.to_lowercase();
        let service_guide = self
            .service_guide_markers
            .iter()
            .any(|m| !m.is_empty() && filename.contains(&m.to_lowercase()));

        let request = PromptBuilder::new(chunk_text, context)
            .with_position(position)
            .service_guide(service_guide)
            .into_request();

        self.submit_request(&request, credentials).await
    }

    /// Submit an arbitrary task request
    pub async fn submit_request(
        &self,
        request: &TaskRequest,
        credentials: Option<&Credentials>,
    ) -> Result<TaskHandle, ExtractorError> {
        let credentials = credentials.filter(|c| c.is_complete()).ok_or_else(|| {
            ExtractorError::Submission("analysis service credentials are required".to_string())
        })?;

        let handle = self
            .service
            .submit(request, credentials)
            .await
            .map_err(|e| ExtractorError::Submission(e.to_string()))?;

        debug!(
            "Submitted {} task {} ({} chars)",
            request.application,
            handle,
            request.message.len()
        );
        Ok(handle)
    }

    /// Read the current status of a task once
    pub async fn poll(&self, handle: &TaskHandle) -> Result<TaskStatus, ExtractorError> {
        self.service
            .get_status(handle)
            .await
            .map_err(|e| ExtractorError::Status(format!("task {}: {}", handle, e)))
    }

    /// Poll until the task finishes or the attempt budget runs out
    ///
    /// Sleeps `interval` between attempts, never after the last one.
    pub async fn wait_for_completion(
        &self,
        handle: &TaskHandle,
        poll: PollConfig,
    ) -> Result<String, ExtractorError> {
        for attempt in 1..=poll.max_attempts {
            match self.poll(handle).await? {
                TaskStatus::Complete(result) => {
                    debug!("Task {} complete after {} polls", handle, attempt);
                    return Ok(result);
                }
                TaskStatus::Failed(message) => {
                    warn!("Task {} failed: {}", handle, message);
                    return Err(ExtractorError::TaskFailed {
                        handle: handle.clone(),
                        message,
                    });
                }
                TaskStatus::Running => {
                    if attempt < poll.max_attempts {
                        tokio::time::sleep(poll.interval()).await;
                    }
                }
            }
        }

        warn!("Task {} still running after {} polls", handle, poll.max_attempts);
        Err(ExtractorError::TaskTimeout {
            handle: handle.clone(),
            attempts: poll.max_attempts,
        })
    }
}
