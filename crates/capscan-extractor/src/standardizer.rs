//! Normalization pass over the full record set

use crate::config::PollConfig;
use crate::error::ExtractorError;
use crate::parser::{ResultParser, ServiceRepair};
use crate::prompt::standardization_request;
use crate::task::TaskClient;
use capscan_domain::traits::AnalysisService;
use capscan_domain::{Credentials, RawCapabilityRecord};
use tracing::{info, warn};

/// Collapses heterogeneous records into the canonical field names
pub struct Standardizer<'a, A> {
    client: &'a TaskClient<A>,
    threshold: usize,
    poll: PollConfig,
    repair_poll: PollConfig,
}

impl<'a, A: AnalysisService> Standardizer<'a, A> {
    /// Create a standardizer
    pub fn new(
        client: &'a TaskClient<A>,
        threshold: usize,
        poll: PollConfig,
        repair_poll: PollConfig,
    ) -> Self {
        Self {
            client,
            threshold,
            poll,
            repair_poll,
        }
    }

    /// Standardize `records`
    ///
    /// Above the threshold the input comes back unchanged without a service
    /// call. Any failure yields an empty list; the caller then keeps the raw
    /// records.
    pub async fn standardize(
        &self,
        records: &[RawCapabilityRecord],
        credentials: Option<&Credentials>,
    ) -> Vec<RawCapabilityRecord> {
        if records.is_empty() {
            return Vec::new();
        }

        if records.len() > self.threshold {
            info!(
                "Skipping standardization for {} records (threshold {})",
                records.len(),
                self.threshold
            );
            return records.to_vec();
        }

        match self.run(records, credentials).await {
            Ok(standardized) => {
                info!(
                    "Standardized {} records into {}",
                    records.len(),
                    standardized.len()
                );
                standardized
            }
            Err(e) => {
                warn!("Standardization failed, keeping raw records: {}", e);
                Vec::new()
            }
        }
    }

    async fn run(
        &self,
        records: &[RawCapabilityRecord],
        credentials: Option<&Credentials>,
    ) -> Result<Vec<RawCapabilityRecord>, ExtractorError> {
        let request = standardization_request(records)?;
        let handle = self.client.submit_request(&request, credentials).await?;
        let answer = self.client.wait_for_completion(&handle, self.poll).await?;

        let mut parser = ResultParser::local();
        if let Some(credentials) = credentials {
            parser = parser.with_strategy(ServiceRepair::new(
                self.client,
                credentials,
                self.repair_poll,
            ));
        }

        let standardized = parser.parse(&answer).await;
        if standardized.is_empty() {
            return Err(ExtractorError::Standardization(
                "standardization task returned no usable records".to_string(),
            ));
        }
        Ok(standardized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capscan_analysis::{MockAnalysisService, MockTask};

    const FAST: PollConfig = PollConfig::new(3, 1);

    fn records(n: usize) -> Vec<RawCapabilityRecord> {
        (0..n)
            .map(|i| RawCapabilityRecord::new().with("webMethod", format!("m{}", i)))
            .collect()
    }

    fn creds() -> Credentials {
        Credentials::new("k", "u")
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let service = MockAnalysisService::default();
        let client = TaskClient::new(service.clone());
        let out = Standardizer::new(&client, 150, FAST, FAST)
            .standardize(&[], Some(&creds()))
            .await;
        assert!(out.is_empty());
        assert_eq!(service.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_above_threshold_returned_unchanged() {
        let service = MockAnalysisService::default();
        let client = TaskClient::new(service.clone());
        let input = records(151);

        let out = Standardizer::new(&client, 150, FAST, FAST)
            .standardize(&input, Some(&creds()))
            .await;

        assert_eq!(out, input);
        assert_eq!(service.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_at_threshold_makes_one_call() {
        let service = MockAnalysisService::default();
        service.push_task(MockTask::complete(r#"[{"name": "m0", "type": "api"}]"#));
        let client = TaskClient::new(service.clone());

        let out = Standardizer::new(&client, 150, FAST, FAST)
            .standardize(&records(150), Some(&creds()))
            .await;

        assert_eq!(service.submit_count(), 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].first_str(&["name"]).unwrap(), "m0");
        assert!(service.submitted()[0].message.contains("\"webMethod\": \"m149\""));
    }

    #[tokio::test]
    async fn test_failures_yield_empty() {
        let service = MockAnalysisService::default();
        service.push_task(MockTask::failed("overloaded"));
        service.push_task(MockTask::hang());
        service.push_task(MockTask::complete("no json here"));
        service.push_task(MockTask::failed("repair unavailable"));
        let client = TaskClient::new(service.clone());
        let standardizer = Standardizer::new(&client, 150, FAST, FAST);
        let input = records(2);

        assert!(standardizer.standardize(&input, Some(&creds())).await.is_empty());
        assert!(standardizer.standardize(&input, Some(&creds())).await.is_empty());
        assert!(standardizer.standardize(&input, Some(&creds())).await.is_empty());
        // Without credentials nothing is submitted
        assert!(standardizer.standardize(&input, None).await.is_empty());
        assert_eq!(service.submit_count(), 4);
    }
}
