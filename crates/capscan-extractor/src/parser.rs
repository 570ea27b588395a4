//! Parse analysis task output into raw capability records
//!
//! Task output is frequently wrapped (double-encoded JSON strings, Markdown
//! fences), truncated at the token limit, or shaped differently from run to
//! run. Parsing therefore goes through ordered [`RepairStrategy`]s and a
//! shape-flattening pass.

use crate::config::PollConfig;
use crate::prompt::repair_request;
use crate::task::TaskClient;
use async_trait::async_trait;
use capscan_domain::traits::AnalysisService;
use capscan_domain::{Credentials, RawCapabilityRecord};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// One way of turning task output into records
#[async_trait]
pub trait RepairStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Try to recover records from `text`; `None` if this strategy cannot
    async fn attempt(&self, text: &str) -> Option<Vec<RawCapabilityRecord>>;
}

/// Parse the text as it is
pub struct DirectParse;

#[async_trait]
impl RepairStrategy for DirectParse {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn attempt(&self, text: &str) -> Option<Vec<RawCapabilityRecord>> {
        serde_json::from_str::<Value>(text).ok().map(flatten_records)
    }
}

/// Cut truncated output back to its last complete element and close it
pub struct TruncationRepair;

#[async_trait]
impl RepairStrategy for TruncationRepair {
    fn name(&self) -> &'static str {
        "truncation"
    }

    async fn attempt(&self, text: &str) -> Option<Vec<RawCapabilityRecord>> {
        repair_locally(text).map(flatten_records)
    }
}

/// Ask the analysis service to fix the JSON
pub struct ServiceRepair<'a, A> {
    client: &'a TaskClient<A>,
    credentials: &'a Credentials,
    poll: PollConfig,
}

impl<'a, A> ServiceRepair<'a, A> {
    /// Create a service-backed repair strategy
    pub fn new(client: &'a TaskClient<A>, credentials: &'a Credentials, poll: PollConfig) -> Self {
        Self {
            client,
            credentials,
            poll,
        }
    }
}

#[async_trait]
impl<'a, A: AnalysisService> RepairStrategy for ServiceRepair<'a, A> {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn attempt(&self, text: &str) -> Option<Vec<RawCapabilityRecord>> {
        let request = repair_request(text);
        let handle = match self.client.submit_request(&request, Some(self.credentials)).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("JSON repair submission failed: {}", e);
                return None;
            }
        };

        let answer = match self.client.wait_for_completion(&handle, self.poll).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("JSON repair task did not finish: {}", e);
                return None;
            }
        };

        let fixed = strip_envelope(&answer);
        serde_json::from_str::<Value>(&fixed)
            .ok()
            .or_else(|| repair_locally(&fixed))
            .map(flatten_records)
    }
}

/// Ordered list of strategies; the first that succeeds wins
pub struct ResultParser<'a> {
    strategies: Vec<Box<dyn RepairStrategy + 'a>>,
}

impl<'a> ResultParser<'a> {
    /// Parser with no strategies
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Direct parse followed by local truncation repair
    pub fn local() -> Self {
        Self::empty()
            .with_strategy(DirectParse)
            .with_strategy(TruncationRepair)
    }

    /// Append a strategy, tried after the existing ones
    pub fn with_strategy(mut self, strategy: impl RepairStrategy + 'a) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Parse raw task output
    ///
    /// Never fails: when no strategy recovers anything the result is empty.
    pub async fn parse(&self, raw: &str) -> Vec<RawCapabilityRecord> {
        let text = strip_envelope(raw);
        if text.is_empty() {
            warn!("Task output is empty");
            return Vec::new();
        }

        for strategy in &self.strategies {
            if let Some(records) = strategy.attempt(&text).await {
                debug!(
                    "Parsed {} records with {} strategy",
                    records.len(),
                    strategy.name()
                );
                return records;
            }
        }

        warn!(
            "Could not parse task output ({} chars), continuing with no records",
            text.len()
        );
        Vec::new()
    }
}

/// Remove a JSON-string layer, Markdown fences and leading prose
pub fn strip_envelope(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    // Double-encoded payload: "[{\"name\": ...}]"
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        if let Ok(Value::String(inner)) = serde_json::from_str::<Value>(&text) {
            text = inner.trim().to_string();
        }
    }

    if serde_json::from_str::<Value>(&text).is_ok() {
        return text;
    }

    text = strip_fences(&text).to_string();

    match text.find(|c: char| c == '[' || c == '{') {
        Some(start) if start > 0 => text[start..].to_string(),
        _ => text,
    }
}

/// Unwrap a Markdown code block
///
/// Fences only count at the start of the text or of a line. A JSON string
/// cannot hold a raw newline, so fences quoted inside values are left alone.
fn strip_fences(text: &str) -> &str {
    let open = if text.starts_with("```") {
        0
    } else {
        match text.find("\n```") {
            Some(nl) => nl + 1,
            None => return text,
        }
    };

    let after = &text[open + 3..];
    // Skip the language tag line
    let body = match after.find('\n') {
        Some(nl) => &after[nl + 1..],
        None => after.trim_start_matches(|c: char| c.is_alphanumeric()),
    };

    let body = match body.find("\n```") {
        Some(end) => &body[..end],
        None => {
            let trimmed = body.trim_end();
            trimmed.strip_suffix("```").unwrap_or(trimmed)
        }
    };
    body.trim()
}

/// Local repair: drop trailing commas, then cut back truncated output
fn repair_locally(text: &str) -> Option<Value> {
    let cleaned = strip_trailing_commas(text);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Some(value);
    }

    let closed = close_truncated(text)?;
    serde_json::from_str(&strip_trailing_commas(&closed)).ok()
}

/// Cut `text` after the last complete array element and append the
/// brackets still open at that point
fn close_truncated(text: &str) -> Option<String> {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut cut: Option<(usize, Vec<char>)> = None;

    for (offset, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => open.push(']'),
            '{' => open.push('}'),
            ']' | '}' => {
                if open.pop() != Some(c) {
                    return None;
                }
                if open.last().map_or(true, |&top| top == ']') {
                    cut = Some((offset + c.len_utf8(), open.clone()));
                }
            }
            _ => {}
        }
    }

    let (end, still_open) = cut?;
    let mut repaired = text[..end].trim_end().trim_end_matches(',').to_string();
    repaired.extend(still_open.iter().rev());
    Some(repaired)
}

/// Remove commas directly followed by `}` or `]`, outside strings
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some(&'}') | Some(&']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Collapse any supported result shape into a flat record list
pub fn flatten_records(value: Value) -> Vec<RawCapabilityRecord> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(element_record).collect(),
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("capabilities") {
                return items.into_iter().filter_map(element_record).collect();
            }

            if let Some(Value::Object(modules)) = map.get("modules") {
                return modules
                    .iter()
                    .filter_map(|(name, data)| data.as_object().map(|d| module_records(name, d)))
                    .flatten()
                    .collect();
            }

            if map.values().any(is_module) {
                return map
                    .iter()
                    .filter_map(|(name, data)| {
                        data.as_object()
                            .filter(|d| is_module(data) && !d.is_empty())
                            .map(|d| module_records(name, d))
                    })
                    .flatten()
                    .collect();
            }

            let mut records = Vec::new();
            for (key, value) in map {
                if let Value::Array(items) = value {
                    records.extend(
                        items
                            .into_iter()
                            .filter_map(element_record)
                            .map(|r| r.with("module", key.clone())),
                    );
                }
            }
            records
        }
        _ => Vec::new(),
    }
}

fn element_record(value: Value) -> Option<RawCapabilityRecord> {
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            Some(RawCapabilityRecord::new().with("name", s.trim()))
        }
        other => RawCapabilityRecord::from_value(other),
    }
}

fn is_module(value: &Value) -> bool {
    value.as_object().map_or(false, |m| {
        ["services", "WebServices", "operations"]
            .iter()
            .any(|k| m.get(*k).map_or(false, Value::is_array))
    })
}

fn module_records(module: &str, data: &Map<String, Value>) -> Vec<RawCapabilityRecord> {
    let mut records = Vec::new();

    let services = data
        .get("services")
        .and_then(Value::as_array)
        .or_else(|| data.get("WebServices").and_then(Value::as_array));

    for service in services.into_iter().flatten() {
        let Some(service) = RawCapabilityRecord::from_value(service.clone()) else {
            continue;
        };
        let endpoints: Vec<Value> = service
            .get("Operations")
            .and_then(Value::as_array)
            .map(|ops| {
                ops.iter()
                    .filter_map(|op| op.get("MethodName").cloned())
                    .collect()
            })
            .unwrap_or_default();

        let mut record = RawCapabilityRecord::new()
            .with(
                "type",
                service
                    .first_str(&["Type", "type"])
                    .unwrap_or_else(|| "Web Service".to_string()),
            )
            .with(
                "protocol",
                service
                    .first_str(&["protocol"])
                    .unwrap_or_else(|| "HTTPS".to_string()),
            )
            .with("description", module_description(module, &service))
            .with("endpoints", Value::Array(endpoints))
            .with("area", module);
        if let Some(name) = service.first_str(&["ServiceName", "name"]) {
            record.insert("name", name);
        }
        records.push(record);
    }

    let operations = data.get("operations").and_then(Value::as_array);
    for operation in operations.into_iter().flatten() {
        let Some(operation) = RawCapabilityRecord::from_value(operation.clone()) else {
            continue;
        };
        let mut record = RawCapabilityRecord::new()
            .with(
                "type",
                operation
                    .first_str(&["type"])
                    .unwrap_or_else(|| "API Operation".to_string()),
            )
            .with("description", module_description(module, &operation))
            .with("area", module);
        for key in ["name", "protocol", "dataFormat"] {
            if let Some(value) = operation.first_str(&[key]) {
                record.insert(key, value);
            }
        }
        records.push(record);
    }

    records
}

fn module_description(module: &str, item: &RawCapabilityRecord) -> String {
    format!(
        "{} - {}",
        module,
        item.first_str(&["description"]).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use capscan_analysis::{MockAnalysisService, MockTask};
    use serde_json::json;

    fn names(records: &[RawCapabilityRecord]) -> Vec<String> {
        records
            .iter()
            .filter_map(|r| r.first_str(&["name"]))
            .collect()
    }

    async fn parse_local(raw: &str) -> Vec<RawCapabilityRecord> {
        ResultParser::local().parse(raw).await
    }

    #[tokio::test]
    async fn test_parse_plain_array() {
        let records = parse_local(r#"[{"name": "a"}, {"name": "b"}]"#).await;
        assert_eq!(names(&records), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_parse_markdown_wrapper() {
        let raw = "```json\n[{\"name\": \"getOrder\"}]\n```";
        assert_eq!(names(&parse_local(raw).await), vec!["getOrder"]);
    }

    #[tokio::test]
    async fn test_parse_double_encoded() {
        let raw = serde_json::to_string(r#"[{"name": "x"}]"#).unwrap();
        assert_eq!(names(&parse_local(&raw).await), vec!["x"]);
    }

    #[tokio::test]
    async fn test_leading_prose_dropped() {
        let raw = "Here are the capabilities: [{\"name\": \"p\"}]";
        assert_eq!(names(&parse_local(raw).await), vec!["p"]);
    }

    #[tokio::test]
    async fn test_truncated_array_cut_to_last_complete_element() {
        let raw = r#"[{"name":"a"},{"name":"b","extra":"c"#;
        let records = parse_local(raw).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].clone().into_value(), json!({"name": "a"}));
    }

    #[tokio::test]
    async fn test_truncation_inside_wrapper_object() {
        let raw = r#"{"capabilities": [{"name": "a", "tags": ["x", "y"]}, {"name": "b"}, {"na"#;
        assert_eq!(names(&parse_local(raw).await), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_braces_inside_strings_ignored() {
        let raw = r#"[{"name":"a","description":"uses } and ] and \" quotes"},{"name":"b"#;
        let records = parse_local(raw).await;
        assert_eq!(names(&records), vec!["a"]);
        assert_eq!(
            records[0].first_str(&["description"]).unwrap(),
            "uses } and ] and \" quotes"
        );
    }

    #[tokio::test]
    async fn test_trailing_commas_removed() {
        let raw = r#"[{"name": "a", "note": "x,]",}, {"name": "b",},]"#;
        let records = parse_local(raw).await;
        assert_eq!(names(&records), vec!["a", "b"]);
        assert_eq!(records[0].first_str(&["note"]).unwrap(), "x,]");
    }

    #[tokio::test]
    async fn test_unrecoverable_yields_nothing() {
        assert!(parse_local("I could not find any capabilities.").await.is_empty());
        assert!(parse_local("[{\"name\": \"a").await.is_empty());
        assert!(parse_local("").await.is_empty());
    }

    #[tokio::test]
    async fn test_service_repair_used_last() {
        let service = MockAnalysisService::default();
        service.push_task(MockTask::complete("```json\n[{\"name\": \"fixed\"}]\n```"));
        let client = TaskClient::new(service.clone());
        let creds = Credentials::new("k", "u");
        let parser = ResultParser::local().with_strategy(ServiceRepair::new(
            &client,
            &creds,
            PollConfig::new(3, 1),
        ));

        let records = parser.parse("[{\"name\": \"a").await;
        assert_eq!(names(&records), vec!["fixed"]);
        assert_eq!(service.submit_count(), 1);
        assert!(service.submitted()[0].message.contains("[{\"name\": \"a"));

        // Recoverable locally: no service call
        parser.parse("[{\"name\": \"ok\"}]").await;
        assert_eq!(service.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_service_repair_failure_yields_nothing() {
        let service = MockAnalysisService::default();
        service.push_task(MockTask::failed("no capacity"));
        let client = TaskClient::new(service.clone());
        let creds = Credentials::new("k", "u");
        let parser = ResultParser::local().with_strategy(ServiceRepair::new(
            &client,
            &creds,
            PollConfig::new(3, 1),
        ));

        assert!(parser.parse("not json at all {").await.is_empty());
    }

    #[test]
    fn test_flatten_capabilities_wrapper() {
        let records = flatten_records(json!({"capabilities": [{"name": "a"}, "b", 3]}));
        assert_eq!(names(&records), vec!["a", "b"]);
    }

    #[test]
    fn test_flatten_modules() {
        let value = json!({
            "modules": {
                "Billing": {
                    "WebServices": [{
                        "ServiceName": "InvoiceService",
                        "description": "invoices",
                        "Operations": [{"MethodName": "createInvoice"}, {"MethodName": "voidInvoice"}]
                    }],
                    "operations": [{"name": "listInvoices", "dataFormat": "JSON"}]
                }
            }
        });
        let records = flatten_records(value);
        assert_eq!(records.len(), 2);

        let service = &records[0];
        assert_eq!(service.first_str(&["name"]).unwrap(), "InvoiceService");
        assert_eq!(service.first_str(&["type"]).unwrap(), "Web Service");
        assert_eq!(service.first_str(&["protocol"]).unwrap(), "HTTPS");
        assert_eq!(service.first_str(&["description"]).unwrap(), "Billing - invoices");
        assert_eq!(service.first_array_str("endpoints").unwrap(), "createInvoice");
        assert_eq!(service.first_str(&["area"]).unwrap(), "Billing");

        let operation = &records[1];
        assert_eq!(operation.first_str(&["type"]).unwrap(), "API Operation");
        assert_eq!(operation.first_str(&["dataFormat"]).unwrap(), "JSON");
        assert_eq!(operation.first_str(&["description"]).unwrap(), "Billing -");
    }

    #[test]
    fn test_flatten_top_level_modules_without_wrapper() {
        let value = json!({
            "Orders": {"operations": [{"name": "placeOrder"}]},
            "summary": "two modules"
        });
        assert_eq!(names(&flatten_records(value)), vec!["placeOrder"]);
    }

    #[test]
    fn test_flatten_fallback_tags_module() {
        let value = json!({
            "Customers": [{"name": "createCustomer"}],
            "Accounts": [{"name": "openAccount"}],
            "note": "ignored"
        });
        let records = flatten_records(value);
        assert_eq!(records.len(), 2);
        let customer = records
            .iter()
            .find(|r| r.first_str(&["name"]).as_deref() == Some("createCustomer"))
            .unwrap();
        assert_eq!(customer.first_str(&["module"]).unwrap(), "Customers");
    }

    #[test]
    fn test_strip_envelope_variants() {
        assert_eq!(strip_envelope("  [1]  "), "[1]");
        assert_eq!(strip_envelope("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_envelope("```json\n[1, 2"), "[1, 2");
        assert_eq!(strip_envelope("\"[1]\""), "[1]");
        assert_eq!(strip_envelope("Result:\n```json\n[1]\n```\nDone."), "[1]");
        assert_eq!(strip_envelope("```json\n[1]```"), "[1]");
    }

    #[test]
    fn test_strip_envelope_keeps_quoted_fences() {
        let raw = r#"[{"name": "getOrder", "sampleRequest": "```xml\n<getOrder/>\n```"}]"#;
        assert_eq!(strip_envelope(raw), raw);
    }

    #[tokio::test]
    async fn test_parse_fenced_sample_inside_value() {
        let raw = r#"[{"name": "getOrder", "sampleRequest": "```xml\n<getOrder/>\n```"}]"#;
        let records = parse_local(raw).await;
        assert_eq!(names(&records), vec!["getOrder"]);
        assert_eq!(
            records[0].first_str(&["sampleRequest"]).unwrap(),
            "```xml\n<getOrder/>\n```"
        );
    }

    #[tokio::test]
    async fn test_parse_wrapper_around_fenced_value() {
        let raw = "```json\n[{\"name\": \"a\", \"sampleResponse\": \"```\"}]\n```";
        let records = parse_local(raw).await;
        assert_eq!(names(&records), vec!["a"]);
        assert_eq!(records[0].first_str(&["sampleResponse"]).unwrap(), "```");
    }
}
