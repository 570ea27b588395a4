//! Instructions sent to the analysis service

use crate::error::ExtractorError;
use crate::types::DocumentContext;
use capscan_domain::{FileKind, RawCapabilityRecord, TaskRequest};

/// Application tag for per-chunk extraction tasks
pub const EXTRACTION_APPLICATION: &str = "capability-extraction";

/// Application tag for the standardization task
pub const STANDARDIZER_APPLICATION: &str = "capability-standardizer";

/// Application tag for JSON repair tasks
pub const REPAIR_APPLICATION: &str = "capability-json-fixer";

/// Builds the extraction instruction for one chunk
pub struct PromptBuilder<'a> {
    text: &'a str,
    context: &'a DocumentContext,
    position: Option<(usize, usize)>,
    service_guide: bool,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(text: &'a str, context: &'a DocumentContext) -> Self {
        Self {
            text,
            context,
            position: None,
            service_guide: false,
        }
    }

    /// Mark the text as chunk `i` of `n` (one-based)
    pub fn with_position(mut self, position: Option<(usize, usize)>) -> Self {
        self.position = position;
        self
    }

    /// Use the web-service-guide variant of the prompt
    pub fn service_guide(mut self, enabled: bool) -> Self {
        self.service_guide = enabled;
        self
    }

    /// Build the user message
    pub fn build(&self) -> String {
        let chunk_note = self
            .position
            .map(|(i, n)| format!("\n\nNOTE: This is chunk {} of {} from the document.", i, n))
            .unwrap_or_default();

        if self.service_guide {
            return format!(
                "Analyze the following web services guide content and extract all web service methods.{}\n\n\
                 DOCUMENT CONTENT:\n{}\n\n{}",
                chunk_note, self.text, SERVICE_GUIDE_REQUIREMENTS
            );
        }

        let app_context = self
            .context
            .application_name
            .as_deref()
            .map(|name| format!(" for the application \"{}\"", name))
            .unwrap_or_default();

        format!(
            "Analyze the following document content and extract all technical capabilities{}.{}\n\n\
             DOCUMENT CONTENT:\n{}\n\n{}\n{}\n\n\
             Be exhaustive and extract every single capability mentioned.",
            app_context,
            chunk_note,
            self.text,
            EXTRACTION_TARGETS,
            file_kind_hint(&self.context.file_kind)
        )
    }

    /// Wrap the message in a task request
    pub fn into_request(self) -> TaskRequest {
        TaskRequest {
            application: EXTRACTION_APPLICATION.to_string(),
            role: "You are an expert system analyst specializing in extracting application \
                   capabilities and interfaces from technical documents."
                .to_string(),
            task: "Extract all capabilities, interfaces, and integration points from the document"
                .to_string(),
            format: "Return structured JSON with all capabilities found".to_string(),
            restrictions: "Extract only information explicitly mentioned in the document"
                .to_string(),
            additional: "Be exhaustive and thorough. Include every capability, no matter how small."
                .to_string(),
            message: self.build(),
            max_tokens: 16000,
            temperature: 0.1,
        }
    }
}

fn file_kind_hint(kind: &FileKind) -> &'static str {
    match kind {
        FileKind::Pdf => "This is a PDF document. Extract all technical capabilities mentioned.",
        FileKind::Text => "This is a text file. Extract all technical capabilities and interfaces.",
        FileKind::Word => {
            "This is a Word document. Extract all API specifications and capabilities."
        }
        FileKind::Image => {
            "This is an image/diagram. Identify all systems, connections, and integration points shown."
        }
        FileKind::Excel => {
            "This is an Excel file. Extract any API specifications, data models, or capability lists."
        }
        FileKind::Other(_) => "Extract all technical capabilities from this document.",
    }
}

/// Instruction that normalizes records into the canonical schema
pub fn standardization_request(
    records: &[RawCapabilityRecord],
) -> Result<TaskRequest, ExtractorError> {
    let input = serde_json::to_string_pretty(records)
        .map_err(|e| ExtractorError::Standardization(format!("Failed to encode records: {}", e)))?;

    Ok(TaskRequest {
        application: STANDARDIZER_APPLICATION.to_string(),
        role: "You are a data standardization expert that converts various capability formats \
               into a consistent schema."
            .to_string(),
        task: "Standardize the capability data into the required format".to_string(),
        format: "Return only valid JSON array in the specified format".to_string(),
        restrictions: "Do not add explanations, return only JSON".to_string(),
        additional: "Preserve all original information while standardizing the format"
            .to_string(),
        message: format!(
            "Please standardize the following capabilities into a consistent format.\n\n\
             Input capabilities:\n{}\n\n{}",
            input, STANDARD_SCHEMA
        ),
        max_tokens: 8000,
        temperature: 0.1,
    })
}

/// Instruction that asks the service to fix truncated or malformed JSON
pub fn repair_request(text: &str) -> TaskRequest {
    TaskRequest {
        application: REPAIR_APPLICATION.to_string(),
        role: "You are a JSON parser that fixes truncated or malformed JSON.".to_string(),
        task: "Fix the truncated JSON and return valid JSON".to_string(),
        format: "Return only valid JSON array".to_string(),
        restrictions: "Do not add explanations, return only JSON".to_string(),
        additional: String::new(),
        message: format!(
            "The following JSON array was truncated. Please complete or fix it to make it valid \
             JSON. Return ONLY the valid JSON array, no explanations:\n\n{}\n\n\
             Return a valid JSON array of capabilities.",
            text
        ),
        max_tokens: 8000,
        temperature: 0.0,
    }
}

const EXTRACTION_TARGETS: &str = r#"Extract:
1. All APIs and web services
2. File interfaces and data formats
3. Integration points and protocols
4. Public methods and functions
5. Directory structures and paths
6. Configuration parameters
7. System interfaces

Return a JSON array of capabilities with properties like: name, type, description, protocol, etc."#;

const SERVICE_GUIDE_REQUIREMENTS: &str = r#"EXTRACTION REQUIREMENTS:
For EACH web service method found in the above content, extract:
1. area - The functional area/module (e.g., "Corporate Manager - Customer Management")
2. webMethod - The exact method name (e.g., "createCustomer")
3. outputName - The output result name (e.g., "createCustomerResult")
4. description - What the method does
5. interfaceType - SOAP or REST

Look for patterns like:
- Method definitions
- Operation names
- Service endpoints
- WSDL operations
- API documentation sections

Return a JSON array where each element has: {area, webMethod, outputName, description, interfaceType}"#;

const STANDARD_SCHEMA: &str = r#"For EACH capability, extract and return in this exact JSON format:
[
  {
    "name": "<capability name or method name>",
    "type": "<interface|api|web-service|function|data-format>",
    "area": "<functional area or module>",
    "description": "<what this capability does>",
    "interfaceType": "<SOAP|REST|GraphQL|File|Database|etc>",
    "protocol": "<HTTP|HTTPS|FTP|TCP|etc>",
    "dataFormat": "<JSON|XML|CSV|Binary|etc>",
    "endpoint": "<endpoint URL or method name>",
    "sampleRequest": "<example request if available>",
    "sampleResponse": "<example response or output name if available>"
  }
]

IMPORTANT:
- Use "name" for the capability/method name (not webMethod)
- Ensure all fields are present (use null if not available)
- Maintain the original information but in standardized format
- If interfaceType is not specified, infer from context
- Return ONLY the JSON array, no explanations"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn context(kind: FileKind, app: Option<&str>) -> DocumentContext {
        DocumentContext {
            filename: "guide.pdf".to_string(),
            file_kind: kind,
            application_name: app.map(str::to_string),
        }
    }

    #[test]
    fn test_prompt_includes_text_and_application() {
        let ctx = context(FileKind::Pdf, Some("Billing"));
        let prompt = PromptBuilder::new("createInvoice does X", &ctx).build();

        assert!(prompt.contains("createInvoice does X"));
        assert!(prompt.contains("for the application \"Billing\""));
        assert!(prompt.contains("This is a PDF document."));
        assert!(!prompt.contains("NOTE: This is chunk"));
    }

    #[test]
    fn test_prompt_includes_chunk_note() {
        let ctx = context(FileKind::Text, None);
        let prompt = PromptBuilder::new("text", &ctx)
            .with_position(Some((2, 3)))
            .build();
        assert!(prompt.contains("NOTE: This is chunk 2 of 3 from the document."));
        assert!(prompt.contains("This is a text file."));
    }

    #[test]
    fn test_unknown_kind_uses_generic_hint() {
        let ctx = context(FileKind::Other("xml".into()), None);
        let prompt = PromptBuilder::new("text", &ctx).build();
        assert!(prompt.contains("Extract all technical capabilities from this document."));
    }

    #[test]
    fn test_service_guide_variant() {
        let ctx = context(FileKind::Pdf, Some("Billing"));
        let prompt = PromptBuilder::new("body", &ctx).service_guide(true).build();
        assert!(prompt.contains("{area, webMethod, outputName, description, interfaceType}"));
        assert!(!prompt.contains("Billing"));
    }

    #[test]
    fn test_task_budgets() {
        let ctx = context(FileKind::Pdf, None);
        let extraction = PromptBuilder::new("body", &ctx).into_request();
        assert_eq!(extraction.application, EXTRACTION_APPLICATION);
        assert_eq!(extraction.max_tokens, 16000);

        let standardize = standardization_request(&[RawCapabilityRecord::new().with("name", "a")])
            .unwrap();
        assert_eq!(standardize.max_tokens, 8000);
        assert!(standardize.message.contains("\"name\": \"a\""));

        let repair = repair_request("[{\"name\":");
        assert_eq!(repair.temperature, 0.0);
        assert!(repair.message.contains("[{\"name\":"));
    }
}
