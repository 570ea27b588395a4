//! Canonical capability schema

use crate::id::CapabilityId;
use crate::provenance::Provenance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of capability
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CapabilityType {
    /// Integration interface
    Interface,
    /// API or API operation
    Api,
    /// Web service or other hosted service
    Service,
    /// Function or method
    Function,
    /// Unrecognized label, kept verbatim
    Other(String),
}

impl CapabilityType {
    /// Parse a free-form label (case-insensitive, separators ignored)
    pub fn parse(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "interface" | "integration" => CapabilityType::Interface,
            "api" | "apioperation" | "restapi" | "endpoint" => CapabilityType::Api,
            "service" | "webservice" => CapabilityType::Service,
            "function" | "method" => CapabilityType::Function,
            _ => CapabilityType::Other(label.trim().to_string()),
        }
    }

    /// Canonical label
    pub fn as_str(&self) -> &str {
        match self {
            CapabilityType::Interface => "interface",
            CapabilityType::Api => "api",
            CapabilityType::Service => "service",
            CapabilityType::Function => "function",
            CapabilityType::Other(label) => label,
        }
    }
}

/// Interface technology of a capability
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum InterfaceKind {
    /// REST over HTTP
    Rest,
    /// SOAP web service
    Soap,
    /// GraphQL endpoint
    GraphQl,
    /// File exchange
    File,
    /// Database access
    Database,
    /// Unrecognized label, kept verbatim
    Other(String),
}

impl InterfaceKind {
    /// Parse a free-form label (case-insensitive, separators ignored)
    pub fn parse(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "rest" | "restapi" | "http" => InterfaceKind::Rest,
            "soap" | "wsdl" => InterfaceKind::Soap,
            "graphql" => InterfaceKind::GraphQl,
            "file" | "fileinterface" => InterfaceKind::File,
            "database" | "db" => InterfaceKind::Database,
            _ => InterfaceKind::Other(label.trim().to_string()),
        }
    }

    /// Canonical label
    pub fn as_str(&self) -> &str {
        match self {
            InterfaceKind::Rest => "REST",
            InterfaceKind::Soap => "SOAP",
            InterfaceKind::GraphQl => "GraphQL",
            InterfaceKind::File => "File",
            InterfaceKind::Database => "Database",
            InterfaceKind::Other(label) => label,
        }
    }
}

/// Availability of a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// Offered and usable
    Available,
    /// Currently consumed by some integration
    InUse,
    /// Scheduled for removal
    Deprecated,
    /// Not yet delivered
    Planned,
}

impl AvailabilityStatus {
    /// Canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::InUse => "in_use",
            AvailabilityStatus::Deprecated => "deprecated",
            AvailabilityStatus::Planned => "planned",
        }
    }

    /// Parse a label, if it is one of the known statuses
    pub fn parse(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "available" => Some(AvailabilityStatus::Available),
            "inuse" => Some(AvailabilityStatus::InUse),
            "deprecated" => Some(AvailabilityStatus::Deprecated),
            "planned" => Some(AvailabilityStatus::Planned),
            _ => None,
        }
    }
}

impl Default for AvailabilityStatus {
    fn default() -> Self {
        AvailabilityStatus::Available
    }
}

macro_rules! label_conversions {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl From<String> for $name {
            fn from(label: String) -> Self {
                $name::parse(&label)
            }
        }
    };
}

label_conversions!(CapabilityType);
label_conversions!(InterfaceKind);

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// One extracted unit of functionality, in canonical form
///
/// Created by the extraction ledger once per standardized record and
/// immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Unique identifier
    pub id: CapabilityId,

    /// Owning application
    pub application_id: i64,

    /// Capability or method name
    pub name: String,

    /// Kind of capability
    pub capability_type: CapabilityType,

    /// Functional area or module
    pub area: Option<String>,

    /// Human description
    pub description: Option<String>,

    /// Interface technology
    pub interface_kind: Option<InterfaceKind>,

    /// Transport protocol (HTTP, HTTPS, SFTP, ...)
    pub protocol: String,

    /// Data format (JSON, XML, CSV, ...)
    pub data_format: String,

    /// Endpoint URL, operation name or other locator
    pub endpoint: Option<String>,

    /// Example request
    pub sample_request: Option<String>,

    /// Example response or output name
    pub sample_response: Option<String>,

    /// Whether the capability is in use
    pub is_active: bool,

    /// Availability status
    pub status: AvailabilityStatus,

    /// Matched interface record, if the host resolved one
    pub mapped_interface_id: Option<i64>,

    /// Source document and method
    pub provenance: Provenance,

    /// Extraction time (seconds since epoch)
    pub extracted_at: u64,
}

impl Capability {
    /// Check the invariants the store relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        if self.protocol.trim().is_empty() {
            return Err("protocol is empty".to_string());
        }
        if self.data_format.trim().is_empty() {
            return Err("data_format is empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Capability {
        Capability {
            id: CapabilityId::new(),
            application_id: 7,
            name: "createCustomer".to_string(),
            capability_type: CapabilityType::Service,
            area: Some("Customer Management".to_string()),
            description: None,
            interface_kind: Some(InterfaceKind::Soap),
            protocol: "HTTPS".to_string(),
            data_format: "XML".to_string(),
            endpoint: Some("createCustomer".to_string()),
            sample_request: None,
            sample_response: Some("createCustomerResult".to_string()),
            is_active: true,
            status: AvailabilityStatus::Available,
            mapped_interface_id: None,
            provenance: Provenance::new("guide.pdf", "analysis-service"),
            extracted_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(CapabilityType::parse("Web Service"), CapabilityType::Service);
        assert_eq!(CapabilityType::parse("web-service"), CapabilityType::Service);
        assert_eq!(CapabilityType::parse("API Operation"), CapabilityType::Api);
        assert_eq!(
            CapabilityType::parse("data-format"),
            CapabilityType::Other("data-format".to_string())
        );
    }

    #[test]
    fn test_interface_labels() {
        assert_eq!(InterfaceKind::parse("soap"), InterfaceKind::Soap);
        assert_eq!(InterfaceKind::parse("GraphQL"), InterfaceKind::GraphQl);
        assert_eq!(InterfaceKind::parse("JMS"), InterfaceKind::Other("JMS".to_string()));
        assert_eq!(InterfaceKind::Rest.to_string(), "REST");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(AvailabilityStatus::parse("in use"), Some(AvailabilityStatus::InUse));
        assert_eq!(AvailabilityStatus::parse("in_use"), Some(AvailabilityStatus::InUse));
        assert_eq!(AvailabilityStatus::parse("retired"), None);
        assert_eq!(AvailabilityStatus::default(), AvailabilityStatus::Available);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut blank = sample();
        blank.name = "   ".to_string();
        assert!(blank.validate().is_err());
    }
}
