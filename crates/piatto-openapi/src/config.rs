use serde::{Deserialize, Serialize};

/// Configuration for OpenAPI document generation
///
/// Mirrors the `info`/`servers`/`externalDocs` sections of the OpenAPI
/// 3.0.2 object model; everything else in the document is derived from
/// the registered routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// OpenAPI specification version (should stay in the 3.0.x family)
    pub openapi_version: String,

    /// API information
    pub info: InfoConfig,

    /// Server configurations
    pub servers: Vec<ServerConfig>,

    /// External documentation
    pub external_docs: Option<ExternalDocsConfig>,
}

/// API information section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoConfig {
    /// API title
    pub title: String,

    /// API version
    pub version: String,

    /// API description
    pub description: Option<String>,

    /// Terms of service URL
    pub terms_of_service: Option<String>,

    /// Contact information
    pub contact: Option<ContactConfig>,

    /// License information
    pub license: Option<LicenseConfig>,
}

/// Contact information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactConfig {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

/// License information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    pub name: String,
    pub url: Option<String>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub description: Option<String>,
}

/// External documentation reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalDocsConfig {
    pub url: String,
    pub description: Option<String>,
}

impl ApiConfig {
    /// Create a new configuration with the mandatory title and version
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            openapi_version: "3.0.2".to_string(),
            info: InfoConfig {
                title: title.to_string(),
                version: version.to_string(),
                description: None,
                terms_of_service: None,
                contact: None,
                license: None,
            },
            servers: Vec::new(),
            external_docs: None,
        }
    }

    /// Set the API description
    pub fn with_description(mut self, description: &str) -> Self {
        self.info.description = Some(description.to_string());
        self
    }

    /// Set the terms-of-service URL
    pub fn with_terms_of_service(mut self, url: &str) -> Self {
        self.info.terms_of_service = Some(url.to_string());
        self
    }

    /// Set contact information
    pub fn with_contact(mut self, contact: ContactConfig) -> Self {
        self.info.contact = Some(contact);
        self
    }

    /// Set license information
    pub fn with_license(mut self, name: &str, url: Option<&str>) -> Self {
        self.info.license = Some(LicenseConfig {
            name: name.to_string(),
            url: url.map(|s| s.to_string()),
        });
        self
    }

    /// Add a server entry
    pub fn add_server(mut self, url: &str, description: Option<&str>) -> Self {
        self.servers.push(ServerConfig {
            url: url.to_string(),
            description: description.map(|s| s.to_string()),
        });
        self
    }

    /// Set the external documentation link
    pub fn with_external_docs(mut self, url: &str, description: Option<&str>) -> Self {
        self.external_docs = Some(ExternalDocsConfig {
            url: url.to_string(),
            description: description.map(|s| s.to_string()),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ApiConfig::new("Demo", "0.1.0")
            .with_description("demo api")
            .add_server("http://localhost:8000", Some("dev"))
            .with_license("MIT", None);

        assert_eq!(config.info.title, "Demo");
        assert_eq!(config.info.description.as_deref(), Some("demo api"));
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.info.license.as_ref().unwrap().name, "MIT");
    }
}
