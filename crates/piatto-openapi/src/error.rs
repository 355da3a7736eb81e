use thiserror::Error;

/// Result type for OpenAPI operations
pub type OpenApiResult<T> = Result<T, OpenApiError>;

/// Errors that can occur during OpenAPI document generation
#[derive(Debug, Error)]
pub enum OpenApiError {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Schema reflection or translation error
    #[error("schema error: {0}")]
    Schema(String),

    /// A `$ref` pointed at a definition that is not present anywhere.
    /// This is a programming error in the handler's descriptor declarations
    /// and fails the build loudly instead of emitting a broken document.
    #[error("unresolved schema reference `{name}` while translating `{owner}`")]
    Reference { name: String, owner: String },

    /// Two different schemas were registered under the same component alias
    #[error("component alias `{alias}` registered twice with conflicting schemas")]
    AliasConflict { alias: String },

    /// An HTTP method the document model cannot represent
    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },

    /// Generic error with context
    #[error("OpenAPI error: {0}")]
    Generic(String),
}

impl OpenApiError {
    /// Create a new schema error
    pub fn schema_error<T: ToString>(msg: T) -> Self {
        Self::Schema(msg.to_string())
    }

    /// Create a new unresolved-reference error
    pub fn reference<N: ToString, O: ToString>(name: N, owner: O) -> Self {
        Self::Reference {
            name: name.to_string(),
            owner: owner.to_string(),
        }
    }

    /// Create a generic error
    pub fn generic<T: ToString>(msg: T) -> Self {
        Self::Generic(msg.to_string())
    }
}
