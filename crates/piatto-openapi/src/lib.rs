/*!
# piatto-openapi

OpenAPI 3.0 document generation for the piatto handler framework.

This crate turns route metadata collected at registration time into a
complete, internally consistent OpenAPI document: operations per route,
shared component schemas, and namespaced aliases for nested types so that
unrelated handlers reusing a type name never collide.

## Usage

```rust
use piatto_openapi::{ApiConfig, DocumentBuilder};

let builder = DocumentBuilder::new(ApiConfig::new("Demo API", "1.0.0"));
let spec = builder.generate(&[], &[]).unwrap();
assert_eq!(spec.openapi, "3.0.2");
```
*/

// Re-export main types
pub use crate::{
    builder::{DocumentBuilder, RouteDoc, TagDoc},
    config::ApiConfig,
    error::{OpenApiError, OpenApiResult},
    registry::{SchemaRegistry, SchemaSource},
    specification::OpenApiSpec,
};

// Core modules
pub mod builder;
pub mod config;
pub mod error;
pub mod specification;

// Schema registration and translation
pub mod registry;
pub mod resolve;

// Documentation UI pages
pub mod ui;
