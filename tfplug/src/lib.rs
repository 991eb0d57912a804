//! tfplug - Terraform Plugin Framework for Rust
//!
//! The provider-facing half of a Terraform plugin framework: lifecycle
//! traits, dynamic values, schemas, validation, planning and an in-process
//! server that dispatches calls to data sources and resources.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod plan_modifier;
pub mod validator;

pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use provider::{DataSourceFactory, Provider, ProviderData, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::ProviderServer;
pub use types::{
    AttributePath, Config, Diagnostic, DiagnosticSeverity, DiagnosticsExt, Dynamic, DynamicValue,
    State,
};
