//! In-process provider server
//!
//! ProviderServer drives a Provider the way Terraform core does: it
//! configures the provider once, keeps the provider data it returns, and for
//! every data source or resource call builds a fresh instance from the
//! registered factory, configures it, then runs the lifecycle method.
//! There is no transport here; callers invoke the methods directly.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ReadDataSourceResponse, ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::plan_modifier::{plan_resource, PlannedChange};
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderData, ProviderMetadataRequest,
    ProviderSchemaRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest, ReadResourceRequest,
    ReadResourceResponse, ResourceSchemaRequest, ResourceWithConfigure, UpdateResourceRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::Schema;
use crate::types::{Diagnostic, DiagnosticsExt, DynamicValue};
use crate::validator::validate_config;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::Instrument;

pub const DEFAULT_TERRAFORM_VERSION: &str = "1.9.0";

/// Schemas for the provider and everything it registers
#[derive(Debug, Clone)]
pub struct ProviderSchemas {
    pub provider: Schema,
    pub data_sources: HashMap<String, Schema>,
    pub resources: HashMap<String, Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of applying a planned change
#[derive(Debug, Clone)]
pub struct ApplyResourceChangeResponse {
    /// Null after a successful destroy
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    NoOp,
}

impl ChangeAction {
    /// Derives the action from prior/planned nullness
    pub fn between(prior_state: &DynamicValue, planned_state: &DynamicValue) -> Self {
        match (prior_state.is_null(), planned_state.is_null()) {
            (true, false) => ChangeAction::Create,
            (false, true) => ChangeAction::Delete,
            (false, false) => ChangeAction::Update,
            (true, true) => ChangeAction::NoOp,
        }
    }
}

pub struct ProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: RwLock<Option<ProviderData>>,
}

impl<P: Provider + 'static> ProviderServer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: RwLock::new(None),
        }
    }

    pub async fn is_configured(&self) -> bool {
        self.provider_data.read().await.is_some()
    }

    pub async fn provider_version(&self) -> String {
        let ctx = Context::for_operation("GetMetadata");
        let provider = self.provider.read().await;
        provider
            .metadata(ctx, ProviderMetadataRequest)
            .await
            .version
    }

    pub async fn get_provider_schema(&self) -> ProviderSchemas {
        let ctx = Context::for_operation("GetProviderSchema");
        let provider = self.provider.read().await;

        let provider_schema = provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .instrument(ctx.span())
            .await;
        let mut diagnostics = provider_schema.diagnostics;

        let mut data_sources = HashMap::new();
        for (type_name, factory) in provider.data_sources() {
            let response = factory()
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_sources.insert(type_name, response.schema);
        }

        let mut resources = HashMap::new();
        for (type_name, factory) in provider.resources() {
            let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resources.insert(type_name, response.schema);
        }

        ProviderSchemas {
            provider: provider_schema.schema,
            data_sources,
            resources,
            diagnostics,
        }
    }

    pub async fn validate_provider_config(&self, config: DynamicValue) -> Vec<Diagnostic> {
        let ctx = Context::for_operation("ValidateProviderConfig");
        let provider = self.provider.read().await;

        let schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(validate_config(&schema.schema, &config));
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = provider
            .validate(ctx.clone(), ValidateProviderConfigRequest { config })
            .instrument(ctx.span())
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    /// Configures the provider and keeps its provider data on success
    pub async fn configure_provider(&self, config: DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = self.validate_provider_config(config.clone()).await;
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let ctx = Context::for_operation("ConfigureProvider");
        let response = {
            let mut provider = self.provider.write().await;
            provider
                .configure(
                    ctx.clone(),
                    ConfigureProviderRequest {
                        terraform_version: DEFAULT_TERRAFORM_VERSION.to_string(),
                        config,
                    },
                )
                .instrument(ctx.span())
                .await
        };
        diagnostics.extend(response.diagnostics);

        if !diagnostics.has_errors() {
            *self.provider_data.write().await = response.provider_data;
            tracing::debug!(request_id = %ctx.request_id(), "provider configured");
        }

        diagnostics
    }

    pub async fn validate_data_source_config(
        &self,
        type_name: &str,
        config: DynamicValue,
    ) -> Vec<Diagnostic> {
        let ctx = Context::for_operation("ValidateDataResourceConfig");
        let data_source = match self.data_source_instance(&ctx, type_name).await {
            Ok(ds) => ds,
            Err(diagnostics) => return diagnostics,
        };

        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(validate_config(&schema.schema, &config));
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = data_source
            .validate(
                ctx.clone(),
                ValidateDataSourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .instrument(ctx.span())
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: DynamicValue,
    ) -> ReadDataSourceResponse {
        let diagnostics = self
            .validate_data_source_config(type_name, config.clone())
            .await;
        if diagnostics.has_errors() {
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            };
        }

        let ctx = Context::for_operation("ReadDataSource");
        let data_source = match self.data_source_instance(&ctx, type_name).await {
            Ok(ds) => ds,
            Err(diagnostics) => {
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        };

        let mut response = data_source
            .read(
                ctx.clone(),
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .instrument(ctx.span())
            .await;

        let mut all = diagnostics;
        all.append(&mut response.diagnostics);
        response.diagnostics = all;
        response
    }

    pub async fn validate_resource_config(
        &self,
        type_name: &str,
        config: DynamicValue,
    ) -> Vec<Diagnostic> {
        let ctx = Context::for_operation("ValidateResourceConfig");
        let resource = match self.resource_instance(&ctx, type_name).await {
            Ok(r) => r,
            Err(diagnostics) => return diagnostics,
        };

        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(validate_config(&schema.schema, &config));
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = resource
            .validate(
                ctx.clone(),
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .instrument(ctx.span())
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    /// Plans a change; a null config plans a destroy
    pub async fn plan_resource_change(
        &self,
        type_name: &str,
        prior_state: DynamicValue,
        config: DynamicValue,
    ) -> PlannedChange {
        if !config.is_null() {
            let diagnostics = self.validate_resource_config(type_name, config.clone()).await;
            if diagnostics.has_errors() {
                return PlannedChange {
                    planned_state: prior_state,
                    requires_replace: vec![],
                    diagnostics,
                };
            }
        }

        let ctx = Context::for_operation("PlanResourceChange");
        let resource = match self.resource_instance(&ctx, type_name).await {
            Ok(r) => r,
            Err(diagnostics) => {
                return PlannedChange {
                    planned_state: prior_state,
                    requires_replace: vec![],
                    diagnostics,
                }
            }
        };

        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
        let _span = ctx.span().entered();
        let change = plan_resource(&schema.schema, &config, &prior_state);
        tracing::debug!(
            type_name,
            requires_replace = change.requires_replace.len(),
            "planned resource change"
        );
        change
    }

    /// Runs create, update or delete depending on prior/planned nullness
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior_state: DynamicValue,
        planned_state: DynamicValue,
        config: DynamicValue,
    ) -> ApplyResourceChangeResponse {
        let ctx = Context::for_operation("ApplyResourceChange");
        let resource = match self.resource_instance(&ctx, type_name).await {
            Ok(r) => r,
            Err(diagnostics) => {
                return ApplyResourceChangeResponse {
                    new_state: prior_state,
                    diagnostics,
                }
            }
        };

        let action = ChangeAction::between(&prior_state, &planned_state);
        tracing::debug!(request_id = %ctx.request_id(), type_name, ?action, "applying resource change");

        let (new_state, diagnostics) = match action {
            ChangeAction::Create => {
                let response = resource
                    .create(
                        ctx.clone(),
                        CreateResourceRequest {
                            type_name: type_name.to_string(),
                            planned_state,
                            config,
                        },
                    )
                    .instrument(ctx.span())
                    .await;
                (response.new_state, response.diagnostics)
            }
            ChangeAction::Update => {
                let response = resource
                    .update(
                        ctx.clone(),
                        UpdateResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior_state.clone(),
                            planned_state,
                            config,
                        },
                    )
                    .instrument(ctx.span())
                    .await;
                (response.new_state, response.diagnostics)
            }
            ChangeAction::Delete => {
                let response = resource
                    .delete(
                        ctx.clone(),
                        DeleteResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior_state.clone(),
                        },
                    )
                    .instrument(ctx.span())
                    .await;
                (DynamicValue::null(), response.diagnostics)
            }
            ChangeAction::NoOp => (planned_state, vec![]),
        };

        // A failed apply leaves the previous state in place
        if diagnostics.has_errors() {
            return ApplyResourceChangeResponse {
                new_state: prior_state,
                diagnostics,
            };
        }

        ApplyResourceChangeResponse {
            new_state,
            diagnostics,
        }
    }

    pub async fn read_resource(
        &self,
        type_name: &str,
        current_state: DynamicValue,
    ) -> ReadResourceResponse {
        let ctx = Context::for_operation("ReadResource");
        let resource = match self.resource_instance(&ctx, type_name).await {
            Ok(r) => r,
            Err(diagnostics) => {
                return ReadResourceResponse {
                    new_state: Some(current_state),
                    diagnostics,
                }
            }
        };

        resource
            .read(
                ctx.clone(),
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state,
                },
            )
            .instrument(ctx.span())
            .await
    }

    async fn data_source_instance(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let factory_output = {
            let provider = self.provider.read().await;
            provider.data_sources().get(type_name).map(|factory| factory())
        };
        let mut data_source = factory_output.ok_or_else(|| {
            vec![Diagnostic::error(
                "Unknown data source type",
                TfplugError::DataSourceNotFound(type_name.to_string()).to_string(),
            )]
        })?;

        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }

        Ok(data_source)
    }

    async fn resource_instance(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory_output = {
            let provider = self.provider.read().await;
            provider.resources().get(type_name).map(|factory| factory())
        };
        let mut resource = factory_output.ok_or_else(|| {
            vec![Diagnostic::error(
                "Unknown resource type",
                TfplugError::ResourceNotFound(type_name.to_string()).to_string(),
            )]
        })?;

        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }

        Ok(resource)
    }
}
