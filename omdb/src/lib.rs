pub mod api;
pub mod config;
pub mod data_sources;
pub mod models;
pub mod provider_data;
pub mod resources;
pub mod store;

pub use provider_data::OmdbProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};
use tfplug::validator::StringLengthValidator;

use config::{ProviderConfig, ATTR_API_BASE_URL, ATTR_API_KEY, ATTR_LOCAL_DIR};

pub const PROVIDER_TYPE_NAME: &str = "omdb";

pub struct OmdbProvider {
    version: String,
    commit: String,
    provider_data: Option<OmdbProviderData>,
}

impl Default for OmdbProvider {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"), "")
    }
}

impl OmdbProvider {
    pub fn new(version: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            commit: commit.into(),
            provider_data: None,
        }
    }

    /// `v<version>` for release builds, otherwise the commit
    pub fn version_string(&self) -> String {
        if self.version.is_empty() {
            self.commit.clone()
        } else {
            format!("v{}", self.version)
        }
    }

    pub fn provider_data(&self) -> Option<&OmdbProviderData> {
        self.provider_data.as_ref()
    }
}

#[async_trait]
impl Provider for OmdbProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            version: self.version_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up films on OMDb and keeps film records on local disk")
            .attribute(
                AttributeBuilder::new(ATTR_API_KEY, AttributeType::String)
                    .description("OMDb API key. Can also be set with OMDB_API_KEY")
                    .optional()
                    .sensitive()
                    .validator(StringLengthValidator::non_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_API_BASE_URL, AttributeType::String)
                    .description("OMDb API base URL. Can also be set with OMDB_API_BASE_URL")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_LOCAL_DIR, AttributeType::String)
                    .description(
                        "Directory holding film resource files. Can also be set with OMDB_LOCAL_DIR",
                    )
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(Some(url)) = request
            .config
            .get_string_opt(&AttributePath::new(ATTR_API_BASE_URL))
        {
            if let Err(e) = config::parse_base_url(&url) {
                diagnostics.push(
                    Diagnostic::error("Invalid api_base_url", e.to_string())
                        .with_attribute(AttributePath::new(ATTR_API_BASE_URL)),
                );
            }
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let fail = |diagnostic: Diagnostic| ConfigureProviderResponse {
            diagnostics: vec![diagnostic],
            provider_data: None,
        };

        let config = match ProviderConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Provider configuration failed: {}", e);
                let mut diagnostic = Diagnostic::error("Invalid provider configuration", e.to_string());
                if let Some(path) = e.attribute() {
                    diagnostic = diagnostic.with_attribute(path);
                }
                return fail(diagnostic);
            }
        };
        tracing::debug!("Configuring provider with {:?}", config);

        let client = match api::Client::new(config.api_base_url.clone(), config.api_key.clone()) {
            Ok(client) => client,
            Err(e) => {
                return fail(Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                ))
            }
        };

        let store = store::FilmStore::new(config.local_dir.clone());
        if let Err(e) = store.ensure_dir().await {
            tracing::error!(
                "Failed to create local directory {}: {}",
                config.local_dir.display(),
                e
            );
            return fail(
                Diagnostic::error("Failed to create local directory", e.to_string())
                    .with_attribute(AttributePath::new(ATTR_LOCAL_DIR)),
            );
        }

        let provider_data = OmdbProviderData::new(client, store, config);
        self.provider_data = Some(provider_data.clone());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(provider_data)),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories = HashMap::new();
        factories.insert(
            resources::film::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::FilmResource::new())
                    as Box<dyn tfplug::resource::ResourceWithConfigure>
            }) as ResourceFactory,
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories = HashMap::new();
        factories.insert(
            data_sources::film_by_id::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::FilmByIdDataSource::new())
                    as Box<dyn tfplug::data_source::DataSourceWithConfigure>
            }) as DataSourceFactory,
        );
        factories
    }
}
