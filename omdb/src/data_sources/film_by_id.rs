//! Film lookup by IMDb id

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthValidator;
use tfplug::TfplugError;

use crate::models::{ATTR_IMDB_ID, ATTR_RATINGS, ATTR_SOURCE, ATTR_TITLE, ATTR_VALUE, ATTR_YEAR};
use crate::OmdbProviderData;

pub const TYPE_NAME: &str = "omdb_film_by_id";

#[derive(Default)]
pub struct FilmByIdDataSource {
    provider_data: Option<OmdbProviderData>,
}

impl FilmByIdDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn error_response(diagnostics: Vec<Diagnostic>) -> ReadDataSourceResponse {
        ReadDataSourceResponse {
            state: DynamicValue::null(),
            diagnostics,
        }
    }
}

#[async_trait]
impl DataSource for FilmByIdDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up a film on OMDb by its IMDb id")
            .attribute(
                AttributeBuilder::new(ATTR_IMDB_ID, AttributeType::String)
                    .description("IMDb id of the film, e.g. tt0111161")
                    .required()
                    .validator(StringLengthValidator::non_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_TITLE, AttributeType::String)
                    .description("Title of the film")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_YEAR, AttributeType::String)
                    .description("Release year of the film")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    ATTR_RATINGS,
                    AttributeType::string_object_list(&[ATTR_SOURCE, ATTR_VALUE]),
                )
                .description("Review scores as reported by OMDb")
                .computed()
                .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return Self::error_response(vec![Diagnostic::error(
                    TfplugError::ProviderNotConfigured.to_string(),
                    "Provider data was not properly configured",
                )]);
            }
        };

        let imdb_id = match request
            .config
            .get_string_opt(&AttributePath::new(ATTR_IMDB_ID))
        {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                return Self::error_response(vec![Diagnostic::error(
                    "Missing imdb_id",
                    "imdb_id must be a known, non-empty string",
                )
                .with_attribute(AttributePath::new(ATTR_IMDB_ID))]);
            }
            Err(e) => {
                return Self::error_response(vec![Diagnostic::error(
                    "Invalid imdb_id",
                    e.to_string(),
                )
                .with_attribute(AttributePath::new(ATTR_IMDB_ID))]);
            }
        };

        tracing::debug!("Reading film {} from OMDb", imdb_id);

        let film = match provider_data.client.get_film_by_id(&imdb_id).await {
            Ok(film) => film,
            Err(e) if e.is_transport() => {
                tracing::error!("OMDb request for {} failed: {}", imdb_id, e);
                return Self::error_response(vec![Diagnostic::error(
                    "error making http request",
                    e.to_string(),
                )]);
            }
            Err(e) => {
                tracing::error!("OMDb response for {} unusable: {}", imdb_id, e);
                return Self::error_response(vec![Diagnostic::error(
                    "error decoding API response",
                    e.to_string(),
                )]);
            }
        };

        match film.into_lookup(&imdb_id).to_state() {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => Self::error_response(vec![Diagnostic::error(
                "Failed to build state",
                e.to_string(),
            )]),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for FilmByIdDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        // Unconfigured providers are reported by read, not here
        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<OmdbProviderData>() {
                self.provider_data = Some(provider_data.clone());
                tracing::debug!("Configured film_by_id data source with provider data");
            } else {
                tracing::error!("Failed to downcast provider data to OmdbProviderData");
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract OmdbProviderData from provider data",
                ));
            }
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
