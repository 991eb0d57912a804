//! Film resource backed by a JSON file per film

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::TfplugError;

use crate::models::{
    ratings_from_state, FilmRecord, ATTR_ID, ATTR_RATINGS, ATTR_SOURCE, ATTR_TITLE, ATTR_VALUE,
    ATTR_YEAR,
};
use crate::store::FilmStore;
use crate::OmdbProviderData;

pub const TYPE_NAME: &str = "omdb_film";

#[derive(Default)]
pub struct FilmResource {
    provider_data: Option<OmdbProviderData>,
}

impl FilmResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Result<&FilmStore, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(|data| data.store.as_ref())
            .ok_or_else(|| {
                Diagnostic::error(
                    TfplugError::ProviderNotConfigured.to_string(),
                    "Provider data was not properly configured",
                )
            })
    }
}

#[async_trait]
impl Resource for FilmResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("A film stored as a JSON file in the provider's local directory")
            .attribute(
                AttributeBuilder::new(ATTR_ID, AttributeType::String)
                    .description("Generated identifier, also the file name")
                    .computed()
                    .plan_modifier(RequiresReplaceIfChanged)
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_TITLE, AttributeType::String)
                    .description("Title of the film")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_YEAR, AttributeType::String)
                    .description("Release year of the film")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    ATTR_RATINGS,
                    AttributeType::string_object_list(&[ATTR_SOURCE, ATTR_VALUE]),
                )
                .description("Review scores for the film")
                .optional()
                .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let fail = |diagnostic: Diagnostic| CreateResourceResponse {
            new_state: DynamicValue::null(),
            diagnostics: vec![diagnostic],
        };

        let store = match self.store() {
            Ok(store) => store,
            Err(diagnostic) => return fail(diagnostic),
        };

        let mut film = match FilmRecord::from_state(&request.planned_state) {
            Ok(film) => film,
            Err(e) => return fail(Diagnostic::error("Failed to read plan", e.to_string())),
        };

        let id = match store.create(&film.to_file()).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to write film {:?}: {}", film.title, e);
                return fail(Diagnostic::error("error writing film to file", e.to_string()));
            }
        };
        tracing::debug!("Created film {} ({:?})", id, film.title);

        film.id = Some(id);
        match film.to_state() {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => fail(Diagnostic::error("Failed to build state", e.to_string())),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let store = match self.store() {
            Ok(store) => store,
            Err(diagnostic) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diagnostic],
                }
            }
        };

        let id = match request
            .current_state
            .get_string_opt(&AttributePath::new(ATTR_ID))
        {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                tracing::debug!("Film state has no id, removing from state");
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                };
            }
            Err(e) => {
                tracing::error!("Film state has an invalid id: {}", e);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![
                        Diagnostic::error("error reading film state", e.to_string())
                            .with_attribute(AttributePath::new(ATTR_ID)),
                    ],
                };
            }
        };

        let file = match store.read(&id).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                tracing::debug!("Film {} no longer exists, removing from state", id);
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                };
            }
            Err(e) => {
                tracing::error!("Failed to read film {}: {}", id, e);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![Diagnostic::error("error reading film file", e.to_string())],
                };
            }
        };

        let mut film = FilmRecord::from_file(id, file);
        // The file cannot tell an empty list from null; keep what state had
        if film.ratings.is_none() {
            if let Ok(Some(ratings)) = ratings_from_state(&request.current_state) {
                if ratings.is_empty() {
                    film.ratings = Some(ratings);
                }
            }
        }

        match film.to_state() {
            Ok(state) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![Diagnostic::error("Failed to build state", e.to_string())],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let fail = |state: DynamicValue, diagnostic: Diagnostic| UpdateResourceResponse {
            new_state: state,
            diagnostics: vec![diagnostic],
        };

        let store = match self.store() {
            Ok(store) => store,
            Err(diagnostic) => return fail(request.prior_state, diagnostic),
        };

        // The id never changes in place, whatever the plan says
        let id = match request
            .prior_state
            .get_string_opt(&AttributePath::new(ATTR_ID))
        {
            Ok(Some(id)) if !id.is_empty() => id,
            _ => {
                return fail(
                    request.prior_state,
                    Diagnostic::error("update error", "cannot update film with unknown ID"),
                )
            }
        };

        let mut film = match FilmRecord::from_state(&request.planned_state) {
            Ok(film) => film,
            Err(e) => {
                return fail(
                    request.prior_state,
                    Diagnostic::error("Failed to read plan", e.to_string()),
                )
            }
        };

        if let Err(e) = store.write(&id, &film.to_file()).await {
            tracing::error!("Failed to overwrite film {}: {}", id, e);
            return fail(
                request.prior_state,
                Diagnostic::error("error writing film to file", e.to_string()),
            );
        }
        tracing::debug!("Updated film {}", id);

        film.id = Some(id);
        match film.to_state() {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => fail(
                request.prior_state,
                Diagnostic::error("Failed to build state", e.to_string()),
            ),
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let store = match self.store() {
            Ok(store) => store,
            Err(diagnostic) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diagnostic],
                }
            }
        };

        let id = match request
            .prior_state
            .get_string_opt(&AttributePath::new(ATTR_ID))
        {
            Ok(Some(id)) if !id.is_empty() => id,
            _ => {
                return DeleteResourceResponse {
                    diagnostics: vec![Diagnostic::error(
                        "delete error",
                        "cannot delete film with unknown ID",
                    )],
                }
            }
        };

        match store.delete(&id).await {
            Ok(()) => {
                tracing::debug!("Deleted film {}", id);
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                tracing::error!("Failed to delete film {}: {}", id, e);
                DeleteResourceResponse {
                    diagnostics: vec![Diagnostic::error("delete error", e.to_string())],
                }
            }
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for FilmResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<OmdbProviderData>() {
                self.provider_data = Some(provider_data.clone());
                tracing::debug!("Configured film resource with provider data");
            } else {
                tracing::error!("Failed to downcast provider data to OmdbProviderData");
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract OmdbProviderData from provider data",
                ));
            }
        }

        ConfigureResourceResponse { diagnostics }
    }
}
