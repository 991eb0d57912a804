//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::config::ProviderConfig;
use crate::store::FilmStore;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct OmdbProviderData {
    pub client: Arc<Client>,
    pub store: Arc<FilmStore>,
    pub config: Arc<ProviderConfig>,
}

impl OmdbProviderData {
    pub fn new(client: Client, store: FilmStore, config: ProviderConfig) -> Self {
        Self {
            client: Arc::new(client),
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}
