use serde::Deserialize;

use crate::models::{FilmLookup, Rating};

/// Subset of the OMDb title response the provider uses
#[derive(Debug, Clone, Deserialize)]
pub struct FilmResponse {
    #[serde(rename = "imdbID", default)]
    pub imdb_id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "Ratings", default)]
    pub ratings: Vec<Rating>,
}

impl FilmResponse {
    /// The requested id is kept even when OMDb echoes a different one
    pub fn into_lookup(self, requested_id: &str) -> FilmLookup {
        FilmLookup {
            imdb_id: requested_id.to_string(),
            title: self.title,
            year: self.year,
            ratings: self.ratings,
        }
    }
}
