//! Film types and their mapping to Terraform values
//!
//! Conversions between `DynamicValue` objects and these structs are written
//! out by hand, one attribute at a time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::{Result, TfplugError};

pub const ATTR_ID: &str = "id";
pub const ATTR_IMDB_ID: &str = "imdb_id";
pub const ATTR_TITLE: &str = "title";
pub const ATTR_YEAR: &str = "year";
pub const ATTR_RATINGS: &str = "ratings";
pub const ATTR_SOURCE: &str = "source";
pub const ATTR_VALUE: &str = "value";

/// One review score, in the shape OMDb returns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Rating {
    pub fn new(source: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            value: value.into(),
        }
    }

    pub fn to_dynamic(&self) -> Dynamic {
        Dynamic::Map(HashMap::from([
            (ATTR_SOURCE.to_string(), Dynamic::String(self.source.clone())),
            (ATTR_VALUE.to_string(), Dynamic::String(self.value.clone())),
        ]))
    }

    /// Null or missing fields become empty strings
    pub fn from_dynamic(value: &Dynamic) -> Result<Self> {
        let fields = value.as_map().ok_or_else(|| TfplugError::TypeMismatch {
            expected: "object".to_string(),
            actual: value.type_name().to_string(),
        })?;

        let field = |name: &str| -> Result<String> {
            match fields.get(name) {
                None | Some(Dynamic::Null) => Ok(String::new()),
                Some(Dynamic::String(s)) => Ok(s.clone()),
                Some(other) => Err(TfplugError::TypeMismatch {
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                }),
            }
        };

        Ok(Self {
            source: field(ATTR_SOURCE)?,
            value: field(ATTR_VALUE)?,
        })
    }
}

pub fn ratings_to_dynamic(ratings: &[Rating]) -> Dynamic {
    Dynamic::List(ratings.iter().map(Rating::to_dynamic).collect())
}

/// Reads the `ratings` attribute; null, unknown or absent is None
pub fn ratings_from_state(state: &DynamicValue) -> Result<Option<Vec<Rating>>> {
    match state.get(&AttributePath::new(ATTR_RATINGS)) {
        None | Some(Dynamic::Null) | Some(Dynamic::Unknown) => Ok(None),
        Some(Dynamic::List(items)) => items
            .iter()
            .map(Rating::from_dynamic)
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => Err(TfplugError::TypeMismatch {
            expected: "list".to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

/// State of the film lookup data source
#[derive(Debug, Clone, PartialEq)]
pub struct FilmLookup {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    pub ratings: Vec<Rating>,
}

impl FilmLookup {
    pub fn to_state(&self) -> Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_string(&AttributePath::new(ATTR_IMDB_ID), self.imdb_id.clone())?;
        state.set_string(&AttributePath::new(ATTR_TITLE), self.title.clone())?;
        state.set_string(&AttributePath::new(ATTR_YEAR), self.year.clone())?;
        state.set_value(
            &AttributePath::new(ATTR_RATINGS),
            ratings_to_dynamic(&self.ratings),
        )?;
        Ok(state)
    }
}

/// Plan or state of the film resource
#[derive(Debug, Clone, PartialEq)]
pub struct FilmRecord {
    pub id: Option<String>,
    pub title: String,
    pub year: String,
    pub ratings: Option<Vec<Rating>>,
}

impl FilmRecord {
    pub fn from_state(state: &DynamicValue) -> Result<Self> {
        Ok(Self {
            id: state
                .get_string_opt(&AttributePath::new(ATTR_ID))?
                .filter(|id| !id.is_empty()),
            title: state.get_string(&AttributePath::new(ATTR_TITLE))?,
            year: state.get_string(&AttributePath::new(ATTR_YEAR))?,
            ratings: ratings_from_state(state)?,
        })
    }

    pub fn to_state(&self) -> Result<DynamicValue> {
        let mut state = DynamicValue::object();
        match &self.id {
            Some(id) => state.set_string(&AttributePath::new(ATTR_ID), id.clone())?,
            None => state.set_null(&AttributePath::new(ATTR_ID))?,
        }
        state.set_string(&AttributePath::new(ATTR_TITLE), self.title.clone())?;
        state.set_string(&AttributePath::new(ATTR_YEAR), self.year.clone())?;
        match &self.ratings {
            Some(ratings) => {
                state.set_value(&AttributePath::new(ATTR_RATINGS), ratings_to_dynamic(ratings))?
            }
            None => state.set_null(&AttributePath::new(ATTR_RATINGS))?,
        }
        Ok(state)
    }

    pub fn to_file(&self) -> FilmFile {
        FilmFile {
            title: self.title.clone(),
            year: self.year.clone(),
            ratings: self.ratings.clone().unwrap_or_default(),
        }
    }

    /// An empty ratings list on disk is null in state
    pub fn from_file(id: String, file: FilmFile) -> Self {
        Self {
            id: Some(id),
            title: file.title,
            year: file.year,
            ratings: if file.ratings.is_empty() {
                None
            } else {
                Some(file.ratings)
            },
        }
    }
}

/// On-disk representation of a film resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmFile {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Ratings", default, skip_serializing_if = "Vec::is_empty")]
    pub ratings: Vec<Rating>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(title: &str, year: &str, ratings: Option<Vec<Rating>>) -> DynamicValue {
        FilmRecord {
            id: None,
            title: title.to_string(),
            year: year.to_string(),
            ratings,
        }
        .to_state()
        .unwrap()
    }

    #[test]
    fn film_record_reads_plan_with_unknown_id() {
        let mut state = plan("X", "1999", None);
        state.mark_unknown(&AttributePath::new(ATTR_ID)).unwrap();

        let record = FilmRecord::from_state(&state).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.title, "X");
        assert_eq!(record.year, "1999");
        assert_eq!(record.ratings, None);
    }

    #[test]
    fn film_record_requires_title() {
        let mut state = DynamicValue::object();
        state
            .set_string(&AttributePath::new(ATTR_YEAR), "1999".to_string())
            .unwrap();

        assert!(FilmRecord::from_state(&state).is_err());
    }

    #[test]
    fn ratings_with_null_fields_become_empty_strings() {
        let mut state = plan("X", "1999", None);
        let item = Dynamic::Map(HashMap::from([
            (ATTR_SOURCE.to_string(), Dynamic::String("Metacritic".to_string())),
            (ATTR_VALUE.to_string(), Dynamic::Null),
        ]));
        state
            .set_list(&AttributePath::new(ATTR_RATINGS), vec![item])
            .unwrap();

        let ratings = ratings_from_state(&state).unwrap().unwrap();
        assert_eq!(ratings, vec![Rating::new("Metacritic", "")]);
    }

    #[test]
    fn ratings_of_wrong_type_are_rejected() {
        let mut state = plan("X", "1999", None);
        state
            .set_string(&AttributePath::new(ATTR_RATINGS), "9/10".to_string())
            .unwrap();

        assert!(ratings_from_state(&state).is_err());
    }

    #[test]
    fn film_file_omits_empty_ratings() {
        let file = FilmFile {
            title: "X".to_string(),
            year: "1999".to_string(),
            ratings: vec![],
        };
        let json = serde_json::to_string(&file).unwrap();
        assert_eq!(json, r#"{"Title":"X","Year":"1999"}"#);
    }

    #[test]
    fn empty_ratings_on_disk_read_back_as_null() {
        let record = FilmRecord::from_file(
            "00aa".to_string(),
            FilmFile {
                title: "X".to_string(),
                year: "1999".to_string(),
                ratings: vec![],
            },
        );
        let state = record.to_state().unwrap();
        assert!(state.get(&AttributePath::new(ATTR_RATINGS)).unwrap().is_null());
        assert_eq!(state.get_string(&AttributePath::new(ATTR_ID)).unwrap(), "00aa");
    }

    #[test]
    fn lookup_state_always_has_a_ratings_list() {
        let lookup = FilmLookup {
            imdb_id: "tt0111161".to_string(),
            title: "The Shawshank Redemption".to_string(),
            year: "1994".to_string(),
            ratings: vec![],
        };
        let state = lookup.to_state().unwrap();
        assert_eq!(
            state.get_list(&AttributePath::new(ATTR_RATINGS)).unwrap(),
            Vec::<Dynamic>::new()
        );
    }
}
