#![allow(clippy::disallowed_methods)]

//! End-to-end tests driving the OMDb provider through ProviderServer

use mockito::{Matcher, Server};
use omdb::models::{FilmFile, Rating};
use omdb::OmdbProvider;
use std::path::Path;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::{DiagnosticsExt, ProviderServer};

const FILM_BY_ID: &str = "omdb_film_by_id";
const FILM: &str = "omdb_film";

const SHAWSHANK: &str = r#"{
    "Title": "The Shawshank Redemption",
    "Year": "1994",
    "Rated": "R",
    "imdbID": "tt0111161",
    "Ratings": [
        {"Source": "Internet Movie Database", "Value": "9.3/10"},
        {"Source": "Rotten Tomatoes", "Value": "91%"},
        {"Source": "Metacritic", "Value": "82/100"}
    ],
    "Response": "True"
}"#;

fn provider_config(base_url: &str, local_dir: &Path) -> DynamicValue {
    let mut config = DynamicValue::object();
    config
        .set_string(&AttributePath::new("api_key"), "test-key".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("api_base_url"), format!("{}/", base_url))
        .unwrap();
    config
        .set_string(
            &AttributePath::new("local_dir"),
            local_dir.to_str().unwrap().to_string(),
        )
        .unwrap();
    config
}

async fn configured_server(base_url: &str, local_dir: &Path) -> ProviderServer<OmdbProvider> {
    let server = ProviderServer::new(OmdbProvider::new("0.1.0", "abc123"));
    let diagnostics = server
        .configure_provider(provider_config(base_url, local_dir))
        .await;
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    server
}

fn lookup_config(imdb_id: &str) -> DynamicValue {
    let mut config = DynamicValue::object();
    config
        .set_string(&AttributePath::new("imdb_id"), imdb_id.to_string())
        .unwrap();
    config
}

fn film_config(title: &str, year: &str, ratings: Option<Vec<(&str, &str)>>) -> DynamicValue {
    let mut config = DynamicValue::object();
    config
        .set_string(&AttributePath::new("title"), title.to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("year"), year.to_string())
        .unwrap();
    match ratings {
        Some(ratings) => config
            .set_list(
                &AttributePath::new("ratings"),
                ratings
                    .into_iter()
                    .map(|(s, v)| Rating::new(s, v).to_dynamic())
                    .collect(),
            )
            .unwrap(),
        None => config.set_null(&AttributePath::new("ratings")).unwrap(),
    }
    config
}

async fn create_film(
    server: &ProviderServer<OmdbProvider>,
    config: DynamicValue,
) -> DynamicValue {
    let plan = server
        .plan_resource_change(FILM, DynamicValue::null(), config.clone())
        .await;
    assert!(!plan.diagnostics.has_errors(), "{:?}", plan.diagnostics);
    assert!(plan
        .planned_state
        .get(&AttributePath::new("id"))
        .unwrap()
        .is_unknown());

    let applied = server
        .apply_resource_change(FILM, DynamicValue::null(), plan.planned_state, config)
        .await;
    assert!(!applied.diagnostics.has_errors(), "{:?}", applied.diagnostics);
    applied.new_state
}

fn film_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect()
}

fn id_of(state: &DynamicValue) -> String {
    state.get_string(&AttributePath::new("id")).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_reports_versioned_metadata_and_schemas() {
    let server = ProviderServer::new(OmdbProvider::new("0.1.0", "abc123"));
    assert_eq!(server.provider_version().await, "v0.1.0");

    let schemas = server.get_provider_schema().await;
    assert!(schemas.diagnostics.is_empty());
    assert!(schemas.provider.attribute("api_key").unwrap().sensitive);
    assert!(schemas.data_sources[FILM_BY_ID]
        .attribute("imdb_id")
        .unwrap()
        .required);
    let id = schemas.resources[FILM].attribute("id").unwrap();
    assert!(id.computed);
    assert_eq!(id.plan_modifiers.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn lookup_returns_film_from_api() {
    let mut api = Server::new_async().await;
    let mock = api
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("i".into(), "tt0111161".into()),
            Matcher::UrlEncoded("apikey".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SHAWSHANK)
        .expect(2)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server(&api.url(), dir.path()).await;

    let first = server
        .read_data_source(FILM_BY_ID, lookup_config("tt0111161"))
        .await;
    let second = server
        .read_data_source(FILM_BY_ID, lookup_config("tt0111161"))
        .await;

    assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
    assert_eq!(first.state, second.state);
    let state = first.state;
    assert_eq!(
        state.get_string(&AttributePath::new("imdb_id")).unwrap(),
        "tt0111161"
    );
    assert_eq!(
        state.get_string(&AttributePath::new("title")).unwrap(),
        "The Shawshank Redemption"
    );
    assert_eq!(state.get_string(&AttributePath::new("year")).unwrap(), "1994");
    let ratings = state.get_list(&AttributePath::new("ratings")).unwrap();
    assert_eq!(ratings.len(), 3);
    assert_eq!(
        state
            .get_string(&AttributePath::new("ratings").index(2).attribute("value"))
            .unwrap(),
        "82/100"
    );
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn lookup_surfaces_omdb_error_body() {
    let mut api = Server::new_async().await;
    let _mock = api
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"Response":"False","Error":"Incorrect IMDb ID."}"#)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server(&api.url(), dir.path()).await;

    let response = server
        .read_data_source(FILM_BY_ID, lookup_config("tt0000000"))
        .await;

    assert!(response.diagnostics.has_errors());
    assert_eq!(response.diagnostics[0].summary, "error decoding API response");
    assert!(response.diagnostics[0].detail.contains("Incorrect IMDb ID."));
    assert!(response.state.is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn lookup_surfaces_http_failure() {
    let mut api = Server::new_async().await;
    let _mock = api
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"Response":"False","Error":"Invalid API key!"}"#)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server(&api.url(), dir.path()).await;

    let response = server
        .read_data_source(FILM_BY_ID, lookup_config("tt0111161"))
        .await;

    assert_eq!(response.diagnostics[0].summary, "error making http request");
    assert!(response.diagnostics[0].detail.contains("Invalid API key!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn lookup_requires_imdb_id() {
    let api = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server(&api.url(), dir.path()).await;

    let response = server
        .read_data_source(FILM_BY_ID, DynamicValue::object())
        .await;

    assert!(response.diagnostics.has_errors());
    assert_eq!(
        response.diagnostics[0].attribute,
        Some(AttributePath::new("imdb_id"))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn create_writes_exactly_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;

    let state = create_film(&server, film_config("X", "1999", None)).await;
    let id = id_of(&state);

    assert_eq!(id.len(), 16);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(film_files(dir.path()), vec![id.clone()]);

    let raw = std::fs::read_to_string(dir.path().join(&id)).unwrap();
    let file: FilmFile = serde_json::from_str(&raw).unwrap();
    assert_eq!(file.title, "X");
    assert_eq!(file.year, "1999");
    assert!(file.ratings.is_empty());
    assert!(!raw.contains("Ratings"));

    let read = server.read_resource(FILM, state.clone()).await;
    assert!(read.diagnostics.is_empty());
    assert_eq!(read.new_state, Some(state));
}

#[tokio::test(flavor = "multi_thread")]
async fn create_with_ratings_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;

    let state = create_film(
        &server,
        film_config("X", "1999", Some(vec![("Rotten Tomatoes", "87%")])),
    )
    .await;

    let raw = std::fs::read_to_string(dir.path().join(id_of(&state))).unwrap();
    let file: FilmFile = serde_json::from_str(&raw).unwrap();
    assert_eq!(file.ratings, vec![Rating::new("Rotten Tomatoes", "87%")]);
    assert!(raw.contains("\n  \"Ratings\": ["));

    let read = server.read_resource(FILM, state.clone()).await;
    assert_eq!(read.new_state, Some(state));
}

#[tokio::test(flavor = "multi_thread")]
async fn create_with_empty_ratings_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;

    let state = create_film(&server, film_config("X", "1999", Some(vec![]))).await;
    assert_eq!(
        state.get_list(&AttributePath::new("ratings")).unwrap(),
        Vec::<Dynamic>::new()
    );

    let raw = std::fs::read_to_string(dir.path().join(id_of(&state))).unwrap();
    assert!(!raw.contains("Ratings"));

    let read = server.read_resource(FILM, state.clone()).await;
    assert!(!read.diagnostics.has_errors(), "{:?}", read.diagnostics);
    assert_eq!(read.new_state, Some(state));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_file_and_read_reports_absence() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;
    let state = create_film(&server, film_config("X", "1999", None)).await;

    let plan = server
        .plan_resource_change(FILM, state.clone(), DynamicValue::null())
        .await;
    assert!(plan.planned_state.is_null());
    let applied = server
        .apply_resource_change(FILM, state.clone(), plan.planned_state, DynamicValue::null())
        .await;

    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    assert!(applied.new_state.is_null());
    assert!(film_files(dir.path()).is_empty());

    let read = server.read_resource(FILM, state).await;
    assert!(read.diagnostics.is_empty());
    assert!(read.new_state.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn externally_removed_file_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;
    let state = create_film(&server, film_config("X", "1999", None)).await;

    std::fs::remove_file(dir.path().join(id_of(&state))).unwrap();

    let read = server.read_resource(FILM, state).await;
    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    assert!(read.new_state.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_preserves_id_when_plan_omits_it() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;
    let prior = create_film(&server, film_config("X", "1999", None)).await;
    let id = id_of(&prior);

    let config = film_config("Y", "2000", Some(vec![("Metacritic", "70/100")]));
    let plan = server
        .plan_resource_change(FILM, prior.clone(), config.clone())
        .await;
    assert!(plan.requires_replace.is_empty());
    assert_eq!(id_of(&plan.planned_state), id);

    // Strip the id from the plan; apply must still keep it
    let mut planned = plan.planned_state;
    planned.set_null(&AttributePath::new("id")).unwrap();
    let applied = server
        .apply_resource_change(FILM, prior, planned, config)
        .await;

    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    assert_eq!(id_of(&applied.new_state), id);
    assert_eq!(film_files(dir.path()), vec![id.clone()]);
    let file: FilmFile =
        serde_json::from_slice(&std::fs::read(dir.path().join(&id)).unwrap()).unwrap();
    assert_eq!(file.title, "Y");
    assert_eq!(file.year, "2000");
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_with_empty_id_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;

    let mut prior = film_config("X", "1999", None);
    prior
        .set_string(&AttributePath::new("id"), String::new())
        .unwrap();
    let applied = server
        .apply_resource_change(FILM, prior.clone(), DynamicValue::null(), DynamicValue::null())
        .await;

    assert!(applied.diagnostics.has_errors());
    assert_eq!(applied.diagnostics[0].summary, "delete error");
    assert_eq!(applied.new_state, prior);
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupt_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;
    std::fs::write(dir.path().join("0123456789abcdef"), "not json").unwrap();

    let mut state = film_config("X", "1999", None);
    state
        .set_string(&AttributePath::new("id"), "0123456789abcdef".to_string())
        .unwrap();
    let read = server.read_resource(FILM, state.clone()).await;

    assert!(read.diagnostics.has_errors());
    assert_eq!(read.new_state, Some(state));
}

#[tokio::test(flavor = "multi_thread")]
async fn handlers_report_unconfigured_provider() {
    let server = ProviderServer::new(OmdbProvider::default());

    let lookup = server
        .read_data_source(FILM_BY_ID, lookup_config("tt0111161"))
        .await;
    assert_eq!(lookup.diagnostics[0].summary, "Provider not configured");

    let config = film_config("X", "1999", None);
    let plan = server
        .plan_resource_change(FILM, DynamicValue::null(), config.clone())
        .await;
    let applied = server
        .apply_resource_change(FILM, DynamicValue::null(), plan.planned_state, config)
        .await;
    assert_eq!(applied.diagnostics[0].summary, "Provider not configured");
    assert!(applied.new_state.is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn validation_rejects_missing_title_and_empty_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;

    let mut config = DynamicValue::object();
    config
        .set_string(&AttributePath::new("year"), "1999".to_string())
        .unwrap();
    let diagnostics = server.validate_resource_config(FILM, config).await;
    assert!(diagnostics.has_errors());
    assert_eq!(
        diagnostics[0].attribute,
        Some(AttributePath::new("title"))
    );

    let mut provider_config = DynamicValue::object();
    provider_config
        .set_string(&AttributePath::new("api_key"), String::new())
        .unwrap();
    let diagnostics = ProviderServer::new(OmdbProvider::default())
        .configure_provider(provider_config)
        .await;
    assert!(diagnostics.has_errors());
}

#[tokio::test(flavor = "multi_thread")]
async fn setting_computed_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = configured_server("http://127.0.0.1:9", dir.path()).await;

    let mut config = film_config("X", "1999", None);
    config
        .set_value(
            &AttributePath::new("id"),
            Dynamic::String("chosen".to_string()),
        )
        .unwrap();

    let diagnostics = server.validate_resource_config(FILM, config).await;
    assert!(diagnostics.has_errors());
}
