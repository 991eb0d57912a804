use std::sync::Arc;
use url::Url;

use super::error::ApiError;
use super::film::FilmResponse;
use super::response::OmdbResponseHandler;

/// OMDb API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Client {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("terraform-provider-omdb/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                api_key: api_key.into(),
            }),
        })
    }

    /// Look up one film by IMDb id
    pub async fn get_film_by_id(&self, imdb_id: &str) -> Result<FilmResponse, ApiError> {
        let url = self.film_url(imdb_id, true);
        tracing::debug!("GET request to: {}", self.film_url(imdb_id, false));

        let response = self.inner.http_client.get(url).send().await?;
        tracing::debug!("Response status: {}", response.status());

        OmdbResponseHandler::extract_response(response).await
    }

    /// `<base>?i=<id>&apikey=<key>`; the key is left out for logging
    fn film_url(&self, imdb_id: &str, with_key: bool) -> Url {
        let mut url = self.inner.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("i", imdb_id);
            if with_key {
                query.append_pair("apikey", &self.inner.api_key);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> Client {
        let base = Url::parse(&format!("{}/", server.url())).unwrap();
        Client::new(base, "secret").unwrap()
    }

    #[test]
    fn film_url_carries_id_and_key() {
        let client = Client::new(Url::parse("https://www.omdbapi.com/").unwrap(), "k3y").unwrap();
        assert_eq!(
            client.film_url("tt0111161", true).as_str(),
            "https://www.omdbapi.com/?i=tt0111161&apikey=k3y"
        );
        assert_eq!(
            client.film_url("tt0111161", false).as_str(),
            "https://www.omdbapi.com/?i=tt0111161"
        );
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = Client::new(Url::parse("https://www.omdbapi.com/").unwrap(), "k3y").unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("k3y"));
    }

    #[tokio::test]
    async fn get_film_by_id_decodes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("i".into(), "tt0111161".into()),
                Matcher::UrlEncoded("apikey".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "Title": "The Shawshank Redemption",
                    "Year": "1994",
                    "imdbID": "tt0111161",
                    "Ratings": [
                        {"Source": "Internet Movie Database", "Value": "9.3/10"},
                        {"Source": "Rotten Tomatoes", "Value": "91%"}
                    ],
                    "Response": "True"
                }"#,
            )
            .create_async()
            .await;

        let film = client_for(&server).get_film_by_id("tt0111161").await.unwrap();
        assert_eq!(film.title, "The Shawshank Redemption");
        assert_eq!(film.year, "1994");
        assert_eq!(film.imdb_id, "tt0111161");
        assert_eq!(film.ratings.len(), 2);
        assert_eq!(film.ratings[1].value, "91%");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_film_by_id_surfaces_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"Response":"False","Error":"Incorrect IMDb ID."}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_film_by_id("tt0").await.unwrap_err();
        assert!(matches!(err, ApiError::Omdb(ref m) if m == "Incorrect IMDb ID."));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn get_film_by_id_surfaces_http_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client_for(&server)
            .get_film_by_id("tt0111161")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 500, .. }));
        assert!(err.is_transport());
    }
}
