//! HTTP client for the Figma REST API.
//!
//! A thin fetch wrapper: one GET per call, non-2xx responses mapped to
//! [`Error::Api`], no retries.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, Request, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, Credential};
use crate::error::{Error, Result};
use crate::figma::types::*;
use crate::figma::DesignSource;
use crate::VERSION;

/// Bytes escaped when a caller value becomes one REST path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Encode `raw` so it stays a single path segment.
///
/// Dot segments are refused outright: URL parsing collapses them even when
/// percent-encoded.
fn segment(raw: &str) -> Result<String> {
    if raw.is_empty() || raw == "." || raw == ".." {
        return Err(Error::InvalidParams(format!(
            "Invalid path segment: {:?}",
            raw
        )));
    }
    Ok(utf8_percent_encode(raw, PATH_SEGMENT).to_string())
}

/// User agent string for API requests.
fn user_agent() -> String {
    format!("figma-context-mcp/{} (rust)", VERSION)
}

/// Figma REST client.
#[derive(Debug, Clone)]
pub struct FigmaClient {
    client: Client,
    api_url: String,
    credential: Option<Credential>,
}

impl FigmaClient {
    /// Create a client from server configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_credential(
            config.api_url.clone(),
            config.credential.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_credential(
        api_url: impl Into<String>,
        credential: Option<Credential>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            credential,
        })
    }

    /// Get the API URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    fn build_request(&self, path: &str, query: &[(&str, String)]) -> Result<Request> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| Error::Auth("No Figma access token configured".to_string()))?;

        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), path);
        let builder = self.client.get(&url).query(query);
        let builder = match credential {
            Credential::Personal(token) => builder.header("X-Figma-Token", token),
            Credential::OAuth(token) => builder.bearer_auth(token),
        };

        Ok(builder.build()?)
    }

    /// Make an authenticated GET request.
    async fn get<R: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<R> {
        let request = self.build_request(path, query)?;
        debug!("GET {}", request.url());
        let response = self.client.execute(request).await?;
        self.handle_response(response).await
    }

    /// Handle API response, extracting errors.
    async fn handle_response<R: DeserializeOwned>(&self, response: Response) -> Result<R> {
        let status = response.status();

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), status_text, body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Failed to parse response: {}", e)))
    }

    // ===== API Endpoints =====

    /// Fetch a whole file.
    pub async fn get_file(&self, file_key: &str) -> Result<FigmaFile> {
        self.get(&format!("files/{}", segment(file_key)?), &[])
            .await
    }

    /// Fetch specific subtrees of a file.
    pub async fn get_file_nodes(&self, file_key: &str, ids: &[String]) -> Result<FileNodes> {
        self.get(
            &format!("files/{}/nodes", segment(file_key)?),
            &[("ids", ids.join(","))],
        )
        .await
    }

    /// Download URLs for every image fill in a file.
    pub async fn get_image_fills(&self, file_key: &str) -> Result<ImageFills> {
        self.get(&format!("files/{}/images", segment(file_key)?), &[])
            .await
    }

    /// Render nodes to images.
    pub async fn render_images(
        &self,
        file_key: &str,
        ids: &[String],
        format: &str,
        scale: Option<f64>,
    ) -> Result<RenderedImages> {
        let mut query = vec![("ids", ids.join(",")), ("format", format.to_string())];
        if let Some(scale) = scale {
            query.push(("scale", scale.to_string()));
        }
        let path = format!("images/{}", segment(file_key)?);
        let rendered: RenderedImages = self.get(&path, &query).await?;
        if let Some(err) = &rendered.err {
            return Err(Error::api(400, "Bad Request", err.clone()));
        }
        Ok(rendered)
    }

    /// Local variables and collections of a file.
    pub async fn get_local_variables(&self, file_key: &str) -> Result<LocalVariables> {
        self.get(&format!("files/{}/variables/local", segment(file_key)?), &[])
            .await
    }

    /// Published components of a team.
    pub async fn get_team_components(&self, team_id: &str) -> Result<TeamComponents> {
        self.get(&format!("teams/{}/components", segment(team_id)?), &[])
            .await
    }
}

#[async_trait]
impl DesignSource for FigmaClient {
    async fn local_variables(&self, file_key: &str) -> Result<LocalVariablesMeta> {
        Ok(self.get_local_variables(file_key).await?.meta)
    }

    async fn team_components(&self, team_id: &str) -> Result<Vec<PublishedComponent>> {
        Ok(self.get_team_components(team_id).await?.meta.components)
    }

    async fn image_fills(&self, file_key: &str) -> Result<HashMap<String, String>> {
        Ok(self.get_image_fills(file_key).await?.meta.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(credential: Option<Credential>) -> FigmaClient {
        FigmaClient::with_credential(
            "https://api.figma.test/v1/",
            credential,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_personal_token_header() {
        let client = client(Some(Credential::Personal("pat".to_string())));
        let request = client.build_request("files/abc", &[]).unwrap();
        assert_eq!(request.url().as_str(), "https://api.figma.test/v1/files/abc");
        assert_eq!(request.headers()["X-Figma-Token"], "pat");
        assert!(request.headers().get("Authorization").is_none());
    }

    #[test]
    fn test_oauth_token_header() {
        let client = client(Some(Credential::OAuth("oauth".to_string())));
        let request = client
            .build_request("files/abc/nodes", &[("ids", "1:2,3:4".to_string())])
            .unwrap();
        assert_eq!(request.headers()["Authorization"], "Bearer oauth");
        assert_eq!(request.url().query(), Some("ids=1%3A2%2C3%3A4"));
    }

    #[test]
    fn test_missing_credential() {
        let client = client(None);
        assert!(!client.has_credential());
        let err = client.build_request("files/abc", &[]).unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_path_segments_are_escaped() {
        let client = client(Some(Credential::Personal("pat".to_string())));
        let path = format!("files/{}", segment("a/../teams/1/components").unwrap());
        let request = client.build_request(&path, &[]).unwrap();
        assert_eq!(
            request.url().path(),
            "/v1/files/a%2F..%2Fteams%2F1%2Fcomponents"
        );

        assert_eq!(segment("AbC-123_x").unwrap(), "AbC-123_x");
        assert_eq!(segment("50%?#").unwrap(), "50%25%3F%23");
        assert!(segment("..").is_err());
        assert!(segment(".").is_err());
        assert!(segment("").is_err());
    }

    #[tokio::test]
    async fn test_dot_segment_never_reaches_network() {
        let client = client(Some(Credential::Personal("pat".to_string())));
        let err = client.get_team_components("..").await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            credential: Some(Credential::Personal("t".to_string())),
            ..Config::default()
        };
        let client = FigmaClient::new(&config).unwrap();
        assert_eq!(client.api_url(), crate::config::DEFAULT_API_URL);
    }
}
