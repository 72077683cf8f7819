//! HTTP client for the fleetpack server

use std::collections::BTreeMap;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use fleetpack_api::{ControlInfo, DesiredState, HealthResponse, PacketListing, Spec};

use crate::error::{ClientError, Result};

const PACKET_CONTENT_TYPE: &str = "application/octet-stream";

/// HTTP client for communicating with the fleetpack server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    ///
    /// # Example
    /// ```no_run
    /// use fleetpack_client::HttpClient;
    ///
    /// let client = HttpClient::new("http://localhost:8080")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new HTTP client with custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(base_url: impl AsRef<str>, client: Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Server base URL
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL from path segments; each segment is percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "sending request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Turn a non-success status into `ClientError::Api`
    async fn check(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }
        Ok(response)
    }

    /// Perform a GET request and deserialize the response
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = self.request(Method::GET, self.url(segments)?).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Perform a POST request with JSON body
    async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &impl Serialize,
    ) -> Result<T> {
        let response = self
            .request(Method::POST, self.url(segments)?)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Perform a PUT request with JSON body
    async fn put<T: DeserializeOwned>(&self, segments: &[&str], body: &impl Serialize) -> Result<T> {
        let response = self
            .request(Method::PUT, self.url(segments)?)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Perform a DELETE request
    async fn delete(&self, segments: &[&str]) -> Result<()> {
        let response = self
            .request(Method::DELETE, self.url(segments)?)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // System endpoints

    /// Get server health status
    ///
    /// # Errors
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get(&["health"]).await
    }

    // Packet endpoints

    /// List control infos of every stored packet, grouped by name
    ///
    /// # Errors
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_packets(&self) -> Result<PacketListing> {
        self.get(&["packet", ""]).await
    }

    /// Upload an encoded packet
    ///
    /// The server stores the canonical re-encoding; the returned control info
    /// carries the hash it is stored under.
    ///
    /// # Errors
    /// Returns an error if the request fails or the server rejects the bytes.
    pub async fn upload_packet(&self, bytes: Vec<u8>) -> Result<ControlInfo> {
        let response = self
            .request(Method::POST, self.url(&["packet", ""])?)
            .header(CONTENT_TYPE, PACKET_CONTENT_TYPE)
            .body(bytes)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Resolve the desired state for a device's labels
    ///
    /// # Errors
    /// Returns an error if the request fails or the server returns an error.
    ///
    /// # Example
    /// ```no_run
    /// # use fleetpack_client::HttpClient;
    /// # use fleetpack_api::Labels;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = HttpClient::new("http://localhost:8080")?;
    /// let mut labels = Labels::new();
    /// labels.insert("arch".into(), "arm64".into());
    /// let state = client.compute_desired_state(&labels).await?;
    /// if state.is_partial() {
    ///     eprintln!("unresolved: {:?}", state.unresolved_names());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compute_desired_state(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<DesiredState> {
        self.post(&["packet", "compute"], labels).await
    }

    /// Control info for a hash
    ///
    /// # Errors
    /// Returns an error if the request fails or the hash is unknown.
    pub async fn packet_info(&self, hash: &str) -> Result<ControlInfo> {
        self.get(&["packet", hash, "info"]).await
    }

    /// Raw packet bytes for a hash
    ///
    /// The bytes are returned as served; callers that care about integrity
    /// should hash them and compare.
    ///
    /// # Errors
    /// Returns an error if the request fails or the hash is unknown.
    pub async fn packet_data(&self, hash: &str) -> Result<Vec<u8>> {
        let response = self
            .request(Method::GET, self.url(&["packet", hash, "data"])?)
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }

    /// Delete a packet by hash
    ///
    /// # Errors
    /// Returns an error if the request fails or the hash is unknown.
    pub async fn delete_packet(&self, hash: &str) -> Result<()> {
        self.delete(&["packet", hash]).await
    }

    // Spec endpoints

    /// List all specs in creation order
    ///
    /// # Errors
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_specs(&self) -> Result<Vec<Spec>> {
        self.get(&["spec", ""]).await
    }

    /// Create a spec
    ///
    /// # Errors
    /// Returns an error if the request fails or the id is empty or taken.
    pub async fn create_spec(&self, spec: &Spec) -> Result<Spec> {
        self.post(&["spec", ""], spec).await
    }

    /// Merge every spec whose target matches `labels`
    ///
    /// # Errors
    /// Returns an error if the request fails or the server returns an error.
    pub async fn compute_spec(&self, labels: &BTreeMap<String, String>) -> Result<Spec> {
        self.post(&["spec", "compute"], labels).await
    }

    /// Get a spec by id
    ///
    /// # Errors
    /// Returns an error if the request fails or the id is unknown.
    pub async fn get_spec(&self, id: &str) -> Result<Spec> {
        self.get(&["spec", id]).await
    }

    /// Replace a spec; `id` wins over `spec.id`
    ///
    /// # Errors
    /// Returns an error if the request fails or the id is unknown.
    pub async fn update_spec(&self, id: &str, spec: &Spec) -> Result<Spec> {
        self.put(&["spec", id], spec).await
    }

    /// Delete a spec by id
    ///
    /// # Errors
    /// Returns an error if the request fails or the id is unknown.
    pub async fn delete_spec(&self, id: &str) -> Result<()> {
        self.delete(&["spec", id]).await
    }
}
