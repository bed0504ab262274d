//! HTTP client used by the hosting services.

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use reqwest::header::LOCATION;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::status::check_status;

/// Thin wrapper over a reqwest [`Client`] that classifies failed statuses.
///
/// Every request is sent exactly once.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request and returns the body as text.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        debug!("GET text from {} with query {:?}...", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;

        response.text().await.context("Failed to read response body")
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET JSON from {} with query {:?}...", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;

        response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")
    }

    /// Performs a POST request with a JSON body and deserializes the JSON response.
    #[tracing::instrument(skip(self, body))]
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("POST JSON to {}...", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;

        response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")
    }

    /// Performs a form-encoded POST request.
    ///
    /// Returns the `Location` header of the response, if any.
    #[tracing::instrument(skip(self, fields))]
    pub async fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<Option<String>> {
        debug!("POST form with {} fields to {}...", fields.len(), url);

        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;

        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }
}
