//! Client factory for the hosting service.

use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use crate::config::Config;
use crate::http::HttpClient;

use super::BitbucketClient;

/// Build an HTTP client that authenticates every request with `token`.
pub fn build_http_client(token: &str) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();

    let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    auth_value.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_value);
    debug!("HTTP client configured with authentication");

    let client = Client::builder()
        .user_agent(concat!("depbump/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()?;

    Ok(HttpClient::new(client))
}

/// Build the Bitbucket client from configuration.
pub fn build_hosting_service(config: &Config) -> Result<BitbucketClient> {
    let http_client = build_http_client(&config.token)?;
    Ok(BitbucketClient::from_http_client(
        http_client,
        &config.api_url,
    ))
}
