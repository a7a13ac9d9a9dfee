//! External image-search collaborator, queried only on dictionary misses.
//!
//! The API key is read from an environment variable named in config and is
//! never written down anywhere. Without a key the provider degrades to a
//! permanent miss rather than an error, so playback carries on without
//! visuals.

use crate::config::AppConfig;
use crate::error::{Result, WordbeamError};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub trait ImageProvider: Send + Sync {
    /// Look up one representative image URL for a word. `Ok(None)` is a
    /// miss; transport problems are `Fetch` errors the caller treats as a
    /// miss too.
    fn search(&self, word: &str) -> Result<Option<String>>;
}

/// Provider used when search is disabled or unconfigured.
pub struct DisabledProvider;

impl ImageProvider for DisabledProvider {
    fn search(&self, _word: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: ResultUrls,
}

#[derive(Debug, Deserialize)]
struct ResultUrls {
    small: String,
}

pub struct HttpImageSearch {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl HttpImageSearch {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if !config.images_enabled {
            info!("Image search disabled in config");
            return None;
        }
        let api_key = match env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                warn!(
                    var = %config.api_key_env,
                    "No image search key in environment; visuals come from the dictionary only"
                );
                return None;
            }
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs.max(1)))
            .build()
            .map_err(|err| warn!("Could not build HTTP client: {err}"))
            .ok()?;
        info!(endpoint = %config.search_endpoint, "Image search ready");
        Some(HttpImageSearch {
            client,
            endpoint: config.search_endpoint.clone(),
            api_key,
        })
    }
}

impl ImageProvider for HttpImageSearch {
    fn search(&self, word: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("query", word),
                ("per_page", "1"),
                ("client_id", self.api_key.as_str()),
            ])
            .send()
            .map_err(|err| WordbeamError::Fetch(err.to_string()))?;
        if !response.status().is_success() {
            return Err(WordbeamError::Fetch(format!(
                "image search returned {}",
                response.status()
            )));
        }
        let parsed: SearchResponse = response
            .json()
            .map_err(|err| WordbeamError::Fetch(err.to_string()))?;
        let hit = parsed.results.into_iter().next().map(|result| result.urls.small);
        debug!(word, hit = hit.is_some(), "Image search completed");
        Ok(hit)
    }
}

/// Provider selection for the current config and environment.
pub fn provider_from_config(config: &AppConfig) -> Arc<dyn ImageProvider> {
    match HttpImageSearch::from_config(config) {
        Some(provider) => Arc::new(provider),
        None => Arc::new(DisabledProvider),
    }
}
