//! Recipe Lookup
//!
//! One GET against the recipe search endpoint, returning the
//! ingredient lines of the first result.

use crate::config::RecipeApiConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Something that can list the ingredients of a recipe.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Ingredient lines of the best match for `query`. An empty list
    /// means the search found nothing.
    async fn ingredients(&self, query: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RecipeResult>,
}

#[derive(Debug, Deserialize)]
struct RecipeResult {
    #[serde(rename = "extendedIngredients", default)]
    extended_ingredients: Vec<Ingredient>,
}

#[derive(Debug, Deserialize)]
struct Ingredient {
    original: String,
}

/// HTTP-backed [`RecipeSource`] for the complexSearch endpoint.
pub struct RecipeClient {
    http: Client,
    config: RecipeApiConfig,
}

impl RecipeClient {
    const SEARCH_PATH: &'static str = "/recipes/complexSearch";

    pub fn new(config: RecipeApiConfig, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn search_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            Self::SEARCH_PATH
        )
    }
}

#[async_trait]
impl RecipeSource for RecipeClient {
    async fn ingredients(&self, query: &str) -> Result<Vec<String>> {
        let url = self.search_url();
        debug!("Searching recipes for '{}'", query);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("query", query),
                ("apiKey", self.config.api_key.as_str()),
                ("number", "1"),
                ("addRecipeInformation", "true"),
                ("fillIngredients", "true"),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let text = res.text().await.map_err(|e| Error::Http(e.to_string()))?;
        let parsed: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Api(format!("Malformed response: {e}")))?;

        let ingredients: Vec<String> = parsed
            .results
            .into_iter()
            .next()
            .map(|recipe| {
                recipe
                    .extended_ingredients
                    .into_iter()
                    .map(|i| i.original)
                    .collect()
            })
            .unwrap_or_default();

        info!("Found {} ingredients for '{}'", ingredients.len(), query);
        Ok(ingredients)
    }
}
