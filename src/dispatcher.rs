//! Request Dispatcher
//!
//! Routes one decoded [`Request`] to the recipe or inbox operation and
//! builds the [`Response`]. Upstream failures are logged and folded
//! into the reply shapes clients already expect: a failed recipe
//! lookup reads as "No ingredients found" and a failed fetch as an
//! empty list. The underlying [`Result`]s stay available to library
//! callers through the [`RecipeSource`] and [`MailFetch`] traits.

use crate::config::{Config, ServerConfig};
use crate::error::{Error, Result};
use crate::fetcher::{ImapFetcher, MailFetch};
use crate::mailer::{MailSend, SendOutcome, SmtpMailer};
use crate::protocol::{Request, Response};
use crate::recipe::{RecipeClient, RecipeSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Dispatcher {
    recipes: Arc<dyn RecipeSource>,
    mailer: Arc<dyn MailSend>,
    fetcher: Arc<dyn MailFetch>,
    upstream_timeout: Duration,
    max_fetch_limit: usize,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        recipes: Arc<dyn RecipeSource>,
        mailer: Arc<dyn MailSend>,
        fetcher: Arc<dyn MailFetch>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            recipes,
            mailer,
            fetcher,
            upstream_timeout,
            max_fetch_limit: ServerConfig::DEFAULT_MAX_FETCH_LIMIT,
        }
    }

    /// Cap the number of messages a single fetch request can return.
    #[must_use]
    pub fn with_fetch_limit(mut self, max: usize) -> Self {
        self.max_fetch_limit = max;
        self
    }

    /// Wire the network-backed components from a [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.server.upstream_timeout;
        let recipes = RecipeClient::new(config.recipe_api.clone(), timeout)?;
        let mailer = SmtpMailer::new(config.smtp.clone(), config.credentials.clone())
            .with_timeout(timeout);
        let fetcher = ImapFetcher::new(config.imap.clone(), config.credentials.clone());

        Ok(Self::new(
            Arc::new(recipes),
            Arc::new(mailer),
            Arc::new(fetcher),
            timeout,
        )
        .with_fetch_limit(config.server.max_fetch_limit))
    }

    /// Handle a request that may have failed to decode.
    ///
    /// Never fails: every error becomes a `Failure` response.
    pub async fn handle(&self, request: Result<Request>) -> Response {
        match request {
            Ok(request) => self.dispatch(request).await.unwrap_or_else(|e| {
                warn!("Request failed: {}", e);
                Response::failure(e.to_string())
            }),
            Err(e) => {
                warn!("Rejected request: {}", e);
                Response::failure(e.to_string())
            }
        }
    }

    /// Route a decoded request.
    pub async fn dispatch(&self, request: Request) -> Result<Response> {
        info!("Dispatching {} request", request.kind());
        match request {
            Request::Recipe {
                food_type,
                recipient_email,
            } => {
                self.recipe(food_type.as_deref(), recipient_email.as_deref())
                    .await
            }
            Request::FetchEmails { criterion, limit } => {
                Ok(self.fetch_emails(&criterion, limit).await)
            }
            Request::Unknown(kind) => {
                warn!("Unknown request type: {:?}", kind);
                Ok(Response::invalid_type())
            }
        }
    }

    async fn recipe(
        &self,
        food_type: Option<&str>,
        recipient_email: Option<&str>,
    ) -> Result<Response> {
        let food_type =
            food_type.ok_or_else(|| Error::Validation("missing field 'food_type'".to_string()))?;

        let ingredients = match self
            .bounded("recipe lookup", self.recipes.ingredients(food_type))
            .await
        {
            Ok(ingredients) => ingredients,
            Err(e) => {
                warn!("Recipe lookup for '{}' failed: {}", food_type, e);
                Vec::new()
            }
        };

        if ingredients.is_empty() {
            return Ok(Response::no_ingredients());
        }

        let (subject, body) = compose_email(food_type, &ingredients);
        let recipient = recipient_email.unwrap_or_default();
        let outcome = SendOutcome::from(
            self.bounded("mail send", self.mailer.send(recipient, &subject, &body))
                .await,
        );
        if !outcome.success {
            warn!("Sending ingredients to '{}' failed: {}", recipient, outcome.message);
        }

        Ok(Response::Recipe {
            success: outcome.success,
            message: outcome.message,
            ingredients,
        })
    }

    async fn fetch_emails(&self, criterion: &str, limit: usize) -> Response {
        if limit > self.max_fetch_limit {
            debug!("Clamping fetch limit {} to {}", limit, self.max_fetch_limit);
        }
        let limit = limit.min(self.max_fetch_limit);
        let emails = match self
            .bounded("mail fetch", self.fetcher.fetch(criterion, limit))
            .await
        {
            Ok(emails) => emails,
            Err(e) => {
                warn!("Fetching emails failed: {}", e);
                Vec::new()
            }
        };
        Response::Emails { emails }
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.upstream_timeout, fut)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "{what} exceeded {}s",
                    self.upstream_timeout.as_secs_f64()
                ))
            })?
    }
}

/// Subject and body of the ingredients email.
#[must_use]
pub fn compose_email(food_type: &str, ingredients: &[String]) -> (String, String) {
    let subject = format!("Ingredients for {food_type} Recipe");
    let body = format!(
        "Here are the ingredients for your {food_type} recipe:\n\n{}",
        ingredients.join("\n")
    );
    (subject, body)
}
