//! Recipe and inbox relay
//!
//! A small TCP service that accepts one JSON request per connection
//! and either mails the ingredients of a recipe (looked up from a
//! recipe search API) to a recipient, or returns the most recent
//! matching messages from an IMAP inbox.
//!
//! The pieces are usable on their own: [`RecipeClient`],
//! [`SmtpMailer`] and [`ImapFetcher`] return plain [`Result`]s, while
//! [`Dispatcher`] and [`Server`] turn them into wire replies.

mod client;
mod codec;
mod config;
mod connection;
mod dispatcher;
mod error;
mod fetcher;
mod mailer;
mod protocol;
mod recipe;
mod server;

pub use client::send_request;
pub use codec::read_request;
pub use config::{Config, Credentials, ImapConfig, RecipeApiConfig, ServerConfig, SmtpConfig};
pub use dispatcher::{Dispatcher, compose_email};
pub use error::{Error, Result};
pub use fetcher::{ImapFetcher, MailFetch, summarize};
pub use mailer::{MailSend, SendOutcome, SmtpMailer};
pub use protocol::{EmailSummary, Request, Response};
pub use recipe::{RecipeClient, RecipeSource};
pub use server::Server;
