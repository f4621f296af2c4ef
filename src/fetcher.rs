//! Mail Fetcher
//!
//! Opens an IMAP session, searches the configured mailbox and turns
//! the most recent matches into [`EmailSummary`] values.

use crate::config::{Credentials, ImapConfig};
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::protocol::{EmailSummary, validate_criterion};
use async_trait::async_trait;
use futures::StreamExt;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::info;

/// Something that can return recent mailbox messages.
#[async_trait]
pub trait MailFetch: Send + Sync {
    /// Return up to `limit` of the most recent messages matching the
    /// IMAP search `criterion`.
    async fn fetch(&self, criterion: &str, limit: usize) -> Result<Vec<EmailSummary>>;
}

/// IMAP-backed [`MailFetch`].
pub struct ImapFetcher {
    config: ImapConfig,
    credentials: Credentials,
}

impl ImapFetcher {
    #[must_use]
    pub const fn new(config: ImapConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    async fn fetch_in_session(
        &self,
        session: &mut ImapSession,
        criterion: &str,
        limit: usize,
    ) -> Result<Vec<EmailSummary>> {
        connection::select(session, &self.config.mailbox).await?;

        let ids = session
            .search(criterion)
            .await
            .map_err(|e| Error::MailProtocol(format!("Search failed: {e}")))?;

        let recent = most_recent(ids, limit);
        if recent.is_empty() {
            return Ok(vec![]);
        }

        info!(
            "Fetching {} of the messages matching '{}'",
            recent.len(),
            criterion
        );

        let mut emails = Vec::with_capacity(recent.len());
        for id in recent {
            emails.push(fetch_single(session, id).await?);
        }
        Ok(emails)
    }
}

#[async_trait]
impl MailFetch for ImapFetcher {
    async fn fetch(&self, criterion: &str, limit: usize) -> Result<Vec<EmailSummary>> {
        validate_criterion(criterion)?;
        let mut session = connection::connect(&self.config, &self.credentials).await?;
        let result = self.fetch_in_session(&mut session, criterion, limit).await;
        connection::close(session).await;
        result
    }
}

/// Sort search hits ascending and keep the last `limit`.
fn most_recent(ids: impl IntoIterator<Item = u32>, limit: usize) -> Vec<u32> {
    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.sort_unstable();
    let start = ids.len().saturating_sub(limit);
    ids.split_off(start)
}

async fn fetch_single(session: &mut ImapSession, id: u32) -> Result<EmailSummary> {
    let mut messages = session
        .fetch(id.to_string(), "(BODY[])")
        .await
        .map_err(|e| Error::MailProtocol(format!("Fetch failed: {e}")))?;

    let mut raw = None;
    while let Some(item) = messages.next().await {
        let fetch = item.map_err(|e| Error::MailProtocol(format!("Fetch error: {e}")))?;
        if raw.is_none() {
            raw = fetch.body().map(<[u8]>::to_vec);
        }
    }
    drop(messages);

    let raw = raw.ok_or_else(|| Error::MailProtocol(format!("No body found for message {id}")))?;
    summarize(&id.to_string(), &raw)
}

/// Parse a raw RFC 5322 message into an [`EmailSummary`].
pub fn summarize(id: &str, raw: &[u8]) -> Result<EmailSummary> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| Error::MailProtocol(format!("Unparseable message {id}")))?;

    Ok(EmailSummary {
        id: id.to_string(),
        subject: message.subject().unwrap_or_default().to_string(),
        sender: sender(&message),
        body: body_text(&message),
    })
}

fn sender(message: &Message<'_>) -> String {
    let Some(addr) = message.from().and_then(|from| from.first()) else {
        return String::new();
    };
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (None, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => String::new(),
    }
}

/// First `text/plain` part of a multipart message, or the whole body
/// of a single-part one.
fn body_text(message: &Message<'_>) -> String {
    let root = message.root_part();
    if matches!(root.body, PartType::Multipart(_)) {
        message
            .parts
            .iter()
            .find(|part| is_text_plain(part))
            .map(part_text)
            .unwrap_or_default()
    } else {
        part_text(root)
    }
}

fn is_text_plain(part: &MessagePart<'_>) -> bool {
    if !matches!(part.body, PartType::Text(_)) {
        return false;
    }
    // Parts without a Content-Type default to text/plain.
    part.content_type().is_none_or(|ct| {
        ct.ctype().eq_ignore_ascii_case("text")
            && ct.subtype().is_some_and(|s| s.eq_ignore_ascii_case("plain"))
    })
}

fn part_text(part: &MessagePart<'_>) -> String {
    part.text_contents().map_or_else(
        || String::from_utf8_lossy(part.contents()).into_owned(),
        str::to_string,
    )
}
