//! Wire types
//!
//! A request is a single JSON object whose `type` field picks the
//! operation. Replies differ in shape per operation, so [`Response`]
//! is an enum and serializes to the matching object layout:
//!
//! ```text
//! {"success": bool, "message": string, "ingredients": [string]}
//! {"success": true, "emails": [{"id", "subject", "sender", "body"}]}
//! {"success": false, "message": string}
//! ```

use crate::error::{Error, Result};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Metadata and plain-text body of one fetched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub body: String,
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Look up ingredients for `food_type` and mail them to
    /// `recipient_email`. Both fields are checked where they are used.
    Recipe {
        food_type: Option<String>,
        recipient_email: Option<String>,
    },
    /// Return the last `limit` messages matching `criterion`.
    FetchEmails { criterion: String, limit: usize },
    /// Missing or unrecognised `type`.
    Unknown(Option<String>),
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(rename = "type")]
    kind: Option<Value>,
    food_type: Option<String>,
    recipient_email: Option<String>,
    criterion: Option<String>,
    limit: Option<usize>,
}

impl Request {
    pub const DEFAULT_CRITERION: &'static str = "UNSEEN";
    pub const DEFAULT_LIMIT: usize = 5;

    /// Decode a request from raw UTF-8 JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode a request from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawRequest =
            serde_json::from_value(value).map_err(|e| Error::Parse(e.to_string()))?;

        let kind = match raw.kind {
            Some(Value::String(kind)) => kind,
            Some(other) => return Ok(Self::Unknown(Some(other.to_string()))),
            None => return Ok(Self::Unknown(None)),
        };

        Ok(match kind.as_str() {
            "recipe" => Self::Recipe {
                food_type: raw.food_type,
                recipient_email: raw.recipient_email,
            },
            "fetch_emails" => {
                let criterion = raw
                    .criterion
                    .unwrap_or_else(|| Self::DEFAULT_CRITERION.to_string());
                validate_criterion(&criterion)?;
                Self::FetchEmails {
                    criterion,
                    limit: raw.limit.unwrap_or(Self::DEFAULT_LIMIT),
                }
            }
            _ => Self::Unknown(Some(kind)),
        })
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Recipe { .. } => "recipe",
            Self::FetchEmails { .. } => "fetch_emails",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Check an IMAP search criterion before it reaches the server.
///
/// The criterion is sent verbatim after `SEARCH`, so a line break would
/// start a new command in the logged-in session.
///
/// # Errors
///
/// Returns `Error::Validation` if the criterion is blank or contains a
/// control character.
pub fn validate_criterion(criterion: &str) -> Result<()> {
    if criterion.trim().is_empty() {
        return Err(Error::Validation("criterion is empty".to_string()));
    }
    if let Some(c) = criterion.chars().find(|c| c.is_control()) {
        return Err(Error::Validation(format!("criterion contains control character {c:?}")));
    }
    Ok(())
}

/// A reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Outcome of a recipe request.
    Recipe {
        success: bool,
        message: String,
        ingredients: Vec<String>,
    },
    /// Messages returned for a `fetch_emails` request. Always a success.
    Emails { emails: Vec<EmailSummary> },
    /// Anything that went wrong before an operation could report.
    Failure { message: String },
}

impl Response {
    pub const INVALID_TYPE: &'static str = "Invalid request type";
    pub const NO_INGREDIENTS: &'static str = "No ingredients found";
    pub const BUSY: &'static str = "Server busy, try again later";

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_type() -> Self {
        Self::failure(Self::INVALID_TYPE)
    }

    #[must_use]
    pub fn busy() -> Self {
        Self::failure(Self::BUSY)
    }

    #[must_use]
    pub fn no_ingredients() -> Self {
        Self::Recipe {
            success: false,
            message: Self::NO_INGREDIENTS.to_string(),
            ingredients: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        match self {
            Self::Recipe { success, .. } => *success,
            Self::Emails { .. } => true,
            Self::Failure { .. } => false,
        }
    }

    /// Serialize to the JSON bytes written back to the client.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Parse(e.to_string()))
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Recipe {
                success,
                message,
                ingredients,
            } => {
                let mut s = serializer.serialize_struct("Response", 3)?;
                s.serialize_field("success", success)?;
                s.serialize_field("message", message)?;
                s.serialize_field("ingredients", ingredients)?;
                s.end()
            }
            Self::Emails { emails } => {
                let mut s = serializer.serialize_struct("Response", 2)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("emails", emails)?;
                s.end()
            }
            Self::Failure { message } => {
                let mut s = serializer.serialize_struct("Response", 2)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("message", message)?;
                s.end()
            }
        }
    }
}
