//! Invocation payload validation.
//!
//! The host hands us an untyped JSON event. [`BundleRequest::from_event`] is the
//! only way to obtain a request, so everything downstream can rely on the
//! field shapes without re-checking them.

use serde_json::{Map, Value};
use thiserror::Error;

/// A validated invocation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    /// Legacy field. Required to be a string, never used.
    pub api_url: String,

    /// Destination endpoint for the multipart upload.
    pub upload_url: String,

    /// Correlation id. Prefixes the working directory and names the archive.
    pub token: String,

    /// Image URLs, fetched in order.
    pub sources: Vec<String>,
}

/// Payload shape defects. Raised before any filesystem or network access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Bad event data: event must be a JSON object")]
    NotAnObject,

    #[error("Bad event data: `{field}` is missing")]
    Missing { field: &'static str },

    #[error("Bad event data: `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Bad event data: `sources[{index}]` must be a string")]
    SourceNotString { index: usize },

    #[error("Bad event data: `token` must not contain path separators or be `.`/`..`")]
    UnsafeToken,
}

impl BundleRequest {
    pub fn from_event(event: &Value) -> Result<Self, EventError> {
        let object = event.as_object().ok_or(EventError::NotAnObject)?;

        let api_url = require_string(object, "api_url")?;
        let upload_url = require_string(object, "upload_url")?;
        let token = require_string(object, "token")?;
        if !is_safe_token(&token) {
            return Err(EventError::UnsafeToken);
        }

        let raw_sources = match object.get("sources") {
            None | Some(Value::Null) => return Err(EventError::Missing { field: "sources" }),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(EventError::WrongType {
                    field: "sources",
                    expected: "a list of strings",
                });
            }
        };

        let sources = raw_sources
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_str()
                    .map(ToString::to_string)
                    .ok_or(EventError::SourceNotString { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            api_url,
            upload_url,
            token,
            sources,
        })
    }

    /// File name the archive is stored and uploaded under.
    #[must_use]
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.token)
    }
}

fn require_string(object: &Map<String, Value>, field: &'static str) -> Result<String, EventError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(EventError::Missing { field }),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(EventError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

// The token becomes part of a directory name; it must not escape the temp root.
fn is_safe_token(token: &str) -> bool {
    !token.contains(['/', '\\', '\0']) && token != "." && token != ".."
}

#[cfg(test)]
mod tests {
    use super::{BundleRequest, EventError};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn valid_event() -> Value {
        json!({
            "api_url": "https://api.example.com",
            "upload_url": "https://bucket.example.com/upload?sig=abc",
            "token": "job-42",
            "sources": [
                "https://img.example.com/a.jpg",
                "https://img.example.com/b.png"
            ]
        })
    }

    #[test]
    fn parses_valid_event() {
        let request = BundleRequest::from_event(&valid_event()).expect("valid");
        assert_eq!(
            request,
            BundleRequest {
                api_url: "https://api.example.com".to_string(),
                upload_url: "https://bucket.example.com/upload?sig=abc".to_string(),
                token: "job-42".to_string(),
                sources: vec![
                    "https://img.example.com/a.jpg".to_string(),
                    "https://img.example.com/b.png".to_string(),
                ],
            }
        );
        assert_eq!(request.archive_name(), "job-42.zip");
    }

    #[test]
    fn empty_sources_are_accepted() {
        let mut event = valid_event();
        event["sources"] = json!([]);
        let request = BundleRequest::from_event(&event).expect("valid");
        assert!(request.sources.is_empty());
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(
            BundleRequest::from_event(&json!(["a"])),
            Err(EventError::NotAnObject)
        );
    }

    #[test]
    fn rejects_each_missing_field() {
        for field in ["api_url", "upload_url", "token", "sources"] {
            let mut event = valid_event();
            event.as_object_mut().unwrap().remove(field);
            assert_eq!(
                BundleRequest::from_event(&event),
                Err(EventError::Missing { field }),
                "field {field}"
            );
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let mut event = valid_event();
        event["token"] = Value::Null;
        assert_eq!(
            BundleRequest::from_event(&event),
            Err(EventError::Missing { field: "token" })
        );
    }

    #[test]
    fn upload_url_is_type_checked() {
        let mut event = valid_event();
        event["upload_url"] = json!(123);
        assert_eq!(
            BundleRequest::from_event(&event),
            Err(EventError::WrongType {
                field: "upload_url",
                expected: "a string",
            })
        );
    }

    #[test]
    fn sources_must_be_a_list_of_strings() {
        let mut event = valid_event();
        event["sources"] = json!("https://img.example.com/a.jpg");
        assert!(matches!(
            BundleRequest::from_event(&event),
            Err(EventError::WrongType {
                field: "sources",
                ..
            })
        ));

        event["sources"] = json!(["https://img.example.com/a.jpg", 7]);
        assert_eq!(
            BundleRequest::from_event(&event),
            Err(EventError::SourceNotString { index: 1 })
        );
    }

    #[test]
    fn rejects_tokens_that_escape_the_temp_root() {
        for token in ["../etc", "a/b", "..", ".", "a\\b"] {
            let mut event = valid_event();
            event["token"] = json!(token);
            assert_eq!(
                BundleRequest::from_event(&event),
                Err(EventError::UnsafeToken),
                "token {token}"
            );
        }
    }

    #[test]
    fn error_messages_name_the_field() {
        let err = EventError::Missing { field: "sources" };
        assert_eq!(err.to_string(), "Bad event data: `sources` is missing");
    }
}
