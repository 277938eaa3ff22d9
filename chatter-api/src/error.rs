use anyhow::{anyhow, Context};
use serde_json::json;

use crate::CommentId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Comment not found {0}")]
    NotFound(CommentId),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Comment body is empty")]
    EmptyBody,

    #[error("Unknown sort key {0:?}")]
    UnknownSortKey(String),

    #[error("Comment store unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Whether re-triggering the same action has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Unknown(_) | Error::Unavailable(_) => true,
            Error::PermissionDenied
            | Error::NotFound(_)
            | Error::NullByteInString(_)
            | Error::EmptyBody
            | Error::UnknownSortKey(_) => false,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NotFound(id) => json!({
                "message": "comment not found",
                "type": "not-found",
                "id": id,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::EmptyBody => json!({
                "message": "comment body is empty",
                "type": "empty-body",
            }),
            Error::UnknownSortKey(k) => json!({
                "message": "unknown sort key",
                "type": "unknown-sort",
                "key": k,
            }),
            Error::Unavailable(msg) => json!({
                "message": msg,
                "type": "unavailable",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "permission-denied" => Error::PermissionDenied,
                "not-found" => Error::NotFound(CommentId(String::from(
                    data.get("id")
                        .and_then(|id| id.as_str())
                        .ok_or_else(|| anyhow!("error is a not-found without an id"))?,
                ))),
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "empty-body" => Error::EmptyBody,
                "unknown-sort" => Error::UnknownSortKey(String::from(
                    data.get("key")
                        .and_then(|k| k.as_str())
                        .ok_or_else(|| anyhow!("error is an unknown-sort without a key"))?,
                )),
                "unavailable" => Error::Unavailable(message()),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_parse_back() {
        let errors = [
            Error::Unknown(String::from("boom")),
            Error::PermissionDenied,
            Error::NotFound(CommentId::from("42")),
            Error::NullByteInString(String::from("a\0b")),
            Error::EmptyBody,
            Error::UnknownSortKey(String::from("hot")),
            Error::Unavailable(String::from("timeout")),
        ];
        for e in errors {
            assert_eq!(Error::parse(&e.contents()).unwrap(), e);
        }
    }

    #[test]
    fn unknown_types_are_refused() {
        assert!(Error::parse(br#"{"type": "teapot"}"#).is_err());
        assert!(Error::parse(br#"{"message": "no type"}"#).is_err());
        assert!(Error::parse(b"not json").is_err());
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(Error::Unavailable(String::new()).is_retryable());
        assert!(!Error::PermissionDenied.is_retryable());
        assert!(!Error::EmptyBody.is_retryable());
    }
}
