use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Position of a record in the `(created_at, id)` ordering.
///
/// `id` breaks ties between records created at the same instant, so two
/// cursors from the same collection are never equal unless they name the
/// same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub created_at: OffsetDateTime,
    pub id: i64,
}

/// Token payload. The instant is stored as whole Unix seconds plus the
/// nanosecond within that second, which covers every `OffsetDateTime`.
#[derive(Debug, Serialize, Deserialize)]
struct Token {
    #[serde(rename = "s")]
    seconds: i64,
    #[serde(rename = "n")]
    nanoseconds: u32,
    id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("cursor is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("cursor payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("cursor timestamp is out of range: {0}")]
    Timestamp(#[from] time::error::ComponentRange),
}

impl Cursor {
    #[must_use]
    pub fn new(created_at: OffsetDateTime, id: i64) -> Self {
        Self { created_at, id }
    }

    /// Encodes the cursor as an opaque, URL-safe token.
    #[must_use]
    pub fn encode(&self) -> String {
        let payload = serde_json::json!({
            "s": self.created_at.unix_timestamp(),
            "n": self.created_at.nanosecond(),
            "id": self.id,
        });
        URL_SAFE_NO_PAD.encode(payload.to_string())
    }

    /// Decodes a token produced by [`Cursor::encode`].
    ///
    /// A missing or empty token is not an error: it means the caller did not
    /// supply a position.
    pub fn decode(token: Option<&str>) -> Result<Option<Self>, CursorError> {
        let Some(token) = token.filter(|value| !value.is_empty()) else {
            return Ok(None);
        };
        let payload = URL_SAFE_NO_PAD.decode(token)?;
        let token: Token = serde_json::from_slice(&payload)?;
        let created_at = OffsetDateTime::from_unix_timestamp(token.seconds)?
            .replace_nanosecond(token.nanoseconds)?;
        Ok(Some(Self::new(created_at, token.id)))
    }
}
