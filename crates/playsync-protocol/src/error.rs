//! Error types for the payload layer.

/// Errors that can occur turning payloads into JSON and back.
///
/// A decode failure here usually means the host environment's glue code
/// and this crate disagree about a payload shape — the message carries the
/// serde detail needed to spot which field.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a payload into JSON).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning JSON into a payload).
    ///
    /// Common causes: malformed JSON from host glue, missing required
    /// fields, or an unknown `op`/`status` tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
