//! Binary snapshot encoding.
//!
//! Layout: the magic bytes `GCHT`, one format-version byte, then the history
//! encoded with bincode's standard configuration.

use super::store::ChatHistory;

pub const MAGIC: &[u8; 4] = b"GCHT";
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1;
const MAX_PAYLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Why a snapshot could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// Not a snapshot, or written by an unknown format version
    Mismatch(String),
    /// Right header, unreadable payload
    Corrupt(String),
}

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_PAYLOAD_BYTES>()
}

/// Encode a history into snapshot bytes
pub fn encode(history: &ChatHistory) -> Result<Vec<u8>, bincode::error::EncodeError> {
    let payload = bincode::serde::encode_to_vec(history, bincode_config())?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode snapshot bytes back into a history
pub fn decode(bytes: &[u8]) -> Result<ChatHistory, DecodeFailure> {
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(DecodeFailure::Mismatch("missing snapshot header".to_string()));
    }
    let version = bytes[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(DecodeFailure::Mismatch(format!(
            "unsupported format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let payload = &bytes[HEADER_LEN..];
    let (history, consumed): (ChatHistory, usize) =
        bincode::serde::decode_from_slice(payload, bincode_config())
            .map_err(|e| DecodeFailure::Corrupt(e.to_string()))?;
    if consumed != payload.len() {
        return Err(DecodeFailure::Corrupt(format!(
            "{} trailing bytes after history",
            payload.len() - consumed
        )));
    }
    Ok(history)
}
