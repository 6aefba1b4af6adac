//! store::id
//!
//! Record ID validation and storage-name encoding.

use super::error::StoreError;

/// Check a record ID before it is turned into a path.
///
/// Rejects empty IDs and anything that could escape the store directory:
/// `..`, `/` and `\`. A lone `.` inside an ID is fine (`human.camilo`).
///
/// # Example
///
/// ```
/// use gitrecords::store::validate_id;
///
/// assert!(validate_id("human.camilo").is_ok());
/// assert!(validate_id("../etc/passwd").is_err());
/// ```
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let reason = if id.is_empty() {
        "must not be empty"
    } else if id.contains("..") {
        "contains '..'"
    } else if id.contains('/') {
        "contains '/'"
    } else if id.contains('\\') {
        "contains '\\'"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidId {
        id: id.to_string(),
        reason,
    })
}

/// Maps record IDs to storage-safe names and back.
///
/// `list` reports decoded IDs, so a store only accepts IDs for which
/// [`IdEncoder::reject`] returns `None`.
pub trait IdEncoder: Send + Sync + std::fmt::Debug {
    /// ID to storage name.
    fn encode(&self, id: &str) -> String;

    /// Storage name to ID.
    fn decode(&self, name: &str) -> String;

    /// Why `id` cannot be stored under this encoding, if it cannot.
    ///
    /// The default rejects any ID that does not survive `encode` then
    /// `decode` unchanged.
    fn reject(&self, id: &str) -> Option<&'static str> {
        (self.decode(&self.encode(id)) != id).then_some("does not survive id encoding")
    }
}

/// Encodes `:` as `_`.
///
/// IDs containing `_` are rejected, since the encoded name would decode
/// to a different ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColonEncoder;

impl IdEncoder for ColonEncoder {
    fn encode(&self, id: &str) -> String {
        id.replace(':', "_")
    }

    fn decode(&self, name: &str) -> String {
        name.replace('_', ":")
    }

    fn reject(&self, id: &str) -> Option<&'static str> {
        id.contains('_')
            .then_some("contains '_', which is reserved by the colon encoding")
    }
}

/// Validate `id` and map it to its storage name.
///
/// Checks [`validate_id`] first, then the encoder's own restrictions.
pub fn storage_name(id: &str, encoder: Option<&dyn IdEncoder>) -> Result<String, StoreError> {
    validate_id(id)?;
    let Some(encoder) = encoder else {
        return Ok(id.to_string());
    };
    if let Some(reason) = encoder.reject(id) {
        return Err(StoreError::InvalidId {
            id: id.to_string(),
            reason,
        });
    }
    Ok(encoder.encode(id))
}
