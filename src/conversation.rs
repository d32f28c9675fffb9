//! Conversation identifier.

use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Opaque client-generated token correlating every message of one browser
/// session with the backend.
///
/// Format: `cid-<unix millis>-<0..1000>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let salt: u16 = rand::thread_rng().gen_range(0..1000);
        Self(format!("cid-{millis}-{salt}"))
    }

    /// Return the stored identifier under `key`, or generate and store one.
    ///
    /// A stored value is never replaced; blank values count as absent.
    pub fn load_or_create(store: &dyn KeyValueStore, key: &str) -> Result<Self, StorageError> {
        if let Some(existing) = store.get(key)? {
            if !existing.trim().is_empty() {
                return Ok(Self(existing));
            }
        }

        let id = Self::generate();
        store.set(key, id.as_str())?;
        tracing::info!(
            name: "widget.conversation.created",
            conversation_id = %id,
            "New conversation id stored"
        );
        Ok(id)
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
