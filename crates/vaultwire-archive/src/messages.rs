//! Message-archive boundary.
//!
//! The recovery service reads persisted ciphertext through this trait;
//! it never assumes where the messages live. The platform's document
//! store implements it server-side; [`MemoryMessageArchive`] serves
//! tests and the CLI's file-loading path.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vaultwire_core::StoreError;
use vaultwire_crypto::EncryptedPayload;

/// A persisted message as the archive sees it: opaque ciphertext plus
/// the metadata needed to select and order it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Platform message id
    pub message_id: String,
    /// Unix timestamp (seconds) the message was sent
    pub sent_at_secs: u64,
    /// The encrypted message content
    pub payload: EncryptedPayload,
}

/// Inclusive unix-seconds range selecting messages for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest `sent_at_secs` included
    pub from_secs: u64,
    /// Latest `sent_at_secs` included
    pub to_secs: u64,
}

impl DateRange {
    /// Whether a timestamp falls inside the range.
    pub fn contains(&self, sent_at_secs: u64) -> bool {
        self.from_secs <= sent_at_secs && sent_at_secs <= self.to_secs
    }
}

/// Read-only view over persisted ciphertext.
#[async_trait]
pub trait MessageArchive: Send + Sync {
    /// Messages for one conversation within a date range, ordered by
    /// `sent_at_secs` ascending.
    ///
    /// Returns an empty list when nothing falls in range.
    async fn load_range(
        &self,
        conversation_id: &str,
        range: DateRange,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}

/// In-memory message archive for tests and CLI file loading.
///
/// Thread-safe through Mutex, but uses `lock().expect()` which will
/// panic if the mutex is poisoned - acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryMessageArchive {
    inner: Arc<Mutex<HashMap<String, Vec<StoredMessage>>>>,
}

impl MemoryMessageArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an archive from a conversation → messages map (the CLI's
    /// JSON file shape).
    pub fn from_map(map: HashMap<String, Vec<StoredMessage>>) -> Self {
        Self { inner: Arc::new(Mutex::new(map)) }
    }

    /// Append a message to a conversation.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    pub fn push_message(&self, conversation_id: &str, message: StoredMessage) {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
    }
}

#[async_trait]
impl MessageArchive for MemoryMessageArchive {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    async fn load_range(
        &self,
        conversation_id: &str,
        range: DateRange,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let mut messages: Vec<StoredMessage> = inner
            .get(conversation_id)
            .map(|messages| {
                messages.iter().filter(|m| range.contains(m.sent_at_secs)).cloned().collect()
            })
            .unwrap_or_default();

        messages.sort_by(|a, b| a.sent_at_secs.cmp(&b.sent_at_secs));

        Ok(messages)
    }
}
