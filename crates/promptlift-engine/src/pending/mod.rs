//! Cross-page pending insertions.
//!
//! "Open this prompt in platform X" stores the text under a fixed key before
//! opening X's page. The next page session on X picks it up, writes it into
//! the input and deletes it. Entries older than the TTL are never delivered.
//!
//! Lifecycle: `None → Pending → Consumed | Expired`. Only `Pending` is ever
//! persisted; the other states are outcomes reported to the caller.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use promptlift_bridge::BridgeClient;
use promptlift_bridge::storage::PENDING_INSERTION_KEY;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInsertion {
    pub text: String,
    pub platform_id: String,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl PendingInsertion {
    pub fn new(text: impl Into<String>, platform_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            text: text.into(),
            platform_id: platform_id.into(),
            created_at: Utc::now(),
            ttl_seconds: ttl.as_secs(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        self.created_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Expired strictly after `created_at + ttl`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds()
    }
}

/// Persisted record, tagged by lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum InsertionState {
    None,
    Pending(PendingInsertion),
    Consumed(PendingInsertion),
    Expired(PendingInsertion),
}

/// Result of checking for an insertion on page load.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Nothing,
    /// Found but stale; it has been deleted.
    Expired(PendingInsertion),
    /// Fresh but meant for another platform; left in place.
    OtherPlatform(PendingInsertion),
    Deliver(PendingInsertion),
}

/// Pending insertion persistence over the bridge's storage actions.
#[derive(Clone)]
pub struct PendingInsertionStore {
    bridge: BridgeClient,
    ttl: Duration,
}

impl PendingInsertionStore {
    pub fn new(bridge: BridgeClient, ttl: Duration) -> Self {
        Self { bridge, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a new insertion, replacing whatever was there.
    pub async fn create(
        &self,
        text: &str,
        platform_id: &str,
    ) -> Result<PendingInsertion, EngineError> {
        let now = Utc::now();
        if let InsertionState::Pending(existing) = self.load().await? {
            if !existing.is_expired_at(now) && existing.platform_id != platform_id {
                warn!(
                    "Replacing unconsumed insertion for {} with one for {}",
                    existing.platform_id, platform_id
                );
            }
        }

        let insertion = PendingInsertion::new(text, platform_id, self.ttl).with_created_at(now);
        self.bridge
            .set(
                PENDING_INSERTION_KEY,
                &InsertionState::Pending(insertion.clone()),
            )
            .await?;
        info!("Stored pending insertion for {} ({} chars)", platform_id, text.len());
        Ok(insertion)
    }

    /// Current persisted state. Undecodable records are deleted.
    pub async fn load(&self) -> Result<InsertionState, EngineError> {
        let Some(raw) = self.bridge.get_raw(PENDING_INSERTION_KEY).await? else {
            return Ok(InsertionState::None);
        };
        match serde_json::from_value::<InsertionState>(raw) {
            Ok(InsertionState::Pending(p)) => Ok(InsertionState::Pending(p)),
            Ok(other) => {
                debug!("Dropping non-pending insertion record: {:?}", other);
                self.bridge.remove(PENDING_INSERTION_KEY).await?;
                Ok(InsertionState::None)
            }
            Err(e) => {
                warn!("Dropping undecodable pending insertion: {}", e);
                self.bridge.remove(PENDING_INSERTION_KEY).await?;
                Ok(InsertionState::None)
            }
        }
    }

    /// Check for an insertion addressed to `platform_id`.
    ///
    /// Expired entries are deleted whatever platform they target. A fresh
    /// entry for another platform is left for that platform's page.
    pub async fn check(
        &self,
        platform_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Delivery, EngineError> {
        let InsertionState::Pending(insertion) = self.load().await? else {
            return Ok(Delivery::Nothing);
        };

        if insertion.is_expired_at(now) {
            let stale = EngineError::StaleInsertion {
                platform_id: insertion.platform_id.clone(),
                age_seconds: insertion.age_seconds(now),
            };
            info!("{}", stale);
            self.bridge.remove(PENDING_INSERTION_KEY).await?;
            return Ok(Delivery::Expired(insertion));
        }

        if platform_id == Some(insertion.platform_id.as_str()) {
            Ok(Delivery::Deliver(insertion))
        } else {
            debug!("Pending insertion is for {}, leaving it", insertion.platform_id);
            Ok(Delivery::OtherPlatform(insertion))
        }
    }

    /// Delete the record if it is still the one that was delivered.
    pub async fn consume(&self, insertion: &PendingInsertion) -> Result<InsertionState, EngineError> {
        if let InsertionState::Pending(current) = self.load().await? {
            if current == *insertion {
                self.bridge.remove(PENDING_INSERTION_KEY).await?;
            } else {
                debug!("Pending insertion was replaced before consumption");
            }
        }
        Ok(InsertionState::Consumed(insertion.clone()))
    }

    /// Delete the record for an insertion that went stale while held.
    pub async fn expire(&self, insertion: &PendingInsertion) -> Result<InsertionState, EngineError> {
        if let InsertionState::Pending(current) = self.load().await? {
            if current == *insertion {
                self.bridge.remove(PENDING_INSERTION_KEY).await?;
            }
        }
        Ok(InsertionState::Expired(insertion.clone()))
    }

    /// Delete an expired record. Returns whether one was removed.
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<bool, EngineError> {
        match self.load().await? {
            InsertionState::Pending(p) if p.is_expired_at(now) => {
                self.bridge.remove(PENDING_INSERTION_KEY).await?;
                debug!("Pruned expired insertion for {}", p.platform_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn clear(&self) -> Result<(), EngineError> {
        self.bridge.remove(PENDING_INSERTION_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
