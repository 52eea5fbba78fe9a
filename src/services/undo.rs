use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::MatchingConfig;
use crate::error::{MatchingError, Result};
use crate::models::{Match, Swipe, UndoRecord, UserId};
use crate::storage::{MatchStore, SwipeStore, UndoStore};
use crate::sync::StripedLocks;

/// Outcome of a successful undo.
#[derive(Debug, Clone)]
pub struct UndoOutcome {
    pub undone_swipe: Swipe,
    /// True when the reversal also removed a match the swipe had created.
    pub match_removed: bool,
}

/// Holds one reversible-swipe record per actor and reverses it within the
/// configured window.
pub struct UndoService {
    swipes: Arc<dyn SwipeStore>,
    matches: Arc<dyn MatchStore>,
    undo: Arc<dyn UndoStore>,
    config: MatchingConfig,
    clock: Arc<dyn Clock>,
    actor_locks: StripedLocks,
}

impl UndoService {
    pub fn new(
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<dyn MatchStore>,
        undo: Arc<dyn UndoStore>,
        config: MatchingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            swipes,
            matches,
            undo,
            config,
            clock,
            actor_locks: StripedLocks::default(),
        }
    }

    /// Store the actor's latest swipe as reversible, overwriting any prior
    /// unexpired record. There is no undo chaining.
    pub async fn record_reversible(
        &self,
        actor: UserId,
        swipe: Swipe,
        created_match: Option<&Match>,
    ) -> Result<()> {
        let _guard = self.actor_locks.lock(&actor).await;

        let expires_at =
            self.clock.now() + Duration::seconds(self.config.undo.window_secs as i64);
        let record = UndoRecord {
            actor,
            swipe,
            match_id: created_match.map(|m| m.id.clone()),
            expires_at,
        };
        self.undo.put(&record).await?;
        debug!(actor = %actor, expires_at = %expires_at, "recorded reversible swipe");
        Ok(())
    }

    /// Whether the actor currently has an unexpired undo available. An
    /// expired record is removed on access.
    pub async fn can_undo(&self, actor: UserId) -> Result<bool> {
        let _guard = self.actor_locks.lock(&actor).await;

        let Some(record) = self.undo.get(actor).await? else {
            return Ok(false);
        };
        if record.is_expired(self.clock.now()) {
            self.undo.delete(actor).await?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Seconds left on the current undo window; 0 when none is available.
    pub async fn seconds_remaining(&self, actor: UserId) -> Result<u64> {
        let Some(record) = self.undo.get(actor).await? else {
            return Ok(0);
        };
        let remaining = (record.expires_at - self.clock.now()).num_seconds();
        Ok(remaining.max(0) as u64)
    }

    /// Reverse the actor's last swipe.
    ///
    /// The compensating deletes run match-first: a crash between the two
    /// leaves at most an orphaned swipe record, never a match referencing a
    /// missing swipe.
    pub async fn undo(&self, actor: UserId) -> Result<UndoOutcome> {
        let _guard = self.actor_locks.lock(&actor).await;

        let Some(record) = self.undo.get(actor).await? else {
            return Err(MatchingError::NotFound("no swipe to undo".into()));
        };

        if record.is_expired(self.clock.now()) {
            self.undo.delete(actor).await?;
            return Err(MatchingError::Expired);
        }

        let mut match_removed = false;
        if let Some(match_id) = &record.match_id {
            match_removed = self.matches.delete(match_id).await?;
        }
        self.swipes
            .delete(record.swipe.actor, record.swipe.target)
            .await?;

        // One-shot: the same action cannot be undone twice.
        self.undo.delete(actor).await?;

        info!(
            actor = %actor,
            target = %record.swipe.target,
            match_removed,
            "swipe reversed"
        );
        Ok(UndoOutcome {
            undone_swipe: record.swipe,
            match_removed,
        })
    }

    /// Drop the actor's undo state without reversing anything.
    pub async fn clear(&self, actor: UserId) -> Result<()> {
        let _guard = self.actor_locks.lock(&actor).await;
        self.undo.delete(actor).await?;
        Ok(())
    }
}
