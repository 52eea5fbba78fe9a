//! Collaborator interfaces consumed by the engine.
//!
//! These traits define the boundary between the matching core and the
//! persistence layer. Implementations may block or go over the network; the
//! services never hold a lock across these calls longer than the critical
//! section they guard requires.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

use crate::error::StorageError;
use crate::models::{
    Block, Match, Profile, ProfileState, Report, Standout, Swipe, SwipeDirection, UndoRecord,
    UserId,
};

pub use memory::MemoryStore;

/// Profile lookup. Profiles are owned by the profile subsystem; the engine
/// only reads them, except for the auto-ban state transition.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<Profile>, StorageError>;

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<Profile>, StorageError>;

    /// All profiles currently in the Active lifecycle state.
    async fn find_active(&self) -> Result<Vec<Profile>, StorageError>;

    async fn update_state(&self, id: UserId, state: ProfileState) -> Result<(), StorageError>;
}

/// Swipe persistence, unique per ordered (actor, target) pair.
#[async_trait]
pub trait SwipeStore: Send + Sync {
    /// Upsert: a later swipe on the same ordered pair replaces the stored one.
    async fn save(&self, swipe: &Swipe) -> Result<(), StorageError>;

    async fn get(&self, actor: UserId, target: UserId) -> Result<Option<Swipe>, StorageError>;

    async fn delete(&self, actor: UserId, target: UserId) -> Result<bool, StorageError>;

    /// Everyone the actor has already swiped on, either direction of decision.
    async fn swiped_user_ids(&self, actor: UserId) -> Result<HashSet<UserId>, StorageError>;

    /// Swipes of one direction recorded by the actor at or after `since`.
    async fn count_since(
        &self,
        actor: UserId,
        direction: SwipeDirection,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError>;

    /// All swipes recorded by the actor at or after `since` (velocity window).
    async fn count_all_since(&self, actor: UserId, since: DateTime<Utc>)
        -> Result<u32, StorageError>;

    /// Like swipes whose target is the given user.
    async fn likes_received(&self, target: UserId) -> Result<Vec<Swipe>, StorageError>;
}

/// Match persistence.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Idempotent create: returns false without writing when a match with
    /// the same id already exists.
    async fn create_if_absent(&self, m: &Match) -> Result<bool, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<Match>, StorageError>;

    async fn update(&self, m: &Match) -> Result<(), StorageError>;

    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    async fn all_for(&self, user: UserId) -> Result<Vec<Match>, StorageError>;

    /// Matches in a non-terminal state involving the user.
    async fn live_for(&self, user: UserId) -> Result<Vec<Match>, StorageError>;
}

/// Block and report persistence.
#[async_trait]
pub trait SafetyStore: Send + Sync {
    /// Idempotent: saving an existing block is a no-op.
    async fn save_block(&self, block: &Block) -> Result<(), StorageError>;

    async fn delete_block(&self, blocker: UserId, blocked: UserId) -> Result<bool, StorageError>;

    /// Directional check: has `blocker` blocked `blocked`?
    async fn is_blocked(&self, blocker: UserId, blocked: UserId) -> Result<bool, StorageError>;

    /// Idempotent per (reporter, reported) pair.
    async fn save_report(&self, report: &Report) -> Result<(), StorageError>;

    async fn has_reported(&self, reporter: UserId, reported: UserId)
        -> Result<bool, StorageError>;

    async fn count_distinct_reporters(&self, reported: UserId) -> Result<u32, StorageError>;

    /// Ids invisible to `user`: blocked in either direction plus reported.
    async fn exclusions_for(&self, user: UserId) -> Result<HashSet<UserId>, StorageError>;
}

/// Single-slot undo state per actor.
#[async_trait]
pub trait UndoStore: Send + Sync {
    /// Overwrites any existing record for the actor.
    async fn put(&self, record: &UndoRecord) -> Result<(), StorageError>;

    async fn get(&self, actor: UserId) -> Result<Option<UndoRecord>, StorageError>;

    async fn delete(&self, actor: UserId) -> Result<bool, StorageError>;
}

/// Derived recommendation state: the daily-pick viewed flag and the cached
/// standout lists.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn is_pick_viewed(&self, seeker: UserId, day: NaiveDate) -> Result<bool, StorageError>;

    async fn mark_pick_viewed(&self, seeker: UserId, day: NaiveDate) -> Result<(), StorageError>;

    async fn standouts_for(
        &self,
        seeker: UserId,
        day: NaiveDate,
    ) -> Result<Vec<Standout>, StorageError>;

    async fn save_standouts(
        &self,
        seeker: UserId,
        day: NaiveDate,
        standouts: &[Standout],
    ) -> Result<(), StorageError>;
}
