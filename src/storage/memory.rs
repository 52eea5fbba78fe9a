use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{
    MatchStore, ProfileStore, RecommendationStore, SafetyStore, SwipeStore, UndoStore,
};
use crate::error::StorageError;
use crate::models::{
    Block, Match, Profile, ProfileState, Report, Standout, Swipe, SwipeDirection, UndoRecord,
    UserId,
};

/// In-memory implementation of every collaborator interface.
///
/// Backs the test suite and embedded setups. A single instance implements
/// all store traits, so one `Arc<MemoryStore>` can be handed to every
/// service.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<UserId, Profile>,
    swipes: HashMap<(UserId, UserId), Swipe>,
    matches: HashMap<String, Match>,
    blocks: HashMap<(UserId, UserId), Block>,
    reports: HashMap<(UserId, UserId), Report>,
    undo: HashMap<UserId, UndoRecord>,
    pick_views: HashSet<(UserId, NaiveDate)>,
    standouts: HashMap<(UserId, NaiveDate), Vec<Standout>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile. Intended for tests and bootstrap code.
    pub fn insert_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.id, profile);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, id: UserId) -> Result<Option<Profile>, StorageError> {
        Ok(self.lock().profiles.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<Profile>, StorageError> {
        let inner = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.profiles.get(id).cloned())
            .collect())
    }

    async fn find_active(&self) -> Result<Vec<Profile>, StorageError> {
        Ok(self
            .lock()
            .profiles
            .values()
            .filter(|p| p.state == ProfileState::Active)
            .cloned()
            .collect())
    }

    async fn update_state(&self, id: UserId, state: ProfileState) -> Result<(), StorageError> {
        let mut inner = self.lock();
        match inner.profiles.get_mut(&id) {
            Some(profile) => {
                profile.state = state;
                Ok(())
            }
            None => Err(StorageError::Backend(format!("unknown profile {id}"))),
        }
    }
}

#[async_trait]
impl SwipeStore for MemoryStore {
    async fn save(&self, swipe: &Swipe) -> Result<(), StorageError> {
        self.lock()
            .swipes
            .insert((swipe.actor, swipe.target), swipe.clone());
        Ok(())
    }

    async fn get(&self, actor: UserId, target: UserId) -> Result<Option<Swipe>, StorageError> {
        Ok(self.lock().swipes.get(&(actor, target)).cloned())
    }

    async fn delete(&self, actor: UserId, target: UserId) -> Result<bool, StorageError> {
        Ok(self.lock().swipes.remove(&(actor, target)).is_some())
    }

    async fn swiped_user_ids(&self, actor: UserId) -> Result<HashSet<UserId>, StorageError> {
        Ok(self
            .lock()
            .swipes
            .values()
            .filter(|s| s.actor == actor)
            .map(|s| s.target)
            .collect())
    }

    async fn count_since(
        &self,
        actor: UserId,
        direction: SwipeDirection,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        Ok(self
            .lock()
            .swipes
            .values()
            .filter(|s| s.actor == actor && s.direction == direction && s.created_at >= since)
            .count() as u32)
    }

    async fn count_all_since(
        &self,
        actor: UserId,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        Ok(self
            .lock()
            .swipes
            .values()
            .filter(|s| s.actor == actor && s.created_at >= since)
            .count() as u32)
    }

    async fn likes_received(&self, target: UserId) -> Result<Vec<Swipe>, StorageError> {
        Ok(self
            .lock()
            .swipes
            .values()
            .filter(|s| s.target == target && s.is_like())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create_if_absent(&self, m: &Match) -> Result<bool, StorageError> {
        let mut inner = self.lock();
        if inner.matches.contains_key(&m.id) {
            return Ok(false);
        }
        inner.matches.insert(m.id.clone(), m.clone());
        Ok(true)
    }

    async fn get(&self, id: &str) -> Result<Option<Match>, StorageError> {
        Ok(self.lock().matches.get(id).cloned())
    }

    async fn update(&self, m: &Match) -> Result<(), StorageError> {
        let mut inner = self.lock();
        match inner.matches.get_mut(&m.id) {
            Some(existing) => {
                *existing = m.clone();
                Ok(())
            }
            None => Err(StorageError::Backend(format!("unknown match {}", m.id))),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.lock().matches.remove(id).is_some())
    }

    async fn all_for(&self, user: UserId) -> Result<Vec<Match>, StorageError> {
        Ok(self
            .lock()
            .matches
            .values()
            .filter(|m| m.involves(user))
            .cloned()
            .collect())
    }

    async fn live_for(&self, user: UserId) -> Result<Vec<Match>, StorageError> {
        Ok(self
            .lock()
            .matches
            .values()
            .filter(|m| m.involves(user) && m.is_live())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SafetyStore for MemoryStore {
    async fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        self.lock()
            .blocks
            .entry((block.blocker, block.blocked))
            .or_insert_with(|| block.clone());
        Ok(())
    }

    async fn delete_block(&self, blocker: UserId, blocked: UserId) -> Result<bool, StorageError> {
        Ok(self.lock().blocks.remove(&(blocker, blocked)).is_some())
    }

    async fn is_blocked(&self, blocker: UserId, blocked: UserId) -> Result<bool, StorageError> {
        Ok(self.lock().blocks.contains_key(&(blocker, blocked)))
    }

    async fn save_report(&self, report: &Report) -> Result<(), StorageError> {
        self.lock()
            .reports
            .entry((report.reporter, report.reported))
            .or_insert_with(|| report.clone());
        Ok(())
    }

    async fn has_reported(
        &self,
        reporter: UserId,
        reported: UserId,
    ) -> Result<bool, StorageError> {
        Ok(self.lock().reports.contains_key(&(reporter, reported)))
    }

    async fn count_distinct_reporters(&self, reported: UserId) -> Result<u32, StorageError> {
        Ok(self
            .lock()
            .reports
            .keys()
            .filter(|(_, target)| *target == reported)
            .count() as u32)
    }

    async fn exclusions_for(&self, user: UserId) -> Result<HashSet<UserId>, StorageError> {
        let inner = self.lock();
        let mut excluded = HashSet::new();
        for (blocker, blocked) in inner.blocks.keys() {
            if *blocker == user {
                excluded.insert(*blocked);
            }
            if *blocked == user {
                excluded.insert(*blocker);
            }
        }
        for (reporter, reported) in inner.reports.keys() {
            if *reporter == user {
                excluded.insert(*reported);
            }
        }
        Ok(excluded)
    }
}

#[async_trait]
impl UndoStore for MemoryStore {
    async fn put(&self, record: &UndoRecord) -> Result<(), StorageError> {
        self.lock().undo.insert(record.actor, record.clone());
        Ok(())
    }

    async fn get(&self, actor: UserId) -> Result<Option<UndoRecord>, StorageError> {
        Ok(self.lock().undo.get(&actor).cloned())
    }

    async fn delete(&self, actor: UserId) -> Result<bool, StorageError> {
        Ok(self.lock().undo.remove(&actor).is_some())
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn is_pick_viewed(&self, seeker: UserId, day: NaiveDate) -> Result<bool, StorageError> {
        Ok(self.lock().pick_views.contains(&(seeker, day)))
    }

    async fn mark_pick_viewed(&self, seeker: UserId, day: NaiveDate) -> Result<(), StorageError> {
        self.lock().pick_views.insert((seeker, day));
        Ok(())
    }

    async fn standouts_for(
        &self,
        seeker: UserId,
        day: NaiveDate,
    ) -> Result<Vec<Standout>, StorageError> {
        Ok(self
            .lock()
            .standouts
            .get(&(seeker, day))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_standouts(
        &self,
        seeker: UserId,
        day: NaiveDate,
        standouts: &[Standout],
    ) -> Result<(), StorageError> {
        self.lock()
            .standouts
            .insert((seeker, day), standouts.to_vec());
        Ok(())
    }
}
