use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::MatchingConfig;
use crate::error::{MatchingError, Result};
use crate::models::{Match, Profile, ProfileState, Swipe, SwipeDirection, UserId};
use crate::services::undo::UndoService;
use crate::storage::{MatchStore, ProfileStore, SafetyStore, SwipeStore};
use crate::sync::{pair_key, StripedLocks};

/// Result of a swipe: the recorded decision plus the match it created, if
/// mutual interest was detected.
#[derive(Debug, Clone)]
pub struct SwipeOutcome {
    pub swipe: Swipe,
    pub match_created: Option<Match>,
}

/// A user who liked the actor and has not been responded to yet.
#[derive(Debug, Clone)]
pub struct PendingLiker {
    pub profile: Profile,
    pub liked_at: DateTime<Utc>,
}

/// Records swipe decisions, detects mutual interest, creates and retires
/// matches, and enforces swipe-rate limits.
pub struct MatchingService {
    profiles: Arc<dyn ProfileStore>,
    swipes: Arc<dyn SwipeStore>,
    matches: Arc<dyn MatchStore>,
    safety: Arc<dyn SafetyStore>,
    undo: Arc<UndoService>,
    config: MatchingConfig,
    clock: Arc<dyn Clock>,
    /// Serializes the mutual-like check and match creation per unordered
    /// user pair.
    pair_locks: StripedLocks,
}

impl MatchingService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<dyn MatchStore>,
        safety: Arc<dyn SafetyStore>,
        undo: Arc<UndoService>,
        config: MatchingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            swipes,
            matches,
            safety,
            undo,
            config,
            clock,
            pair_locks: StripedLocks::default(),
        }
    }

    /// Record a swipe decision for `actor` on `target`.
    ///
    /// A Like that meets an earlier Like from the target creates a match
    /// exactly once: the check and the creation run inside one critical
    /// section per unordered pair, and the store's create-if-absent keeps a
    /// racing writer from duplicating it.
    pub async fn swipe(
        &self,
        actor: UserId,
        target: UserId,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome> {
        if actor == target {
            return Err(MatchingError::Validation("cannot swipe on yourself".into()));
        }

        let actor_profile = self.require_profile(actor).await?;
        if actor_profile.state != ProfileState::Active {
            return Err(MatchingError::Validation(format!(
                "actor profile is {:?}, not active",
                actor_profile.state
            )));
        }

        let target_profile = self.require_profile(target).await?;
        if target_profile.state != ProfileState::Active {
            return Err(MatchingError::Validation(format!(
                "target profile is {:?}, not active",
                target_profile.state
            )));
        }

        if self.safety.is_blocked(actor, target).await? || self.safety.is_blocked(target, actor).await?
        {
            return Err(MatchingError::Validation("target is unavailable".into()));
        }

        self.enforce_rate_limits(actor, direction).await?;

        let now = self.clock.now();
        let swipe = Swipe::new(actor, target, direction, now);

        let match_created = {
            let _guard = self.pair_locks.lock(&pair_key(actor, target)).await;

            if let Some(existing) = self.swipes.get(actor, target).await? {
                if existing.direction == direction {
                    return Err(MatchingError::Conflict(format!(
                        "swipe on {target} already recorded"
                    )));
                }
                debug!(actor = %actor, target = %target, "superseding prior swipe");
            }
            self.swipes.save(&swipe).await?;

            if direction == SwipeDirection::Like {
                self.try_create_match(actor, target, now).await?
            } else {
                None
            }
        };

        self.undo
            .record_reversible(actor, swipe.clone(), match_created.as_ref())
            .await?;

        Ok(SwipeOutcome {
            swipe,
            match_created,
        })
    }

    /// Mutual-like check and idempotent match creation. Runs inside the
    /// pair critical section.
    async fn try_create_match(
        &self,
        actor: UserId,
        target: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>> {
        let reverse = self.swipes.get(target, actor).await?;
        if !reverse.as_ref().is_some_and(|s| s.is_like()) {
            return Ok(None);
        }

        let m = Match::new(actor, target, now)?;
        if self.matches.create_if_absent(&m).await? {
            info!(match_id = %m.id, "mutual like, match created");
            return Ok(Some(m));
        }

        // A match with this identity already exists; surface it if it is
        // still live rather than inventing a duplicate.
        warn!(match_id = %m.id, "match creation raced an existing match");
        Ok(self.matches.get(&m.id).await?.filter(Match::is_live))
    }

    /// End a match from either live state.
    pub async fn unmatch(&self, match_id: &str, initiator: UserId) -> Result<Match> {
        self.transition(match_id, |m, now| m.unmatch(initiator, now))
            .await
    }

    /// End a match kindly.
    pub async fn graceful_exit(&self, match_id: &str, initiator: UserId) -> Result<Match> {
        self.transition(match_id, |m, now| m.graceful_exit(initiator, now))
            .await
    }

    /// End a match because one side blocked the other.
    pub async fn block(&self, match_id: &str, initiator: UserId) -> Result<Match> {
        self.transition(match_id, |m, now| m.block(initiator, now))
            .await
    }

    /// Mutual-consent move from Active to Friends.
    pub async fn transition_to_friends(&self, match_id: &str, initiator: UserId) -> Result<Match> {
        self.transition(match_id, |m, _| m.to_friends(initiator)).await
    }

    /// Mutual-consent move back from Friends to Active.
    pub async fn rekindle(&self, match_id: &str, initiator: UserId) -> Result<Match> {
        self.transition(match_id, |m, _| m.rekindle(initiator)).await
    }

    async fn transition<F>(&self, match_id: &str, apply: F) -> Result<Match>
    where
        F: FnOnce(&mut Match, DateTime<Utc>) -> Result<()>,
    {
        let mut m = self
            .matches
            .get(match_id)
            .await?
            .ok_or_else(|| MatchingError::NotFound(format!("match {match_id}")))?;

        apply(&mut m, self.clock.now())?;
        self.matches.update(&m).await?;
        info!(match_id = %m.id, state = ?m.state, "match transitioned");
        Ok(m)
    }

    /// Users who liked `user` and have not been responded to, newest first.
    pub async fn pending_likers(&self, user: UserId) -> Result<Vec<PendingLiker>> {
        let mut excluded = self.swipes.swiped_user_ids(user).await?;
        excluded.extend(self.safety.exclusions_for(user).await?);
        for m in self.matches.all_for(user).await? {
            if let Some(other) = m.other_user(user) {
                excluded.insert(other);
            }
        }

        let likes = self.swipes.likes_received(user).await?;
        let liker_ids: Vec<UserId> = likes
            .iter()
            .map(|s| s.actor)
            .filter(|id| !excluded.contains(id))
            .collect();
        let profiles = self.profiles.get_many(&liker_ids).await?;

        let mut pending: Vec<PendingLiker> = profiles
            .into_iter()
            .filter(|p| p.is_active())
            .filter_map(|p| {
                likes
                    .iter()
                    .find(|s| s.actor == p.id)
                    .map(|s| PendingLiker {
                        liked_at: s.created_at,
                        profile: p,
                    })
            })
            .collect();

        pending.sort_by(|a, b| b.liked_at.cmp(&a.liked_at));
        Ok(pending)
    }

    async fn enforce_rate_limits(&self, actor: UserId, direction: SwipeDirection) -> Result<()> {
        let now = self.clock.now();

        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let (limit, label) = match direction {
            SwipeDirection::Like => (self.config.limits.daily_like_limit, "daily like budget"),
            SwipeDirection::Pass => (self.config.limits.daily_pass_limit, "daily pass budget"),
        };
        let used = self.swipes.count_since(actor, direction, start_of_day).await?;
        if used >= limit {
            warn!(actor = %actor, used, limit, "{label} exhausted");
            return Err(MatchingError::RateLimit(format!("{label} exhausted")));
        }

        let minute_ago = now - Duration::seconds(60);
        let recent = self.swipes.count_all_since(actor, minute_ago).await?;
        if recent >= self.config.limits.swipes_per_minute {
            warn!(actor = %actor, recent, "swipe velocity ceiling hit");
            return Err(MatchingError::RateLimit("swipe velocity ceiling hit".into()));
        }

        Ok(())
    }

    async fn require_profile(&self, id: UserId) -> Result<Profile> {
        self.profiles
            .get(id)
            .await?
            .ok_or_else(|| MatchingError::NotFound(format!("profile {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Dealbreakers, Gender, Lifestyle, MatchState};
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn profile(gender: Gender, interested: Gender) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1995, 1, 1).unwrap(),
            gender,
            interested_in: BTreeSet::from([interested]),
            location: None,
            max_distance_km: 50,
            min_age: 21,
            max_age: 40,
            interests: BTreeSet::new(),
            lifestyle: Lifestyle::default(),
            dealbreakers: Dealbreakers::none(),
            pace: None,
            verified: false,
            state: ProfileState::Active,
            updated_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        service: MatchingService,
        a: UserId,
        b: UserId,
    }

    fn fixture() -> Fixture {
        fixture_with_config(MatchingConfig::default())
    }

    fn fixture_with_config(config: MatchingConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));

        let alice = profile(Gender::Woman, Gender::Man);
        let bob = profile(Gender::Man, Gender::Woman);
        let a = alice.id;
        let b = bob.id;
        store.insert_profile(alice);
        store.insert_profile(bob);

        let undo = Arc::new(UndoService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            config.clone(),
            clock.clone(),
        ));
        let service = MatchingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            undo,
            config,
            clock.clone(),
        );
        Fixture {
            store,
            clock,
            service,
            a,
            b,
        }
    }

    #[tokio::test]
    async fn self_swipe_is_rejected() {
        let f = fixture();
        let result = f.service.swipe(f.a, f.a, SwipeDirection::Like).await;
        assert!(matches!(result, Err(MatchingError::Validation(_))));
    }

    #[tokio::test]
    async fn like_without_reciprocal_creates_no_match() {
        let f = fixture();
        let outcome = f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();
        assert!(outcome.match_created.is_none());
    }

    #[tokio::test]
    async fn mutual_like_creates_deterministic_match() {
        let f = fixture();
        f.service.swipe(f.b, f.a, SwipeDirection::Like).await.unwrap();
        let outcome = f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();

        let created = outcome.match_created.expect("match should be created");
        assert_eq!(created.id, Match::pair_id(f.b, f.a));
        assert_eq!(created.state, MatchState::Active);
    }

    #[tokio::test]
    async fn pass_does_not_count_toward_mutual_like() {
        let f = fixture();
        f.service.swipe(f.b, f.a, SwipeDirection::Pass).await.unwrap();
        let outcome = f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();
        assert!(outcome.match_created.is_none());
    }

    #[tokio::test]
    async fn repeated_same_direction_swipe_is_a_conflict() {
        let f = fixture();
        f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();
        let result = f.service.swipe(f.a, f.b, SwipeDirection::Like).await;
        assert!(matches!(result, Err(MatchingError::Conflict(_))));
    }

    #[tokio::test]
    async fn opposite_direction_supersedes() {
        let f = fixture();
        f.service.swipe(f.a, f.b, SwipeDirection::Pass).await.unwrap();
        let outcome = f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();
        assert_eq!(outcome.swipe.direction, SwipeDirection::Like);
    }

    #[tokio::test]
    async fn swiping_inactive_target_fails_validation() {
        let f = fixture();
        let paused = {
            let mut p = profile(Gender::Man, Gender::Woman);
            p.state = ProfileState::Paused;
            let id = p.id;
            f.store.insert_profile(p);
            id
        };
        let result = f.service.swipe(f.a, paused, SwipeDirection::Like).await;
        assert!(matches!(result, Err(MatchingError::Validation(_))));
    }

    #[tokio::test]
    async fn daily_like_budget_is_enforced() {
        let mut config = MatchingConfig::default();
        config.limits.daily_like_limit = 1;
        // Keep the velocity ceiling out of the way.
        config.limits.swipes_per_minute = 100;
        let f = fixture_with_config(config);

        f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();

        let extra = profile(Gender::Man, Gender::Woman);
        let extra_id = extra.id;
        f.store.insert_profile(extra);
        let result = f.service.swipe(f.a, extra_id, SwipeDirection::Like).await;
        assert!(matches!(result, Err(MatchingError::RateLimit(_))));
    }

    #[tokio::test]
    async fn velocity_ceiling_is_enforced() {
        let mut config = MatchingConfig::default();
        config.limits.swipes_per_minute = 2;
        let f = fixture_with_config(config);

        for _ in 0..2 {
            let extra = profile(Gender::Man, Gender::Woman);
            let extra_id = extra.id;
            f.store.insert_profile(extra);
            f.service.swipe(f.a, extra_id, SwipeDirection::Pass).await.unwrap();
        }

        let result = f.service.swipe(f.a, f.b, SwipeDirection::Pass).await;
        assert!(matches!(result, Err(MatchingError::RateLimit(_))));

        // The window slides: a minute later the budget frees up.
        f.clock.advance(Duration::seconds(61));
        assert!(f.service.swipe(f.a, f.b, SwipeDirection::Pass).await.is_ok());
    }

    #[tokio::test]
    async fn friends_round_trip_and_unmatch() {
        let f = fixture();
        f.service.swipe(f.b, f.a, SwipeDirection::Like).await.unwrap();
        let outcome = f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();
        let match_id = outcome.match_created.unwrap().id;

        let m = f.service.transition_to_friends(&match_id, f.a).await.unwrap();
        assert_eq!(m.state, MatchState::Friends);
        let m = f.service.rekindle(&match_id, f.b).await.unwrap();
        assert_eq!(m.state, MatchState::Active);

        let m = f.service.unmatch(&match_id, f.a).await.unwrap();
        assert_eq!(m.state, MatchState::Unmatched);
        let again = f.service.unmatch(&match_id, f.b).await;
        assert!(matches!(again, Err(MatchingError::State(_))));
    }

    #[tokio::test]
    async fn non_participant_cannot_graceful_exit() {
        let f = fixture();
        f.service.swipe(f.b, f.a, SwipeDirection::Like).await.unwrap();
        let outcome = f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();
        let match_id = outcome.match_created.unwrap().id;

        let stranger = Uuid::new_v4();
        let result = f.service.graceful_exit(&match_id, stranger).await;
        assert!(matches!(result, Err(MatchingError::State(_))));
    }

    #[tokio::test]
    async fn pending_likers_excludes_answered_and_sorts_newest_first() {
        let f = fixture();

        let carol = profile(Gender::Man, Gender::Woman);
        let carol_id = carol.id;
        f.store.insert_profile(carol);

        f.service.swipe(f.b, f.a, SwipeDirection::Like).await.unwrap();
        f.clock.advance(Duration::seconds(10));
        f.service.swipe(carol_id, f.a, SwipeDirection::Like).await.unwrap();

        let pending = f.service.pending_likers(f.a).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].profile.id, carol_id);

        // Answering one removes them from the list.
        f.service.swipe(f.a, f.b, SwipeDirection::Like).await.unwrap();
        let pending = f.service.pending_likers(f.a).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].profile.id, carol_id);
    }
}
