use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::MatchingConfig;
use crate::error::{MatchingError, Result};
use crate::models::{Block, Match, Profile, ProfileState, Report, ReportReason, UserId};
use crate::storage::{MatchStore, ProfileStore, SafetyStore};
use crate::sync::StripedLocks;

/// Outcome of filing a report.
#[derive(Debug, Clone, Copy)]
pub struct ReportOutcome {
    /// True when this report pushed the target over the auto-ban threshold.
    pub auto_banned: bool,
}

/// Records blocks and reports, auto-suspends accounts past the report
/// threshold, and exposes exclusion sets to the candidate pipeline.
pub struct TrustSafetyService {
    safety: Arc<dyn SafetyStore>,
    profiles: Arc<dyn ProfileStore>,
    matches: Arc<dyn MatchStore>,
    config: MatchingConfig,
    clock: Arc<dyn Clock>,
    /// Serializes the report-count check and ban per reported user.
    target_locks: StripedLocks,
}

impl TrustSafetyService {
    pub fn new(
        safety: Arc<dyn SafetyStore>,
        profiles: Arc<dyn ProfileStore>,
        matches: Arc<dyn MatchStore>,
        config: MatchingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            safety,
            profiles,
            matches,
            config,
            clock,
            target_locks: StripedLocks::default(),
        }
    }

    /// Block a user. Idempotent: blocking the same target again is a no-op.
    /// Any live match between the pair transitions to Blocked.
    pub async fn block(&self, actor: UserId, target: UserId) -> Result<()> {
        if actor == target {
            return Err(MatchingError::Validation("cannot block yourself".into()));
        }
        self.require(target).await?;

        if self.safety.is_blocked(actor, target).await? {
            debug!(actor = %actor, target = %target, "block already present");
            return Ok(());
        }

        self.safety
            .save_block(&Block {
                blocker: actor,
                blocked: target,
                created_at: self.clock.now(),
            })
            .await?;
        self.block_live_match(actor, target).await?;

        info!(actor = %actor, target = %target, "user blocked");
        Ok(())
    }

    /// Remove a block. Returns false when none existed.
    pub async fn unblock(&self, actor: UserId, target: UserId) -> Result<bool> {
        Ok(self.safety.delete_block(actor, target).await?)
    }

    /// File a report. Idempotent per reporter; implicitly blocks the
    /// reported user; auto-bans the target once the distinct-reporter count
    /// reaches the configured threshold.
    pub async fn report(
        &self,
        actor: UserId,
        target: UserId,
        reason: ReportReason,
        description: Option<String>,
    ) -> Result<ReportOutcome> {
        if actor == target {
            return Err(MatchingError::Validation("cannot report yourself".into()));
        }
        if let Some(text) = &description {
            let max = self.config.safety.max_report_description_len;
            if text.len() > max {
                return Err(MatchingError::Validation(format!(
                    "report description exceeds {max} characters"
                )));
            }
        }
        self.require(target).await?;

        if self.safety.has_reported(actor, target).await? {
            debug!(actor = %actor, target = %target, "duplicate report ignored");
            return Ok(ReportOutcome { auto_banned: false });
        }

        self.safety
            .save_report(&Report {
                reporter: actor,
                reported: target,
                reason,
                description,
                created_at: self.clock.now(),
            })
            .await?;

        // Reporting implies the reporter no longer sees the reported party.
        if !self.safety.is_blocked(actor, target).await? {
            self.safety
                .save_block(&Block {
                    blocker: actor,
                    blocked: target,
                    created_at: self.clock.now(),
                })
                .await?;
            self.block_live_match(actor, target).await?;
        }

        let auto_banned = self.apply_auto_ban_if_threshold(target).await?;
        Ok(ReportOutcome { auto_banned })
    }

    /// Ids the candidate pipeline must exclude for this user: blocked in
    /// either direction plus reported.
    pub async fn exclusions(&self, user: UserId) -> Result<HashSet<UserId>> {
        Ok(self.safety.exclusions_for(user).await?)
    }

    /// Check-then-ban runs inside a per-target critical section so
    /// concurrent reports cannot double-count or race the state change.
    async fn apply_auto_ban_if_threshold(&self, target: UserId) -> Result<bool> {
        let _guard = self.target_locks.lock(&target).await;

        let count = self.safety.count_distinct_reporters(target).await?;
        if count < self.config.safety.auto_ban_threshold {
            return Ok(false);
        }

        let profile = self.require(target).await?;
        if profile.state == ProfileState::Banned {
            return Ok(false);
        }

        self.profiles
            .update_state(target, ProfileState::Banned)
            .await?;
        warn!(target = %target, reports = count, "auto-ban threshold reached");
        Ok(true)
    }

    /// Transition any live match between the pair to Blocked.
    async fn block_live_match(&self, blocker: UserId, blocked: UserId) -> Result<()> {
        let pair = Match::pair_id(blocker, blocked);
        if let Some(mut m) = self.matches.get(&pair).await? {
            if m.is_live() {
                m.block(blocker, self.clock.now())?;
                self.matches.update(&m).await?;
                info!(match_id = %m.id, "match blocked");
            }
        }
        Ok(())
    }

    async fn require(&self, id: UserId) -> Result<Profile> {
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
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1995, 1, 1).unwrap(),
            gender: Gender::Woman,
            interested_in: BTreeSet::from([Gender::Man]),
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

    fn service(store: Arc<MemoryStore>) -> TrustSafetyService {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        TrustSafetyService::new(
            store.clone(),
            store.clone(),
            store,
            MatchingConfig::default(),
            clock,
        )
    }

    #[tokio::test]
    async fn self_block_and_self_report_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let p = profile();
        let id = p.id;
        store.insert_profile(p);
        let svc = service(store);

        assert!(matches!(
            svc.block(id, id).await,
            Err(MatchingError::Validation(_))
        ));
        assert!(matches!(
            svc.report(id, id, ReportReason::Spam, None).await,
            Err(MatchingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn block_is_idempotent_and_feeds_exclusions() {
        let store = Arc::new(MemoryStore::new());
        let a = profile();
        let b = profile();
        let (ida, idb) = (a.id, b.id);
        store.insert_profile(a);
        store.insert_profile(b);
        let svc = service(store);

        svc.block(ida, idb).await.unwrap();
        svc.block(ida, idb).await.unwrap();

        assert!(svc.exclusions(ida).await.unwrap().contains(&idb));
        // Blocks exclude in both directions.
        assert!(svc.exclusions(idb).await.unwrap().contains(&ida));
    }

    #[tokio::test]
    async fn report_implicitly_blocks() {
        let store = Arc::new(MemoryStore::new());
        let a = profile();
        let b = profile();
        let (ida, idb) = (a.id, b.id);
        store.insert_profile(a);
        store.insert_profile(b);
        let svc = service(store);

        let outcome = svc
            .report(ida, idb, ReportReason::Harassment, None)
            .await
            .unwrap();
        assert!(!outcome.auto_banned);
        assert!(svc.exclusions(ida).await.unwrap().contains(&idb));
    }

    #[tokio::test]
    async fn third_distinct_reporter_triggers_auto_ban() {
        let store = Arc::new(MemoryStore::new());
        let target = profile();
        let target_id = target.id;
        store.insert_profile(target);
        let reporters: Vec<UserId> = (0..3)
            .map(|_| {
                let p = profile();
                let id = p.id;
                store.insert_profile(p);
                id
            })
            .collect();
        let svc = service(store.clone());

        for (i, reporter) in reporters.iter().enumerate() {
            let outcome = svc
                .report(*reporter, target_id, ReportReason::Spam, None)
                .await
                .unwrap();
            assert_eq!(outcome.auto_banned, i == 2, "only the third report bans");
        }

        let profiles: Arc<dyn ProfileStore> = store;
        let banned = profiles.get(target_id).await.unwrap().unwrap();
        assert_eq!(banned.state, ProfileState::Banned);
    }

    #[tokio::test]
    async fn duplicate_reports_do_not_advance_the_count() {
        let store = Arc::new(MemoryStore::new());
        let target = profile();
        let target_id = target.id;
        store.insert_profile(target);
        let reporter = profile();
        let reporter_id = reporter.id;
        store.insert_profile(reporter);
        let svc = service(store.clone());

        for _ in 0..5 {
            let outcome = svc
                .report(reporter_id, target_id, ReportReason::Spam, None)
                .await
                .unwrap();
            assert!(!outcome.auto_banned);
        }

        let profiles: Arc<dyn ProfileStore> = store;
        let target = profiles.get(target_id).await.unwrap().unwrap();
        assert_eq!(target.state, ProfileState::Active);
    }

    #[tokio::test]
    async fn blocking_transitions_live_match() {
        let store = Arc::new(MemoryStore::new());
        let a = profile();
        let b = profile();
        let (ida, idb) = (a.id, b.id);
        store.insert_profile(a);
        store.insert_profile(b);

        let m = Match::new(ida, idb, Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()).unwrap();
        let matches: Arc<dyn MatchStore> = store.clone();
        matches.create_if_absent(&m).await.unwrap();

        let svc = service(store);
        svc.block(ida, idb).await.unwrap();

        let blocked = matches.get(&m.id).await.unwrap().unwrap();
        assert_eq!(blocked.state, MatchState::Blocked);
        assert_eq!(blocked.ended_by, Some(ida));
    }
}
