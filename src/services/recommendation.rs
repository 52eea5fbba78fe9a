use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::MatchingConfig;
use crate::core::distance::distance_between;
use crate::core::scoring;
use crate::error::{MatchingError, Result};
use crate::models::{DailyPick, Profile, Standout, SwipeDirection, UserId};
use crate::services::discovery::DiscoveryService;
use crate::storage::{ProfileStore, RecommendationStore, SwipeStore};

/// Snapshot of a user's daily swipe budget.
#[derive(Debug, Clone)]
pub struct DailyStatus {
    pub likes_used: u32,
    pub likes_remaining: u32,
    pub passes_used: u32,
    pub passes_remaining: u32,
    pub day: NaiveDate,
    pub resets_at: DateTime<Utc>,
}

/// Derives the deterministic "pick of the day" and the ranked standout
/// shortlist from the candidate-eligible pool.
pub struct RecommendationService {
    profiles: Arc<dyn ProfileStore>,
    swipes: Arc<dyn SwipeStore>,
    recs: Arc<dyn RecommendationStore>,
    discovery: Arc<DiscoveryService>,
    config: MatchingConfig,
    clock: Arc<dyn Clock>,
}

impl RecommendationService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        swipes: Arc<dyn SwipeStore>,
        recs: Arc<dyn RecommendationStore>,
        discovery: Arc<DiscoveryService>,
        config: MatchingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            swipes,
            recs,
            discovery,
            config,
            clock,
        }
    }

    /// The seeker's pick for the given day.
    ///
    /// Selection is seeded by the day ordinal and the seeker id, so repeated
    /// calls on the same day return the same candidate as long as the
    /// eligible pool is unchanged. Returns `None` when the pool is empty.
    pub async fn daily_pick(&self, seeker: UserId, day: NaiveDate) -> Result<Option<DailyPick>> {
        let seeker_profile = self.require(seeker).await?;
        let candidates = self.discovery.eligible_on(seeker, day).await?;
        if candidates.is_empty() {
            return Ok(None);
        }

        let mut rng = StdRng::seed_from_u64(pick_seed(seeker, day));
        let picked = &candidates[rng.gen_range(0..candidates.len())];

        let reason = self.pick_reason(&seeker_profile, picked, day, &mut rng);
        let viewed = self.recs.is_pick_viewed(seeker, day).await?;

        debug!(seeker = %seeker, candidate = %picked.id, %day, "daily pick selected");
        Ok(Some(DailyPick {
            seeker,
            candidate: picked.id,
            day,
            reason,
            viewed,
        }))
    }

    pub async fn mark_pick_viewed(&self, seeker: UserId, day: NaiveDate) -> Result<()> {
        self.recs.mark_pick_viewed(seeker, day).await?;
        Ok(())
    }

    /// Today's ranked standouts, at most `top_n`. Served from the per-day
    /// cache when one exists, so a list the seeker has already seen does not
    /// reorder under them.
    pub async fn standouts(
        &self,
        seeker: UserId,
        day: NaiveDate,
        top_n: usize,
    ) -> Result<Vec<Standout>> {
        let cached = self.recs.standouts_for(seeker, day).await?;
        if !cached.is_empty() {
            let mut list = cached;
            list.truncate(top_n);
            return Ok(list);
        }

        let seeker_profile = self.require(seeker).await?;
        let candidates = self.discovery.eligible_on(seeker, day).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let recent = self.recent_standout_ids(seeker, day).await?;
        let now = self.clock.now();
        let count = top_n.min(self.config.recommendation.standout_count);

        let mut scored: Vec<(u32, &Profile)> = candidates
            .iter()
            .filter(|c| !recent.contains(&c.id))
            .map(|c| (self.standout_score(&seeker_profile, c, day, now), c))
            .collect();

        // Deterministic order: score descending, candidate id as tie-break.
        scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(count);

        let standouts: Vec<Standout> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, candidate))| Standout {
                seeker,
                candidate: candidate.id,
                day,
                rank: i + 1,
                score,
                reason: self.standout_reason(&seeker_profile, candidate),
            })
            .collect();

        if !standouts.is_empty() {
            self.recs.save_standouts(seeker, day, &standouts).await?;
            info!(seeker = %seeker, count = standouts.len(), %day, "standouts generated");
        }
        Ok(standouts)
    }

    /// Likes and passes used today against the configured budgets.
    pub async fn daily_status(&self, user: UserId) -> Result<DailyStatus> {
        let now = self.clock.now();
        let day = now.date_naive();
        let start_of_day = day.and_time(NaiveTime::MIN).and_utc();
        let resets_at = (day + chrono::Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc();

        let likes_used = self
            .swipes
            .count_since(user, SwipeDirection::Like, start_of_day)
            .await?;
        let passes_used = self
            .swipes
            .count_since(user, SwipeDirection::Pass, start_of_day)
            .await?;

        Ok(DailyStatus {
            likes_used,
            likes_remaining: self.config.limits.daily_like_limit.saturating_sub(likes_used),
            passes_used,
            passes_remaining: self.config.limits.daily_pass_limit.saturating_sub(passes_used),
            day,
            resets_at,
        })
    }

    /// Composite 0-100 standout score.
    fn standout_score(
        &self,
        seeker: &Profile,
        candidate: &Profile,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> u32 {
        let weights = &self.config.standouts;
        let rec = &self.config.recommendation;

        let distance = match distance_between(seeker, candidate) {
            Some(d) if seeker.max_distance_km > 0 => {
                (1.0 - d / seeker.max_distance_km as f64).max(0.0)
            }
            _ => 0.5,
        };
        let age = scoring::age_score(seeker, candidate, day, rec.similar_age_years);
        let interests = standout_interest_score(seeker, candidate);
        let lifestyle = scoring::lifestyle_score(&seeker.lifestyle, &candidate.lifestyle);
        let completeness = candidate.completeness();
        let activity = scoring::activity_score(candidate.updated_at, now);

        let composite = distance * weights.distance
            + age * weights.age
            + interests * weights.interests
            + lifestyle * weights.lifestyle
            + completeness * weights.completeness
            + activity * weights.activity;

        (composite * 100.0).round().clamp(0.0, 100.0) as u32
    }

    /// Reason text from the strongest contributing factor, generic seeded
    /// fallback when nothing stands out.
    fn pick_reason(
        &self,
        seeker: &Profile,
        picked: &Profile,
        day: NaiveDate,
        rng: &mut StdRng,
    ) -> String {
        let rec = &self.config.recommendation;

        if let Some(distance) = distance_between(seeker, picked) {
            if distance < rec.nearby_distance_km {
                return "Lives nearby!".to_string();
            }
            if distance < rec.close_distance_km {
                return "Close enough for coffee!".to_string();
            }
        }

        let shared = seeker.interests.intersection(&picked.interests).count();
        if shared >= rec.min_shared_interests {
            return "Many shared interests!".to_string();
        }
        if shared >= 1 {
            return "Some shared interests".to_string();
        }

        if let (Some(a), Some(b)) = (seeker.lifestyle.goal, picked.lifestyle.goal) {
            if a == b {
                return "Looking for the same thing".to_string();
            }
        }
        if let (Some(a), Some(b)) = (seeker.lifestyle.kids, picked.lifestyle.kids) {
            if a == b {
                return "Same stance on kids".to_string();
            }
        }

        let age_diff = seeker.age_on(day).abs_diff(picked.age_on(day));
        if age_diff <= rec.similar_age_years {
            return "Similar age".to_string();
        }
        if age_diff <= rec.compatible_age_years {
            return "Age-appropriate match".to_string();
        }

        const FALLBACKS: [&str; 5] = [
            "Our algorithm thinks you might click!",
            "Something different today!",
            "Expand your horizons!",
            "Why not give them a chance?",
            "Could be a pleasant surprise!",
        ];
        FALLBACKS[rng.gen_range(0..FALLBACKS.len())].to_string()
    }

    fn standout_reason(&self, seeker: &Profile, candidate: &Profile) -> String {
        let rec = &self.config.recommendation;

        let shared = seeker.interests.intersection(&candidate.interests).count();
        if shared >= rec.min_shared_interests {
            return "Many shared interests".to_string();
        }
        if shared >= 1 {
            return "Shared interests".to_string();
        }

        if let Some(distance) = distance_between(seeker, candidate) {
            if distance < rec.nearby_distance_km {
                return "Lives nearby".to_string();
            }
        }

        if scoring::lifestyle_score(&seeker.lifestyle, &candidate.lifestyle) >= 0.75 {
            return "Compatible lifestyle".to_string();
        }
        if let (Some(a), Some(b)) = (seeker.lifestyle.goal, candidate.lifestyle.goal) {
            if a == b {
                return "Same relationship goals".to_string();
            }
        }

        "Top match for you".to_string()
    }

    /// Candidates featured within the diversity window, excluded from
    /// today's list.
    async fn recent_standout_ids(&self, seeker: UserId, day: NaiveDate) -> Result<HashSet<UserId>> {
        let mut recent = HashSet::new();
        for offset in 1..=self.config.recommendation.standout_diversity_days {
            let past_day = day - chrono::Duration::days(offset as i64);
            for standout in self.recs.standouts_for(seeker, past_day).await? {
                recent.insert(standout.candidate);
            }
        }
        Ok(recent)
    }

    async fn require(&self, id: UserId) -> Result<Profile> {
        self.profiles
            .get(id)
            .await?
            .ok_or_else(|| MatchingError::NotFound(format!("profile {id}")))
    }
}

/// Seed combining the day's ordinal with a stable fold of the seeker uuid.
/// Never time-of-call-dependent.
fn pick_seed(seeker: UserId, day: NaiveDate) -> u64 {
    let ordinal = day.num_days_from_ce() as i64 as u64;
    let id = seeker.as_u128();
    ordinal
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (id as u64)
        ^ ((id >> 64) as u64)
}

/// Standouts treat missing interest data as soft signal rather than zeroing
/// the component: both-empty is neutral, one-empty slightly negative.
fn standout_interest_score(seeker: &Profile, candidate: &Profile) -> f64 {
    let a = &seeker.interests;
    let b = &candidate.interests;
    if a.is_empty() && b.is_empty() {
        return 0.5;
    }
    if a.is_empty() || b.is_empty() {
        return 0.3;
    }
    scoring::interest_score(a, b)
}
