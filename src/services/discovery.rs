use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::clock::Clock;
use crate::core::finder::CandidateFinder;
use crate::error::{MatchingError, Result};
use crate::models::{Profile, UserId};
use crate::storage::{ProfileStore, SafetyStore, SwipeStore};

/// Assembles the candidate pool and exclusion sets from the collaborators
/// and delegates to the pure pipeline in [`CandidateFinder`].
pub struct DiscoveryService {
    profiles: Arc<dyn ProfileStore>,
    swipes: Arc<dyn SwipeStore>,
    safety: Arc<dyn SafetyStore>,
    finder: CandidateFinder,
    clock: Arc<dyn Clock>,
}

impl DiscoveryService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        swipes: Arc<dyn SwipeStore>,
        safety: Arc<dyn SafetyStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            swipes,
            safety,
            finder: CandidateFinder::new(),
            clock,
        }
    }

    /// Next batch of ranked candidates for the seeker, as of today.
    pub async fn find_candidates(&self, seeker: UserId) -> Result<Vec<Profile>> {
        self.eligible_on(seeker, self.clock.today()).await
    }

    /// Eligible candidates for the seeker with ages evaluated on the given
    /// day. Used by the recommendation service for day-pinned computations.
    pub async fn eligible_on(&self, seeker: UserId, day: NaiveDate) -> Result<Vec<Profile>> {
        let seeker = self
            .profiles
            .get(seeker)
            .await?
            .ok_or_else(|| MatchingError::NotFound(format!("profile {seeker}")))?;

        let pool = self.profiles.find_active().await?;

        let mut exclusions: HashSet<UserId> = self.swipes.swiped_user_ids(seeker.id).await?;
        exclusions.extend(self.safety.exclusions_for(seeker.id).await?);

        let candidates = self.finder.find_candidates(&seeker, pool, &exclusions, day);
        info!(
            seeker = %seeker.id,
            candidates = candidates.len(),
            "discovery batch assembled"
        );
        Ok(candidates)
    }
}
