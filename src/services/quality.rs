use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::config::MatchingConfig;
use crate::core::distance::distance_between;
use crate::core::scoring::{
    self, MatchQuality, ScoreComponents,
};
use crate::error::{MatchingError, Result};
use crate::models::{Profile, UserId};
use crate::storage::{ProfileStore, SwipeStore};

/// Computes the compatibility of a pair from one user's perspective, e.g.
/// to render a match-quality badge.
pub struct CompatibilityService {
    profiles: Arc<dyn ProfileStore>,
    swipes: Arc<dyn SwipeStore>,
    config: MatchingConfig,
    clock: Arc<dyn Clock>,
}

impl CompatibilityService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        swipes: Arc<dyn SwipeStore>,
        config: MatchingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            swipes,
            config,
            clock,
        }
    }

    /// Score the pair from `perspective`'s side. Fails closed with NotFound
    /// when either profile cannot be resolved (e.g. deleted concurrently).
    pub async fn score(&self, perspective: UserId, other: UserId) -> Result<MatchQuality> {
        if perspective == other {
            return Err(MatchingError::Validation(
                "cannot score a user against themselves".into(),
            ));
        }

        let me = self.require(perspective).await?;
        let them = self.require(other).await?;

        let now = self.clock.now();
        let today = now.date_naive();

        let distance_km = distance_between(&me, &them);
        let time_between_likes = self.time_between_likes(perspective, other).await?;

        let components = ScoreComponents {
            distance: scoring::distance_score(distance_km, me.max_distance_km),
            age: scoring::age_score(&me, &them, today, self.config.recommendation.similar_age_years),
            interests: scoring::interest_score(&me.interests, &them.interests),
            lifestyle: scoring::lifestyle_score(&me.lifestyle, &them.lifestyle),
            pace: scoring::pace_score(me.pace.as_ref(), them.pace.as_ref()),
            response: scoring::response_score(time_between_likes),
        };
        let overall = components.overall(&self.config.scoring);

        let shared = scoring::shared_interests(&me.interests, &them.interests);
        let age_difference = me.age_on(today).abs_diff(them.age_on(today));
        let highlights = self.highlights(
            &me,
            &them,
            distance_km,
            shared.len(),
            age_difference,
            time_between_likes,
        );

        debug!(perspective = %perspective, other = %other, overall, "compatibility computed");

        Ok(MatchQuality {
            perspective,
            other,
            computed_at: now,
            components,
            overall,
            distance_km,
            age_difference,
            shared_interests: shared,
            time_between_likes_secs: time_between_likes.map(|d| d.num_seconds()),
            highlights,
        })
    }

    /// Elapsed time between the two mutual likes, if both exist.
    async fn time_between_likes(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<chrono::Duration>> {
        let mine = self.swipes.get(a, b).await?;
        let theirs = self.swipes.get(b, a).await?;
        match (mine, theirs) {
            (Some(x), Some(y)) if x.is_like() && y.is_like() => {
                Ok(Some((x.created_at - y.created_at).abs()))
            }
            _ => Ok(None),
        }
    }

    fn highlights(
        &self,
        me: &Profile,
        them: &Profile,
        distance_km: Option<f64>,
        shared_count: usize,
        age_difference: u32,
        time_between_likes: Option<chrono::Duration>,
    ) -> Vec<String> {
        let rec = &self.config.recommendation;
        let mut highlights = Vec::new();

        if let Some(distance) = distance_km {
            if distance < rec.nearby_distance_km {
                highlights.push(format!("Lives nearby ({distance:.1} km away)"));
            } else if distance < rec.close_distance_km {
                highlights.push(format!("{distance:.0} km away"));
            }
        }

        if shared_count >= rec.min_shared_interests {
            highlights.push(format!("You share {shared_count} interests"));
        } else if shared_count >= 1 {
            highlights.push("Shared interests".to_string());
        }

        if let (Some(mine), Some(theirs)) = (me.lifestyle.kids, them.lifestyle.kids) {
            if mine == theirs {
                highlights.push("Same stance on kids".to_string());
            } else if mine.compatible_with(theirs) {
                highlights.push("Compatible on kids".to_string());
            }
        }
        if let (Some(mine), Some(theirs)) = (me.lifestyle.goal, them.lifestyle.goal) {
            if mine == theirs {
                highlights.push("Same relationship goals".to_string());
            }
        }

        if let Some(elapsed) = time_between_likes {
            if elapsed.num_hours() < 24 {
                highlights.push("Quick mutual interest!".to_string());
            }
        }

        if age_difference <= rec.similar_age_years {
            highlights.push("Similar age".to_string());
        }

        highlights.truncate(5);
        highlights
    }

    async fn require(&self, id: UserId) -> Result<Profile> {
        self.profiles
            .get(id)
            .await?
            .ok_or_else(|| MatchingError::NotFound(format!("profile {id}")))
    }
}
