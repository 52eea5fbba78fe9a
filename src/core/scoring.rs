use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::ScoringWeights;
use crate::models::{Interest, Lifestyle, PacePreferences, Profile, UserId};

/// Normalized [0, 1] sub-scores that feed the weighted overall score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub distance: f64,
    pub age: f64,
    pub interests: f64,
    pub lifestyle: f64,
    pub pace: f64,
    pub response: f64,
}

impl ScoreComponents {
    /// Weighted overall score, 0-100. Weights are validated to sum to 1.0 at
    /// configuration time, so the clamp only guards float rounding.
    pub fn overall(&self, weights: &ScoringWeights) -> u8 {
        let weighted = self.distance * weights.distance
            + self.age * weights.age
            + self.interests * weights.interests
            + self.lifestyle * weights.lifestyle
            + self.pace * weights.pace
            + self.response * weights.response;
        (weighted * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Compatibility of a pair, computed from one user's perspective (the
/// distance component uses that user's max distance, so perspectives can
/// differ slightly).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchQuality {
    pub perspective: UserId,
    pub other: UserId,
    pub computed_at: DateTime<Utc>,
    pub components: ScoreComponents,
    /// Overall score, 0-100.
    pub overall: u8,
    pub distance_km: Option<f64>,
    pub age_difference: u32,
    pub shared_interests: Vec<Interest>,
    pub time_between_likes_secs: Option<i64>,
    pub highlights: Vec<String>,
}

impl MatchQuality {
    /// Star rating, 1-5.
    pub fn star_rating(&self) -> u8 {
        match self.overall {
            90..=100 => 5,
            75..=89 => 4,
            60..=74 => 3,
            40..=59 => 2,
            _ => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.overall {
            90..=100 => "Excellent Match",
            75..=89 => "Great Match",
            60..=74 => "Good Match",
            40..=59 => "Fair Match",
            _ => "Low Compatibility",
        }
    }
}

/// Distance component: linear decay from 1.0 at zero distance to 0.0 at the
/// seeker's maximum. Unknown distance scores 1.0 rather than penalizing
/// missing location data.
#[inline]
pub fn distance_score(distance_km: Option<f64>, max_distance_km: u32) -> f64 {
    let Some(distance) = distance_km else {
        return 1.0;
    };
    let max = max_distance_km as f64;
    if max <= 0.0 {
        return 0.5;
    }
    if distance >= max {
        return 0.0;
    }
    1.0 - distance / max
}

/// Age component: 1.0 within the configured similar-age threshold, then
/// decaying over the average of the two stated age ranges.
pub fn age_score(a: &Profile, b: &Profile, today: NaiveDate, similar_age_years: u32) -> f64 {
    let diff = a.age_on(today).abs_diff(b.age_on(today));
    if diff <= similar_age_years {
        return 1.0;
    }

    let range_a = a.max_age.saturating_sub(a.min_age);
    let range_b = b.max_age.saturating_sub(b.min_age);
    let avg_range = (range_a + range_b) as f64 / 2.0;
    if avg_range <= 0.0 {
        return 0.5;
    }
    (1.0 - diff as f64 / avg_range).max(0.0)
}

/// Interest component: shared count over the smaller set, 0.0 when either
/// user listed no interests.
pub fn interest_score(a: &BTreeSet<Interest>, b: &BTreeSet<Interest>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / a.len().min(b.len()) as f64
}

pub fn shared_interests(a: &BTreeSet<Interest>, b: &BTreeSet<Interest>) -> Vec<Interest> {
    a.intersection(b).copied().collect()
}

/// Lifestyle component: fraction of mutually-filled attributes that are
/// compatible. Neutral 0.5 when nothing is comparable.
pub fn lifestyle_score(a: &Lifestyle, b: &Lifestyle) -> f64 {
    let mut comparable = 0u32;
    let mut matches = 0u32;

    if let (Some(x), Some(y)) = (a.smoking, b.smoking) {
        comparable += 1;
        if x == y {
            matches += 1;
        }
    }
    if let (Some(x), Some(y)) = (a.drinking, b.drinking) {
        comparable += 1;
        if x == y {
            matches += 1;
        }
    }
    if let (Some(x), Some(y)) = (a.kids, b.kids) {
        comparable += 1;
        if x.compatible_with(y) {
            matches += 1;
        }
    }
    if let (Some(x), Some(y)) = (a.goal, b.goal) {
        comparable += 1;
        if x == y {
            matches += 1;
        }
    }

    if comparable == 0 {
        return 0.5;
    }
    matches as f64 / comparable as f64
}

/// Pace component: fraction of the four dimensions that match exactly or
/// where either side is flexible. Neutral 0.5 when either user has not set
/// pace preferences.
pub fn pace_score(a: Option<&PacePreferences>, b: Option<&PacePreferences>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.5;
    };

    use crate::models::{CommunicationStyle, ConversationDepth, MessagingCadence, TimeToFirstDate};

    let mut aligned = 0u32;
    if a.messaging == b.messaging
        || a.messaging == MessagingCadence::NoPreference
        || b.messaging == MessagingCadence::NoPreference
    {
        aligned += 1;
    }
    if a.first_date == b.first_date
        || a.first_date == TimeToFirstDate::NoPreference
        || b.first_date == TimeToFirstDate::NoPreference
    {
        aligned += 1;
    }
    if a.style == b.style
        || a.style == CommunicationStyle::MixOfEverything
        || b.style == CommunicationStyle::MixOfEverything
    {
        aligned += 1;
    }
    if a.depth == b.depth
        || a.depth == ConversationDepth::DependsOnVibe
        || b.depth == ConversationDepth::DependsOnVibe
    {
        aligned += 1;
    }

    aligned as f64 / 4.0
}

/// Response component: tiered by how quickly the mutual like closed.
/// Unknown (no mutual likes yet) is neutral.
pub fn response_score(time_between_likes: Option<Duration>) -> f64 {
    let Some(elapsed) = time_between_likes else {
        return 0.5;
    };
    let hours = elapsed.num_hours();
    if hours < 1 {
        1.0
    } else if hours < 24 {
        0.9
    } else if hours < 72 {
        0.7
    } else if hours < 168 {
        0.5
    } else if hours < 720 {
        0.3
    } else {
        0.1
    }
}

/// Activity-recency component for standouts, tiered on time since the
/// profile was last touched.
pub fn activity_score(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - updated_at).num_hours();
    if hours < 1 {
        1.0
    } else if hours < 24 {
        0.9
    } else if hours < 72 {
        0.7
    } else if hours < 168 {
        0.5
    } else if hours < 720 {
        0.3
    } else {
        0.1
    }
}
