use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

use crate::core::distance::distance_between;
use crate::core::filters::{
    mutual_age_preference, mutual_gender_interest, passes_dealbreakers, within_distance,
};
use crate::models::{Profile, UserId};

/// Discovery pipeline: narrows a profile pool down to eligible candidates
/// and ranks them by distance.
///
/// # Pipeline stages (each strictly narrows the set)
/// 1. Exclude the seeker itself
/// 2. Keep only Active profiles
/// 3. Exclude already swiped / blocked / reported ids
/// 4. Mutual gender interest, both ways
/// 5. Mutual age preference, both ways
/// 6. Distance within the seeker's maximum (skipped per-pair when either
///    location is unknown)
/// 7. Dealbreakers
///
/// Pure over its inputs; safe to invoke from any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateFinder;

impl CandidateFinder {
    pub fn new() -> Self {
        Self
    }

    /// Run the pipeline over a fresh pool. An empty result is a valid
    /// outcome, not an error.
    ///
    /// Ranking is ascending by distance; candidates with unknown distance
    /// sort last, with the candidate id as the deterministic tie-break.
    pub fn find_candidates(
        &self,
        seeker: &Profile,
        pool: Vec<Profile>,
        exclusions: &HashSet<UserId>,
        today: NaiveDate,
    ) -> Vec<Profile> {
        let pool_size = pool.len();

        let mut ranked: Vec<(Option<f64>, Profile)> = pool
            .into_iter()
            .filter(|candidate| candidate.id != seeker.id)
            .filter(|candidate| candidate.is_active())
            .filter(|candidate| !exclusions.contains(&candidate.id))
            .filter(|candidate| mutual_gender_interest(seeker, candidate))
            .filter(|candidate| mutual_age_preference(seeker, candidate, today))
            .filter(|candidate| within_distance(seeker, candidate))
            .filter(|candidate| passes_dealbreakers(seeker, candidate, today))
            .map(|candidate| (distance_between(seeker, &candidate), candidate))
            .collect();

        ranked.sort_by(|(da, a), (db, b)| match (da, db) {
            (Some(x), Some(y)) => x
                .partial_cmp(y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });

        let candidates: Vec<Profile> = ranked.into_iter().map(|(_, profile)| profile).collect();

        debug!(
            seeker = %seeker.id,
            pool = pool_size,
            excluded = exclusions.len(),
            found = candidates.len(),
            "candidate pipeline complete"
        );

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dealbreakers, Gender, GeoPoint, Lifestyle, ProfileState};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn candidate(lat_offset: f64) -> Profile {
        let mut profile = seeker();
        profile.id = Uuid::new_v4();
        profile.gender = Gender::Man;
        profile.interested_in = BTreeSet::from([Gender::Woman]);
        profile.location = Some(GeoPoint {
            latitude: 40.7128 + lat_offset,
            longitude: -74.0060,
        });
        profile
    }

    fn seeker() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: "Seeker".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1995, 1, 1).unwrap(),
            gender: Gender::Woman,
            interested_in: BTreeSet::from([Gender::Man]),
            location: Some(GeoPoint {
                latitude: 40.7128,
                longitude: -74.0060,
            }),
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

    #[test]
    fn filters_self_inactive_and_excluded() {
        let finder = CandidateFinder::new();
        let seeker = seeker();

        let mut inactive = candidate(0.01);
        inactive.state = ProfileState::Paused;
        let excluded = candidate(0.01);
        let ok = candidate(0.01);

        let exclusions = HashSet::from([excluded.id]);
        let pool = vec![seeker.clone(), inactive, excluded, ok.clone()];
        let result = finder.find_candidates(&seeker, pool, &exclusions, today());

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, ok.id);
    }

    #[test]
    fn ranks_by_distance_with_unknown_last() {
        let finder = CandidateFinder::new();
        let seeker = seeker();

        // ~0.045 degrees latitude is ~5 km, ~0.072 is ~8 km
        let near = candidate(0.045);
        let far = candidate(0.072);
        let mut unknown = candidate(0.0);
        unknown.location = None;

        let pool = vec![far.clone(), unknown.clone(), near.clone()];
        let result = finder.find_candidates(&seeker, pool, &HashSet::new(), today());

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].id, near.id);
        assert_eq!(result[1].id, far.id);
        assert_eq!(result[2].id, unknown.id);
    }

    #[test]
    fn empty_pool_is_valid_output() {
        let finder = CandidateFinder::new();
        let seeker = seeker();
        let result = finder.find_candidates(&seeker, Vec::new(), &HashSet::new(), today());
        assert!(result.is_empty());
    }

    #[test]
    fn missing_location_does_not_empty_the_result() {
        let finder = CandidateFinder::new();
        let mut seeker = seeker();
        seeker.location = None;

        let pool = vec![candidate(5.0)]; // would be far out of range if measured
        let result = finder.find_candidates(&seeker, pool, &HashSet::new(), today());
        assert_eq!(result.len(), 1);
    }
}
