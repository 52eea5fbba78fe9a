use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::core::distance::distance_between;
use crate::models::{Dealbreakers, Profile};

/// Check that gender interest is satisfied both ways: the seeker wants the
/// candidate's gender AND the candidate wants the seeker's gender.
///
/// An empty interest set means "interested in nobody", so nothing passes.
#[inline]
pub fn mutual_gender_interest(seeker: &Profile, candidate: &Profile) -> bool {
    seeker.interested_in.contains(&candidate.gender)
        && candidate.interested_in.contains(&seeker.gender)
}

/// Check that each party's age falls inside the other's stated range.
#[inline]
pub fn mutual_age_preference(seeker: &Profile, candidate: &Profile, today: NaiveDate) -> bool {
    let seeker_age = seeker.age_on(today);
    let candidate_age = candidate.age_on(today);
    if seeker_age == 0 || candidate_age == 0 {
        // Missing or future birth date
        return false;
    }

    let candidate_in_seeker_range =
        candidate_age >= seeker.min_age && candidate_age <= seeker.max_age;
    let seeker_in_candidate_range =
        seeker_age >= candidate.min_age && seeker_age <= candidate.max_age;

    candidate_in_seeker_range && seeker_in_candidate_range
}

/// Distance filter against the seeker's maximum. Pairs where either party
/// lacks a known location skip the filter rather than being excluded.
#[inline]
pub fn within_distance(seeker: &Profile, candidate: &Profile) -> bool {
    match distance_between(seeker, candidate) {
        Some(distance) => distance <= seeker.max_distance_km as f64,
        None => true,
    }
}

/// Evaluate the seeker's dealbreakers against a candidate.
///
/// A candidate who has not filled in an attribute fails any active
/// dealbreaker on it.
pub fn passes_dealbreakers(seeker: &Profile, candidate: &Profile, today: NaiveDate) -> bool {
    let db = &seeker.dealbreakers;
    if !db.has_any() {
        return true;
    }

    acceptable(candidate.lifestyle.smoking, &db.smoking)
        && acceptable(candidate.lifestyle.drinking, &db.drinking)
        && acceptable(candidate.lifestyle.kids, &db.kids)
        && acceptable(candidate.lifestyle.goal, &db.goals)
        && acceptable(candidate.lifestyle.education, &db.education)
        && passes_height(db, candidate)
        && passes_age_gap(db, seeker, candidate, today)
}

/// Set-containment check: an empty set means the attribute is ignored.
#[inline]
fn acceptable<T: Ord + Copy>(value: Option<T>, allowed: &BTreeSet<T>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    matches!(value, Some(v) if allowed.contains(&v))
}

fn passes_height(db: &Dealbreakers, candidate: &Profile) -> bool {
    if db.min_height_cm.is_none() && db.max_height_cm.is_none() {
        return true;
    }
    let Some(height) = candidate.lifestyle.height_cm else {
        return false;
    };
    if let Some(min) = db.min_height_cm {
        if height < min {
            return false;
        }
    }
    match db.max_height_cm {
        Some(max) => height <= max,
        None => true,
    }
}

fn passes_age_gap(db: &Dealbreakers, seeker: &Profile, candidate: &Profile, today: NaiveDate) -> bool {
    let Some(max_gap) = db.max_age_gap else {
        return true;
    };
    let seeker_age = seeker.age_on(today);
    let candidate_age = candidate.age_on(today);
    if seeker_age == 0 || candidate_age == 0 {
        return true;
    }
    seeker_age.abs_diff(candidate_age) <= max_gap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, GeoPoint, Lifestyle, ProfileState, Smoking};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn profile(gender: Gender, interested: &[Gender], birth_year: i32) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            birth_date: NaiveDate::from_ymd_opt(birth_year, 1, 1).unwrap(),
            gender,
            interested_in: interested.iter().copied().collect(),
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
    fn gender_interest_must_hold_both_ways() {
        let seeker = profile(Gender::Woman, &[Gender::Man], 1995);
        let candidate = profile(Gender::Man, &[Gender::Woman], 1994);
        assert!(mutual_gender_interest(&seeker, &candidate));

        let uninterested = profile(Gender::Man, &[Gender::Man], 1994);
        assert!(!mutual_gender_interest(&seeker, &uninterested));
    }

    #[test]
    fn empty_interest_set_matches_nobody() {
        let seeker = profile(Gender::Woman, &[], 1995);
        let candidate = profile(Gender::Man, &[Gender::Woman], 1994);
        assert!(!mutual_gender_interest(&seeker, &candidate));
    }

    #[test]
    fn age_preference_must_hold_both_ways() {
        let seeker = profile(Gender::Woman, &[Gender::Man], 1995);
        let candidate = profile(Gender::Man, &[Gender::Woman], 1994);
        assert!(mutual_age_preference(&seeker, &candidate, today()));

        let mut narrow = profile(Gender::Man, &[Gender::Woman], 1994);
        narrow.min_age = 35;
        assert!(!mutual_age_preference(&seeker, &narrow, today()));
    }

    #[test]
    fn missing_location_skips_distance_filter() {
        let seeker = profile(Gender::Woman, &[Gender::Man], 1995);
        let mut far_without_location = profile(Gender::Man, &[Gender::Woman], 1994);
        far_without_location.location = None;
        assert!(within_distance(&seeker, &far_without_location));

        let mut too_far = profile(Gender::Man, &[Gender::Woman], 1994);
        too_far.location = Some(GeoPoint {
            latitude: 34.0522,
            longitude: -118.2437,
        });
        assert!(!within_distance(&seeker, &too_far));
    }

    #[test]
    fn dealbreaker_rejects_missing_attribute() {
        let mut seeker = profile(Gender::Woman, &[Gender::Man], 1995);
        seeker.dealbreakers.smoking = BTreeSet::from([Smoking::Never]);

        let unfilled = profile(Gender::Man, &[Gender::Woman], 1994);
        assert!(!passes_dealbreakers(&seeker, &unfilled, today()));

        let mut smoker = profile(Gender::Man, &[Gender::Woman], 1994);
        smoker.lifestyle.smoking = Some(Smoking::Regularly);
        assert!(!passes_dealbreakers(&seeker, &smoker, today()));

        let mut non_smoker = profile(Gender::Man, &[Gender::Woman], 1994);
        non_smoker.lifestyle.smoking = Some(Smoking::Never);
        assert!(passes_dealbreakers(&seeker, &non_smoker, today()));
    }

    #[test]
    fn height_dealbreaker_uses_bounds() {
        let mut seeker = profile(Gender::Woman, &[Gender::Man], 1995);
        seeker.dealbreakers.min_height_cm = Some(170);
        seeker.dealbreakers.max_height_cm = Some(190);

        let mut short = profile(Gender::Man, &[Gender::Woman], 1994);
        short.lifestyle.height_cm = Some(165);
        assert!(!passes_dealbreakers(&seeker, &short, today()));

        let mut fits = profile(Gender::Man, &[Gender::Woman], 1994);
        fits.lifestyle.height_cm = Some(180);
        assert!(passes_dealbreakers(&seeker, &fits, today()));
    }

    #[test]
    fn age_gap_dealbreaker() {
        let mut seeker = profile(Gender::Woman, &[Gender::Man], 1995);
        seeker.dealbreakers.max_age_gap = Some(3);

        let close = profile(Gender::Man, &[Gender::Woman], 1993);
        assert!(passes_dealbreakers(&seeker, &close, today()));

        let wide = profile(Gender::Man, &[Gender::Woman], 1985);
        assert!(!passes_dealbreakers(&seeker, &wide, today()));
    }
}
