use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::MatchingError;

pub type UserId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Woman,
    Man,
    NonBinary,
}

/// Profile lifecycle. `Banned` is one-way: no transition leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    Incomplete,
    Active,
    Paused,
    Banned,
}

impl ProfileState {
    /// Transition table: `from-state x requested-state -> permitted`.
    pub fn can_transition(self, to: ProfileState) -> bool {
        use ProfileState::*;
        match self {
            Incomplete => matches!(to, Active | Banned),
            Active => matches!(to, Paused | Banned),
            Paused => matches!(to, Active | Banned),
            Banned => false,
        }
    }
}

/// Geographic coordinates in degrees. Absence on a profile means the
/// location is unknown, never (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoking {
    Never,
    Sometimes,
    Regularly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drinking {
    Never,
    Socially,
    Regularly,
}

/// Stance on having children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KidsStance {
    No,
    Open,
    Someday,
    HasKids,
}

impl KidsStance {
    /// `Open` pairs with everything; `Someday` and `HasKids` pair with each
    /// other (mixed families).
    pub fn compatible_with(self, other: KidsStance) -> bool {
        if self == other {
            return true;
        }
        if self == KidsStance::Open || other == KidsStance::Open {
            return true;
        }
        matches!(
            (self, other),
            (KidsStance::Someday, KidsStance::HasKids) | (KidsStance::HasKids, KidsStance::Someday)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipGoal {
    Casual,
    ShortTerm,
    LongTerm,
    Marriage,
    Unsure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Education {
    HighSchool,
    SomeCollege,
    Bachelors,
    Masters,
    Doctorate,
    TradeSchool,
    Other,
}

/// Lifestyle attributes. `None` means the user has not filled the field in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifestyle {
    pub smoking: Option<Smoking>,
    pub drinking: Option<Drinking>,
    pub kids: Option<KidsStance>,
    pub goal: Option<RelationshipGoal>,
    pub education: Option<Education>,
    pub height_cm: Option<u16>,
}

/// Interest tags selectable on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interest {
    Hiking,
    Camping,
    Cycling,
    Running,
    Climbing,
    Movies,
    Music,
    Concerts,
    Theater,
    Photography,
    Reading,
    Writing,
    Cooking,
    Baking,
    Wine,
    Coffee,
    Foodie,
    Gym,
    Yoga,
    Tennis,
    Swimming,
    VideoGames,
    BoardGames,
    Podcasts,
    Travel,
    Dancing,
    Volunteering,
    Pets,
    Nightlife,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingCadence {
    Rarely,
    Often,
    Constantly,
    NoPreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeToFirstDate {
    Quickly,
    FewDays,
    Weeks,
    Months,
    NoPreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    TextOnly,
    VoiceNotes,
    VideoCalls,
    InPersonOnly,
    MixOfEverything,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationDepth {
    SmallTalk,
    DeepChat,
    Existential,
    DependsOnVibe,
}

/// Dating-pace preferences across four dimensions. A profile either sets all
/// four or none (`Option<PacePreferences>` on [`Profile`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacePreferences {
    pub messaging: MessagingCadence,
    pub first_date: TimeToFirstDate,
    pub style: CommunicationStyle,
    pub depth: ConversationDepth,
}

/// Hard filters. An empty set means "ignore this attribute"; a non-empty set
/// means the candidate's value must be in it. Candidates missing an attribute
/// fail any active dealbreaker on it.
///
/// Dealbreakers are one-way: they restrict who the owner sees, not who sees
/// the owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dealbreakers {
    #[serde(default)]
    pub smoking: BTreeSet<Smoking>,
    #[serde(default)]
    pub drinking: BTreeSet<Drinking>,
    #[serde(default)]
    pub kids: BTreeSet<KidsStance>,
    #[serde(default)]
    pub goals: BTreeSet<RelationshipGoal>,
    #[serde(default)]
    pub education: BTreeSet<Education>,
    #[serde(default)]
    pub min_height_cm: Option<u16>,
    #[serde(default)]
    pub max_height_cm: Option<u16>,
    #[serde(default)]
    pub max_age_gap: Option<u32>,
}

impl Dealbreakers {
    /// No dealbreakers: accepts everyone.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_any(&self) -> bool {
        !self.smoking.is_empty()
            || !self.drinking.is_empty()
            || !self.kids.is_empty()
            || !self.goals.is_empty()
            || !self.education.is_empty()
            || self.min_height_cm.is_some()
            || self.max_height_cm.is_some()
            || self.max_age_gap.is_some()
    }
}

/// A user profile as the matching engine sees it. Owned by the profile
/// subsystem; this crate reads it and never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    /// Genders the user wants to see. Empty means interested in nobody —
    /// never "no preference".
    #[serde(default)]
    pub interested_in: BTreeSet<Gender>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    pub max_distance_km: u32,
    pub min_age: u32,
    pub max_age: u32,
    #[serde(default)]
    pub interests: BTreeSet<Interest>,
    #[serde(default)]
    pub lifestyle: Lifestyle,
    #[serde(default)]
    pub dealbreakers: Dealbreakers,
    #[serde(default)]
    pub pace: Option<PacePreferences>,
    #[serde(default)]
    pub verified: bool,
    pub state: ProfileState,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.state == ProfileState::Active
    }

    /// Age in whole years on the given date; 0 if the birth date lies in the
    /// future.
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        date.years_since(self.birth_date).unwrap_or(0)
    }

    /// Apply a lifecycle transition, rejecting moves the table forbids.
    pub fn transition(&mut self, to: ProfileState) -> Result<(), MatchingError> {
        if !self.state.can_transition(to) {
            return Err(MatchingError::State(format!(
                "profile cannot move from {:?} to {:?}",
                self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }

    /// Fraction of profile sections filled in, 0.0 to 1.0. Feeds the
    /// standout composite.
    pub fn completeness(&self) -> f64 {
        let signals = [
            self.location.is_some(),
            self.interests.len() >= 3,
            self.lifestyle.smoking.is_some(),
            self.lifestyle.drinking.is_some(),
            self.lifestyle.kids.is_some(),
            self.lifestyle.goal.is_some(),
            self.pace.is_some(),
            self.verified,
        ];
        let filled = signals.iter().filter(|s| **s).count();
        filled as f64 / signals.len() as f64
    }
}
