use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::UserId;
use crate::error::MatchingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Like,
    Pass,
}

/// A recorded swipe decision. Unique per ordered (actor, target) pair; a
/// later swipe on the same pair supersedes the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swipe {
    pub id: Uuid,
    pub actor: UserId,
    pub target: UserId,
    pub direction: SwipeDirection,
    pub created_at: DateTime<Utc>,
}

impl Swipe {
    pub fn new(actor: UserId, target: UserId, direction: SwipeDirection, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor,
            target,
            direction,
            created_at: at,
        }
    }

    pub fn is_like(&self) -> bool {
        self.direction == SwipeDirection::Like
    }
}

/// Current state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    Active,
    Friends,
    Unmatched,
    GracefulExit,
    Blocked,
}

impl MatchState {
    /// Transition table. Active and Friends convert into each other; the
    /// remaining states are terminal.
    pub fn can_transition(self, to: MatchState) -> bool {
        use MatchState::*;
        match self {
            Active => matches!(to, Friends | Unmatched | GracefulExit | Blocked),
            Friends => matches!(to, Active | Unmatched | GracefulExit | Blocked),
            Unmatched | GracefulExit | Blocked => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchState::Unmatched | MatchState::GracefulExit | MatchState::Blocked
        )
    }
}

/// Why a match ended. Kept separately from the state for history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Unmatch,
    GracefulExit,
    Block,
}

/// A match between two users who mutually liked each other.
///
/// The id is deterministic: the two user uuids sorted and joined, so both
/// participants and any retry compute the same identity. `user_a` is always
/// the smaller uuid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub user_a: UserId,
    pub user_b: UserId,
    pub created_at: DateTime<Utc>,
    pub state: MatchState,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_by: Option<UserId>,
    pub end_reason: Option<EndReason>,
}

impl Match {
    /// Deterministic id for an unordered user pair; argument order is
    /// irrelevant.
    pub fn pair_id(a: UserId, b: UserId) -> String {
        if a <= b {
            format!("{a}_{b}")
        } else {
            format!("{b}_{a}")
        }
    }

    /// New active match with the canonical user ordering.
    pub fn new(a: UserId, b: UserId, at: DateTime<Utc>) -> Result<Self, MatchingError> {
        if a == b {
            return Err(MatchingError::Validation("cannot match with yourself".into()));
        }
        let (user_a, user_b) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self {
            id: Self::pair_id(a, b),
            user_a,
            user_b,
            created_at: at,
            state: MatchState::Active,
            ended_at: None,
            ended_by: None,
            end_reason: None,
        })
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.user_a == user || self.user_b == user
    }

    pub fn other_user(&self, user: UserId) -> Option<UserId> {
        if self.user_a == user {
            Some(self.user_b)
        } else if self.user_b == user {
            Some(self.user_a)
        } else {
            None
        }
    }

    pub fn is_live(&self) -> bool {
        !self.state.is_terminal()
    }

    /// One user ended the match.
    pub fn unmatch(&mut self, initiator: UserId, at: DateTime<Utc>) -> Result<(), MatchingError> {
        self.end(MatchState::Unmatched, EndReason::Unmatch, initiator, at)
    }

    /// One user ended the match kindly.
    pub fn graceful_exit(&mut self, initiator: UserId, at: DateTime<Utc>) -> Result<(), MatchingError> {
        self.end(MatchState::GracefulExit, EndReason::GracefulExit, initiator, at)
    }

    /// One user blocked the other.
    pub fn block(&mut self, initiator: UserId, at: DateTime<Utc>) -> Result<(), MatchingError> {
        self.end(MatchState::Blocked, EndReason::Block, initiator, at)
    }

    /// Mutual-consent move to a platonic connection. The relationship stays
    /// live, so no end metadata is written.
    pub fn to_friends(&mut self, initiator: UserId) -> Result<(), MatchingError> {
        self.guard(initiator, MatchState::Friends)?;
        self.state = MatchState::Friends;
        Ok(())
    }

    /// Mutual-consent move back from Friends to Active.
    pub fn rekindle(&mut self, initiator: UserId) -> Result<(), MatchingError> {
        self.guard(initiator, MatchState::Active)?;
        self.state = MatchState::Active;
        Ok(())
    }

    fn end(
        &mut self,
        to: MatchState,
        reason: EndReason,
        initiator: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), MatchingError> {
        self.guard(initiator, to)?;
        self.state = to;
        self.ended_at = Some(at);
        self.ended_by = Some(initiator);
        self.end_reason = Some(reason);
        Ok(())
    }

    fn guard(&self, initiator: UserId, to: MatchState) -> Result<(), MatchingError> {
        if !self.involves(initiator) {
            return Err(MatchingError::State(format!(
                "user {initiator} is not a participant of match {}",
                self.id
            )));
        }
        if !self.state.can_transition(to) {
            return Err(MatchingError::State(format!(
                "match {} cannot move from {:?} to {:?}",
                self.id, self.state, to
            )));
        }
        Ok(())
    }
}

/// Single-slot reversible swipe per actor. Recording a new one discards any
/// unexpired prior record; there is no undo chaining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoRecord {
    pub actor: UserId,
    pub swipe: Swipe,
    /// Match created by the recorded swipe, if any.
    pub match_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl UndoRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Deterministic "pick of the day" for a seeker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPick {
    pub seeker: UserId,
    pub candidate: UserId,
    pub day: NaiveDate,
    pub reason: String,
    /// Mutable view flag; not part of the deterministic computation.
    pub viewed: bool,
}

/// One entry of the ranked daily standout shortlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standout {
    pub seeker: UserId,
    pub candidate: UserId,
    pub day: NaiveDate,
    /// 1-based position in the list.
    pub rank: usize,
    /// Composite score, 0-100.
    pub score: u32,
    pub reason: String,
}
