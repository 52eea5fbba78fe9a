use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::UserId;

/// One user hiding another. Blocks are directional; the exclusion set treats
/// them symmetrically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub blocker: UserId,
    pub blocked: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    InappropriateContent,
    FakeProfile,
    Other,
}

/// A report filed against a user. Reporting implicitly blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub reporter: UserId,
    pub reported: UserId,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
