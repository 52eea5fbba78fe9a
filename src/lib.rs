//! Ember Match - matching engine for the Ember dating app
//!
//! This library turns a pool of profiles into ranked candidates, records
//! swipe decisions, creates and retires matches, scores match quality,
//! selects deterministic daily recommendations, and supports a short-lived
//! undo of the last swipe. Persistence and presentation stay behind injected
//! collaborator interfaces.

pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::MatchingConfig;
pub use crate::core::{distance::haversine_distance, finder::CandidateFinder, scoring::MatchQuality};
pub use crate::error::{MatchingError, Result, StorageError};
pub use crate::models::{Match, MatchState, Profile, ProfileState, Swipe, SwipeDirection};
pub use crate::services::{
    CompatibilityService, DiscoveryService, MatchingService, RecommendationService, SwipeOutcome,
    TrustSafetyService, UndoOutcome, UndoService,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_exports_work() {
        let d = haversine_distance(40.7128, -74.0060, 40.7128, -74.0060);
        assert!(d < 0.01);
        assert!(MatchingConfig::default().validate().is_ok());
    }
}
