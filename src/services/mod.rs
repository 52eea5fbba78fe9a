// Service exports
pub mod discovery;
pub mod matching;
pub mod quality;
pub mod recommendation;
pub mod safety;
pub mod undo;

pub use discovery::DiscoveryService;
pub use matching::{MatchingService, PendingLiker, SwipeOutcome};
pub use quality::CompatibilityService;
pub use recommendation::{DailyStatus, RecommendationService};
pub use safety::{ReportOutcome, TrustSafetyService};
pub use undo::{UndoOutcome, UndoService};
