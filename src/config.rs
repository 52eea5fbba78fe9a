use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Weights must sum to 1.0 within this tolerance.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Engine configuration.
///
/// One validated value, passed by dependency injection at service
/// construction. Every tunable threshold lives here; nothing is hardcoded at
/// the call sites.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub standouts: StandoutWeights,
    #[serde(default)]
    pub limits: RateLimits,
    #[serde(default)]
    pub safety: SafetySettings,
    #[serde(default)]
    pub undo: UndoSettings,
    #[serde(default)]
    pub recommendation: RecommendationSettings,
}

/// Component weights for the compatibility score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_score_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_score_age_weight")]
    pub age: f64,
    #[serde(default = "default_score_interest_weight")]
    pub interests: f64,
    #[serde(default = "default_score_lifestyle_weight")]
    pub lifestyle: f64,
    #[serde(default = "default_score_pace_weight")]
    pub pace: f64,
    #[serde(default = "default_score_response_weight")]
    pub response: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.distance + self.age + self.interests + self.lifestyle + self.pace + self.response
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_weight_sum("scoring.weights", self.sum())?;
        validate_non_negative(
            "scoring.weights",
            &[
                self.distance,
                self.age,
                self.interests,
                self.lifestyle,
                self.pace,
                self.response,
            ],
        )
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: default_score_distance_weight(),
            age: default_score_age_weight(),
            interests: default_score_interest_weight(),
            lifestyle: default_score_lifestyle_weight(),
            pace: default_score_pace_weight(),
            response: default_score_response_weight(),
        }
    }
}

fn default_score_distance_weight() -> f64 {
    0.25
}
fn default_score_age_weight() -> f64 {
    0.15
}
fn default_score_interest_weight() -> f64 {
    0.20
}
fn default_score_lifestyle_weight() -> f64 {
    0.15
}
fn default_score_pace_weight() -> f64 {
    0.15
}
fn default_score_response_weight() -> f64 {
    0.10
}

/// Component weights for the standout composite. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StandoutWeights {
    #[serde(default = "default_standout_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_standout_age_weight")]
    pub age: f64,
    #[serde(default = "default_standout_interest_weight")]
    pub interests: f64,
    #[serde(default = "default_standout_lifestyle_weight")]
    pub lifestyle: f64,
    #[serde(default = "default_standout_completeness_weight")]
    pub completeness: f64,
    #[serde(default = "default_standout_activity_weight")]
    pub activity: f64,
}

impl StandoutWeights {
    pub fn sum(&self) -> f64 {
        self.distance
            + self.age
            + self.interests
            + self.lifestyle
            + self.completeness
            + self.activity
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_weight_sum("standouts.weights", self.sum())?;
        validate_non_negative(
            "standouts.weights",
            &[
                self.distance,
                self.age,
                self.interests,
                self.lifestyle,
                self.completeness,
                self.activity,
            ],
        )
    }
}

impl Default for StandoutWeights {
    fn default() -> Self {
        Self {
            distance: default_standout_distance_weight(),
            age: default_standout_age_weight(),
            interests: default_standout_interest_weight(),
            lifestyle: default_standout_lifestyle_weight(),
            completeness: default_standout_completeness_weight(),
            activity: default_standout_activity_weight(),
        }
    }
}

fn default_standout_distance_weight() -> f64 {
    0.20
}
fn default_standout_age_weight() -> f64 {
    0.15
}
fn default_standout_interest_weight() -> f64 {
    0.25
}
fn default_standout_lifestyle_weight() -> f64 {
    0.15
}
fn default_standout_completeness_weight() -> f64 {
    0.15
}
fn default_standout_activity_weight() -> f64 {
    0.10
}

/// Swipe budgets: a per-direction daily allowance and a per-minute velocity
/// ceiling, both checked before any swipe is recorded.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimits {
    #[serde(default = "default_daily_like_limit")]
    pub daily_like_limit: u32,
    #[serde(default = "default_daily_pass_limit")]
    pub daily_pass_limit: u32,
    #[serde(default = "default_swipes_per_minute")]
    pub swipes_per_minute: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            daily_like_limit: default_daily_like_limit(),
            daily_pass_limit: default_daily_pass_limit(),
            swipes_per_minute: default_swipes_per_minute(),
        }
    }
}

fn default_daily_like_limit() -> u32 {
    100
}
fn default_daily_pass_limit() -> u32 {
    250
}
fn default_swipes_per_minute() -> u32 {
    30
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SafetySettings {
    /// Distinct reporters required before an account is auto-banned.
    #[serde(default = "default_auto_ban_threshold")]
    pub auto_ban_threshold: u32,
    #[serde(default = "default_max_report_description_len")]
    pub max_report_description_len: usize,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            auto_ban_threshold: default_auto_ban_threshold(),
            max_report_description_len: default_max_report_description_len(),
        }
    }
}

fn default_auto_ban_threshold() -> u32 {
    3
}
fn default_max_report_description_len() -> usize {
    500
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UndoSettings {
    /// Seconds the most recent swipe stays reversible.
    #[serde(default = "default_undo_window_secs")]
    pub window_secs: u64,
}

impl Default for UndoSettings {
    fn default() -> Self {
        Self {
            window_secs: default_undo_window_secs(),
        }
    }
}

fn default_undo_window_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RecommendationSettings {
    #[serde(default = "default_nearby_distance_km")]
    pub nearby_distance_km: f64,
    #[serde(default = "default_close_distance_km")]
    pub close_distance_km: f64,
    /// Age gap (years) treated as "similar age" by scoring and reasons.
    #[serde(default = "default_similar_age_years")]
    pub similar_age_years: u32,
    #[serde(default = "default_compatible_age_years")]
    pub compatible_age_years: u32,
    #[serde(default = "default_min_shared_interests")]
    pub min_shared_interests: usize,
    #[serde(default = "default_standout_count")]
    pub standout_count: usize,
    /// Days a candidate stays off the standout list after appearing on it.
    #[serde(default = "default_standout_diversity_days")]
    pub standout_diversity_days: u32,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            nearby_distance_km: default_nearby_distance_km(),
            close_distance_km: default_close_distance_km(),
            similar_age_years: default_similar_age_years(),
            compatible_age_years: default_compatible_age_years(),
            min_shared_interests: default_min_shared_interests(),
            standout_count: default_standout_count(),
            standout_diversity_days: default_standout_diversity_days(),
        }
    }
}

fn default_nearby_distance_km() -> f64 {
    5.0
}
fn default_close_distance_km() -> f64 {
    10.0
}
fn default_similar_age_years() -> u32 {
    2
}
fn default_compatible_age_years() -> u32 {
    5
}
fn default_min_shared_interests() -> usize {
    3
}
fn default_standout_count() -> usize {
    10
}
fn default_standout_diversity_days() -> u32 {
    3
}

impl MatchingConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Sources, later overrides earlier:
    /// 1. Default values on the structs
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with EMBER__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("EMBER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from a custom path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder().add_source(File::from(path.as_ref())).build()?;

        let loaded: Self = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Eager validation, run once at construction. Rejects weight sets that
    /// do not sum to 1.0 and nonsensical limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.standouts.validate()?;

        if self.limits.daily_like_limit == 0 {
            return Err(ConfigError::Message(
                "limits.daily_like_limit must be positive".into(),
            ));
        }
        if self.limits.daily_pass_limit == 0 {
            return Err(ConfigError::Message(
                "limits.daily_pass_limit must be positive".into(),
            ));
        }
        if self.limits.swipes_per_minute == 0 {
            return Err(ConfigError::Message(
                "limits.swipes_per_minute must be positive".into(),
            ));
        }
        if self.undo.window_secs == 0 {
            return Err(ConfigError::Message("undo.window_secs must be positive".into()));
        }
        if self.safety.auto_ban_threshold == 0 {
            return Err(ConfigError::Message(
                "safety.auto_ban_threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn validate_weight_sum(section: &str, sum: f64) -> Result<(), ConfigError> {
    if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
        return Err(ConfigError::Message(format!(
            "{section} must sum to 1.0, got {sum}"
        )));
    }
    Ok(())
}

fn validate_non_negative(section: &str, weights: &[f64]) -> Result<(), ConfigError> {
    if weights.iter().any(|w| *w < 0.0) {
        return Err(ConfigError::Message(format!(
            "{section} must not contain negative weights"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MatchingConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.scoring.sum() - 1.0).abs() < WEIGHT_SUM_EPSILON);
        assert!((config.standouts.sum() - 1.0).abs() < WEIGHT_SUM_EPSILON);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = MatchingConfig::default();
        config.scoring.distance = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_weights() {
        let mut config = MatchingConfig::default();
        config.standouts.activity = -0.1;
        config.standouts.completeness = 0.35;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_undo_window() {
        let mut config = MatchingConfig::default();
        config.undo.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_thresholds() {
        let config = MatchingConfig::default();
        assert_eq!(config.safety.auto_ban_threshold, 3);
        assert_eq!(config.limits.daily_like_limit, 100);
        assert_eq!(config.undo.window_secs, 30);
    }
}
