use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::candidates::errors::EngineError;

/// Where normalization reads "today" from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    #[default]
    System,
    Fixed(NaiveDate),
}

impl DateSource {
    /// UTC calendar date, matching the ISO dates already in the stores.
    pub fn today(&self) -> NaiveDate {
        match self {
            DateSource::System => Utc::now().date_naive(),
            DateSource::Fixed(date) => *date,
        }
    }
}

/// Default values filled in by normalization.
///
/// The historical importers disagreed on the score range and on the casing
/// of the initial status, so both are configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsPolicy {
    /// Inclusive lower bound of the unscored default.
    pub score_min: i64,
    /// Inclusive upper bound of the unscored default.
    pub score_max: i64,
    pub default_status: String,
    pub placeholder_skill: String,
    /// Source tag for rows that carry none. `None` leaves the field unset.
    pub default_source: Option<String>,
    pub date_source: DateSource,
}

impl Default for DefaultsPolicy {
    fn default() -> Self {
        Self {
            score_min: 75,
            score_max: 94,
            default_status: "New".to_string(),
            placeholder_skill: "General".to_string(),
            default_source: None,
            date_source: DateSource::System,
        }
    }
}

impl DefaultsPolicy {
    /// Defaults used by the cloud-folder importer: wider score range and a
    /// lower-case status.
    pub fn drive_legacy() -> Self {
        Self {
            score_min: 70,
            score_max: 94,
            default_status: "new".to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.score_min > self.score_max {
            return Err(EngineError::InvalidPolicy(format!(
                "score_min ({}) is greater than score_max ({})",
                self.score_min, self.score_max
            )));
        }
        if self.default_status.trim().is_empty() {
            return Err(EngineError::InvalidPolicy(
                "default_status must not be blank".to_string(),
            ));
        }
        if self.placeholder_skill.trim().is_empty() {
            return Err(EngineError::InvalidPolicy(
                "placeholder_skill must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn draw_score<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let lo = self.score_min.min(self.score_max);
        let hi = self.score_min.max(self.score_max);
        rng.gen_range(lo..=hi)
    }

    pub fn today(&self) -> NaiveDate {
        self.date_source.today()
    }

    pub fn today_string(&self) -> String {
        self.today().format("%Y-%m-%d").to_string()
    }
}
