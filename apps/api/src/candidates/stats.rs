use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::candidates::models::Candidate;

/// Score at or above which a candidate counts as a top match.
pub const TOP_MATCH_THRESHOLD: i64 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStats {
    pub total: usize,
    /// Rounded mean; candidates without a score count as 0.
    pub average_ai_score: i64,
    pub top_matches: usize,
    pub new_today: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
}

pub fn compute_stats(candidates: &[Candidate], today: NaiveDate) -> CandidateStats {
    let total = candidates.len();
    let score_sum: i64 = candidates.iter().map(|c| c.ai_score.unwrap_or(0)).sum();
    let average_ai_score = if total > 0 {
        (score_sum as f64 / total as f64).round() as i64
    } else {
        0
    };

    let top_matches = candidates
        .iter()
        .filter(|c| c.ai_score.unwrap_or(0) >= TOP_MATCH_THRESHOLD)
        .count();

    let today = today.format("%Y-%m-%d").to_string();
    let new_today = candidates
        .iter()
        .filter(|c| {
            c.applied_date
                .as_deref()
                .is_some_and(|d| d.starts_with(&today))
        })
        .count();

    let mut by_status = BTreeMap::new();
    let mut by_source = BTreeMap::new();
    for c in candidates {
        let status = c.status.as_deref().unwrap_or("New").to_string();
        *by_status.entry(status).or_insert(0) += 1;
        let source = c.source.as_deref().unwrap_or("Unknown").to_string();
        *by_source.entry(source).or_insert(0) += 1;
    }

    CandidateStats {
        total,
        average_ai_score,
        top_matches,
        new_today,
        by_status,
        by_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(score: Option<i64>, status: Option<&str>, date: Option<&str>) -> Candidate {
        Candidate {
            ai_score: score,
            status: status.map(String::from),
            applied_date: date.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_collection() {
        let stats = compute_stats(&[], NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_ai_score, 0);
        assert!(stats.by_status.is_empty());
    }

    #[test]
    fn test_counts_and_average() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        let all = vec![
            candidate(Some(82), Some("Rejected"), Some("2025-12-20")),
            candidate(Some(90), Some("New"), Some("2025-12-21")),
            candidate(Some(92), None, Some("2025-12-21T09:30:00.000Z")),
            candidate(None, Some("New"), None),
        ];
        let stats = compute_stats(&all, today);
        assert_eq!(stats.total, 4);
        // (82 + 90 + 92 + 0) / 4 = 66
        assert_eq!(stats.average_ai_score, 66);
        assert_eq!(stats.top_matches, 2);
        assert_eq!(stats.new_today, 2);
        assert_eq!(stats.by_status["New"], 3);
        assert_eq!(stats.by_status["Rejected"], 1);
        assert_eq!(stats.by_source["Unknown"], 4);
    }
}
