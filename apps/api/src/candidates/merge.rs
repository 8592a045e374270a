use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::candidates::errors::EngineError;
use crate::candidates::models::{json_kind, Candidate, CandidateId, MAX_ID};
use crate::candidates::normalize::NormalizedCandidate;

/// Counts produced by one merge. `added + updated + skipped` always equals
/// the number of incoming records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Pre-existing records folded into an earlier record with the same email.
    pub folded: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub candidates: Vec<Candidate>,
    pub report: MergeReport,
}

/// Upserts `incoming` into `existing` by case-insensitive email.
///
/// Existing records keep their relative order and ids; new records are
/// appended in incoming order with ids above every id seen so far. Within a
/// batch, a later record for the same email updates the earlier one.
///
/// Fails only when a new record would need an id above [`MAX_ID`].
pub fn merge(
    existing: Vec<Candidate>,
    incoming: Vec<NormalizedCandidate>,
) -> Result<MergeOutcome, EngineError> {
    let mut report = MergeReport::default();
    let mut next_id: CandidateId = existing
        .iter()
        .filter_map(|c| c.id)
        .max()
        .map_or(Some(1), |max| max.checked_add(1))
        .ok_or(EngineError::IdsExhausted)?;

    let mut candidates: Vec<Candidate> = Vec::with_capacity(existing.len() + incoming.len());
    let mut by_email: HashMap<String, usize> = HashMap::new();

    for record in existing {
        let Some(key) = record.email_key() else {
            candidates.push(record);
            continue;
        };
        match by_email.get(&key) {
            Some(&pos) => {
                warn!(
                    "Folding duplicate stored record {:?} into {:?} ({key})",
                    record.id, candidates[pos].id
                );
                candidates[pos].absorb(record);
                report.folded += 1;
            }
            None => {
                by_email.insert(key, candidates.len());
                candidates.push(record);
            }
        }
    }

    for normalized in incoming {
        let Some(key) = normalized.email_key() else {
            debug!(
                "Skipping '{}': no email",
                normalized.candidate().display_name()
            );
            report.skipped += 1;
            continue;
        };
        let mut record = normalized.into_inner();

        match by_email.get(&key) {
            Some(&pos) => {
                debug!("Updated: {}", record.display_name());
                candidates[pos].absorb(record);
                report.updated += 1;
            }
            None => {
                if next_id > MAX_ID {
                    return Err(EngineError::IdsExhausted);
                }
                let id = next_id;
                next_id += 1;
                record.id = Some(id);
                debug!("Added: {} (ID: {id})", record.display_name());
                by_email.insert(key, candidates.len());
                candidates.push(record);
                report.added += 1;
            }
        }
    }

    Ok(MergeOutcome { candidates, report })
}

/// Decodes a stored collection, failing fast on the first element that is
/// not a JSON object. Objects always decode; see [`Candidate::from_object`].
pub fn decode_existing(values: Vec<Value>) -> Result<Vec<Candidate>, EngineError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(fields) => Ok(Candidate::from_object(fields)),
            other => Err(EngineError::InvalidExisting {
                index,
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        })
        .collect()
}

/// [`merge`] over an untyped stored collection.
pub fn merge_values(
    existing: Vec<Value>,
    incoming: Vec<NormalizedCandidate>,
) -> Result<MergeOutcome, EngineError> {
    merge(decode_existing(existing)?, incoming)
}
