use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, trace};

use crate::candidates::csv::RawRow;
use crate::candidates::errors::EngineError;
use crate::candidates::models::{parse_score, split_skills, Candidate};
use crate::candidates::policy::DefaultsPolicy;

/// A candidate whose required fields (`aiScore`, `status`, `appliedDate`,
/// `skills`) are guaranteed present. Only this module can build one.
///
/// The email may still be blank; the merge counts such records as skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCandidate(Candidate);

impl NormalizedCandidate {
    pub fn candidate(&self) -> &Candidate {
        &self.0
    }

    pub fn into_inner(self) -> Candidate {
        self.0
    }

    pub fn email_key(&self) -> Option<String> {
        self.0.email_key()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Email,
    Phone,
    Position,
    Status,
    Skills,
    AppliedDate,
    AiScore,
    Source,
    Id,
}

const FIELD_COUNT: usize = 10;

/// Header spellings seen across the import scripts. Canonical names come
/// first so they win over an alias present on the same row.
const HEADER_ALIASES: &[(&str, Field)] = &[
    ("name", Field::Name),
    ("email", Field::Email),
    ("phone", Field::Phone),
    ("position", Field::Position),
    ("status", Field::Status),
    ("skills", Field::Skills),
    ("applieddate", Field::AppliedDate),
    ("aiscore", Field::AiScore),
    ("source", Field::Source),
    ("id", Field::Id),
    ("full name", Field::Name),
    ("candidate name", Field::Name),
    ("e-mail", Field::Email),
    ("email address", Field::Email),
    ("mobile", Field::Phone),
    ("phone number", Field::Phone),
    ("role", Field::Position),
    ("job title", Field::Position),
    ("skill", Field::Skills),
    ("applied_date", Field::AppliedDate),
    ("applied date", Field::AppliedDate),
    ("ai_score", Field::AiScore),
    ("ai score", Field::AiScore),
    ("score", Field::AiScore),
];

fn resolve_header(key: &str) -> Option<(usize, Field)> {
    let key = key.trim().to_lowercase();
    HEADER_ALIASES
        .iter()
        .position(|(alias, _)| *alias == key)
        .map(|rank| (rank, HEADER_ALIASES[rank].1))
}

/// Turns one raw source row into a candidate with every required field set.
///
/// Known columns are matched case-insensitively (aliases included); other
/// non-empty columns pass through under their original key. Empty cells
/// count as absent. An `id` column is dropped: ids belong to the merge.
pub fn normalize<R: Rng + ?Sized>(
    row: &RawRow,
    policy: &DefaultsPolicy,
    rng: &mut R,
) -> NormalizedCandidate {
    let mut chosen: [Option<(usize, &str)>; FIELD_COUNT] = [None; FIELD_COUNT];
    let mut candidate = Candidate::default();

    for (key, value) in row {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match resolve_header(key) {
            Some((rank, field)) => {
                let slot = &mut chosen[field as usize];
                if slot.map_or(true, |(best, _)| rank < best) {
                    *slot = Some((rank, value));
                }
            }
            None => {
                candidate
                    .extra
                    .insert(key.clone(), Value::String(value.to_string()));
            }
        }
    }

    for (rank, value) in chosen.into_iter().flatten() {
        apply_field(&mut candidate, HEADER_ALIASES[rank].1, value);
    }

    fill_defaults(candidate, policy, rng)
}

fn apply_field(candidate: &mut Candidate, field: Field, value: &str) {
    let text = Some(value.to_string());
    match field {
        Field::Name => candidate.name = text,
        Field::Email => candidate.email = text,
        Field::Phone => candidate.phone = text,
        Field::Position => candidate.position = text,
        Field::Status => candidate.status = text,
        Field::AppliedDate => candidate.applied_date = text,
        Field::Source => candidate.source = text,
        Field::Skills => {
            let skills = split_skills(value);
            if !skills.is_empty() {
                candidate.skills = Some(skills);
            }
        }
        Field::AiScore => match parse_score(value) {
            Some(score) => candidate.ai_score = Some(score),
            None => debug!("Ignoring non-numeric aiScore '{value}'; default will be used"),
        },
        Field::Id => trace!("Ignoring incoming id '{value}'"),
    }
}

/// Normalizes one record of a previously exported JSON collection.
///
/// Blank strings count as absent, like empty CSV cells, and a known field
/// whose value cannot be read falls back to its default. The record's `id`
/// is dropped. Fails only when `value` is not a JSON object.
pub fn normalize_value<R: Rng + ?Sized>(
    value: &Value,
    policy: &DefaultsPolicy,
    rng: &mut R,
) -> Result<NormalizedCandidate, EngineError> {
    let mut candidate = Candidate::from_value(value.clone())?;
    candidate.id = None;
    candidate.discard_unreadable();
    for slot in [
        &mut candidate.name,
        &mut candidate.email,
        &mut candidate.phone,
        &mut candidate.position,
        &mut candidate.status,
        &mut candidate.applied_date,
        &mut candidate.source,
    ] {
        if let Some(text) = slot.take() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                *slot = Some(trimmed.to_string());
            }
        }
    }
    Ok(fill_defaults(candidate, policy, rng))
}

fn fill_defaults<R: Rng + ?Sized>(
    mut candidate: Candidate,
    policy: &DefaultsPolicy,
    rng: &mut R,
) -> NormalizedCandidate {
    if candidate.ai_score.is_none() {
        candidate.ai_score = Some(policy.draw_score(rng));
    }
    if candidate.status.is_none() {
        candidate.status = Some(policy.default_status.clone());
    }
    if candidate.applied_date.is_none() {
        candidate.applied_date = Some(policy.today_string());
    }
    if candidate.skills.as_ref().map_or(true, Vec::is_empty) {
        candidate.skills = Some(vec![policy.placeholder_skill.clone()]);
    }
    if candidate.source.is_none() {
        candidate.source = policy.default_source.clone();
    }
    NormalizedCandidate(candidate)
}

/// A policy bundled with its own random source, for callers that normalize
/// many batches over time.
#[derive(Debug)]
pub struct Normalizer {
    policy: DefaultsPolicy,
    rng: StdRng,
}

impl Normalizer {
    pub fn new(policy: DefaultsPolicy) -> Result<Self, EngineError> {
        policy.validate()?;
        Ok(Self {
            policy,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reproducible default scores.
    pub fn seeded(policy: DefaultsPolicy, seed: u64) -> Result<Self, EngineError> {
        policy.validate()?;
        Ok(Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn policy(&self) -> &DefaultsPolicy {
        &self.policy
    }

    pub fn normalize(&mut self, row: &RawRow) -> NormalizedCandidate {
        normalize(row, &self.policy, &mut self.rng)
    }

    pub fn normalize_value(&mut self, value: &Value) -> Result<NormalizedCandidate, EngineError> {
        normalize_value(value, &self.policy, &mut self.rng)
    }
}
