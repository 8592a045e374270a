use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::candidates::errors::EngineError;

pub type CandidateId = u64;

/// Largest id a stored record may carry. Ids must fit a signed 64-bit
/// column; larger values are kept verbatim in `extra` and never allocated.
pub const MAX_ID: CandidateId = i64::MAX as CandidateId;

/// Document keys of the typed fields.
const KNOWN_FIELDS: [&str; 10] = [
    "id",
    "name",
    "email",
    "phone",
    "position",
    "status",
    "skills",
    "appliedDate",
    "aiScore",
    "source",
];

/// One applicant, keyed by email.
///
/// Known fields are typed; anything else found on a source row or stored
/// document lands in `extra` and is written back verbatim, so a merge never
/// drops a column it does not understand. A known field whose value cannot
/// be read (an `aiScore` of `"N/A"`, an object in `skills`) also stays in
/// `extra` under its own key while the typed field is unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CandidateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    /// ISO `YYYY-MM-DD`. Older imports stored full timestamps here; those are
    /// kept as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Any JSON object decodes; only non-objects are rejected.
impl<'de> Deserialize<'de> for Candidate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Map::<String, Value>::deserialize(deserializer).map(Candidate::from_object)
    }
}

impl Candidate {
    /// Decodes a single JSON document. Anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, EngineError> {
        match value {
            Value::Object(fields) => Ok(Self::from_object(fields)),
            other => Err(EngineError::InvalidRecord(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Builds a candidate from a document's fields. Numbers and booleans
    /// in text fields become strings; values that still do not fit stay
    /// verbatim in `extra`. Null counts as absent.
    pub fn from_object(mut fields: Map<String, Value>) -> Self {
        let mut unreadable = Map::new();
        let id = take_field(&mut fields, &mut unreadable, "id", coerce::id);
        let name = take_field(&mut fields, &mut unreadable, "name", coerce::text);
        let email = take_field(&mut fields, &mut unreadable, "email", coerce::text);
        let phone = take_field(&mut fields, &mut unreadable, "phone", coerce::text);
        let position = take_field(&mut fields, &mut unreadable, "position", coerce::text);
        let status = take_field(&mut fields, &mut unreadable, "status", coerce::text);
        let skills = take_field(&mut fields, &mut unreadable, "skills", coerce::skills);
        let applied_date =
            take_field(&mut fields, &mut unreadable, "appliedDate", coerce::text);
        let ai_score = take_field(&mut fields, &mut unreadable, "aiScore", coerce::score);
        let source = take_field(&mut fields, &mut unreadable, "source", coerce::text);

        fields.extend(unreadable);
        Candidate {
            id,
            name,
            email,
            phone,
            position,
            status,
            skills,
            applied_date,
            ai_score,
            source,
            extra: fields,
        }
    }

    /// The matching key: trimmed, lower-cased email. `None` when blank.
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }

    /// Name shown in logs and summaries: name, then email, then "Unknown".
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Unknown")
    }

    /// Known fields held verbatim in `extra` because their value could not
    /// be read.
    pub fn unreadable_fields(&self) -> Vec<&'static str> {
        KNOWN_FIELDS
            .into_iter()
            .filter(|key| self.extra.contains_key(*key))
            .collect()
    }

    /// Drops the verbatim copies listed by [`Candidate::unreadable_fields`].
    pub fn discard_unreadable(&mut self) {
        for key in KNOWN_FIELDS {
            if let Some(value) = self.extra.remove(key) {
                debug!("Dropping unreadable {key} value {value}");
            }
        }
    }

    /// Shallow field-level overwrite: every field set on `incoming` wins,
    /// every field it leaves unset survives. The id is never touched.
    pub fn absorb(&mut self, incoming: Candidate) {
        let Candidate {
            id: _,
            name,
            email,
            phone,
            position,
            status,
            skills,
            applied_date,
            ai_score,
            source,
            extra,
        } = incoming;

        overwrite(&mut self.name, name);
        overwrite(&mut self.email, email);
        overwrite(&mut self.phone, phone);
        overwrite(&mut self.position, position);
        overwrite(&mut self.status, status);
        overwrite(&mut self.skills, skills);
        overwrite(&mut self.applied_date, applied_date);
        overwrite(&mut self.ai_score, ai_score);
        overwrite(&mut self.source, source);
        self.extra.extend(extra);

        // A typed value replaces any unreadable copy of the same field.
        for key in KNOWN_FIELDS {
            if self.is_set(key) {
                self.extra.remove(key);
            }
        }
    }

    fn is_set(&self, key: &str) -> bool {
        match key {
            "id" => self.id.is_some(),
            "name" => self.name.is_some(),
            "email" => self.email.is_some(),
            "phone" => self.phone.is_some(),
            "position" => self.position.is_some(),
            "status" => self.status.is_some(),
            "skills" => self.skills.is_some(),
            "appliedDate" => self.applied_date.is_some(),
            "aiScore" => self.ai_score.is_some(),
            "source" => self.source.is_some(),
            _ => false,
        }
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if let Some(v) = value {
        *slot = Some(v);
    }
}

fn take_field<T>(
    fields: &mut Map<String, Value>,
    unreadable: &mut Map<String, Value>,
    key: &str,
    coerce: fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = fields.remove(key)?;
    if value.is_null() {
        return None;
    }
    let typed = coerce(&value);
    if typed.is_none() {
        debug!("Keeping unreadable {key} value {value} as-is");
        unreadable.insert(key.to_string(), value);
    }
    typed
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a score cell such as `"87"`, `"87.4"` or `"87%"`.
pub(crate) fn parse_score(raw: &str) -> Option<i64> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.round() as i64)
}

/// Splits a skills cell on `|` or `;`. Commas are the column delimiter, so
/// the importers never used them inside a cell.
pub(crate) fn split_skills(raw: &str) -> Vec<String> {
    raw.split(['|', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

mod coerce {
    use serde_json::Value;

    use super::{parse_score, split_skills, CandidateId, MAX_ID};

    pub fn text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn id(value: &Value) -> Option<CandidateId> {
        let id: CandidateId = match value {
            Value::Number(n) => n.as_u64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        (id <= MAX_ID).then_some(id)
    }

    pub fn score(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            }),
            Value::String(s) => parse_score(s),
            _ => None,
        }
    }

    pub fn skills(value: &Value) -> Option<Vec<String>> {
        match value {
            Value::String(s) => {
                let skills = split_skills(s);
                (!skills.is_empty()).then_some(skills)
            }
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_document_roundtrips_with_extras() {
        let doc = json!({
            "id": 3,
            "name": "David Barrett",
            "email": "David_barrett1997@outlook.com",
            "aiScore": 89,
            "appliedDate": "2025-12-21",
            "skills": ["Carpentry"],
            "cvLink": "https://drive.example/cv.pdf"
        });
        let candidate = Candidate::from_value(doc.clone()).unwrap();
        assert_eq!(candidate.id, Some(3));
        assert_eq!(candidate.ai_score, Some(89));
        assert_eq!(
            candidate.extra.get("cvLink"),
            Some(&json!("https://drive.example/cv.pdf"))
        );
        assert_eq!(serde_json::to_value(&candidate).unwrap(), doc);
    }

    #[test]
    fn test_lenient_score_and_skills() {
        let candidate = Candidate::from_value(json!({
            "email": "a@x.com",
            "aiScore": "91",
            "skills": "Python|ML"
        }))
        .unwrap();
        assert_eq!(candidate.ai_score, Some(91));
        assert_eq!(
            candidate.skills,
            Some(vec!["Python".to_string(), "ML".to_string()])
        );
    }

    #[test]
    fn test_scalar_text_fields_become_strings() {
        let candidate = Candidate::from_value(json!({
            "email": "a@x.com",
            "phone": 447700900123u64,
            "name": 42,
            "status": true
        }))
        .unwrap();
        assert_eq!(candidate.phone.as_deref(), Some("447700900123"));
        assert_eq!(candidate.name.as_deref(), Some("42"));
        assert_eq!(candidate.status.as_deref(), Some("true"));
        assert!(candidate.extra.is_empty());
    }

    #[test]
    fn test_unreadable_fields_kept_verbatim() {
        let doc = json!({
            "id": "abc",
            "email": "a@x.com",
            "aiScore": "N/A",
            "appliedDate": {"day": 1},
            "skills": 7
        });
        let candidate = Candidate::from_value(doc.clone()).unwrap();
        assert_eq!(candidate.id, None);
        assert_eq!(candidate.ai_score, None);
        assert_eq!(candidate.applied_date, None);
        assert_eq!(candidate.skills, None);
        assert_eq!(
            candidate.unreadable_fields(),
            vec!["id", "skills", "appliedDate", "aiScore"]
        );
        assert_eq!(serde_json::to_value(&candidate).unwrap(), doc);
    }

    #[test]
    fn test_id_above_signed_range_not_typed() {
        let candidate = Candidate::from_value(json!({ "id": u64::MAX, "email": "a@x.com" })).unwrap();
        assert_eq!(candidate.id, None);
        assert_eq!(candidate.extra.get("id"), Some(&json!(u64::MAX)));

        let candidate = Candidate::from_value(json!({ "id": MAX_ID })).unwrap();
        assert_eq!(candidate.id, Some(MAX_ID));
    }

    #[test]
    fn test_absorb_replaces_unreadable_copy() {
        let mut existing = Candidate::from_value(json!({ "id": 1, "aiScore": "N/A" })).unwrap();
        existing.absorb(Candidate {
            ai_score: Some(88),
            ..Default::default()
        });
        assert_eq!(existing.ai_score, Some(88));
        assert!(existing.unreadable_fields().is_empty());
        assert_eq!(
            serde_json::to_value(&existing).unwrap(),
            json!({ "id": 1, "aiScore": 88 })
        );
    }

    #[test]
    fn test_non_object_rejected() {
        let err = Candidate::from_value(json!(["a@x.com"])).unwrap_err();
        assert!(err.to_string().contains("an array"), "{err}");
    }

    #[test]
    fn test_email_key_is_case_insensitive() {
        let candidate = Candidate {
            email: Some("  Sands.Trevor@Gmail.com ".into()),
            ..Default::default()
        };
        assert_eq!(candidate.email_key().as_deref(), Some("sands.trevor@gmail.com"));

        let blank = Candidate {
            email: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(blank.email_key(), None);
    }

    #[test]
    fn test_absorb_keeps_fields_absent_from_incoming() {
        let mut existing = Candidate {
            id: Some(1),
            name: Some("A".into()),
            email: Some("a@x.com".into()),
            status: Some("New".into()),
            source: Some("Manual".into()),
            ..Default::default()
        };
        existing.extra.insert("notes".into(), json!("met at fair"));

        let mut incoming = Candidate {
            id: Some(99),
            email: Some("A@X.com".into()),
            status: Some("Interview".into()),
            ..Default::default()
        };
        incoming.extra.insert("linkedin".into(), json!("in/a"));

        existing.absorb(incoming);

        assert_eq!(existing.id, Some(1));
        assert_eq!(existing.name.as_deref(), Some("A"));
        assert_eq!(existing.status.as_deref(), Some("Interview"));
        assert_eq!(existing.source.as_deref(), Some("Manual"));
        assert_eq!(existing.extra.get("notes"), Some(&json!("met at fair")));
        assert_eq!(existing.extra.get("linkedin"), Some(&json!("in/a")));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut c = Candidate::default();
        assert_eq!(c.display_name(), "Unknown");
        c.email = Some("b@y.com".into());
        assert_eq!(c.display_name(), "b@y.com");
        c.name = Some("B".into());
        assert_eq!(c.display_name(), "B");
    }

    #[test]
    fn test_parse_score_variants() {
        assert_eq!(parse_score("87"), Some(87));
        assert_eq!(parse_score(" 87.6 "), Some(88));
        assert_eq!(parse_score("90%"), Some(90));
        assert_eq!(parse_score("n/a"), None);
    }
}
