use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::candidates::{
    compute_stats, merge, parse_rows, Candidate, CandidateId, CandidateStats, DateSource,
    EngineError, MergeReport, NormalizedCandidate, Normalizer, RawRow,
};
use crate::config::Config;
use crate::errors::AppError;
use crate::store::CandidateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    #[serde(flatten)]
    pub report: MergeReport,
    /// Collection size after the import.
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub candidate: Candidate,
    /// False when the email already existed and the record was updated.
    pub created: bool,
}

/// Load → normalize → merge → save, one writer at a time.
///
/// The engine does no concurrency control, so every mutating operation holds
/// `writer` for its whole read-modify-write cycle. The normalizer lives
/// behind the same lock because drawing default scores mutates its RNG.
pub struct CandidateService {
    store: Arc<dyn CandidateStore>,
    writer: Mutex<Normalizer>,
    date_source: DateSource,
}

impl CandidateService {
    pub fn new(store: Arc<dyn CandidateStore>, normalizer: Normalizer) -> Self {
        let date_source = normalizer.policy().date_source;
        Self {
            store,
            writer: Mutex::new(normalizer),
            date_source,
        }
    }

    pub fn from_config(store: Arc<dyn CandidateStore>, config: &Config) -> Result<Self, EngineError> {
        let normalizer = match config.score_seed {
            Some(seed) => Normalizer::seeded(config.policy.clone(), seed)?,
            None => Normalizer::new(config.policy.clone())?,
        };
        Ok(Self::new(store, normalizer))
    }

    /// Imports delimited text. Rows without a `source` column value get
    /// `source_tag`.
    pub async fn import_csv(
        &self,
        text: &str,
        source_tag: Option<&str>,
    ) -> Result<ImportSummary, AppError> {
        let rows = parse_rows(text)?;
        let mut normalizer = self.writer.lock().await;
        let incoming: Vec<NormalizedCandidate> = rows
            .into_iter()
            .map(|mut row| {
                tag_row(&mut row, source_tag);
                normalizer.normalize(&row)
            })
            .collect();
        self.commit(incoming, 0).await
    }

    /// Imports a previously exported JSON collection. Elements that are not
    /// candidate documents are counted as skipped.
    pub async fn import_json(
        &self,
        values: Vec<Value>,
        source_tag: Option<&str>,
    ) -> Result<ImportSummary, AppError> {
        let mut normalizer = self.writer.lock().await;
        let mut rejected = 0;
        let mut incoming = Vec::with_capacity(values.len());
        for (index, mut value) in values.into_iter().enumerate() {
            tag_value(&mut value, source_tag);
            match normalizer.normalize_value(&value) {
                Ok(normalized) => incoming.push(normalized),
                Err(e) => {
                    warn!("Skipping JSON record #{index}: {e}");
                    rejected += 1;
                }
            }
        }
        self.commit(incoming, rejected).await
    }

    /// Caller must hold `writer`.
    async fn commit(
        &self,
        incoming: Vec<NormalizedCandidate>,
        rejected: usize,
    ) -> Result<ImportSummary, AppError> {
        let existing = self.store.load().await?;
        let outcome = merge(existing, incoming)?;
        self.store.save(&outcome.candidates).await?;

        let mut report = outcome.report;
        report.skipped += rejected;
        let summary = ImportSummary {
            report,
            total: outcome.candidates.len(),
        };
        info!(
            "Import complete: {} added, {} updated, {} skipped, {} total",
            report.added, report.updated, report.skipped, summary.total
        );
        Ok(summary)
    }

    pub async fn list(&self) -> Result<Vec<Candidate>, AppError> {
        Ok(self.store.load().await?)
    }

    pub async fn get(&self, id: CandidateId) -> Result<Candidate, AppError> {
        self.store
            .load()
            .await?
            .into_iter()
            .find(|c| c.id == Some(id))
            .ok_or_else(|| not_found(id))
    }

    /// Normalizes one record and upserts it. An existing email updates that
    /// candidate instead of creating a duplicate.
    pub async fn create(&self, body: Value) -> Result<CreateOutcome, AppError> {
        let mut normalizer = self.writer.lock().await;
        let normalized = normalizer.normalize_value(&body)?;
        let key = normalized
            .email_key()
            .ok_or_else(|| AppError::Validation("email is required".to_string()))?;

        let existing = self.store.load().await?;
        let outcome = merge(existing, vec![normalized])?;
        self.store.save(&outcome.candidates).await?;

        let candidate = outcome
            .candidates
            .into_iter()
            .find(|c| c.email_key().as_deref() == Some(key.as_str()))
            .ok_or_else(|| anyhow::anyhow!("merged candidate {key} missing from collection"))?;
        info!("Saved candidate {} ({:?})", candidate.display_name(), candidate.id);
        Ok(CreateOutcome {
            candidate,
            created: outcome.report.added == 1,
        })
    }

    /// Shallow overwrite of one candidate by id. Defaults are not applied
    /// and an `id` in the body is ignored.
    pub async fn update(&self, id: CandidateId, body: Value) -> Result<Candidate, AppError> {
        let _writer = self.writer.lock().await;
        let mut patch = Candidate::from_value(body)?;
        patch.id = None;
        patch.extra.remove("id");
        let unreadable = patch.unreadable_fields();
        if !unreadable.is_empty() {
            return Err(EngineError::InvalidRecord(format!(
                "unreadable value for {}",
                unreadable.join(", ")
            ))
            .into());
        }

        let mut all = self.store.load().await?;
        let pos = all
            .iter()
            .position(|c| c.id == Some(id))
            .ok_or_else(|| not_found(id))?;

        if patch.email.is_some() {
            let key = patch
                .email_key()
                .ok_or_else(|| AppError::Validation("email must not be blank".to_string()))?;
            let taken = all
                .iter()
                .enumerate()
                .any(|(i, c)| i != pos && c.email_key().as_deref() == Some(key.as_str()));
            if taken {
                return Err(AppError::Conflict(format!(
                    "email {key} belongs to another candidate"
                )));
            }
        }

        all[pos].absorb(patch);
        self.store.save(&all).await?;
        Ok(all.swap_remove(pos))
    }

    pub async fn delete(&self, id: CandidateId) -> Result<Candidate, AppError> {
        let _writer = self.writer.lock().await;
        let mut all = self.store.load().await?;
        let pos = all
            .iter()
            .position(|c| c.id == Some(id))
            .ok_or_else(|| not_found(id))?;
        let removed = all.remove(pos);
        self.store.save(&all).await?;
        info!("Deleted candidate {} ({id})", removed.display_name());
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CandidateStats, AppError> {
        let all = self.store.load().await?;
        Ok(compute_stats(&all, self.date_source.today()))
    }
}

fn not_found(id: CandidateId) -> AppError {
    AppError::NotFound(format!("Candidate {id} not found"))
}

fn tag_row(row: &mut RawRow, source_tag: Option<&str>) {
    let Some(tag) = source_tag else { return };
    let has_source = row.get("source").is_some_and(|s| !s.trim().is_empty());
    if !has_source {
        row.insert("source".to_string(), tag.to_string());
    }
}

fn tag_value(value: &mut Value, source_tag: Option<&str>) {
    let (Some(tag), Some(obj)) = (source_tag, value.as_object_mut()) else {
        return;
    };
    let has_source = obj
        .get("source")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !has_source {
        obj.insert("source".to_string(), Value::String(tag.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::DefaultsPolicy;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn service_with(existing: Vec<Candidate>) -> CandidateService {
        let policy = DefaultsPolicy {
            date_source: DateSource::Fixed(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()),
            ..Default::default()
        };
        CandidateService::new(
            Arc::new(MemoryStore::with_candidates(existing)),
            Normalizer::seeded(policy, 11).unwrap(),
        )
    }

    const CSV: &str = "name,email,phone,position,skills\n\
        Alex Johnson,alex@example.com,+441111111111,AI Engineer,Python|ML\n\
        Sarah Chen,sarah@example.com,+442222222222,Data Scientist,SQL\n\
        No Email,,+443333333333,ML Engineer,AWS\n";

    #[tokio::test]
    async fn test_import_csv_then_reimport_is_idempotent() {
        let service = service_with(vec![]);

        let first = service.import_csv(CSV, Some("CSV")).await.unwrap();
        assert_eq!(first.report.added, 2);
        assert_eq!(first.report.skipped, 1);
        assert_eq!(first.total, 2);

        let after_first = service.list().await.unwrap();
        assert_eq!(after_first[0].source.as_deref(), Some("CSV"));
        assert_eq!(
            after_first[0].skills,
            Some(vec!["Python".to_string(), "ML".to_string()])
        );

        // Same ids, same emails; only the freshly drawn default scores may differ.
        let second = service.import_csv(CSV, Some("CSV")).await.unwrap();
        assert_eq!(second.report.added, 0);
        assert_eq!(second.report.updated, 2);
        let after_second = service.list().await.unwrap();
        let ids: Vec<_> = after_second.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_import_rejects_header_only_csv() {
        let service = service_with(vec![]);
        let err = service.import_csv("name,email\n", None).await.unwrap_err();
        assert!(matches!(err, AppError::Csv(_)));
    }

    #[tokio::test]
    async fn test_import_json_skips_non_objects() {
        let service = service_with(vec![]);
        let summary = service
            .import_json(
                vec![
                    json!({"id": 9, "email": "a@x.com", "name": "A", "source": "Drive"}),
                    json!("not a record"),
                    json!({"email": "b@y.com"}),
                ],
                Some("JSON"),
            )
            .await
            .unwrap();
        assert_eq!(summary.report.added, 2);
        assert_eq!(summary.report.skipped, 1);

        let all = service.list().await.unwrap();
        assert_eq!(all[0].id, Some(1));
        assert_eq!(all[0].source.as_deref(), Some("Drive"));
        assert_eq!(all[1].source.as_deref(), Some("JSON"));
    }

    #[tokio::test]
    async fn test_import_json_keeps_record_with_mistyped_phone() {
        let service = service_with(vec![]);
        let summary = service
            .import_json(vec![json!({"email": "c@z.com", "phone": 447700900123u64})], None)
            .await
            .unwrap();
        assert_eq!(summary.report.added, 1);
        assert_eq!(summary.report.skipped, 0);

        let all = service.list().await.unwrap();
        assert_eq!(all[0].phone.as_deref(), Some("447700900123"));
    }

    #[tokio::test]
    async fn test_hand_edited_store_still_loads_and_merges() {
        let existing = vec![
            Candidate::from_value(json!({"id": 3, "email": "a@x.com", "name": 12, "aiScore": "N/A"}))
                .unwrap(),
        ];
        let service = service_with(existing);
        let summary = service
            .import_csv("email,aiscore
a@x.com,91
b@y.com,80", None)
            .await
            .unwrap();
        assert_eq!(summary.report.updated, 1);
        assert_eq!(summary.report.added, 1);

        let first = service.get(3).await.unwrap();
        assert_eq!(first.name.as_deref(), Some("12"));
        assert_eq!(first.ai_score, Some(91));
        assert!(first.unreadable_fields().is_empty());
        assert_eq!(service.get(4).await.unwrap().email.as_deref(), Some("b@y.com"));
    }

    #[tokio::test]
    async fn test_create_upserts_by_email() {
        let service = service_with(vec![Candidate {
            id: Some(4),
            name: Some("Trevor Sands".into()),
            email: Some("sands.trevor@gmail.com".into()),
            ..Default::default()
        }]);

        let created = service
            .create(json!({"email": "new@x.com", "name": "New"}))
            .await
            .unwrap();
        assert!(created.created);
        assert_eq!(created.candidate.id, Some(5));
        assert_eq!(created.candidate.status.as_deref(), Some("New"));

        let updated = service
            .create(json!({"email": "SANDS.TREVOR@gmail.com", "status": "Interview"}))
            .await
            .unwrap();
        assert!(!updated.created);
        assert_eq!(updated.candidate.id, Some(4));
        assert_eq!(updated.candidate.name.as_deref(), Some("Trevor Sands"));
        assert_eq!(updated.candidate.status.as_deref(), Some("Interview"));
    }

    #[tokio::test]
    async fn test_create_requires_email() {
        let service = service_with(vec![]);
        let err = service.create(json!({"name": "Nobody"})).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_is_shallow_and_keeps_id() {
        let service = service_with(vec![Candidate {
            id: Some(1),
            name: Some("A".into()),
            email: Some("a@x.com".into()),
            phone: Some("123".into()),
            ..Default::default()
        }]);
        let updated = service
            .update(1, json!({"id": 77, "status": "Hired", "offer": "signed"}))
            .await
            .unwrap();
        assert_eq!(updated.id, Some(1));
        assert_eq!(updated.phone.as_deref(), Some("123"));
        assert_eq!(updated.status.as_deref(), Some("Hired"));
        assert_eq!(updated.extra.get("offer"), Some(&json!("signed")));
        assert_eq!(service.get(1).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_email_conflict_and_missing() {
        let service = service_with(vec![
            Candidate {
                id: Some(1),
                email: Some("a@x.com".into()),
                ..Default::default()
            },
            Candidate {
                id: Some(2),
                email: Some("b@y.com".into()),
                ..Default::default()
            },
        ]);
        let err = service
            .update(2, json!({"email": "A@x.com"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = service.update(3, json!({"status": "New"})).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .update(1, json!({"aiScore": "high"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Engine(EngineError::InvalidRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_ids_not_reused_while_max_survives() {
        let service = service_with(vec![]);
        service.import_csv("email\na@x.com\nb@y.com\nc@z.com", None).await.unwrap();

        let removed = service.delete(2).await.unwrap();
        assert_eq!(removed.email.as_deref(), Some("b@y.com"));
        assert!(matches!(service.get(2).await, Err(AppError::NotFound(_))));

        service.import_csv("email\nd@w.com", None).await.unwrap();
        let ids: Vec<_> = service.list().await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![Some(1), Some(3), Some(4)]);
    }

    #[tokio::test]
    async fn test_stats_uses_policy_date() {
        let service = service_with(vec![]);
        service
            .import_csv("email,aiscore\na@x.com,95\nb@y.com,85", None)
            .await
            .unwrap();
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.average_ai_score, 90);
        assert_eq!(stats.top_matches, 1);
        assert_eq!(stats.new_today, 2);
    }
}
