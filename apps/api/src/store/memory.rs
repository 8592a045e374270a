use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::candidates::Candidate;
use crate::store::{CandidateStore, StoreError};

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    candidates: RwLock<Vec<Candidate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: RwLock::new(candidates),
        }
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Candidate>, StoreError> {
        Ok(self.candidates.read().await.clone())
    }

    async fn save(&self, candidates: &[Candidate]) -> Result<(), StoreError> {
        *self.candidates.write().await = candidates.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
