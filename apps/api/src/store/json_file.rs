use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::candidates::{decode_existing, Candidate};
use crate::store::{CandidateStore, StoreError};

/// The flat `candidates.json` file: one pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CandidateStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Candidate>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("{} not found; starting with an empty collection", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let Value::Array(items) = serde_json::from_slice::<Value>(&bytes)? else {
            return Err(StoreError::Corrupt(format!(
                "{} does not contain a JSON array",
                self.path.display()
            )));
        };
        debug!("Loaded {} records from {}", items.len(), self.path.display());
        Ok(decode_existing(items)?)
    }

    async fn save(&self, candidates: &[Candidate]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(candidates)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(io::Error::other)??;
        debug!("Wrote {} records to {}", candidates.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

/// Writes through a temp file in the target directory so readers never see
/// a half-written collection.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
