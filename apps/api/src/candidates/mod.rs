// Candidate merge engine: CSV parsing, normalization, email-keyed upsert, stats.
// Everything here is synchronous and free of I/O; persistence lives in `store`
// and the read-modify-write cycle in `service`.

pub mod csv;
pub mod errors;
pub mod handlers;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod policy;
pub mod stats;

// Re-export the public API consumed by the service, stores and binaries.
pub use csv::{parse_rows, RawRow};
pub use errors::{CsvError, EngineError};
pub use merge::{decode_existing, merge, merge_values, MergeOutcome, MergeReport};
pub use models::{Candidate, CandidateId, MAX_ID};
pub use normalize::{normalize, normalize_value, NormalizedCandidate, Normalizer};
pub use policy::{DateSource, DefaultsPolicy};
pub use stats::{compute_stats, CandidateStats};
