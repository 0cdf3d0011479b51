use crate::error::{CurationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const STABILITY_SCHEMA_VERSION: u32 = 1;

/// Keyed capability for run-to-run stability: remembers the chosen
/// representative per (product, semantic group) and the candidates evicted
/// for cause, so synonym choice does not oscillate between runs.
///
/// Writers must observe single-writer discipline per product id; the
/// implementations serialize access internally but do not arbitrate
/// concurrent reprocessing of the same product.
pub trait StabilityStore: Send + Sync {
    fn chosen(&self, product_id: &str, group_key: &str) -> Option<String>;

    fn record_choice(&self, product_id: &str, group_key: &str, representative: &str);

    fn is_blocked(&self, product_id: &str, group_key: &str, candidate: &str) -> bool;

    fn record_eviction(&self, product_id: &str, group_key: &str, candidate: &str);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GroupRecord {
    chosen: Option<String>,
    #[serde(default)]
    blocked: BTreeSet<String>,
}

/// In-memory store; the default for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStabilityStore {
    records: Mutex<HashMap<(String, String), GroupRecord>>,
}

impl MemoryStabilityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StabilityStore for MemoryStabilityStore {
    fn chosen(&self, product_id: &str, group_key: &str) -> Option<String> {
        self.records
            .lock()
            .expect("stability lock")
            .get(&(product_id.to_string(), group_key.to_string()))
            .and_then(|r| r.chosen.clone())
    }

    fn record_choice(&self, product_id: &str, group_key: &str, representative: &str) {
        self.records
            .lock()
            .expect("stability lock")
            .entry((product_id.to_string(), group_key.to_string()))
            .or_default()
            .chosen = Some(representative.to_string());
    }

    fn is_blocked(&self, product_id: &str, group_key: &str, candidate: &str) -> bool {
        self.records
            .lock()
            .expect("stability lock")
            .get(&(product_id.to_string(), group_key.to_string()))
            .is_some_and(|r| r.blocked.contains(candidate))
    }

    fn record_eviction(&self, product_id: &str, group_key: &str, candidate: &str) {
        self.records
            .lock()
            .expect("stability lock")
            .entry((product_id.to_string(), group_key.to_string()))
            .or_default()
            .blocked
            .insert(candidate.to_string());
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedState {
    schema_version: u32,
    /// product id -> group key -> record
    products: BTreeMap<String, BTreeMap<String, GroupRecord>>,
}

/// File-backed store persisted as versioned JSON with an atomic
/// write-then-rename, mirroring how the keyword corpus is saved.
#[derive(Debug)]
pub struct FileStabilityStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl FileStabilityStore {
    /// Open a store, starting empty when the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: PersistedState = serde_json::from_slice(&bytes)?;
                if state.schema_version != STABILITY_SCHEMA_VERSION {
                    return Err(CurationError::UnsupportedSchema {
                        found: state.schema_version,
                        expected: STABILITY_SCHEMA_VERSION,
                    });
                }
                state
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => PersistedState {
                schema_version: STABILITY_SCHEMA_VERSION,
                products: BTreeMap::new(),
            },
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Persist current state. Call once per run, after allocation.
    pub async fn save(&self) -> Result<()> {
        let bytes = {
            let state = self.state.lock().expect("stability lock");
            serde_json::to_vec_pretty(&*state)?
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl StabilityStore for FileStabilityStore {
    fn chosen(&self, product_id: &str, group_key: &str) -> Option<String> {
        self.state
            .lock()
            .expect("stability lock")
            .products
            .get(product_id)
            .and_then(|groups| groups.get(group_key))
            .and_then(|r| r.chosen.clone())
    }

    fn record_choice(&self, product_id: &str, group_key: &str, representative: &str) {
        self.state
            .lock()
            .expect("stability lock")
            .products
            .entry(product_id.to_string())
            .or_default()
            .entry(group_key.to_string())
            .or_default()
            .chosen = Some(representative.to_string());
    }

    fn is_blocked(&self, product_id: &str, group_key: &str, candidate: &str) -> bool {
        self.state
            .lock()
            .expect("stability lock")
            .products
            .get(product_id)
            .and_then(|groups| groups.get(group_key))
            .is_some_and(|r| r.blocked.contains(candidate))
    }

    fn record_eviction(&self, product_id: &str, group_key: &str, candidate: &str) {
        self.state
            .lock()
            .expect("stability lock")
            .products
            .entry(product_id.to_string())
            .or_default()
            .entry(group_key.to_string())
            .or_default()
            .blocked
            .insert(candidate.to_string());
    }
}
