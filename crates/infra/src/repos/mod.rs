mod kv;
mod records;

pub use kv::{FileKVRepo, IKVRepo, InMemoryKVRepo};
pub use records::{RecordKind, RecordStore};
use std::{path::Path, sync::Arc};
use tracing::info;

#[derive(Clone)]
pub struct Repos {
    pub records: RecordStore,
}

impl Repos {
    pub fn create_file(state_dir: &Path) -> anyhow::Result<Self> {
        info!("Persisting state in {}", state_dir.display());
        let kv = FileKVRepo::new(state_dir)?;
        Ok(Self::create_with(Arc::new(kv)))
    }

    pub fn create_inmemory() -> Self {
        Self::create_with(Arc::new(InMemoryKVRepo::new()))
    }

    pub fn create_with(kv: Arc<dyn IKVRepo>) -> Self {
        Self {
            records: RecordStore::new(kv),
        }
    }
}
