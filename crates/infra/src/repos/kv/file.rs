use super::IKVRepo;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Stores every key as `<dir>/<key>.json`.
///
/// Values are written to a temporary file first and then renamed over the
/// old file, so a crash mid write leaves the previous value intact.
pub struct FileKVRepo {
    dir: PathBuf,
}

impl FileKVRepo {
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Unable to create state directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait::async_trait]
impl IKVRepo for FileKVRepo {
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));
        tokio::fs::write(&tmp_path, value)
            .await
            .with_context(|| format!("Unable to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Unable to replace {}", path.display()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Unable to read {}", path.display())),
        }
    }
}
