use async_trait::async_trait;
use super::StorageSink;
use crate::error::StorageError;
use std::io::{self, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::info;

/// Writes objects as files under a root directory, keys becoming relative paths.
pub struct LocalSink {
    root: PathBuf,
}

impl LocalSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl StorageSink for LocalSink {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(StorageError::Config(format!("invalid object key `{}`", key)));
        }

        let io_err = |source| StorageError::Io { key: key.to_string(), source };
        let path = self.path_for(key);
        let parent = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => self.root.clone(),
        };
        tokio::fs::create_dir_all(&parent).await.map_err(io_err)?;

        // Each write gets its own temp file next to the target, then replaces
        // it in one rename; readers never see a half-written file.
        let size = body.len();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&parent)?;
            tmp.write_all(&body)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|join| io_err(io::Error::new(io::ErrorKind::Other, join)))?
        .map_err(io_err)?;

        info!(path = %path.display(), bytes = size, "wrote object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_put_creates_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());

        sink.put("raw/caixin/caixin_index.csv", b"date\n".to_vec(), "text/csv")
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("raw/caixin/caixin_index.csv")).unwrap();
        assert_eq!(written, "date\n");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("raw/caixin")).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_puts_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(LocalSink::new(dir.path()));

        let writes = (0..8).map(|i| {
            let sink = sink.clone();
            tokio::spawn(async move {
                sink.put("raw/usd_cny.csv", format!("run {}\n", i).into_bytes(), "text/csv").await
            })
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap().unwrap();
        }

        let written = std::fs::read_to_string(dir.path().join("raw/usd_cny.csv")).unwrap();
        assert!(written.starts_with("run "));
        assert_eq!(std::fs::read_dir(dir.path().join("raw")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalSink::new(dir.path());

        let err = sink.put("raw/../../etc/passwd", vec![], "text/csv").await.unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
