//! Filesystem storage backend.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::{BlobStore, ObjectMeta, PutOptions, StoredObject};
use crate::Error;
use crate::keys::key_prefix;

const SIDECAR_SUFFIX: &str = ".meta.json";
const PARTIAL_SUFFIX: &str = ".partial";

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Object attributes persisted next to each file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// Storage backend that writes objects to the local filesystem.
///
/// A key maps to a path below the root directory. Metadata is stored in a
/// `<file>.meta.json` sidecar. Intermediate directories are created on write.
/// Writes land in a `.partial` file first and are renamed into place, so
/// readers never see a half-written object.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, Error> {
        if key.is_empty()
            || key.starts_with('/')
            || key.contains('\0')
            || key.ends_with(SIDECAR_SUFFIX)
            || key.ends_with(PARTIAL_SUFFIX)
            || key.split('/').any(|segment| segment == "..")
        {
            return Err(Error::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    async fn read_sidecar(path: &Path) -> Result<Sidecar, Error> {
        match tokio::fs::read(sidecar_path(path)).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| Error::Storage(format!("corrupt metadata: {e}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Sidecar::default()),
            Err(e) => Err(io_error(path, &e)),
        }
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn partial_path(path: &Path) -> PathBuf {
    let n = PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}-{n}{PARTIAL_SUFFIX}", std::process::id()));
    PathBuf::from(name)
}

/// Write `contents` next to `path` and rename it over `path`.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let partial = partial_path(path);
    let result = async {
        tokio::fs::write(&partial, contents).await?;
        tokio::fs::rename(&partial, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(io_error(path, &e));
    }
    Ok(())
}

fn io_error(path: &Path, err: &std::io::Error) -> Error {
    Error::Storage(format!("{}: {err}", path.display()))
}

#[async_trait::async_trait]
impl BlobStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        let path = self.path_for(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, &e)),
        };

        let sidecar = Self::read_sidecar(&path).await?;
        let meta = ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: sidecar.content_type,
            metadata: sidecar.metadata,
        };
        Ok(Some(StoredObject { data: Bytes::from(data), meta }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, Error> {
        let path = self.path_for(key)?;
        let attrs = match tokio::fs::metadata(&path).await {
            Ok(attrs) if attrs.is_file() => attrs,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, &e)),
        };

        let sidecar = Self::read_sidecar(&path).await?;
        Ok(Some(ObjectMeta {
            key: key.to_string(),
            size: attrs.len(),
            content_type: sidecar.content_type,
            metadata: sidecar.metadata,
        }))
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<(), Error> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }

        let sidecar = Sidecar { content_type: options.content_type, metadata: options.metadata };
        let sidecar_json =
            serde_json::to_vec(&sidecar).map_err(|e| Error::Storage(format!("failed to encode metadata: {e}")))?;

        write_atomic(&sidecar_path(&path), &sidecar_json).await?;
        write_atomic(&path, &data).await?;

        tracing::debug!("wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let dir_key = key_prefix(prefix);
        let name_prefix = &prefix[dir_key.len()..];
        let dir = if dir_key.is_empty() { self.root.clone() } else { self.path_for(dir_key)? };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, &e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, &e))? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let internal = name.ends_with(SIDECAR_SUFFIX) || name.ends_with(PARTIAL_SUFFIX);
            if is_file && !internal && name.starts_with(name_prefix) {
                keys.push(format!("{dir_key}{name}"));
            }
        }

        keys.sort();
        Ok(keys)
    }
}
