use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use cidgate_types::{codec, ContentId};

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;
use crate::types::{DirEntry, Stat};

/// In-memory stand-in for an IPFS node's blockstore and files namespace.
///
/// Blobs are addressed by a BLAKE3 CIDv1. Directory identifiers are derived
/// from their sorted children, so any link or unlink below a directory
/// changes its identifier and that of every ancestor, and an identical set
/// of children always hashes to the same identifier.
///
/// Ingested blobs are kept forever; there is no garbage collection.
pub struct InMemoryContentStore {
    state: RwLock<State>,
}

struct State {
    blobs: HashMap<ContentId, Bytes>,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, ContentId>,
}

impl InMemoryContentStore {
    /// Create a store whose namespace holds only `/`.
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert("/".to_string());
        Self {
            state: RwLock::new(State {
                blobs: HashMap::new(),
                dirs,
                files: BTreeMap::new(),
            }),
        }
    }

    /// Create a store with `root` (and its parents) already present.
    pub fn with_root(root: &str) -> StoreResult<Self> {
        let store = Self::new();
        store.create_dir(root)?;
        Ok(store)
    }

    /// Create a directory and any missing parents. Existing directories are
    /// left untouched.
    pub fn create_dir(&self, path: &str) -> StoreResult<()> {
        let path = normalize(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            if state.files.contains_key(&current) {
                return Err(StoreError::InvalidPath {
                    path: current,
                    reason: "not a directory".into(),
                });
            }
            state.dirs.insert(current.clone());
        }
        Ok(())
    }

    /// Number of distinct blobs ever ingested.
    pub fn blob_count(&self) -> usize {
        self.state.read().expect("lock poisoned").blobs.len()
    }

    /// Number of file entries linked anywhere in the namespace.
    pub fn linked_count(&self) -> usize {
        self.state.read().expect("lock poisoned").files.len()
    }

    /// Returns `true` if `cid` has been ingested.
    pub fn has_blob(&self, cid: &ContentId) -> bool {
        self.state
            .read()
            .expect("lock poisoned")
            .blobs
            .contains_key(cid)
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    fn children(&self, dir: &str) -> Vec<DirEntry> {
        let prefix = child_prefix(dir);
        let mut entries: Vec<DirEntry> = Vec::new();

        for (path, cid) in self.files.range(prefix.clone()..) {
            let Some(name) = path.strip_prefix(&prefix) else {
                break;
            };
            if name.contains('/') {
                continue;
            }
            entries.push(DirEntry {
                name: name.to_string(),
                cid: *cid,
            });
        }

        for path in self.dirs.range(prefix.clone()..) {
            let Some(name) = path.strip_prefix(&prefix) else {
                break;
            };
            if name.is_empty() || name.contains('/') {
                continue;
            }
            entries.push(DirEntry {
                name: name.to_string(),
                cid: self.dir_cid(path),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn dir_cid(&self, dir: &str) -> ContentId {
        let mut manifest = Vec::new();
        for entry in self.children(dir) {
            manifest.extend_from_slice(entry.name.as_bytes());
            manifest.push(0);
            manifest.extend_from_slice(entry.cid.to_string().as_bytes());
            manifest.push(b'\n');
        }
        ContentId::from_blake3(codec::DAG_PB, &manifest)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn ingest(&self, data: Bytes) -> StoreResult<ContentId> {
        let cid = ContentId::from_blake3(codec::RAW, &data);
        let mut state = self.state.write().expect("lock poisoned");
        state.blobs.entry(cid).or_insert(data);
        Ok(cid)
    }

    async fn stat(&self, path: &str) -> StoreResult<Stat> {
        let path = normalize(path)?;
        let state = self.state.read().expect("lock poisoned");
        if state.is_dir(&path) {
            return Ok(Stat {
                cid: state.dir_cid(&path),
            });
        }
        match state.files.get(&path) {
            Some(cid) => Ok(Stat { cid: *cid }),
            None => Err(StoreError::NotFound(path)),
        }
    }

    async fn link(&self, cid: &ContentId, path: &str) -> StoreResult<()> {
        let path = normalize(path)?;
        let (parent, _) = split_parent(&path).ok_or_else(|| StoreError::InvalidPath {
            path: path.clone(),
            reason: "cannot link over the namespace root".into(),
        })?;
        let mut state = self.state.write().expect("lock poisoned");
        if !state.blobs.contains_key(cid) {
            return Err(StoreError::NotFound(format!("/ipfs/{cid}")));
        }
        if !state.is_dir(parent) {
            return Err(StoreError::NotFound(parent.to_string()));
        }
        if state.is_dir(&path) || state.files.contains_key(&path) {
            return Err(StoreError::AlreadyExists(path));
        }
        state.files.insert(path, *cid);
        Ok(())
    }

    async fn unlink(&self, path: &str) -> StoreResult<()> {
        let path = normalize(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        if state.is_dir(&path) {
            return Err(StoreError::InvalidPath {
                path,
                reason: "is a directory".into(),
            });
        }
        match state.files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path)),
        }
    }

    async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>> {
        let path = normalize(path)?;
        let state = self.state.read().expect("lock poisoned");
        if state.is_dir(&path) {
            return Ok(state.children(&path));
        }
        if state.files.contains_key(&path) {
            return Err(StoreError::InvalidPath {
                path,
                reason: "not a directory".into(),
            });
        }
        Err(StoreError::NotFound(path))
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryContentStore")
            .field("blob_count", &state.blobs.len())
            .field("dir_count", &state.dirs.len())
            .field("file_count", &state.files.len())
            .finish()
    }
}

/// Absolute path without trailing slash (except `/` itself).
fn normalize(path: &str) -> StoreResult<String> {
    if !path.starts_with('/') {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "paths must be absolute".into(),
        });
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    if trimmed[1..].split('/').any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "empty path segment".into(),
        });
    }
    Ok(trimmed.to_string())
}

fn split_parent(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    let name = &path[idx + 1..];
    if name.is_empty() {
        return None;
    }
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, name))
}

fn child_prefix(dir: &str) -> String {
    if dir == "/" {
        "/".to_string()
    } else {
        format!("{dir}/")
    }
}
