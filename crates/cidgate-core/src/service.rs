use std::sync::Arc;

use bytes::Bytes;
use cidgate_store::ContentStore;
use cidgate_types::{is_transient, path_for, ContentId};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::outcome::{AddOutcome, Listing, RemoveOutcome};
use crate::serializer::RootSerializer;

/// The gatekeeper's operations over one namespace root.
///
/// Cloning is cheap and every clone shares the same store and gate.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    root: Arc<str>,
    gate: Arc<RootSerializer>,
}

impl ContentService {
    /// Build a service over `root` that admits operations through `gate`.
    ///
    /// Every service instance that manages the same root must share one
    /// gate.
    pub fn new(store: Arc<dyn ContentStore>, root: impl Into<String>, gate: Arc<RootSerializer>) -> Self {
        Self {
            store,
            root: Arc::from(root.into()),
            gate,
        }
    }

    /// Build a service with a gate of its own.
    pub fn with_store(store: Arc<dyn ContentStore>, root: impl Into<String>) -> Self {
        Self::new(store, root, Arc::new(RootSerializer::new()))
    }

    /// Path of the namespace root.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn gate(&self) -> &Arc<RootSerializer> {
        &self.gate
    }

    /// Ingest `data` and retain it under the root unless it already is.
    pub async fn add(&self, data: Bytes) -> CoreResult<AddOutcome> {
        let store = Arc::clone(&self.store);
        let root = Arc::clone(&self.root);
        self.gate
            .run_exclusive(move || async move { add_locked(store.as_ref(), &root, data).await })
            .await
    }

    /// Decode `cid_text` and drop its entry from the root.
    ///
    /// Undecodable text fails with [`CoreError::InvalidIdentifier`] before
    /// the gate is requested, so it never reaches the store.
    pub async fn remove(&self, cid_text: &str) -> CoreResult<RemoveOutcome> {
        let cid = ContentId::parse(cid_text)?;
        self.remove_cid(cid).await
    }

    /// Drop the entry for an already-decoded identifier.
    pub async fn remove_cid(&self, cid: ContentId) -> CoreResult<RemoveOutcome> {
        let store = Arc::clone(&self.store);
        let root = Arc::clone(&self.root);
        self.gate
            .run_exclusive(move || async move { remove_locked(store.as_ref(), &root, cid).await })
            .await
    }

    /// Current root identifier and retained content.
    pub async fn list(&self) -> CoreResult<Listing> {
        let store = Arc::clone(&self.store);
        let root = Arc::clone(&self.root);
        self.gate
            .run_exclusive(move || async move { list_locked(store.as_ref(), &root).await })
            .await
    }

    /// Pass through the gate without touching the store.
    pub async fn health(&self) -> CoreResult<()> {
        self.gate.run_exclusive(|| async { Ok(()) }).await
    }
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService")
            .field("root", &self.root)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

async fn add_locked(store: &dyn ContentStore, root: &str, data: Bytes) -> CoreResult<AddOutcome> {
    debug!(bytes = data.len(), "adding content");
    let cid = store.ingest(data).await?;
    debug!(%cid, "ingested content");

    let path = path_for(root, &cid);
    if store.exists(&path).await? {
        info!(%cid, %path, "content already exists");
        return Ok(AddOutcome::Conflict { cid });
    }

    store
        .link(&cid, &path)
        .await
        .map_err(|source| CoreError::LinkIndeterminate {
            cid,
            path: path.clone(),
            source,
        })?;
    debug!(%cid, %path, "linked content");

    let new_root_cid = store.stat(root).await?.cid;
    info!(%cid, %new_root_cid, "content added");
    Ok(AddOutcome::Created { cid, new_root_cid })
}

async fn remove_locked(store: &dyn ContentStore, root: &str, cid: ContentId) -> CoreResult<RemoveOutcome> {
    let path = path_for(root, &cid);
    if !store.exists(&path).await? {
        info!(%cid, "content not found");
        return Ok(RemoveOutcome::NotFound { cid });
    }

    store.unlink(&path).await?;
    let new_root_cid = store.stat(root).await?.cid;
    info!(%cid, %new_root_cid, "content removed");
    Ok(RemoveOutcome::Removed { cid, new_root_cid })
}

async fn list_locked(store: &dyn ContentStore, root: &str) -> CoreResult<Listing> {
    let root_cid = store.stat(root).await?.cid;
    let cids = store
        .list(root)
        .await?
        .into_iter()
        .filter(|entry| !is_transient(&entry.name))
        .map(|entry| entry.cid)
        .collect();
    Ok(Listing { root_cid, cids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cidgate_store::{DirEntry, InMemoryContentStore, Stat, StoreError, StoreResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const ROOT: &str = "/pins";

    fn fake() -> Arc<InMemoryContentStore> {
        Arc::new(InMemoryContentStore::with_root(ROOT).unwrap())
    }

    fn service_over(store: Arc<dyn ContentStore>) -> ContentService {
        ContentService::with_store(store, ROOT)
    }

    async fn root_cid(store: &InMemoryContentStore) -> ContentId {
        store.stat(ROOT).await.unwrap().cid
    }

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        Ingest(ContentId),
        Stat(String),
        Link(String),
        Unlink(String),
        List(String),
    }

    /// Records every call and detects overlapping calls. Each call yields to
    /// the scheduler so unserialized callers would interleave.
    struct RecordingStore {
        inner: InMemoryContentStore,
        calls: Mutex<Vec<Call>>,
        in_flight: AtomicUsize,
        overlaps: AtomicUsize,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                inner: InMemoryContentStore::with_root(ROOT).unwrap(),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                overlaps: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        async fn enter(&self) {
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        fn leave(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ContentStore for RecordingStore {
        async fn ingest(&self, data: Bytes) -> StoreResult<ContentId> {
            self.enter().await;
            let out = self.inner.ingest(data).await;
            if let Ok(cid) = &out {
                self.leave(Call::Ingest(*cid));
            }
            out
        }

        async fn stat(&self, path: &str) -> StoreResult<Stat> {
            self.enter().await;
            let out = self.inner.stat(path).await;
            self.leave(Call::Stat(path.to_string()));
            out
        }

        async fn link(&self, cid: &ContentId, path: &str) -> StoreResult<()> {
            self.enter().await;
            let out = self.inner.link(cid, path).await;
            self.leave(Call::Link(path.to_string()));
            out
        }

        async fn unlink(&self, path: &str) -> StoreResult<()> {
            self.enter().await;
            let out = self.inner.unlink(path).await;
            self.leave(Call::Unlink(path.to_string()));
            out
        }

        async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>> {
            self.enter().await;
            let out = self.inner.list(path).await;
            self.leave(Call::List(path.to_string()));
            out
        }
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum FailOn {
        Ingest,
        Stat,
        StatRoot,
        Link,
        Unlink,
        List,
    }

    /// Delegates to an in-memory store but fails one kind of call.
    struct FailingStore {
        inner: InMemoryContentStore,
        fail_on: FailOn,
    }

    impl FailingStore {
        fn new(fail_on: FailOn) -> Self {
            Self {
                inner: InMemoryContentStore::with_root(ROOT).unwrap(),
                fail_on,
            }
        }

        fn injected() -> StoreError {
            StoreError::Transport("injected failure".into())
        }
    }

    #[async_trait]
    impl ContentStore for FailingStore {
        async fn ingest(&self, data: Bytes) -> StoreResult<ContentId> {
            if self.fail_on == FailOn::Ingest {
                return Err(Self::injected());
            }
            self.inner.ingest(data).await
        }

        async fn stat(&self, path: &str) -> StoreResult<Stat> {
            let is_root = path == ROOT;
            if (self.fail_on == FailOn::Stat && !is_root) || (self.fail_on == FailOn::StatRoot && is_root) {
                return Err(Self::injected());
            }
            self.inner.stat(path).await
        }

        async fn link(&self, cid: &ContentId, path: &str) -> StoreResult<()> {
            if self.fail_on == FailOn::Link {
                return Err(Self::injected());
            }
            self.inner.link(cid, path).await
        }

        async fn unlink(&self, path: &str) -> StoreResult<()> {
            if self.fail_on == FailOn::Unlink {
                return Err(Self::injected());
            }
            self.inner.unlink(path).await
        }

        async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>> {
            if self.fail_on == FailOn::List {
                return Err(Self::injected());
            }
            self.inner.list(path).await
        }
    }

    // -----------------------------------------------------------------------
    // Add
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_twice_creates_then_conflicts() {
        let store = fake();
        let service = service_over(store.clone());
        let before = root_cid(&store).await;

        let first = service.add(Bytes::from_static(b"payload")).await.unwrap();
        let AddOutcome::Created { cid, new_root_cid } = first else {
            panic!("expected Created, got {first:?}");
        };
        assert_ne!(new_root_cid, before);
        assert_eq!(root_cid(&store).await, new_root_cid);

        let second = service.add(Bytes::from_static(b"payload")).await.unwrap();
        assert_eq!(second, AddOutcome::Conflict { cid });
        assert_eq!(root_cid(&store).await, new_root_cid);
        assert_eq!(store.linked_count(), 1);
    }

    #[tokio::test]
    async fn add_links_entry_at_derived_path() {
        let store = fake();
        let service = service_over(store.clone());
        let outcome = service.add(Bytes::from_static(b"abc")).await.unwrap();
        let path = path_for(ROOT, outcome.cid());
        assert_eq!(store.stat(&path).await.unwrap().cid, *outcome.cid());
    }

    #[tokio::test]
    async fn add_conflict_still_ingests() {
        let store = Arc::new(RecordingStore::new());
        let service = service_over(store.clone());
        service.add(Bytes::from_static(b"dup")).await.unwrap();
        let before = store.calls().len();

        let outcome = service.add(Bytes::from_static(b"dup")).await.unwrap();
        let cid = *outcome.cid();
        let calls = store.calls()[before..].to_vec();
        assert_eq!(
            calls,
            vec![Call::Ingest(cid), Call::Stat(path_for(ROOT, &cid))]
        );
    }

    #[tokio::test]
    async fn add_ingest_failure_creates_nothing() {
        let store = Arc::new(FailingStore::new(FailOn::Ingest));
        let service = service_over(store.clone());
        let err = service.add(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(_)));
        assert_eq!(store.inner.linked_count(), 0);
    }

    #[tokio::test]
    async fn add_existence_check_failure_is_operation_failed() {
        let store = Arc::new(FailingStore::new(FailOn::Stat));
        let service = service_over(store.clone());
        let err = service.add(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(StoreError::Transport(_))));
        assert_eq!(store.inner.linked_count(), 0);
    }

    #[tokio::test]
    async fn add_link_failure_is_indeterminate() {
        let store = Arc::new(FailingStore::new(FailOn::Link));
        let service = service_over(store);
        let err = service.add(Bytes::from_static(b"x")).await.unwrap_err();
        match err {
            CoreError::LinkIndeterminate { cid, path, .. } => {
                assert_eq!(path, path_for(ROOT, &cid));
            }
            other => panic!("expected LinkIndeterminate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn add_root_stat_failure_after_link() {
        let store = Arc::new(FailingStore::new(FailOn::StatRoot));
        let service = service_over(store.clone());
        let err = service.add(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(_)));
        // The link itself went through.
        assert_eq!(store.inner.linked_count(), 1);
    }

    #[tokio::test]
    async fn add_empty_payload() {
        let store = fake();
        let service = service_over(store);
        assert!(service.add(Bytes::new()).await.unwrap().is_created());
    }

    // -----------------------------------------------------------------------
    // Remove
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn remove_absent_is_not_found_and_root_unchanged() {
        let store = fake();
        let service = service_over(store.clone());
        service.add(Bytes::from_static(b"keep")).await.unwrap();
        let before = root_cid(&store).await;

        let absent = ContentId::from_blake3(cidgate_types::codec::RAW, b"absent");
        let outcome = service.remove(&absent.to_string()).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::NotFound { cid: absent });
        assert_eq!(root_cid(&store).await, before);
    }

    #[tokio::test]
    async fn remove_invalid_identifier_never_touches_store() {
        let store = Arc::new(RecordingStore::new());
        let service = service_over(store.clone());
        let err = service.remove("not-a-cid").await.unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().starts_with("'not-a-cid' is not a CID"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn remove_unlinks_and_reports_new_root() {
        let store = fake();
        let service = service_over(store.clone());
        let added = service.add(Bytes::from_static(b"gone")).await.unwrap();
        let after_add = root_cid(&store).await;

        let outcome = service.remove(&added.cid().to_string()).await.unwrap();
        let RemoveOutcome::Removed { cid, new_root_cid } = outcome else {
            panic!("expected Removed, got {outcome:?}");
        };
        assert_eq!(&cid, added.cid());
        assert_ne!(new_root_cid, after_add);
        assert!(!service.list().await.unwrap().contains(&cid));
    }

    #[tokio::test]
    async fn remove_unlink_failure_is_operation_failed() {
        let store = Arc::new(FailingStore::new(FailOn::Unlink));
        let service = service_over(store.clone());
        let added = service.add(Bytes::from_static(b"x")).await.unwrap();
        let err = service.remove_cid(*added.cid()).await.unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(_)));
        assert_eq!(store.inner.linked_count(), 1);
    }

    // -----------------------------------------------------------------------
    // List / health
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn list_skips_transient_entries() {
        let store = fake();
        let service = service_over(store.clone());
        let kept = service.add(Bytes::from_static(b"kept")).await.unwrap();

        let scratch = store.ingest(Bytes::from_static(b"scratch")).await.unwrap();
        store.link(&scratch, "/pins/tmp_upload").await.unwrap();

        let listing = service.list().await.unwrap();
        assert_eq!(listing.cids, vec![*kept.cid()]);
        assert!(!listing.contains(&scratch));
        assert_eq!(listing.root_cid, root_cid(&store).await);
    }

    #[tokio::test]
    async fn list_missing_root_is_operation_failed() {
        let store: Arc<dyn ContentStore> = Arc::new(InMemoryContentStore::new());
        let service = service_over(store);
        let err = service.list().await.unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn list_failure_is_operation_failed() {
        let store = Arc::new(FailingStore::new(FailOn::List));
        let service = service_over(store);
        assert!(matches!(
            service.list().await.unwrap_err(),
            CoreError::OperationFailed(_)
        ));
    }

    #[tokio::test]
    async fn health_does_not_call_store() {
        let store = Arc::new(RecordingStore::new());
        let service = service_over(store.clone());
        service.health().await.unwrap();
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn hello_scenario() {
        let store = fake();
        let service = service_over(store.clone());

        let first = service.add(Bytes::from_static(b"hello")).await.unwrap();
        let hello = ContentId::from_blake3(cidgate_types::codec::RAW, b"hello");
        let r1 = match first {
            AddOutcome::Created { cid, new_root_cid } => {
                assert_eq!(cid, hello);
                new_root_cid
            }
            other => panic!("expected Created, got {other:?}"),
        };

        let again = service.add(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(again, AddOutcome::Conflict { cid: hello });
        assert_eq!(root_cid(&store).await, r1);

        let removed = service.remove(&hello.to_string()).await.unwrap();
        let r2 = *removed.new_root_cid().expect("root changes on remove");
        assert_ne!(r2, r1);

        let listing = service.list().await.unwrap();
        assert_eq!(listing, Listing { root_cid: r2, cids: vec![] });
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Splits the call log back into operations. Any interleaving of two
    /// operations' call sequences fails to parse.
    fn parse_operations(calls: &[Call]) -> usize {
        let root = ROOT.to_string();
        let mut i = 0;
        let mut ops = 0;
        while i < calls.len() {
            match &calls[i] {
                Call::Ingest(cid) => {
                    let path = path_for(ROOT, cid);
                    assert_eq!(calls.get(i + 1), Some(&Call::Stat(path.clone())), "add at {i}");
                    i += 2;
                    if calls.get(i) == Some(&Call::Link(path)) {
                        assert_eq!(calls.get(i + 1), Some(&Call::Stat(root.clone())), "add link at {i}");
                        i += 2;
                    }
                }
                Call::Stat(p) if *p == root => {
                    assert_eq!(calls.get(i + 1), Some(&Call::List(root.clone())), "list at {i}");
                    i += 2;
                }
                Call::Stat(p) => {
                    let path = p.clone();
                    i += 1;
                    if calls.get(i) == Some(&Call::Unlink(path)) {
                        assert_eq!(calls.get(i + 1), Some(&Call::Stat(root.clone())), "remove at {i}");
                        i += 2;
                    }
                }
                other => panic!("call {other:?} at {i} does not start an operation"),
            }
            ops += 1;
        }
        ops
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_operations_are_totally_ordered() {
        let store = Arc::new(RecordingStore::new());
        let service = service_over(store.clone());

        let mut seeded = Vec::new();
        for i in 0..8u8 {
            let outcome = service.add(Bytes::from(vec![b's', i])).await.unwrap();
            seeded.push(*outcome.cid());
        }
        let seeded_ops = store.calls().len();
        assert_eq!(parse_operations(&store.calls()), 8);

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let svc = service.clone();
            handles.push(tokio::spawn(async move {
                svc.add(Bytes::from(vec![b'n', i])).await.map(|_| ())
            }));
            let svc = service.clone();
            let cid = seeded[i as usize];
            handles.push(tokio::spawn(async move {
                svc.remove_cid(cid).await.map(|_| ())
            }));
            if i % 2 == 0 {
                let svc = service.clone();
                handles.push(tokio::spawn(async move { svc.list().await.map(|_| ()) }));
                let svc = service.clone();
                handles.push(tokio::spawn(async move {
                    svc.add(Bytes::from_static(b"shared")).await.map(|_| ())
                }));
            }
        }
        let spawned = handles.len();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.overlaps.load(Ordering::SeqCst), 0);
        let calls = store.calls();
        assert_eq!(parse_operations(&calls[seeded_ops..]), spawned);

        let listing = service.list().await.unwrap();
        assert_eq!(listing.cids.len(), 8 + 1);
        for cid in &seeded {
            assert!(!listing.contains(cid));
        }
        // "shared" was submitted four times but linked once.
        let shared = ContentId::from_blake3(cidgate_types::codec::RAW, b"shared");
        assert_eq!(listing.cids.iter().filter(|c| **c == shared).count(), 1);
    }

    #[tokio::test]
    async fn clones_share_one_gate() {
        let service = service_over(fake());
        let clone = service.clone();
        assert!(Arc::ptr_eq(service.gate(), clone.gate()));
        assert_eq!(clone.root(), ROOT);
    }
}
