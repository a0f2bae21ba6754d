//! Versioned index snapshot with TTL and explicit invalidation.
//!
//! Readers clone an `Arc<IndexSnapshot>` and score against it for the whole
//! query, so a concurrent rebuild never changes the statistics under them.
//! Every invalidation bumps an epoch; a rebuild started under an older epoch
//! is handed back to its caller but never installed.

use crate::error::EngineResult;
use crate::search::bm25::{Bm25Index, Bm25Params};
use crate::types::Document;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct IndexSnapshot {
    pub documents: Vec<Document>,
    pub index: Bm25Index,
    pub built_at: DateTime<Utc>,
    pub version: u64,
    /// Distinct jurisdictions, sorted.
    pub jurisdictions: Vec<String>,
}

impl IndexSnapshot {
    /// Index `documents` in corpus order. CPU-bound; callers on the async
    /// runtime should run it on the blocking pool.
    pub fn build(documents: Vec<Document>, params: Bm25Params, title_weight: usize, version: u64) -> Self {
        let index = Bm25Index::build_documents(&documents, params, title_weight);
        let jurisdictions = documents
            .iter()
            .map(|d| d.jurisdiction.trim().to_string())
            .filter(|j| !j.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            documents,
            index,
            built_at: Utc::now(),
            version,
            jurisdictions,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

struct Installed {
    snapshot: Arc<IndexSnapshot>,
    at: Instant,
}

pub struct IndexCache {
    ttl: Duration,
    state: RwLock<Option<Installed>>,
    epoch: AtomicU64,
    versions: AtomicU64,
}

impl IndexCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
            epoch: AtomicU64::new(0),
            versions: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Installed snapshot, stale or not.
    pub fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.state.read().as_ref().map(|s| s.snapshot.clone())
    }

    /// Installed snapshot if it is younger than the TTL.
    pub fn fresh(&self) -> Option<Arc<IndexSnapshot>> {
        self.state
            .read()
            .as_ref()
            .filter(|s| s.at.elapsed() < self.ttl)
            .map(|s| s.snapshot.clone())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Reserve the version number of the next build.
    pub fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install `snapshot` if no invalidation happened since `epoch` and it is
    /// newer than what is installed. Returns whether it was installed.
    pub fn install(&self, snapshot: Arc<IndexSnapshot>, epoch: u64) -> bool {
        let mut state = self.state.write();
        if self.epoch() != epoch {
            return false;
        }
        if state.as_ref().is_some_and(|s| s.snapshot.version >= snapshot.version) {
            return false;
        }
        *state = Some(Installed {
            snapshot,
            at: Instant::now(),
        });
        true
    }

    /// Drop the installed snapshot and fence off in-flight rebuilds.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *state = None;
    }

    /// Fresh snapshot, building one with `build(version)` when needed.
    ///
    /// Concurrent callers may each rebuild; the newest version wins the
    /// install and the others are used once and dropped.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> EngineResult<Arc<IndexSnapshot>>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = EngineResult<IndexSnapshot>>,
    {
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let epoch = self.epoch();
        let version = self.next_version();
        let snapshot = Arc::new(build(version).await?);

        if self.install(snapshot.clone(), epoch) {
            tracing::info!(
                version,
                docs = snapshot.len(),
                jurisdictions = snapshot.jurisdictions.len(),
                "Installed index snapshot"
            );
        } else {
            tracing::debug!(version, "Discarding snapshot superseded during rebuild");
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::types::{DocumentStatus, DocumentType};
    use chrono::NaiveDate;

    fn doc(id: &str, jurisdiction: &str, title: &str) -> Document {
        Document {
            id: id.into(),
            jurisdiction: jurisdiction.into(),
            document_type: DocumentType::Ordinance,
            official_number: id.into(),
            title: title.into(),
            content: None,
            published_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            status: DocumentStatus::Active,
            source_url: String::new(),
            document_types: None,
        }
    }

    fn snapshot(version: u64) -> IndexSnapshot {
        IndexSnapshot::build(
            vec![doc("1", "Merlo", "Tasa vial"), doc("2", "Carlos Tejedor", "Habilitaciones"), doc("3", "Merlo", "Presupuesto")],
            Bm25Params::default(),
            3,
            version,
        )
    }

    #[test]
    fn test_snapshot_lists_sorted_jurisdictions() {
        let s = snapshot(1);
        assert_eq!(s.jurisdictions, vec!["Carlos Tejedor", "Merlo"]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.index.len(), 3);
    }

    #[tokio::test]
    async fn test_get_or_build_reuses_fresh_snapshot() {
        let cache = IndexCache::new(Duration::from_secs(60));
        let first = cache.get_or_build(|v| async move { Ok(snapshot(v)) }).await.unwrap();
        let second = cache
            .get_or_build(|_| async { Err(EngineError::IndexBuild("must not rebuild".into())) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.version, 1);
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_rebuilt_with_newer_version() {
        let cache = IndexCache::new(Duration::ZERO);
        let first = cache.get_or_build(|v| async move { Ok(snapshot(v)) }).await.unwrap();
        let second = cache.get_or_build(|v| async move { Ok(snapshot(v)) }).await.unwrap();
        assert!(second.version > first.version);
        assert!(second.built_at >= first.built_at);
    }

    #[tokio::test]
    async fn test_invalidation_during_rebuild_blocks_install() {
        let cache = IndexCache::new(Duration::from_secs(60));
        let built = cache
            .get_or_build(|v| {
                cache.invalidate();
                async move { Ok(snapshot(v)) }
            })
            .await
            .unwrap();
        assert_eq!(built.len(), 3);
        assert!(cache.current().is_none());
    }

    #[test]
    fn test_older_version_never_replaces_newer() {
        let cache = IndexCache::new(Duration::from_secs(60));
        let epoch = cache.epoch();
        assert!(cache.install(Arc::new(snapshot(2)), epoch));
        assert!(!cache.install(Arc::new(snapshot(1)), epoch));
        assert_eq!(cache.current().unwrap().version, 2);

        cache.invalidate();
        assert!(cache.fresh().is_none());
        assert!(!cache.install(Arc::new(snapshot(3)), epoch));
    }

    #[tokio::test]
    async fn test_build_errors_propagate() {
        let cache = IndexCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_build(|_| async { Err(EngineError::IndexBuild("boom".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IndexBuild(_)));
        assert!(cache.current().is_none());
    }
}
