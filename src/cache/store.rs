use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use databyte_api_types::PageResult;
use metrics::counter;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::trace;

use super::keys::RequestSignature;

/// Token identifying one issued request; larger is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Last successfully fetched page for a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub result: PageResult,
    pub captured_at: OffsetDateTime,
}

impl CacheEntry {
    pub fn new(result: PageResult) -> Self {
        Self {
            result,
            captured_at: OffsetDateTime::now_utc(),
        }
    }
}

/// How the newest generation of a signature ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Committed(CacheEntry),
    Failed(String),
    /// Cancelled before it produced a result.
    Abandoned,
}

/// Latest settlement announced for a signature, tagged with its generation.
pub type Announcement = Option<(Generation, Settlement)>;

#[derive(Default)]
struct SessionInner {
    entries: DashMap<RequestSignature, CacheEntry>,
    generations: DashMap<RequestSignature, Generation>,
    announcements: DashMap<RequestSignature, watch::Sender<Announcement>>,
    next_generation: AtomicU64,
}

/// In-memory cache shared by every handle of one client session.
///
/// Entries are never expired or evicted, only replaced by a newer
/// successful fetch of the same signature. Every settlement of a current
/// generation is also announced per signature, so handles whose own request
/// was superseded can follow the one that won.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for `key`, counted as a hit or miss.
    pub fn lookup(&self, key: &RequestSignature) -> Option<CacheEntry> {
        let entry = self.peek(key);
        if entry.is_some() {
            counter!("databyte_session_cache_hit_total").increment(1);
        } else {
            counter!("databyte_session_cache_miss_total").increment(1);
        }
        entry
    }

    /// Cached entry for `key` without touching the hit/miss counters.
    pub fn peek(&self, key: &RequestSignature) -> Option<CacheEntry> {
        self.inner
            .entries
            .get(key)
            .map(|entry| entry.value().clone())
    }

    /// Issue a new generation for `key`, superseding every earlier one.
    pub fn mint(&self, key: &RequestSignature) -> Generation {
        let generation = Generation(self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1);
        self.inner.generations.insert(key.clone(), generation);
        trace!(key = %key, generation = generation.0, "request generation minted");
        generation
    }

    /// Settlements announced for `key`, starting from the latest one.
    pub fn announcements(&self, key: &RequestSignature) -> watch::Receiver<Announcement> {
        self.inner
            .announcements
            .entry(key.clone())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Store `entry` and run `on_commit` if `generation` is still the newest for `key`.
    ///
    /// The generation shard stays locked until `on_commit` returns, so a
    /// concurrent [`Session::mint`] cannot interleave with the publication.
    /// Returns `false` when the result was superseded and nothing was written.
    pub fn commit<F>(
        &self,
        key: &RequestSignature,
        generation: Generation,
        entry: CacheEntry,
        on_commit: F,
    ) -> bool
    where
        F: FnOnce(&CacheEntry),
    {
        let Some(current) = self.inner.generations.get(key) else {
            return self.superseded(key, generation);
        };
        if *current != generation {
            drop(current);
            return self.superseded(key, generation);
        }

        self.inner.entries.insert(key.clone(), entry.clone());
        on_commit(&entry);
        self.announce(key, generation, Settlement::Committed(entry));
        drop(current);
        true
    }

    /// Record a failed fetch and run `on_reject` if `generation` is still the newest for `key`.
    pub fn reject<F>(
        &self,
        key: &RequestSignature,
        generation: Generation,
        message: String,
        on_reject: F,
    ) -> bool
    where
        F: FnOnce(),
    {
        let Some(current) = self.inner.generations.get(key) else {
            return self.superseded(key, generation);
        };
        if *current != generation {
            drop(current);
            return self.superseded(key, generation);
        }

        on_reject();
        self.announce(key, generation, Settlement::Failed(message));
        drop(current);
        true
    }

    /// Announce that `generation` will never settle, if it is still the newest for `key`.
    pub fn abandon(&self, key: &RequestSignature, generation: Generation) {
        if self.is_current(key, generation) {
            trace!(key = %key, generation = generation.0, "pending generation abandoned");
            self.announce(key, generation, Settlement::Abandoned);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn is_current(&self, key: &RequestSignature, generation: Generation) -> bool {
        self.inner
            .generations
            .get(key)
            .is_some_and(|current| *current == generation)
    }

    fn announce(&self, key: &RequestSignature, generation: Generation, settlement: Settlement) {
        let sender = self
            .inner
            .announcements
            .entry(key.clone())
            .or_insert_with(|| watch::channel(None).0);
        sender.send_if_modified(|latest| {
            // An abandonment never overrides a real outcome of the same generation.
            let stale = latest.as_ref().is_some_and(|(announced, _)| {
                *announced > generation
                    || (*announced == generation && settlement == Settlement::Abandoned)
            });
            if stale {
                return false;
            }
            *latest = Some((generation, settlement));
            true
        });
    }

    fn superseded(&self, key: &RequestSignature, generation: Generation) -> bool {
        counter!("databyte_fetch_superseded_total").increment(1);
        trace!(key = %key, generation = generation.0, "superseded result discarded");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CollectionQuery;
    use databyte_api_types::Record;
    use serde_json::json;

    fn page(id: &str) -> PageResult {
        let record: Record = serde_json::from_value(json!({ "id": id })).expect("record");
        PageResult::single_page(vec![record])
    }

    fn key(name: &str) -> RequestSignature {
        CollectionQuery::new(name).signature()
    }

    #[test]
    fn only_the_newest_generation_commits() {
        let session = Session::new();
        let key = key("projects");
        let first = session.mint(&key);
        let second = session.mint(&key);
        assert!(second > first);

        let mut published = Vec::new();
        let fresh = CacheEntry::new(page("new"));
        let committed = session.commit(&key, second, fresh, |entry| {
            published.push(entry.result.data[0].id().to_string());
        });
        assert!(committed);
        let stale = CacheEntry::new(page("old"));
        let committed = session.commit(&key, first, stale, |entry| {
            published.push(entry.result.data[0].id().to_string());
        });
        assert!(!committed);

        assert_eq!(published, vec!["new"]);
        let cached = session.peek(&key).expect("entry");
        assert_eq!(cached.result.data[0].id(), "new");
    }

    #[test]
    fn unminted_keys_never_commit() {
        let session = Session::new();
        let key = key("blogs");
        let foreign = session.mint(&CollectionQuery::new("members").signature());
        assert!(!session.commit(&key, foreign, CacheEntry::new(page("x")), |_| {}));
        assert!(session.is_empty());
    }

    #[test]
    fn generations_are_tracked_per_key() {
        let session = Session::new();
        let projects = key("projects");
        let blogs = key("blogs");
        let for_projects = session.mint(&projects);
        let for_blogs = session.mint(&blogs);

        assert!(session.is_current(&projects, for_projects));
        assert!(session.is_current(&blogs, for_blogs));
        assert!(!session.is_current(&projects, for_blogs));
    }

    #[test]
    fn clones_share_the_same_maps() {
        let session = Session::new();
        let other = session.clone();
        let key = key("members");
        let generation = session.mint(&key);
        assert!(other.commit(&key, generation, CacheEntry::new(page("m1")), |_| {}));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn failures_respect_generations() {
        let session = Session::new();
        let key = key("projects");
        let stale = session.mint(&key);
        let fresh = session.mint(&key);

        let mut ran = Vec::new();
        assert!(!session.reject(&key, stale, "old".into(), || ran.push("stale")));
        assert!(session.reject(&key, fresh, "new".into(), || ran.push("fresh")));
        assert_eq!(ran, vec!["fresh"]);
        assert_eq!(
            *session.announcements(&key).borrow(),
            Some((fresh, Settlement::Failed("new".into())))
        );
    }

    #[test]
    fn commits_are_announced_to_followers() {
        let session = Session::new();
        let key = key("projects");
        let followers = session.announcements(&key);
        assert_eq!(*followers.borrow(), None);

        let generation = session.mint(&key);
        let entry = CacheEntry::new(page("p1"));
        assert!(session.commit(&key, generation, entry.clone(), |_| {}));

        assert_eq!(
            *followers.borrow(),
            Some((generation, Settlement::Committed(entry)))
        );
    }

    #[test]
    fn only_pending_current_generations_are_abandoned() {
        let session = Session::new();
        let key = key("members");
        let older = session.mint(&key);
        let newer = session.mint(&key);

        session.abandon(&key, older);
        assert_eq!(*session.announcements(&key).borrow(), None);

        let entry = CacheEntry::new(page("m1"));
        assert!(session.commit(&key, newer, entry.clone(), |_| {}));
        session.abandon(&key, newer);
        assert_eq!(
            *session.announcements(&key).borrow(),
            Some((newer, Settlement::Committed(entry)))
        );

        let latest = session.mint(&key);
        session.abandon(&key, latest);
        assert_eq!(
            *session.announcements(&key).borrow(),
            Some((latest, Settlement::Abandoned))
        );
    }
}
