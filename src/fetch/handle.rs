use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};

use databyte_api_types::{PageResult, Pagination, Record};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CollectionQuery, Generation, RequestSignature, Session, Settlement};

use super::{
    config::FetchConfig,
    normalize::normalize,
    transport::{NetworkError, Transport},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    /// No cached data is being shown for the current request.
    Loading,
    /// Cached data is shown while a fresh copy is fetched.
    Revalidating,
    Success,
    Error,
}

/// What a consumer sees for the query it observes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub status: FetchStatus,
    pub data: Option<Vec<Record>>,
    pub pagination: Option<Pagination>,
    pub error: Option<String>,
    pub captured_at: Option<OffsetDateTime>,
}

impl QueryState {
    /// No request of this handle is in flight.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.status,
            FetchStatus::Idle | FetchStatus::Success | FetchStatus::Error
        )
    }

    fn show(&mut self, entry: &CacheEntry) {
        self.data = Some(entry.result.data.clone());
        self.pagination = Some(entry.result.pagination);
        self.captured_at = Some(entry.captured_at);
    }

    fn clear(&mut self) {
        self.data = None;
        self.pagination = None;
        self.captured_at = None;
    }
}

/// Generation a handle currently owns.
///
/// `owned` is read without locking from publication closures. Changing it
/// goes through `issue` so that minting and handing over happen as one step.
#[derive(Default)]
struct Ticket {
    owned: AtomicU64,
    issue: Mutex<()>,
}

impl Ticket {
    fn owns(&self, generation: Generation) -> bool {
        self.owned.load(Ordering::SeqCst) == generation.get()
    }

    fn current(&self) -> Generation {
        Generation::from_raw(self.owned.load(Ordering::SeqCst))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        match self.issue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(result = "poisoned_recovered", "Recovered from poisoned ticket lock");
                poisoned.into_inner()
            }
        }
    }

    /// Mint a generation for `key` and own it. A pending generation of a
    /// different `previous` signature is abandoned first.
    fn reissue(
        &self,
        session: &Session,
        previous: Option<&RequestSignature>,
        key: &RequestSignature,
    ) -> Generation {
        let _guard = self.lock();
        if let Some(previous) = previous.filter(|previous| *previous != key) {
            session.abandon(previous, self.current());
        }
        let generation = session.mint(key);
        self.owned.store(generation.get(), Ordering::SeqCst);
        generation
    }

    /// Replace an abandoned winner with a fresh generation, unless the
    /// handle has moved on since `from` was issued.
    fn take_over(
        &self,
        session: &Session,
        key: &RequestSignature,
        from: Generation,
    ) -> Option<Generation> {
        let _guard = self.lock();
        if !self.owns(from) {
            return None;
        }
        let generation = session.mint(key);
        self.owned.store(generation.get(), Ordering::SeqCst);
        Some(generation)
    }

    fn release(&self, session: &Session, key: &RequestSignature) {
        let _guard = self.lock();
        session.abandon(key, self.current());
    }
}

fn publish_success(
    state: &watch::Sender<QueryState>,
    ticket: &Ticket,
    generation: Generation,
    entry: &CacheEntry,
) {
    state.send_if_modified(|current| {
        if !ticket.owns(generation) {
            return false;
        }
        current.show(entry);
        current.status = FetchStatus::Success;
        current.error = None;
        true
    });
}

fn publish_failure(
    state: &watch::Sender<QueryState>,
    ticket: &Ticket,
    generation: Generation,
    fallback: Option<&CacheEntry>,
    message: String,
) {
    state.send_if_modified(|current| {
        if !ticket.owns(generation) {
            return false;
        }
        if current.data.is_none()
            && let Some(entry) = fallback
        {
            current.show(entry);
        }
        current.status = FetchStatus::Error;
        current.error = Some(message);
        true
    });
}

/// Shared entry point for creating query handles over one session.
#[derive(Clone)]
pub struct FetchClient {
    session: Session,
    transport: Arc<dyn Transport>,
    config: FetchConfig,
}

impl FetchClient {
    pub fn new(session: Session, transport: Arc<dyn Transport>) -> Self {
        Self {
            session,
            transport,
            config: FetchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn handle(&self) -> QueryHandle {
        let (state, _) = watch::channel(QueryState::default());
        QueryHandle {
            client: self.clone(),
            state: Arc::new(state),
            ticket: Arc::new(Ticket::default()),
            query: None,
            task: None,
        }
    }

    /// Fetch a free-form JSON document, bypassing the session cache.
    pub async fn document(&self, path: &str) -> Result<Value, NetworkError> {
        self.get_json(path).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, NetworkError> {
        let request = self.transport.get_json(path);
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| NetworkError::Timeout(limit))?,
            None => request.await,
        }
    }

    async fn fetch(&self, key: &RequestSignature) -> Result<PageResult, NetworkError> {
        normalize(self.get_json(key.as_str()).await?)
    }

    async fn settle(
        self,
        key: RequestSignature,
        mut generation: Generation,
        state: Arc<watch::Sender<QueryState>>,
        ticket: Arc<Ticket>,
    ) {
        loop {
            if self.resolve(&key, generation, &state, &ticket).await {
                return;
            }
            match self.follow(&key, generation, &state, &ticket).await {
                Some(next) => {
                    debug!(key = %key, generation = next.get(), "taking over abandoned request");
                    generation = next;
                }
                None => return,
            }
        }
    }

    /// Fetch and publish one generation. `false` when a newer one superseded it.
    async fn resolve(
        &self,
        key: &RequestSignature,
        generation: Generation,
        state: &watch::Sender<QueryState>,
        ticket: &Ticket,
    ) -> bool {
        match self.fetch(key).await {
            Ok(result) => {
                let entry = CacheEntry::new(result);
                let committed = self.session.commit(key, generation, entry, |entry| {
                    publish_success(state, ticket, generation, entry);
                });
                debug!(key = %key, generation = generation.get(), committed, "fetch settled");
                committed
            }
            Err(err) => {
                warn!(key = %key, generation = generation.get(), error = %err, "fetch failed");
                let message = err.to_string();
                let fallback = self.session.peek(key);
                self.session.reject(key, generation, message.clone(), || {
                    publish_failure(state, ticket, generation, fallback.as_ref(), message);
                })
            }
        }
    }

    /// Wait for the generation that superseded `generation` and show its outcome.
    ///
    /// Returns a fresh generation when the winner was abandoned and this
    /// handle has to fetch the key itself.
    async fn follow(
        &self,
        key: &RequestSignature,
        generation: Generation,
        state: &watch::Sender<QueryState>,
        ticket: &Ticket,
    ) -> Option<Generation> {
        let mut announcements = self.session.announcements(key);
        let latest = {
            let latest = announcements
                .wait_for(|latest| {
                    latest
                        .as_ref()
                        .is_some_and(|(announced, _)| *announced > generation)
                })
                .await
                .ok()?;
            (*latest).clone()
        };
        let (_, settlement) = latest?;

        match settlement {
            Settlement::Committed(entry) => {
                publish_success(state, ticket, generation, &entry);
                None
            }
            Settlement::Failed(message) => {
                let fallback = self.session.peek(key);
                publish_failure(state, ticket, generation, fallback.as_ref(), message);
                None
            }
            Settlement::Abandoned => ticket.take_over(&self.session, key, generation),
        }
    }
}

/// One consumer's view of a collection query.
///
/// Observing or refetching aborts this handle's previous request, and
/// dropping the handle aborts whatever is still pending. When another handle
/// issues a newer request for the same key, this handle shows that
/// request's outcome instead of its own. Both must be called from within a
/// Tokio runtime.
pub struct QueryHandle {
    client: FetchClient,
    state: Arc<watch::Sender<QueryState>>,
    ticket: Arc<Ticket>,
    query: Option<CollectionQuery>,
    task: Option<JoinHandle<()>>,
}

impl QueryHandle {
    /// Start observing `query`, publishing any cached page before the request goes out.
    pub fn observe(&mut self, query: CollectionQuery) {
        let key = query.signature();
        self.cancel_pending();

        let session = &self.client.session;
        let previous = self.query.as_ref().map(CollectionQuery::signature);
        let cached = session.lookup(&key);
        let generation = self.ticket.reissue(session, previous.as_ref(), &key);
        self.state.send_modify(|state| {
            state.error = None;
            match cached.as_ref() {
                Some(entry) => {
                    state.show(entry);
                    state.status = FetchStatus::Revalidating;
                }
                None => {
                    state.clear();
                    state.status = FetchStatus::Loading;
                }
            }
        });
        if cached.is_some() {
            debug!(key = %key, "serving cached page while revalidating");
        }

        self.query = Some(query);
        self.spawn(key, generation);
    }

    /// Re-issue the observed query. With `force_refresh` the cache is not
    /// consulted and the handle stays `Loading` until the network answers,
    /// keeping whatever data it already shows. Does nothing before the first
    /// [`observe`](Self::observe).
    pub fn refetch(&mut self, force_refresh: bool) {
        let Some(query) = self.query.clone() else {
            return;
        };
        if !force_refresh {
            self.observe(query);
            return;
        }

        let key = query.signature();
        self.cancel_pending();
        let generation = self.ticket.reissue(&self.client.session, Some(&key), &key);
        self.state.send_modify(|state| {
            state.status = FetchStatus::Loading;
            state.error = None;
        });
        self.spawn(key, generation);
    }

    pub fn query(&self) -> Option<&CollectionQuery> {
        self.query.as_ref()
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    /// Wait until no request of this handle is in flight.
    pub async fn wait_settled(&self) -> QueryState {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(QueryState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    fn spawn(&mut self, key: RequestSignature, generation: Generation) {
        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        let ticket = Arc::clone(&self.ticket);
        self.task = Some(tokio::spawn(client.settle(key, generation, state, ticket)));
    }

    fn cancel_pending(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        self.cancel_pending();
        if let Some(query) = self.query.as_ref() {
            self.ticket.release(&self.client.session, &query.signature());
        }
    }
}
