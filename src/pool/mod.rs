//! Per-origin connection pool: idle queues bounded by a permit semaphore.
//!
//! Grounded on `hyper-util`'s `client::legacy::pool` (see
//! `other_examples/af6f8caa_tottoto-hyper-util__src-client-legacy-pool.rs.rs`): an `Idle<T>`
//! entry per connection sitting in keep-alive, evicted lazily at checkout time once it has
//! outlived `idle_timeout`. Unlike that pool, concurrency here is bounded by an explicit
//! `tokio::sync::Semaphore` permit per origin rather than an unbounded idle list — a permit
//! is held for as long as a connection exists, whether idle or leased out, so the semaphore's
//! outstanding-permit count is always exactly the number of live connections for that origin.

use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    sync::{Arc, Weak},
    time::{Duration, Instant},
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    hash::HashMap,
    sync::Mutex,
};

/// A connection usable by a transport engine.
///
/// `is_open` is consulted both when popping from the idle queue (to skip dead entries) and
/// when a lease is dropped (to decide whether to return the connection to the idle queue or
/// let its permit go free).
pub trait PooledConnection: Send + 'static {
    /// Whether the connection is still believed usable.
    fn is_open(&self) -> bool;
}

/// The per-origin key a connection is pooled under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionIdentity {
    host: String,
    port: u16,
    secure: bool,
}

impl ConnectionIdentity {
    /// Creates an identity for `host:port`, `secure` indicating TLS was negotiated.
    pub fn new(host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
        }
    }

    /// The origin host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The origin port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this origin is TLS-secured.
    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", if self.secure { "https" } else { "http" }, self.host, self.port)
    }
}

/// Tunables for a [`ConnectionPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Maximum number of idle connections retained per origin.
    pub max_idle_per_host: usize,
    /// Maximum number of live connections (idle or leased) per origin.
    pub max_connections_per_host: usize,
    /// How long a connection may sit idle before it is evicted at the next checkout.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 6,
            max_connections_per_host: 6,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Soft cap on the number of distinct origins tracked in `Inner::permits`/`Inner::idle` at
/// once. Past this, [`ConnectionPool::semaphore_for`] sweeps identities whose permit set is
/// fully idle (no outstanding permits) and whose idle queue is empty, so a client that churns
/// through many short-lived origins doesn't grow these maps without bound.
const KEY_TABLE_SOFT_CAP: usize = 1000;

struct IdleEntry<T> {
    value: T,
    idle_at: Instant,
    permit: OwnedSemaphorePermit,
}

struct Inner<T> {
    idle: HashMap<ConnectionIdentity, VecDeque<IdleEntry<T>>>,
    permits: HashMap<ConnectionIdentity, Arc<Semaphore>>,
}

/// A bounded per-origin connection pool.
///
/// Cloning a `ConnectionPool` is cheap and shares the same underlying state, matching the
/// client's expectation that it can hand a pool handle to every transport engine instance.
pub struct ConnectionPool<T: PooledConnection> {
    inner: Arc<Mutex<Inner<T>>>,
    config: PoolConfig,
}

impl<T: PooledConnection> Clone for ConnectionPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config,
        }
    }
}

impl<T: PooledConnection> ConnectionPool<T> {
    /// Creates a new pool with the given configuration.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                idle: HashMap::default(),
                permits: HashMap::default(),
            })),
            config,
        }
    }

    fn semaphore_for(&self, identity: &ConnectionIdentity) -> Arc<Semaphore> {
        let mut inner = self.inner.lock();
        let semaphore = inner
            .permits
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_connections_per_host)))
            .clone();
        if inner.permits.len() > KEY_TABLE_SOFT_CAP {
            Self::evict_idle_identities(&mut inner, self.config.max_connections_per_host);
        }
        semaphore
    }

    /// Drops permit-table and idle-queue entries for origins with no live connections
    /// (permit set fully available, idle queue empty), bounding the two maps' growth across a
    /// client's lifetime even as it talks to many distinct origins.
    fn evict_idle_identities(inner: &mut Inner<T>, max_connections_per_host: usize) {
        let mut to_evict = Vec::new();
        for (identity, semaphore) in inner.permits.iter() {
            let idle_is_empty = inner.idle.get(identity).map_or(true, VecDeque::is_empty);
            if semaphore.available_permits() == max_connections_per_host && idle_is_empty {
                to_evict.push(identity.clone());
            }
        }
        for identity in to_evict {
            inner.permits.remove(&identity);
            inner.idle.remove(&identity);
        }
    }

    /// Pops the newest still-fresh idle connection for `identity`, discarding closed or
    /// expired entries found along the way (entries are pushed LIFO, so the newest is tried
    /// first, on the theory that the most recently idle connection is most likely still warm).
    fn pop_idle(&self, identity: &ConnectionIdentity) -> Option<IdleEntry<T>> {
        let mut inner = self.inner.lock();
        let list = inner.idle.get_mut(identity)?;
        while let Some(entry) = list.pop_back() {
            if !entry.value.is_open() {
                continue;
            }
            if entry.idle_at.elapsed() > self.config.idle_timeout {
                continue;
            }
            if list.is_empty() {
                inner.idle.remove(identity);
            }
            return Some(entry);
        }
        inner.idle.remove(identity);
        None
    }

    /// Acquires a connection for `identity`: reuses a fresh idle connection if one exists,
    /// otherwise waits for a free permit (bounded by `max_connections_per_host`) and calls
    /// `connect` to establish a new one.
    ///
    /// Honors `cancel`: if it fires while waiting for a permit, returns a cancelled error and
    /// never calls `connect`.
    pub async fn acquire<F, Fut>(
        &self,
        identity: ConnectionIdentity,
        cancel: &CancellationToken,
        connect: F,
    ) -> Result<ConnectionLease<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(entry) = self.pop_idle(&identity) {
            return Ok(ConnectionLease {
                identity,
                value: Some(entry.value),
                permit: Some(entry.permit),
                pool: Arc::downgrade(&self.inner),
                max_idle_per_host: self.config.max_idle_per_host,
                reused: true,
            });
        }

        let semaphore = self.semaphore_for(&identity);
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::cancelled()),
            result = semaphore.acquire_owned() => result.expect("semaphore is never closed"),
        };

        match connect().await {
            Ok(value) => Ok(ConnectionLease {
                identity,
                value: Some(value),
                permit: Some(permit),
                pool: Arc::downgrade(&self.inner),
                max_idle_per_host: self.config.max_idle_per_host,
                reused: false,
            }),
            Err(err) => {
                drop(permit);
                Err(err)
            }
        }
    }

    /// Number of idle connections currently retained for `identity`. For tests and metrics.
    pub fn idle_count(&self, identity: &ConnectionIdentity) -> usize {
        self.inner
            .lock()
            .idle
            .get(identity)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

/// A leased connection, returned to the pool's idle queue on drop if still open.
///
/// Holding a `ConnectionLease` is what keeps its origin's semaphore permit alive: dropping it
/// either reinserts `(value, permit)` into the idle queue (connection still open, queue under
/// its cap) or drops the permit outright, freeing the slot for a fresh connection.
pub struct ConnectionLease<T: PooledConnection> {
    identity: ConnectionIdentity,
    value: Option<T>,
    permit: Option<OwnedSemaphorePermit>,
    pool: Weak<Mutex<Inner<T>>>,
    max_idle_per_host: usize,
    reused: bool,
}

impl<T: PooledConnection> ConnectionLease<T> {
    /// The origin this connection belongs to.
    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    /// Whether this connection was reused from the idle queue rather than freshly connected.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    /// Marks the connection as no longer reusable, so it is dropped (and its permit freed)
    /// rather than returned to the idle queue when the lease is dropped.
    pub fn dispose(&mut self) {
        self.value = None;
    }
}

impl<T: PooledConnection> std::ops::Deref for ConnectionLease<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value.as_ref().expect("value only taken in Drop")
    }
}

impl<T: PooledConnection> std::ops::DerefMut for ConnectionLease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("value only taken in Drop")
    }
}

impl<T: PooledConnection> Drop for ConnectionLease<T> {
    fn drop(&mut self) {
        let (Some(value), Some(permit)) = (self.value.take(), self.permit.take()) else {
            return;
        };
        if !value.is_open() {
            return;
        }
        let Some(pool) = self.pool.upgrade() else {
            return;
        };
        let mut inner = pool.lock();
        let list = inner.idle.entry(self.identity.clone()).or_default();
        if list.len() >= self.max_idle_per_host {
            return;
        }
        list.push_back(IdleEntry {
            value,
            idle_at: Instant::now(),
            permit,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fake(bool);
    impl PooledConnection for Fake {
        fn is_open(&self) -> bool {
            self.0
        }
    }

    fn id() -> ConnectionIdentity {
        ConnectionIdentity::new("example.test", 443, true)
    }

    #[tokio::test]
    async fn reuses_idle_connection() {
        let pool: ConnectionPool<Fake> = ConnectionPool::new(PoolConfig::default());
        let cancel = CancellationToken::new();

        let lease = pool
            .acquire(id(), &cancel, || async { Ok(Fake(true)) })
            .await
            .unwrap();
        assert!(!lease.is_reused());
        drop(lease);
        assert_eq!(pool.idle_count(&id()), 1);

        let lease2 = pool
            .acquire(id(), &cancel, || async { panic!("should reuse") })
            .await
            .unwrap();
        assert!(lease2.is_reused());
    }

    #[tokio::test]
    async fn disposed_connection_is_not_reinserted() {
        let pool: ConnectionPool<Fake> = ConnectionPool::new(PoolConfig::default());
        let cancel = CancellationToken::new();
        let mut lease = pool
            .acquire(id(), &cancel, || async { Ok(Fake(true)) })
            .await
            .unwrap();
        lease.dispose();
        drop(lease);
        assert_eq!(pool.idle_count(&id()), 0);
    }

    #[tokio::test]
    async fn permit_conservation_bounds_concurrent_connections() {
        let config = PoolConfig {
            max_idle_per_host: 1,
            max_connections_per_host: 1,
            idle_timeout: Duration::from_secs(90),
        };
        let pool: ConnectionPool<Fake> = ConnectionPool::new(config);
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let lease = pool
            .acquire(id(), &cancel, {
                let calls = calls.clone();
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Fake(true))
                }
            })
            .await
            .unwrap();

        let cancel_for_second = CancellationToken::new();
        cancel_for_second.cancel();
        let second = pool
            .acquire(id(), &cancel_for_second, || async { Ok(Fake(true)) })
            .await;
        assert!(second.is_err());

        drop(lease);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn key_table_is_swept_once_it_exceeds_the_soft_cap() {
        let pool: ConnectionPool<Fake> = ConnectionPool::new(PoolConfig::default());
        let cancel = CancellationToken::new();

        for port in 0..=KEY_TABLE_SOFT_CAP as u16 {
            let identity = ConnectionIdentity::new("example.test", port, true);
            let mut lease = pool.acquire(identity, &cancel, || async { Ok(Fake(true)) }).await.unwrap();
            lease.dispose();
            drop(lease);
        }

        let remaining = pool.inner.lock().permits.len();
        assert!(
            remaining <= KEY_TABLE_SOFT_CAP,
            "expected the sweep to have brought the permit table back under the soft cap, got {remaining}"
        );
    }
}
