//! Per-thread search connection cache
//!
//! `ConnectionHub` keeps one search connection per calling thread together
//! with the time it was opened, and a single process-wide `modified`
//! timestamp. A thread's connection is reopened on its next `get()` when
//! it was opened before `modified`. `modified` moves forward when:
//!
//! - `invalidate()` is called
//! - a `get()` finds it older than the auto-refresh window (heartbeat)
//!
//! Each thread only touches its own slot; `modified` is a single atomic.
//! A race on `modified` can at worst cause one extra reopen.
//!
//! A slot holds a weak handle to a thread-local liveness token. When the
//! owning thread exits the token is dropped, and the slot is pruned the
//! next time a thread opens a new connection or the slots are counted.

use dashmap::DashMap;
use parking_lot::Mutex;
use scribe_core::{Clock, ConnectionOpener, ScribeResult, SearchConnection, SystemClock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::Duration;
use tracing::{debug, warn};

/// Something whose cached connections can be marked stale
pub trait Invalidate: Send + Sync {
    /// Force every cached connection to reopen on its next use
    fn invalidate(&self);
}

thread_local! {
    static THREAD_ALIVE: Arc<()> = Arc::new(());
}

/// Weak handle that dies with the calling thread
fn thread_token() -> Weak<()> {
    THREAD_ALIVE
        .try_with(Arc::downgrade)
        .unwrap_or_default()
}

struct Slot<C> {
    connection: Arc<Mutex<C>>,
    opened: Timestamp,
    alive: Weak<()>,
}

impl<C> Slot<C> {
    fn is_live(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Thread-affine cache of search connections with staleness detection
pub struct ConnectionHub<O: ConnectionOpener> {
    opener: O,
    clock: Arc<dyn Clock>,
    auto_refresh: Duration,
    modified: AtomicU64,
    slots: DashMap<ThreadId, Slot<O::Connection>>,
}

impl<O: ConnectionOpener> ConnectionHub<O> {
    /// Hub on the system clock
    pub fn new(opener: O, auto_refresh: Duration) -> Self {
        Self::with_clock(opener, auto_refresh, Arc::new(SystemClock))
    }

    /// Hub reading time from `clock`
    pub fn with_clock(opener: O, auto_refresh: Duration, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            opener,
            clock,
            auto_refresh,
            modified: AtomicU64::new(now.as_micros()),
            slots: DashMap::new(),
        }
    }

    /// The calling thread's connection, opened or reopened as needed
    ///
    /// The returned handle must stay on the calling thread's side of the
    /// program; other threads get their own through their own `get()`.
    ///
    /// # Errors
    /// Propagates open or reopen failures. A failed reopen leaves the slot
    /// stale so the next `get()` retries.
    pub fn get(&self) -> ScribeResult<Arc<Mutex<O::Connection>>> {
        let now = self.clock.now();
        self.heartbeat(now);

        let thread = std::thread::current().id();
        let cached = self
            .slots
            .get(&thread)
            .map(|slot| (Arc::clone(&slot.connection), slot.opened));

        match cached {
            Some((connection, opened)) => {
                if opened < self.modified() {
                    warn!(target: "scribe::hub", ?thread, "Reopening connection");
                    connection.lock().reopen()?;
                    if let Some(mut slot) = self.slots.get_mut(&thread) {
                        slot.opened = now;
                    }
                }
                Ok(connection)
            }
            None => {
                self.prune();
                let connection = Arc::new(Mutex::new(self.opener.open()?));
                debug!(target: "scribe::hub", ?thread, "Opened connection");
                self.slots.insert(
                    thread,
                    Slot {
                        connection: Arc::clone(&connection),
                        opened: now,
                        alive: thread_token(),
                    },
                );
                Ok(connection)
            }
        }
    }

    /// Run `f` on the calling thread's connection
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut O::Connection) -> R) -> ScribeResult<R> {
        let connection = self.get()?;
        let mut guard = connection.lock();
        Ok(f(&mut guard))
    }

    /// Mark every cached connection stale as of now
    pub fn invalidate(&self) {
        let now = self.clock.now();
        self.modified.store(now.as_micros(), Ordering::Release);
        debug!(target: "scribe::hub", at = now.as_micros(), "Invalidated search connections");
    }

    /// Current `modified` timestamp
    pub fn modified(&self) -> Timestamp {
        Timestamp::from_micros(self.modified.load(Ordering::Acquire))
    }

    /// Forget the calling thread's connection
    pub fn release(&self) -> bool {
        self.slots.remove(&std::thread::current().id()).is_some()
    }

    /// Number of live threads holding a cached connection
    pub fn cached_connections(&self) -> usize {
        self.prune();
        self.slots.len()
    }

    /// Drop the slots of threads that have exited
    fn prune(&self) {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.is_live());
        let pruned = before.saturating_sub(self.slots.len());
        if pruned > 0 {
            debug!(target: "scribe::hub", pruned, "Dropped connections of exited threads");
        }
    }

    fn heartbeat(&self, now: Timestamp) {
        if self.modified().saturating_add(self.auto_refresh) < now {
            self.modified.store(now.as_micros(), Ordering::Release);
        }
    }
}

impl<O: ConnectionOpener> Invalidate for ConnectionHub<O> {
    fn invalidate(&self) {
        ConnectionHub::invalidate(self);
    }
}

impl<O: ConnectionOpener> std::fmt::Debug for ConnectionHub<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHub")
            .field("auto_refresh", &self.auto_refresh)
            .field("modified", &self.modified())
            .field("cached_connections", &self.slots.len())
            .finish()
    }
}

// ============================================================================
// IndexSearch
// ============================================================================

/// Search entry point handing out fresh-enough per-thread connections
pub struct IndexSearch<O: ConnectionOpener> {
    hub: Arc<ConnectionHub<O>>,
}

impl<O: ConnectionOpener> IndexSearch<O> {
    /// Facade over `hub`
    pub fn new(hub: Arc<ConnectionHub<O>>) -> Self {
        Self { hub }
    }

    /// The calling thread's search connection
    pub fn connection(&self) -> ScribeResult<Arc<Mutex<O::Connection>>> {
        self.hub.get()
    }

    /// Run `f` on the calling thread's search connection
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut O::Connection) -> R) -> ScribeResult<R> {
        self.hub.with_connection(f)
    }

    /// Force every thread to reopen its connection
    pub fn invalidate(&self) {
        self.hub.invalidate();
    }

    /// Underlying hub
    pub fn hub(&self) -> &Arc<ConnectionHub<O>> {
        &self.hub
    }
}

impl<O: ConnectionOpener> Clone for IndexSearch<O> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}
