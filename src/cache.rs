use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use ahash::RandomState;
use hashbrown::HashMap;
use log::trace;

use crate::{
    Dataset,
    coerce::{NumericView, TemporalView, numeric_column, temporal_column},
    dataset::{DatasetId, normalize_column_name},
};

/// Source of the current instant, injectable so expiry can be tested
pub trait Clock {
    /// Returns the current instant
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewKind {
    Numeric,
    Temporal,
}

#[derive(Debug, Clone)]
enum CachedView {
    Numeric(Arc<NumericView>),
    Temporal(Arc<TemporalView>),
}

#[derive(Debug, Clone)]
struct Entry {
    view: CachedView,
    expires_at: Instant,
}

type Key = (DatasetId, ViewKind, String);

/// Memoises coerced column views per `(dataset, column)` with a time-to-live.
///
/// Views are shared through [`Arc`], so a hit costs a reference count bump.
/// Every miss sweeps out expired entries, so the cache never holds more than
/// the entries created within one time-to-live.
/// The cache is owned by its caller; sharing it across threads means wrapping
/// it in a lock.
#[derive(Debug)]
pub struct CoercionCache<C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: HashMap<Key, Entry, RandomState>,
    hits: u64,
    misses: u64,
}

impl CoercionCache<SystemClock> {
    /// Creates a cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> CoercionCache<C> {
    /// Creates a cache reading time from `clock`
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entries: HashMap::with_hasher(RandomState::default()),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the time-to-live applied to new entries
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Numeric view of a column, coerced on a miss
    pub fn numeric(&mut self, dataset: &Dataset, column: &str) -> Arc<NumericView> {
        let view = self.lookup(dataset, column, ViewKind::Numeric, || {
            CachedView::Numeric(Arc::new(numeric_column(dataset, column)))
        });
        match view {
            CachedView::Numeric(v) => v,
            CachedView::Temporal(_) => Arc::new(numeric_column(dataset, column)),
        }
    }

    /// Temporal view of a column, coerced on a miss
    pub fn temporal(&mut self, dataset: &Dataset, column: &str) -> Arc<TemporalView> {
        let view = self.lookup(dataset, column, ViewKind::Temporal, || {
            CachedView::Temporal(Arc::new(temporal_column(dataset, column)))
        });
        match view {
            CachedView::Temporal(v) => v,
            CachedView::Numeric(_) => Arc::new(temporal_column(dataset, column)),
        }
    }

    fn lookup(
        &mut self,
        dataset: &Dataset,
        column: &str,
        kind: ViewKind,
        coerce: impl FnOnce() -> CachedView,
    ) -> CachedView {
        let now = self.clock.now();
        let key = (dataset.id(), kind, normalize_column_name(column));

        if let Some(entry) = self.entries.get(&key) {
            if now < entry.expires_at {
                trace!("coercion cache hit: {:?} {kind:?} {:?}", key.0, key.2);
                self.hits += 1;
                return entry.view.clone();
            }
            trace!("coercion cache entry expired: {:?} {kind:?} {:?}", key.0, key.2);
        } else {
            trace!("coercion cache miss: {:?} {kind:?} {:?}", key.0, key.2);
        }

        self.misses += 1;
        self.drop_expired(now);
        let view = coerce();
        self.entries.insert(
            key,
            Entry {
                view: view.clone(),
                expires_at: now + self.ttl,
            },
        );
        view
    }

    /// Drops every expired entry, returning how many were removed.
    ///
    /// Misses already sweep expired entries, so this only matters for
    /// releasing memory between bursts of lookups.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        self.drop_expired(now)
    }

    fn drop_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let purged = before - self.entries.len();
        if purged > 0 {
            trace!("coercion cache purged {purged} expired entries");
        }
        purged
    }

    /// Drops every entry belonging to a dataset
    pub fn invalidate(&mut self, dataset: DatasetId) {
        self.entries.retain(|(id, _, _), _| *id != dataset);
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups served from the cache
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of lookups that had to coerce
    pub const fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::Value;

    #[derive(Clone)]
    struct ManualClock {
        start: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + self.offset.get()
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_columns([
            ("amount", vec!["1.5".into(), 2.0.into(), Value::Missing]),
            ("date", vec!["2024-01-01".into(), "oops".into(), "2024-01-03".into()]),
        ])
    }

    #[test]
    fn hits_share_the_view() {
        let ds = dataset();
        let mut cache = CoercionCache::new(Duration::from_secs(600));
        let first = cache.numeric(&ds, "amount");
        let second = cache.numeric(&ds, " Amount");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, vec![Some(1.5), Some(2.0), None]);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn numeric_and_temporal_views_are_kept_apart() {
        let ds = dataset();
        let mut cache = CoercionCache::new(Duration::from_secs(60));
        let numeric = cache.numeric(&ds, "date");
        let temporal = cache.temporal(&ds, "date");
        assert_eq!(*numeric, vec![None, None, None]);
        assert_eq!(temporal.iter().filter(|t| t.is_some()).count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = ManualClock::new();
        let ds = dataset();
        let mut cache = CoercionCache::with_clock(Duration::from_secs(10), clock.clone());
        let first = cache.numeric(&ds, "amount");

        clock.advance(Duration::from_secs(9));
        assert!(Arc::ptr_eq(&first, &cache.numeric(&ds, "amount")));

        clock.advance(Duration::from_secs(1));
        assert!(!Arc::ptr_eq(&first, &cache.numeric(&ds, "amount")));
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let clock = ManualClock::new();
        let ds = dataset();
        let mut cache = CoercionCache::with_clock(Duration::from_secs(10), clock.clone());
        cache.numeric(&ds, "amount");
        clock.advance(Duration::from_secs(5));
        cache.temporal(&ds, "date");
        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn misses_sweep_expired_entries() {
        let clock = ManualClock::new();
        let base = dataset();
        let mut cache = CoercionCache::with_clock(Duration::from_secs(10), clock.clone());
        for _ in 0..50 {
            let view = base.filter(&[true, true, true]).unwrap_or_else(|e| panic!("{e}"));
            cache.numeric(&view, "amount");
            clock.advance(Duration::from_secs(10));
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 50);

        let mut cache = CoercionCache::with_clock(Duration::ZERO, clock.clone());
        for _ in 0..1000 {
            let view = base.filter(&[true, false, true]).unwrap_or_else(|e| panic!("{e}"));
            cache.numeric(&view, "amount");
        }
        assert!(cache.len() <= 1);
    }

    #[test]
    fn invalidate_and_clear() {
        let a = dataset();
        let b = a.filter(&[true, false, true]).unwrap_or_else(|e| panic!("{e}"));
        let mut cache = CoercionCache::new(Duration::from_secs(60));
        cache.numeric(&a, "amount");
        cache.numeric(&b, "amount");
        assert_eq!(cache.len(), 2);

        cache.invalidate(a.id());
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.numeric(&b, "amount"), vec![Some(1.5), None]);

        cache.clear();
        assert!(cache.is_empty());
    }
}
