//! Observable value cell with synchronous fan-out.
//!
//! One owner writes, any number of readers poll with [`Observable::get`] or
//! register callbacks. Every [`Observable::set`] notifies all subscribers,
//! including the first write and writes of an unchanged value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

type Callback<T> = Box<dyn FnMut(T) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub struct Observable<T> {
    value: RwLock<Option<T>>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T: Copy + Send> Observable<T> {
    /// A cell with no value yet. Readers see `None` until the first `set`.
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn with_value(value: T) -> Self {
        let cell = Self::new();
        *cell.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
        cell
    }

    #[inline(always)]
    pub fn get(&self) -> Option<T> {
        *self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` and calls every subscriber with it, in subscription order.
    ///
    /// The value lock is released before callbacks run, so callbacks may read
    /// the cell or write other cells. The subscriber lock is held for the whole
    /// fan-out: a callback that calls `set`, `subscribe` or `unsubscribe` on
    /// this same cell deadlocks.
    pub fn set(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, callback) in subs.iter_mut() {
            callback(value);
        }
    }

    pub fn subscribe(&self, callback: impl FnMut(T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Box::new(callback)));
        id
    }

    /// Like [`Observable::subscribe`], but also calls `callback` right away
    /// with the current value when one is set.
    pub fn subscribe_and_fire(&self, mut callback: impl FnMut(T) + Send + 'static) -> SubscriptionId {
        if let Some(current) = self.get() {
            callback(current);
        }
        self.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|(sub_id, _)| *sub_id != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: Copy + Send> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Send + std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
