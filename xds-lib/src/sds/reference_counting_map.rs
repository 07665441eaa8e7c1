// SPDX-FileCopyrightText: © 2025 Huawei Cloud Computing Technologies Co., Ltd
// SPDX-License-Identifier: Apache-2.0
//
// Copyright 2025 Huawei Cloud Computing Technologies Co., Ltd
//
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
//

//! A table of shared, reference-counted values keyed by the configuration they
//! were built from.
//!
//! Each key maps to at most one live value. The first [`find_or_create`] for a
//! key runs the factory; callers that arrive for the same key while it runs
//! block until it finishes and share its outcome. Every successful
//! `find_or_create` must be balanced by exactly one [`release`]; the last
//! release removes the entry and closes the value.
//!
//! [`find_or_create`]: ReferenceCountingMap::find_or_create
//! [`release`]: ReferenceCountingMap::release

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap as HashMap;
use std::{fmt::Debug, hash::Hash, sync::Arc};
use tracing::{debug, warn};

/// A value that owns resources which must be given back when the last user
/// is done with it.
pub trait Closeable {
    fn close(&self);
}

/// Builds the value for a key that is not in the table yet.
pub trait ValueFactory<K, V: ?Sized> {
    type Error;
    fn create(&self, key: &K) -> Result<Arc<V>, Self::Error>;
}

impl<K, V, E, F> ValueFactory<K, V> for F
where
    V: ?Sized,
    F: Fn(&K) -> Result<Arc<V>, E>,
{
    type Error = E;

    fn create(&self, key: &K) -> Result<Arc<V>, E> {
        self(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FindOrCreateError<E> {
    #[error("failed to create value")]
    Factory(#[source] Arc<E>),
    #[error("value construction was abandoned by the creating thread")]
    Abandoned,
}

impl<E> Clone for FindOrCreateError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Factory(e) => Self::Factory(Arc::clone(e)),
            Self::Abandoned => Self::Abandoned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReleaseError {
    #[error("value is not the instance tracked for this key")]
    NotTracked,
}

enum Outcome<V: ?Sized, E> {
    Created(Arc<V>),
    Failed(Arc<E>),
    Abandoned,
}

/// Rendezvous for the callers waiting on an in-flight construction.
struct Pending<V: ?Sized, E> {
    outcome: Mutex<Option<Outcome<V, E>>>,
    ready: Condvar,
}

impl<V: ?Sized, E> Pending<V, E> {
    fn new() -> Self {
        Self { outcome: Mutex::new(None), ready: Condvar::new() }
    }

    fn publish(&self, outcome: Outcome<V, E>) {
        *self.outcome.lock() = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<Arc<V>, FindOrCreateError<E>> {
        let mut outcome = self.outcome.lock();
        loop {
            match outcome.as_ref() {
                Some(Outcome::Created(value)) => return Ok(Arc::clone(value)),
                Some(Outcome::Failed(e)) => return Err(FindOrCreateError::Factory(Arc::clone(e))),
                Some(Outcome::Abandoned) => return Err(FindOrCreateError::Abandoned),
                None => self.ready.wait(&mut outcome),
            }
        }
    }
}

enum Slot<V: ?Sized, E> {
    /// Construction in progress; `waiters` callers are blocked on it and each
    /// of them takes a reference if it succeeds.
    Pending { pending: Arc<Pending<V, E>>, waiters: usize },
    Ready { value: Arc<V>, ref_count: usize },
}

enum Lookup<V: ?Sized, E> {
    Found(Arc<V>),
    Wait(Arc<Pending<V, E>>),
    Construct(Arc<Pending<V, E>>),
}

pub struct ReferenceCountingMap<K, V, F>
where
    V: ?Sized,
    F: ValueFactory<K, V>,
{
    factory: F,
    entries: Mutex<HashMap<K, Slot<V, F::Error>>>,
}

impl<K, V, F> Debug for ReferenceCountingMap<K, V, F>
where
    V: ?Sized,
    F: ValueFactory<K, V>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCountingMap").field("entries", &self.entries.lock().len()).finish_non_exhaustive()
    }
}

impl<K, V, F> ReferenceCountingMap<K, V, F>
where
    K: Eq + Hash + Clone + Debug,
    V: Closeable + ?Sized,
    F: ValueFactory<K, V>,
{
    pub fn new(factory: F) -> Self {
        Self { factory, entries: Mutex::new(HashMap::default()) }
    }

    /// Returns the value for `key`, building it with the factory if no value
    /// is live. Every `Ok` return takes one reference that must be handed back
    /// with [`Self::release`].
    pub fn find_or_create(&self, key: &K) -> Result<Arc<V>, FindOrCreateError<F::Error>> {
        let lookup = {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(Slot::Ready { value, ref_count }) => {
                    *ref_count += 1;
                    debug!(?key, ref_count = *ref_count, "reusing shared value");
                    Lookup::Found(Arc::clone(value))
                },
                Some(Slot::Pending { pending, waiters }) => {
                    *waiters += 1;
                    Lookup::Wait(Arc::clone(pending))
                },
                None => {
                    let pending = Arc::new(Pending::new());
                    entries.insert(key.clone(), Slot::Pending { pending: Arc::clone(&pending), waiters: 0 });
                    Lookup::Construct(pending)
                },
            }
        };

        match lookup {
            Lookup::Found(value) => Ok(value),
            Lookup::Wait(pending) => {
                debug!(?key, "waiting for in-flight construction");
                pending.wait()
            },
            Lookup::Construct(pending) => self.construct(key, pending),
        }
    }

    fn construct(&self, key: &K, pending: Arc<Pending<V, F::Error>>) -> Result<Arc<V>, FindOrCreateError<F::Error>> {
        let mut guard = AbandonGuard { map: self, key, pending: &pending, armed: true };
        let result = self.factory.create(key);
        guard.armed = false;

        let mut entries = self.entries.lock();
        let waiters = match entries.get(key) {
            Some(Slot::Pending { pending: slot, waiters }) if Arc::ptr_eq(slot, &pending) => *waiters,
            _ => 0,
        };
        match result {
            Ok(value) => {
                let ref_count = 1 + waiters;
                entries.insert(key.clone(), Slot::Ready { value: Arc::clone(&value), ref_count });
                drop(entries);
                debug!(?key, ref_count, "created shared value");
                pending.publish(Outcome::Created(Arc::clone(&value)));
                Ok(value)
            },
            Err(e) => {
                entries.remove(key);
                drop(entries);
                warn!(?key, waiters, "failed to create shared value");
                let e = Arc::new(e);
                pending.publish(Outcome::Failed(Arc::clone(&e)));
                Err(FindOrCreateError::Factory(e))
            },
        }
    }

    /// Hands back one reference to `value`, which must be the instance
    /// currently tracked under `key`. The last release removes the entry and
    /// closes the value, outside the table lock.
    pub fn release(&self, key: &K, value: &Arc<V>) -> Result<(), ReleaseError> {
        {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(Slot::Ready { value: tracked, ref_count }) if Arc::ptr_eq(tracked, value) => {
                    if *ref_count > 1 {
                        *ref_count -= 1;
                        debug!(?key, ref_count = *ref_count, "released shared value");
                        return Ok(());
                    }
                },
                _ => {
                    warn!(?key, "attempt to release a value that is not tracked");
                    return Err(ReleaseError::NotTracked);
                },
            }
            entries.remove(key);
        }
        debug!(?key, "last reference released, closing value");
        value.close();
        Ok(())
    }

    /// Number of live or in-flight entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Outstanding references for `key`, `None` if no value is live.
    pub fn ref_count(&self, key: &K) -> Option<usize> {
        match self.entries.lock().get(key) {
            Some(Slot::Ready { ref_count, .. }) => Some(*ref_count),
            Some(Slot::Pending { .. }) | None => None,
        }
    }
}

/// Clears the in-flight slot and wakes its waiters if the factory unwinds.
struct AbandonGuard<'a, K, V, F>
where
    K: Eq + Hash,
    V: ?Sized,
    F: ValueFactory<K, V>,
{
    map: &'a ReferenceCountingMap<K, V, F>,
    key: &'a K,
    pending: &'a Arc<Pending<V, F::Error>>,
    armed: bool,
}

impl<K, V, F> Drop for AbandonGuard<'_, K, V, F>
where
    K: Eq + Hash,
    V: ?Sized,
    F: ValueFactory<K, V>,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut entries = self.map.entries.lock();
            if matches!(entries.get(self.key), Some(Slot::Pending { pending, .. }) if Arc::ptr_eq(pending, self.pending))
            {
                entries.remove(self.key);
            }
        }
        self.pending.publish(Outcome::Abandoned);
    }
}

#[cfg(test)]
mod tests {
    use super::{Closeable, FindOrCreateError, ReferenceCountingMap, ReleaseError};
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc, Barrier,
        },
        thread,
        time::Duration,
    };

    #[derive(Debug)]
    struct Counted {
        key: String,
        closed: AtomicUsize,
    }

    impl Closeable for Counted {
        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    type Factory = Box<dyn Fn(&String) -> Result<Arc<Counted>, String> + Send + Sync>;

    fn counting_factory(created: Arc<AtomicUsize>) -> Factory {
        Box::new(move |key: &String| {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Counted { key: key.clone(), closed: AtomicUsize::new(0) }))
        })
    }

    #[test]
    fn same_key_same_instance() {
        let created = Arc::new(AtomicUsize::new(0));
        let map: ReferenceCountingMap<String, Counted, _> = ReferenceCountingMap::new(counting_factory(Arc::clone(&created)));
        let key = "a".to_owned();
        let first = map.find_or_create(&key).unwrap();
        let second = map.find_or_create(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(map.ref_count(&key), Some(2));

        let other = map.find_or_create(&"b".to_owned()).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(other.key, "b");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn last_release_closes_exactly_once() {
        let map: ReferenceCountingMap<String, Counted, _> = ReferenceCountingMap::new(counting_factory(Arc::default()));
        let key = "a".to_owned();
        let first = map.find_or_create(&key).unwrap();
        let second = map.find_or_create(&key).unwrap();

        map.release(&key, &first).unwrap();
        assert_eq!(first.closed.load(Ordering::SeqCst), 0);
        assert_eq!(map.ref_count(&key), Some(1));

        map.release(&key, &second).unwrap();
        assert_eq!(first.closed.load(Ordering::SeqCst), 1);
        assert!(map.is_empty());
        assert_eq!(map.ref_count(&key), None);
    }

    #[test]
    fn double_release_is_rejected_without_side_effects() {
        let map: ReferenceCountingMap<String, Counted, _> = ReferenceCountingMap::new(counting_factory(Arc::default()));
        let key = "a".to_owned();
        let value = map.find_or_create(&key).unwrap();
        map.release(&key, &value).unwrap();
        assert_eq!(map.release(&key, &value), Err(ReleaseError::NotTracked));
        assert_eq!(value.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn foreign_value_is_rejected() {
        let map: ReferenceCountingMap<String, Counted, _> = ReferenceCountingMap::new(counting_factory(Arc::default()));
        let key = "a".to_owned();
        let tracked = map.find_or_create(&key).unwrap();
        let foreign = Arc::new(Counted { key: key.clone(), closed: AtomicUsize::new(0) });
        assert_eq!(map.release(&key, &foreign), Err(ReleaseError::NotTracked));
        assert_eq!(map.ref_count(&key), Some(1));
        assert_eq!(map.release(&"b".to_owned(), &tracked), Err(ReleaseError::NotTracked));
        assert_eq!(foreign.closed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn recreated_after_close() {
        let created = Arc::new(AtomicUsize::new(0));
        let map: ReferenceCountingMap<String, Counted, _> = ReferenceCountingMap::new(counting_factory(Arc::clone(&created)));
        let key = "a".to_owned();
        let first = map.find_or_create(&key).unwrap();
        map.release(&key, &first).unwrap();
        let second = map.find_or_create(&key).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn factory_failure_is_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let map: ReferenceCountingMap<String, Counted, _> = ReferenceCountingMap::new(move |key: &String| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(format!("cannot build {key}"))
            } else {
                Ok(Arc::new(Counted { key: key.clone(), closed: AtomicUsize::new(0) }))
            }
        });
        let key = "a".to_owned();
        let Err(FindOrCreateError::Factory(e)) = map.find_or_create(&key) else { panic!("expected a factory error") };
        assert_eq!(e.as_str(), "cannot build a");
        assert!(map.is_empty());
        assert!(map.find_or_create(&key).is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_callers_share_one_construction() {
        const THREADS: usize = 8;
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let map: Arc<ReferenceCountingMap<String, Counted, _>> = Arc::new(ReferenceCountingMap::new(move |key: &String| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok::<_, String>(Arc::new(Counted { key: key.clone(), closed: AtomicUsize::new(0) }))
        }));
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let map = Arc::clone(&map);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    map.find_or_create(&"shared".to_owned()).unwrap()
                })
            })
            .collect();
        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
        let key = "shared".to_owned();
        assert_eq!(map.ref_count(&key), Some(THREADS));
        for value in &values {
            map.release(&key, value).unwrap();
        }
        assert_eq!(values[0].closed.load(Ordering::SeqCst), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn panicking_factory_leaves_no_slot_behind() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let map: ReferenceCountingMap<String, Counted, _> = ReferenceCountingMap::new(move |key: &String| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("factory blew up");
            }
            Ok::<_, String>(Arc::new(Counted { key: key.clone(), closed: AtomicUsize::new(0) }))
        });
        let key = "a".to_owned();
        assert!(catch_unwind(AssertUnwindSafe(|| map.find_or_create(&key))).is_err());
        assert!(map.is_empty());
        assert!(map.find_or_create(&key).is_ok());
    }

    #[test]
    fn waiters_share_a_factory_failure() {
        const THREADS: usize = 4;
        let attempts = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicBool::new(true));
        let (counter, fail) = (Arc::clone(&attempts), Arc::clone(&failing));
        let map: Arc<ReferenceCountingMap<String, Counted, _>> = Arc::new(ReferenceCountingMap::new(move |key: &String| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            if fail.load(Ordering::SeqCst) {
                Err(format!("cannot build {key}"))
            } else {
                Ok(Arc::new(Counted { key: key.clone(), closed: AtomicUsize::new(0) }))
            }
        }));
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let map = Arc::clone(&map);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    map.find_or_create(&"shared".to_owned())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for result in &results {
            let Err(FindOrCreateError::Factory(e)) = result else { panic!("expected a factory error") };
            assert_eq!(e.as_str(), "cannot build shared");
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(map.is_empty());

        failing.store(false, Ordering::SeqCst);
        let key = "shared".to_owned();
        let value = map.find_or_create(&key).unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(map.ref_count(&key), Some(1));
        map.release(&key, &value).unwrap();
    }

    #[test]
    fn waiters_see_an_abandoned_construction() {
        const WAITERS: usize = 3;
        let panicking = Arc::new(AtomicBool::new(true));
        let entered = Arc::new(Barrier::new(2));
        let calls = Arc::new(AtomicUsize::new(0));
        let (panic_flag, factory_entered, counter) = (Arc::clone(&panicking), Arc::clone(&entered), Arc::clone(&calls));
        let map: Arc<ReferenceCountingMap<String, Counted, _>> = Arc::new(ReferenceCountingMap::new(move |key: &String| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                factory_entered.wait();
                thread::sleep(Duration::from_millis(100));
            }
            if panic_flag.load(Ordering::SeqCst) {
                panic!("factory blew up");
            }
            Ok::<_, String>(Arc::new(Counted { key: key.clone(), closed: AtomicUsize::new(0) }))
        }));

        let creator = {
            let map = Arc::clone(&map);
            thread::spawn(move || map.find_or_create(&"shared".to_owned()).map(|_| ()))
        };
        // the slot is in flight once the factory runs
        entered.wait();
        let waiters: Vec<_> = (0..WAITERS)
            .map(|_| {
                let map = Arc::clone(&map);
                thread::spawn(move || map.find_or_create(&"shared".to_owned()).map(|_| ()))
            })
            .collect();

        assert!(creator.join().is_err());
        for waiter in waiters {
            assert!(matches!(waiter.join().unwrap(), Err(FindOrCreateError::Abandoned)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(map.is_empty());

        panicking.store(false, Ordering::SeqCst);
        assert!(map.find_or_create(&"shared".to_owned()).is_ok());
    }
}
