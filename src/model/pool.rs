// src/model/pool.rs
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use crate::error::RlResult;
use crate::trace::{trace_info, TraceLogger};

pub type PoolFactory<T> = Arc<dyn Fn() -> RlResult<T> + Send + Sync>;

struct PoolInner<T> {
    version: u64,
    factory: PoolFactory<T>,
    // created objects, whether idle or borrowed
    objects_count: usize,
    idle: Vec<T>,
}

impl<T> PoolInner<T> {
    fn new(factory: PoolFactory<T>, prewarm: usize, version: u64) -> RlResult<Self> {
        let mut idle = Vec::with_capacity(prewarm);
        for _ in 0..prewarm {
            idle.push(factory()?);
        }
        Ok(Self { version, factory, objects_count: prewarm, idle })
    }
}

/// Versioned pool of reusable objects. A borrow is tagged with the pool
/// version at borrow time; a return only recycles the object if the
/// version still matches, otherwise the object is dropped. This is what
/// lets a model hot-swap happen under live traffic: in-flight borrows run
/// to completion on the old version and are discarded on return, and a
/// post-swap borrow only ever sees post-swap instances.
pub struct VersionedObjectPool<T> {
    inner: Mutex<PoolInner<T>>,
    trace: Arc<dyn TraceLogger>,
}

impl<T> VersionedObjectPool<T> {
    pub fn new(factory: PoolFactory<T>, trace: Arc<dyn TraceLogger>) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                version: 0,
                factory,
                objects_count: 0,
                idle: Vec::new(),
            }),
            trace,
        }
    }

    /// Borrow a pooled object, creating one with the current factory if the
    /// pool is idle-empty. The guard returns it on drop.
    pub fn get_or_create(self: &Arc<Self>) -> RlResult<PooledObject<T>> {
        let (obj, version) = {
            let mut inner = self.inner.lock().expect("pool lock");
            let version = inner.version;
            match inner.idle.pop() {
                Some(obj) => (obj, version),
                None => {
                    let obj = (inner.factory)()?;
                    inner.objects_count += 1;
                    trace_info(
                        self.trace.as_ref(),
                        &format!("pool: created object, total count {}", inner.objects_count),
                    );
                    (obj, version)
                }
            }
        };
        Ok(PooledObject { pool: Arc::clone(self), obj: Some(obj), version })
    }

    /// Swap in a new factory and bump the version. The new pool is
    /// pre-warmed to the old object count so steady-state latency does not
    /// regress right after a swap.
    pub fn update_factory(&self, new_factory: PoolFactory<T>) -> RlResult<()> {
        let mut inner = self.inner.lock().expect("pool lock");
        let prewarm = inner.objects_count;
        let new_version = inner.version + 1;
        trace_info(
            self.trace.as_ref(),
            &format!("pool: factory update to version {new_version}, pre-warming {prewarm}"),
        );
        *inner = PoolInner::new(new_factory, prewarm, new_version)?;
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.inner.lock().expect("pool lock").version
    }

    /// Total created objects under the current version, borrowed or idle.
    pub fn size(&self) -> usize {
        self.inner.lock().expect("pool lock").objects_count
    }

    pub fn idle_len(&self) -> usize {
        self.inner.lock().expect("pool lock").idle.len()
    }

    fn return_to_pool(&self, obj: T, obj_version: u64) {
        let mut inner = self.inner.lock().expect("pool lock");
        if inner.version == obj_version {
            inner.idle.push(obj);
        }
        // stale version: drop the object here
    }
}

/// Borrow guard. Deref to use the object; dropping it returns (or
/// discards) it.
pub struct PooledObject<T> {
    pool: Arc<VersionedObjectPool<T>>,
    obj: Option<T>,
    version: u64,
}

impl<T> PooledObject<T> {
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<T> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.obj.as_ref().expect("pooled object taken")
    }
}

impl<T> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.obj.as_mut().expect("pooled object taken")
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(obj) = self.obj.take() {
            self.pool.return_to_pool(obj, self.version);
        }
    }
}
