//! A free list of [`Context`]s reused across requests.
//!
//! [`ContextPool::acquire`] hands out a guard; dropping the guard resets the context and returns
//! it to the free list, so a context comes back whether the chain completed, aborted or unwound.

use crate::context::Context;
use parking_lot::Mutex;
use std::mem;
use std::ops::{Deref, DerefMut};

#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Context>>,
    max_idle: usize,
}

/// A context borrowed from a [`ContextPool`] for the duration of one request.
#[derive(Debug)]
pub struct PooledContext<'pool> {
    context: Context,
    pool: &'pool ContextPool,
}

impl ContextPool {
    /// Creates an empty pool keeping at most `max_idle` contexts around between requests.
    pub fn new(max_idle: usize) -> Self {
        Self { idle: Mutex::new(Vec::new()), max_idle }
    }

    /// Takes an idle context, or allocates one when none is available.
    ///
    /// The returned context is always pristine.
    pub fn acquire(&self) -> PooledContext<'_> {
        let mut context = self.idle.lock().pop().unwrap_or_default();
        context.reset();
        PooledContext { context, pool: self }
    }

    /// Number of contexts waiting in the free list.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    fn release(&self, mut context: Context) {
        context.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(context);
        }
    }
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.context
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        self.pool.release(mem::take(&mut self.context));
    }
}
