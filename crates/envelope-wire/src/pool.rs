// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pooled-buffer scope: a disposable arena that rents byte buffers from a
//! process-global pool for the duration of one deserialization call and
//! returns them all on scope exit.
//!
//! A [`PooledScope`] holds two things: the single `source` buffer that the
//! carrier body is encoded into once (in `convert_to_envelope`), and a pool
//! of extra buffers rented along the way for unescaping JSON string tokens.
//! They are kept as separate fields so that scanning `source` and renting
//! from the extra pool can happen in the same expression without the
//! borrow checker treating them as aliasing the same storage — see
//! [`PooledScope::source_and_pool`].
//!
//! Allocation failure is not modelled as a recoverable error — it is fatal,
//! same as any other allocator failure in Rust.

use std::sync::{Mutex, OnceLock};

fn global_pool() -> &'static Mutex<Vec<Vec<u8>>> {
    static POOL: OnceLock<Mutex<Vec<Vec<u8>>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(Vec::new()))
}

fn rent_from_global(min_capacity: usize) -> Vec<u8> {
    let mut buf = {
        let mut pool = global_pool().lock().unwrap_or_else(|e| e.into_inner());
        take_best_fit(&mut pool, min_capacity).unwrap_or_default()
    };
    buf.clear();
    if buf.capacity() < min_capacity {
        buf.reserve(min_capacity - buf.capacity());
    }
    buf
}

fn take_best_fit(pool: &mut Vec<Vec<u8>>, min_capacity: usize) -> Option<Vec<u8>> {
    let idx = pool.iter().position(|b| b.capacity() >= min_capacity)?;
    Some(pool.swap_remove(idx))
}

fn return_to_global(mut buf: Vec<u8>, clean: bool) {
    if clean {
        buf.iter_mut().for_each(|b| *b = 0);
    }
    let mut pool = global_pool().lock().unwrap_or_else(|e| e.into_inner());
    pool.push(buf);
}

/// Opaque handle to a buffer rented from an [`ExtraPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle(usize);

/// A view into the extra-buffer pool of a [`PooledScope`], borrowed
/// disjointly from the scope's `source` buffer so both can be used
/// together while scanning.
pub struct ExtraPool<'a> {
    buffers: &'a mut Vec<Vec<u8>>,
}

impl<'a> ExtraPool<'a> {
    /// Rent a fresh buffer with at least `min_capacity` bytes of capacity.
    #[must_use]
    pub fn rent(&mut self, min_capacity: usize) -> BufferHandle {
        self.buffers.push(rent_from_global(min_capacity));
        BufferHandle(self.buffers.len() - 1)
    }

    /// Borrow the contents of a rented buffer.
    #[must_use]
    pub fn buffer(&self, handle: BufferHandle) -> &[u8] {
        &self.buffers[handle.0]
    }

    /// Mutably borrow a rented buffer.
    pub fn buffer_mut(&mut self, handle: BufferHandle) -> &mut Vec<u8> {
        &mut self.buffers[handle.0]
    }

    /// Move a rented buffer's contents out, leaving an empty buffer behind
    /// at `handle`. Used to materialise a previously-unescaped payload as a
    /// standalone owned `Vec<u8>` so it can itself be scanned while further
    /// buffers are rented from this same pool (recursive unwrap/parse).
    #[must_use]
    pub fn take(&mut self, handle: BufferHandle) -> Vec<u8> {
        std::mem::take(&mut self.buffers[handle.0])
    }
}

/// An arena that owns the single UTF-8-encoded carrier body buffer for one
/// `convert_to_envelope` call, plus a pool of extra buffers rented while
/// unescaping JSON string tokens. All rented bytes are returned to the
/// process-wide pool (optionally zeroed) when the scope is dropped.
pub struct PooledScope {
    clean_on_return: bool,
    source: Vec<u8>,
    extra: Vec<Vec<u8>>,
}

impl PooledScope {
    /// Open a new, empty scope. `clean_on_return` mirrors the
    /// `clean_rented_buffers` configuration flag.
    #[must_use]
    pub fn new(clean_on_return: bool) -> Self {
        Self {
            clean_on_return,
            source: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Rent the scope's single source buffer, sized to at least
    /// `min_capacity` bytes, ready to be filled via [`source_mut`].
    ///
    /// [`source_mut`]: Self::source_mut
    pub fn prepare_source(&mut self, min_capacity: usize) {
        self.source = rent_from_global(min_capacity);
    }

    /// Mutably borrow the source buffer, to encode the carrier body into.
    pub fn source_mut(&mut self) -> &mut Vec<u8> {
        &mut self.source
    }

    /// Borrow the source buffer's current contents.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Borrow the source buffer and the extra-buffer pool disjointly, so a
    /// scanner can read `source` while renting buffers from the pool in
    /// the same pass (e.g. unescaping a string token found partway through
    /// a scan of `source`).
    pub fn source_and_pool(&mut self) -> (&[u8], ExtraPool<'_>) {
        (
            &self.source,
            ExtraPool {
                buffers: &mut self.extra,
            },
        )
    }

    /// Borrow just the extra-buffer pool.
    pub fn pool(&mut self) -> ExtraPool<'_> {
        ExtraPool {
            buffers: &mut self.extra,
        }
    }

    /// Read a buffer previously rented from the extra pool.
    #[must_use]
    pub fn extra_buffer(&self, handle: BufferHandle) -> &[u8] {
        &self.extra[handle.0]
    }

    /// Number of extra buffers currently rented (excludes the source
    /// buffer, which is always exactly one once [`prepare_source`] has been
    /// called).
    ///
    /// [`prepare_source`]: Self::prepare_source
    #[must_use]
    pub fn extra_count(&self) -> usize {
        self.extra.len()
    }
}

impl Drop for PooledScope {
    fn drop(&mut self) {
        if !self.source.is_empty() || self.source.capacity() > 0 {
            return_to_global(std::mem::take(&mut self.source), self.clean_on_return);
        }
        for buf in self.extra.drain(..) {
            return_to_global(buf, self.clean_on_return);
        }
    }
}
