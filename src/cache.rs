// SPDX-License-Identifier: Apache-2.0

//! Capability cache
//!
//! Hardware probing is paid at most once per thread: the first lookup on a thread
//! probes and stores the record, later lookups return the stored copy.
//!
//! The cache assumes the processor's feature set does not change for the lifetime of
//! the process. Nothing enforces that; on asymmetric multi-core parts where threads can
//! migrate between cores with different extensions, a thread keeps whatever it saw first.

use std::cell::OnceCell;
use std::sync::OnceLock;

use log::trace;

use crate::detect;
use crate::types::CapabilityRecord;

/// Memoizes one dynamic [`CapabilityRecord`].
///
/// Owners that cannot rely on thread-local storage can hold one of these explicitly
/// and pass it along instead of calling [`runtime_capabilities`].
#[derive(Debug, Default)]
pub struct CapabilityCache {
    record: OnceCell<CapabilityRecord>,
}

impl CapabilityCache {
    #[inline]
    pub const fn new() -> Self {
        Self {
            record: OnceCell::new(),
        }
    }

    /// Returns the cached record, probing the processor on first use.
    #[inline]
    pub fn get(&self) -> CapabilityRecord {
        self.get_or_probe_with(detect::probe)
    }

    /// Returns the cached record, running `probe` only if nothing is cached yet.
    #[inline]
    pub fn get_or_probe_with<F>(&self, probe: F) -> CapabilityRecord
    where
        F: FnOnce() -> CapabilityRecord,
    {
        *self.record.get_or_init(probe)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.record.get().is_some()
    }
}

thread_local! {
    static THREAD_CAPABILITIES: CapabilityCache = const { CapabilityCache::new() };
}

/// Dynamic capabilities of the executing processor, probed once per thread.
#[inline]
pub fn runtime_capabilities() -> CapabilityRecord {
    THREAD_CAPABILITIES.with(|cache| {
        if !cache.is_initialized() {
            trace!("probing capabilities for thread {:?}", std::thread::current().id());
        }
        cache.get()
    })
}

/// Whether the current thread already holds a probed record.
#[inline]
pub fn is_probed_on_this_thread() -> bool {
    THREAD_CAPABILITIES.with(CapabilityCache::is_initialized)
}

static SHARED_CAPABILITIES: OnceLock<CapabilityRecord> = OnceLock::new();

/// Process-wide variant of [`runtime_capabilities`].
///
/// One probe for the whole process, lock-free after initialization. Only valid when
/// every core the process may run on exposes the same extensions.
#[inline]
pub fn shared_capabilities() -> CapabilityRecord {
    *SHARED_CAPABILITIES.get_or_init(detect::probe)
}
