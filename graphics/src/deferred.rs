//! Deferred release of GPU resources.
//!
//! The device executes submitted work asynchronously, so a resource whose
//! owning handle goes away may still be referenced by in-flight commands.
//! Instead of releasing it immediately, the handle hands the raw object to a
//! [`DeferredReleaseQueue`]; queued objects are released only after the
//! device has been waited on until idle.
//!
//! ```text
//! Drop(ResourceHandle) / ResourceHandle::reset
//!   1. Take the raw object out of the handle
//!   2. Push it onto the context's DeferredReleaseQueue
//!
//! DeviceContext::flush
//!   1. Take a batch of everything queued so far
//!   2. Wait until the device is idle
//!   3. Release the batch through the backend, in enqueue order
//! ```
//!
//! Objects queued while the wait is in progress are not part of the batch.
//! Work that uses them may have been submitted after the wait started, so
//! they stay queued for the next flush.

use std::fmt;

use parking_lot::Mutex;

use crate::backend::GpuBackend;
use crate::resources::{DeviceResource, ResourceKind};

type ReleaseFn = Box<dyn FnOnce(&dyn GpuBackend) + Send>;

/// A raw object waiting to be released.
struct PendingRelease {
    kind: ResourceKind,
    label: Option<String>,
    release: ReleaseFn,
}

/// Thread-safe list of resources pending release.
///
/// Each entry is released exactly once: [`take`](Self::take) moves the
/// queued entries into a [`ReleaseBatch`], so a concurrent or repeated drain
/// never sees the same entry twice.
#[derive(Default)]
pub struct DeferredReleaseQueue {
    pending: Mutex<Vec<PendingRelease>>,
}

impl DeferredReleaseQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw object for release.
    pub fn enqueue<R: DeviceResource>(&self, raw: R, label: Option<String>) {
        log::trace!("Queued {} {:?} for deferred release", R::KIND, label);
        let entry = PendingRelease {
            kind: R::KIND,
            label,
            release: Box::new(move |backend: &dyn GpuBackend| raw.release(backend)),
        };
        self.pending.lock().push(entry);
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Move every entry queued so far into a batch, leaving the queue empty.
    pub(crate) fn take(&self) -> ReleaseBatch {
        ReleaseBatch {
            entries: std::mem::take(&mut *self.pending.lock()),
        }
    }

    /// Put a batch back in front of anything queued since it was taken.
    pub(crate) fn restore(&self, batch: ReleaseBatch) {
        if batch.is_empty() {
            return;
        }
        let mut pending = self.pending.lock();
        let newer = std::mem::replace(&mut *pending, batch.entries);
        pending.extend(newer);
    }
}

impl fmt::Debug for DeferredReleaseQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredReleaseQueue")
            .field("pending_count", &self.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(DeferredReleaseQueue: Send, Sync);

/// Entries taken out of a [`DeferredReleaseQueue`] together.
pub(crate) struct ReleaseBatch {
    entries: Vec<PendingRelease>,
}

impl ReleaseBatch {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every entry through `backend` and return how many were released.
    ///
    /// Callers must make sure the device no longer uses any of the entries.
    pub(crate) fn release(self, backend: &dyn GpuBackend) -> usize {
        let count = self.entries.len();
        for entry in self.entries {
            log::trace!("Releasing {} {:?}", entry.kind, entry.label);
            (entry.release)(backend);
        }
        if count > 0 {
            log::debug!("Released {count} deferred resources");
        }
        count
    }

    /// Drop every entry without releasing it.
    pub(crate) fn abandon(self) -> usize {
        for entry in &self.entries {
            log::warn!(
                "{} {:?} was never released; the device is gone",
                entry.kind,
                entry.label
            );
        }
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyBackend, DummyEvent};
    use crate::types::{SamplerDescriptor, TransferBufferDescriptor};

    #[test]
    fn test_batch_releases_in_enqueue_order() {
        let backend = DummyBackend::new();
        let probe = backend.probe();
        let queue = DeferredReleaseQueue::new();

        let sampler = backend.create_sampler(&SamplerDescriptor::linear()).unwrap();
        let staging = backend
            .create_transfer_buffer(&TransferBufferDescriptor::upload(16))
            .unwrap();
        let (sampler_id, staging_id) = (sampler.dummy_id().unwrap(), staging.dummy_id().unwrap());

        queue.enqueue(staging, Some("staging".into()));
        queue.enqueue(sampler, None);
        assert_eq!(queue.len(), 2);
        assert_eq!(probe.total_released(), 0);

        let batch = queue.take();
        assert!(queue.is_empty());
        assert_eq!(probe.total_released(), 0);
        assert_eq!(batch.release(&backend), 2);

        let released: Vec<_> = probe
            .events()
            .into_iter()
            .filter_map(|e| match e {
                DummyEvent::Released { id, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(released, vec![staging_id, sampler_id]);
    }

    #[test]
    fn test_second_take_is_empty() {
        let backend = DummyBackend::new();
        let probe = backend.probe();
        let queue = DeferredReleaseQueue::new();
        queue.enqueue(
            backend.create_sampler(&SamplerDescriptor::nearest()).unwrap(),
            None,
        );

        assert_eq!(queue.take().release(&backend), 1);
        assert_eq!(queue.take().release(&backend), 0);
        assert_eq!(probe.total_released(), 1);
    }

    #[test]
    fn test_abandon_releases_nothing() {
        let backend = DummyBackend::new();
        let probe = backend.probe();
        let queue = DeferredReleaseQueue::new();
        queue.enqueue(
            backend.create_sampler(&SamplerDescriptor::nearest()).unwrap(),
            None,
        );

        assert_eq!(queue.take().abandon(), 1);
        assert!(queue.is_empty());
        assert_eq!(probe.total_released(), 0);
        assert_eq!(probe.live_count(), 1);
    }

    #[test]
    fn test_restored_batch_goes_before_newer_entries() {
        let backend = DummyBackend::new();
        let probe = backend.probe();
        let queue = DeferredReleaseQueue::new();

        let older = backend.create_sampler(&SamplerDescriptor::nearest()).unwrap();
        let newer = backend.create_sampler(&SamplerDescriptor::linear()).unwrap();
        let (older_id, newer_id) = (older.dummy_id().unwrap(), newer.dummy_id().unwrap());

        queue.enqueue(older, Some("older".into()));
        let batch = queue.take();
        queue.enqueue(newer, Some("newer".into()));
        queue.restore(batch);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.take().release(&backend), 2);
        let released: Vec<_> = probe
            .events()
            .into_iter()
            .filter_map(|e| match e {
                DummyEvent::Released { id, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(released, vec![older_id, newer_id]);
    }
}
